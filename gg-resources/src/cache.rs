use std::sync::Arc;

use ahash::AHashMap;
use tracing::warn;

use crate::hash::HashRegistry;
use crate::ResourceRef;

/// Opened resources keyed by content hash.
///
/// Identifiers are resolved to hashes through the owned [`HashRegistry`], so
/// every identifier sharing a hash shares one cache entry. Nothing is ever
/// evicted.
#[derive(Default)]
pub struct ResourceCache {
    registry: HashRegistry,
    entries: AHashMap<Arc<str>, ResourceRef>,
}

impl ResourceCache {
    pub fn new() -> ResourceCache {
        ResourceCache::default()
    }

    pub fn registry(&self) -> &HashRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HashRegistry {
        &mut self.registry
    }

    pub fn get(&self, identifier: &str) -> Option<&ResourceRef> {
        let hash = self.registry.get_hash(identifier)?;
        self.entries.get(hash)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    pub fn put(&mut self, identifier: &str, resource: ResourceRef) {
        match self.registry.get_hash(identifier) {
            Some(hash) => {
                self.entries.insert(hash.clone(), resource);
            }
            None => warn!(identifier, "no hash registered, resource not cached"),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("registry", &self.registry)
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_hash_shares_entry() {
        let mut cache = ResourceCache::new();
        cache.registry_mut().register_hash("abc", "/a.png");
        cache.registry_mut().register_hash("abc", "/a.png?v=2");

        let resource: ResourceRef = Arc::new(String::from("pixels"));
        cache.put("/a.png", resource.clone());

        let hit = cache.get("/a.png?v=2").unwrap();
        assert!(Arc::ptr_eq(hit, &resource));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unhashed_put_is_dropped() {
        let mut cache = ResourceCache::new();
        cache.put("/b.png", Arc::new(1u32));

        assert!(cache.is_empty());
        assert!(cache.get("/b.png").is_none());
    }
}
