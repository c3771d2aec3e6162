use std::sync::Arc;

use ahash::AHashMap;

/// Maps resource identifiers to content hashes.
///
/// The first identifier registered for a hash becomes the canonical
/// identifier of every identifier sharing that hash. Entries are never
/// overwritten.
#[derive(Debug, Default)]
pub struct HashRegistry {
    hashes: AHashMap<Arc<str>, Arc<str>>,
    canonical: AHashMap<Arc<str>, Arc<str>>,
}

impl HashRegistry {
    pub fn new() -> HashRegistry {
        HashRegistry::default()
    }

    pub fn register_hash(&mut self, hash: &str, identifier: &str) {
        if self.hashes.contains_key(identifier) {
            return;
        }

        let hash: Arc<str> = hash.into();
        let identifier: Arc<str> = identifier.into();

        self.canonical
            .entry(hash.clone())
            .or_insert_with(|| identifier.clone());
        self.hashes.insert(identifier, hash);
    }

    pub fn get_hash(&self, identifier: &str) -> Option<&Arc<str>> {
        self.hashes.get(identifier)
    }

    /// Unhashed identifiers are their own canonical identifier.
    pub fn get_canonical_identifier(&self, identifier: &str) -> Arc<str> {
        self.hashes
            .get(identifier)
            .and_then(|hash| self.canonical.get(hash))
            .cloned()
            .unwrap_or_else(|| identifier.into())
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
