use std::fmt::{self, Debug};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use eyre::{bail, eyre, Result, WrapErr};
use parking_lot::RwLock;

/// Where handlers fetch raw bytes from.
pub trait Source: Send + Sync + Debug + 'static {
    fn read_bytes(&self, identifier: &str) -> Result<Vec<u8>>;

    fn read_string(&self, identifier: &str) -> Result<String> {
        let bytes = self.read_bytes(identifier)?;
        String::from_utf8(bytes).wrap_err("invalid utf-8")
    }
}

/// Reads identifiers as paths relative to a root directory.
pub struct DirSource {
    root: PathBuf,
}

impl Debug for DirSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirSource")
            .field("root", &self.root)
            .finish()
    }
}

impl DirSource {
    pub fn new(root: impl AsRef<Path>) -> Result<DirSource> {
        Ok(DirSource {
            root: root.as_ref().canonicalize()?,
        })
    }

    /// Identifiers are relative to the root, with or without a leading `/`,
    /// and may not climb out of it.
    fn resolve(&self, identifier: &str) -> Result<PathBuf> {
        let relative = Path::new(identifier.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            bail!("identifier {} escapes the source root", identifier);
        }

        Ok(self.root.join(relative))
    }
}

impl Source for DirSource {
    fn read_bytes(&self, identifier: &str) -> Result<Vec<u8>> {
        let path = self.resolve(identifier)?;
        fs::read(&path).wrap_err_with(|| format!("cannot read {}", path.display()))
    }
}

/// In-memory identifier to bytes map.
#[derive(Default)]
pub struct MemorySource {
    files: RwLock<AHashMap<Arc<str>, Arc<[u8]>>>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    pub fn insert(&self, identifier: impl Into<Arc<str>>, bytes: impl Into<Arc<[u8]>>) {
        self.files.write().insert(identifier.into(), bytes.into());
    }

    pub fn with(self, identifier: impl Into<Arc<str>>, bytes: impl Into<Arc<[u8]>>) -> MemorySource {
        self.insert(identifier, bytes);
        self
    }
}

impl Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("len", &self.files.read().len())
            .finish()
    }
}

impl Source for MemorySource {
    fn read_bytes(&self, identifier: &str) -> Result<Vec<u8>> {
        let files = self.files.read();
        let bytes = files
            .get(identifier)
            .ok_or_else(|| eyre!("no such file: {}", identifier))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_reads_inserted_files() {
        let source = MemorySource::new().with("/a.json", &b"{}"[..]);

        assert_eq!(source.read_string("/a.json").unwrap(), "{}");
        assert!(source.read_bytes("/missing").is_err());
    }

    #[test]
    fn dir_source_strips_leading_slash() {
        let root = std::env::temp_dir().join(format!("gg-resources-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("hello.txt"), "hello").unwrap();

        let source = DirSource::new(&root).unwrap();
        assert_eq!(source.read_string("/hello.txt").unwrap(), "hello");
        assert!(source.read_bytes("nope.txt").is_err());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn dir_source_stays_inside_root() {
        let parent = std::env::temp_dir().join(format!("gg-resources-escape-{}", std::process::id()));
        let root = parent.join("root");
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(parent.join("secret.txt"), "secret").unwrap();
        std::fs::write(root.join("sub/inner.txt"), "inner").unwrap();

        let source = DirSource::new(&root).unwrap();
        assert_eq!(source.read_string("./sub/inner.txt").unwrap(), "inner");

        let error = source.read_bytes("/../secret.txt").unwrap_err();
        assert!(error.to_string().contains("escapes the source root"));
        assert!(source.read_bytes("sub/../../secret.txt").is_err());

        std::fs::remove_dir_all(&parent).unwrap();
    }
}
