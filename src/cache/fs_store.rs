//! Directory-backed cache store
//!
//! Every page is one file directly inside the cache directory. Writes go to
//! a temporary sibling first and are renamed into place, so a reader never
//! observes a half-written page.

use crate::cache::key::{is_valid_key, CACHE_SUFFIX};
use crate::cache::traits::{CacheEntryInfo, CacheError, CacheResult, CacheStore};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const TMP_SUFFIX: &str = ".partial";

/// Cache store writing one file per page into a directory
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    /// Opens (and creates, if needed) the cache directory
    pub fn open(root: impl AsRef<Path>) -> CacheResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        tracing::debug!("Cache directory ready at {}", root.display());
        Ok(Self { root })
    }

    /// The directory holding the cache files
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> CacheResult<PathBuf> {
        if !is_valid_key(key) {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn cached_files(&self, prefix: &str) -> CacheResult<Vec<(String, fs::Metadata)>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };

            if !name.starts_with(prefix) || !name.ends_with(CACHE_SUFFIX) {
                continue;
            }

            let metadata = entry.metadata()?;
            if metadata.is_file() {
                files.push((name, metadata));
            }
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

impl CacheStore for FsCacheStore {
    fn write(&self, key: &str, bytes: &[u8]) -> CacheResult<()> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!("{}{}", key, TMP_SUFFIX));

        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        Ok(())
    }

    fn read(&self, key: &str) -> CacheResult<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CacheError::NotFound(key.to_string()),
            _ => CacheError::Io(e),
        })
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }

    fn mtime(&self, key: &str) -> CacheResult<DateTime<Utc>> {
        let path = self.path_for(key)?;
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CacheError::NotFound(key.to_string()),
            _ => CacheError::Io(e),
        })?;
        Ok(DateTime::<Utc>::from(metadata.modified()?))
    }

    fn list(&self, prefix: &str) -> CacheResult<Vec<CacheEntryInfo>> {
        self.cached_files(prefix)?
            .into_iter()
            .map(|(key, metadata)| {
                Ok(CacheEntryInfo {
                    key,
                    size: metadata.len(),
                    modified: DateTime::<Utc>::from(metadata.modified()?),
                })
            })
            .collect()
    }

    fn remove_prefix(&self, prefix: &str) -> CacheResult<usize> {
        let files = self.cached_files(prefix)?;
        let count = files.len();

        for (name, _) in files {
            fs::remove_file(self.root.join(&name))?;
        }

        tracing::debug!(
            "Removed {} cached files with prefix '{}' from {}",
            count,
            prefix,
            self.root.display()
        );
        Ok(count)
    }
}
