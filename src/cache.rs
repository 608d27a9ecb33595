//! On-disk cache of raw lyric text, keyed by track name.

use std::{fs, io, path::PathBuf};

use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::CacheError;

pub fn cache_hash(key: &str) -> String {
    format!("{:016x}", xxh3_64(key.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct LrcCache {
    dir: PathBuf,
}

impl LrcCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LrcCache { dir: dir.into() }
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.lrc", cache_hash(name)))
    }

    fn io_err(path: PathBuf) -> impl FnOnce(io::Error) -> CacheError {
        move |source| CacheError::Io { path, source }
    }

    pub fn load(&self, name: &str) -> Result<Option<String>, CacheError> {
        let path = self.entry_path(name);
        match fs::read_to_string(&path) {
            Ok(text) => {
                debug!(%name, path = %path.display(), "lyrics cache hit");
                Ok(Some(text))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_err(path)(e)),
        }
    }

    pub fn store(&self, name: &str, lrc: &str) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(Self::io_err(self.dir.clone()))?;
        let path = self.entry_path(name);
        fs::write(&path, lrc).map_err(Self::io_err(path))
    }

    pub fn remove(&self, name: &str) -> Result<(), CacheError> {
        let path = self.entry_path(name);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(Self::io_err(path)(e)),
            _ => Ok(()),
        }
    }

    /// Delete every cached entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Self::io_err(self.dir.clone())(e)),
        };
        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "lrc") {
                fs::remove_file(&path).map_err(Self::io_err(path))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LrcCache::new(dir.path().join("lrc"));
        assert_eq!(cache.load("song.mp3").unwrap(), None);

        cache.store("song.mp3", "[00:01.00]Hi").unwrap();
        assert_eq!(cache.load("song.mp3").unwrap().as_deref(), Some("[00:01.00]Hi"));
        assert_eq!(cache.load("other.mp3").unwrap(), None);
    }

    #[test]
    fn store_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LrcCache::new(dir.path());
        cache.store("a", "one").unwrap();
        cache.store("a", "two").unwrap();
        assert_eq!(cache.load("a").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LrcCache::new(dir.path());
        cache.store("a", "1").unwrap();
        cache.store("b", "2").unwrap();
        cache.store("c", "3").unwrap();
        fs::write(dir.path().join("keep.txt"), "x").unwrap();

        cache.remove("a").unwrap();
        cache.remove("missing").unwrap();
        assert_eq!(cache.load("a").unwrap(), None);

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.load("b").unwrap(), None);
        assert!(dir.path().join("keep.txt").exists());
    }

    #[test]
    fn clear_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LrcCache::new(dir.path().join("never-created"));
        assert_eq!(cache.clear().unwrap(), 0);
    }

    #[test]
    fn names_hash_to_stable_file_names() {
        assert_eq!(cache_hash("song.mp3"), cache_hash("song.mp3"));
        assert_ne!(cache_hash("song.mp3"), cache_hash("Song.mp3"));
        assert_eq!(cache_hash("x").len(), 16);
    }
}
