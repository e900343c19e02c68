//! # Save Storage
//!
//! Where the save blob lives. The game only ever holds one save slot.
//!
//! - [`FileStorage`]: one file on disk, replaced atomically on write
//! - [`MemoryStorage`]: in-process slot for tests and replays

use std::path::{Path, PathBuf};

use crate::error::{GameError, GameResult};

/// A single save slot.
pub trait Storage: Send {
    /// Replaces the stored blob.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the blob cannot be written.
    fn save(&mut self, bytes: &[u8]) -> GameResult<()>;

    /// Reads the stored blob.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if nothing was saved or the blob cannot be read.
    fn load(&self) -> GameResult<Vec<u8>>;
}

/// Save slot backed by a file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Creates a slot at `path`. Nothing is touched until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the save file.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(ToOwned::to_owned).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Storage for FileStorage {
    fn save(&mut self, bytes: &[u8]) -> GameResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                GameError::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        // Write then rename so a crash never leaves a half-written save.
        let temp = self.temp_path();
        std::fs::write(&temp, bytes)
            .map_err(|e| GameError::Storage(format!("failed to write {}: {e}", temp.display())))?;
        std::fs::rename(&temp, &self.path).map_err(|e| {
            GameError::Storage(format!("failed to replace {}: {e}", self.path.display()))
        })?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "save written");
        Ok(())
    }

    fn load(&self) -> GameResult<Vec<u8>> {
        std::fs::read(&self.path)
            .map_err(|e| GameError::Storage(format!("failed to read {}: {e}", self.path.display())))
    }
}

/// Save slot kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    bytes: Option<Vec<u8>>,
}

impl MemoryStorage {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot holding `bytes`.
    #[must_use]
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes: Some(bytes) }
    }

    /// The stored blob, if any.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }
}

impl Storage for MemoryStorage {
    fn save(&mut self, bytes: &[u8]) -> GameResult<()> {
        self.bytes = Some(bytes.to_vec());
        Ok(())
    }

    fn load(&self) -> GameResult<Vec<u8>> {
        self.bytes.clone().ok_or_else(|| GameError::Storage("nothing saved".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, FileStorage) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("saves").join("saveFile"));
        (dir, storage)
    }

    #[test]
    fn test_file_save_and_load() {
        let (_dir, mut storage) = setup_test_dir();
        storage.save(&[1, 2, 3, 4]).unwrap();
        assert_eq!(storage.load().unwrap(), vec![1, 2, 3, 4]);

        storage.save(&[9]).unwrap();
        assert_eq!(storage.load().unwrap(), vec![9]);
        assert!(!storage.temp_path().exists());
    }

    #[test]
    fn test_file_load_missing() {
        let (_dir, storage) = setup_test_dir();
        assert!(matches!(storage.load(), Err(GameError::Storage(_))));
    }

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStorage::new();
        assert!(storage.load().is_err());
        storage.save(b"blob").unwrap();
        assert_eq!(storage.bytes(), Some(&b"blob"[..]));
        assert_eq!(storage.load().unwrap(), b"blob".to_vec());
    }
}
