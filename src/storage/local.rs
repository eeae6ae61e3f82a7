//! Local filesystem artifact store

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{CbrError, CbrResult};

use super::ArtifactStore;

/// Stores artifacts as plain files under a base directory
pub struct LocalStore {
    base: PathBuf,
}

impl LocalStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    fn object_path(&self, filename: &str) -> String {
        self.base.join(filename).to_string_lossy().into_owned()
    }

    async fn save(&self, data: &[u8], path: &str) -> CbrResult<()> {
        let path = Path::new(path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    CbrError::Storage(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        fs::write(path, data)
            .map_err(|e| CbrError::Storage(format!("Failed to write {}: {}", path.display(), e)))
    }

    async fn load(&self, path: &str) -> CbrResult<Vec<u8>> {
        let path = Path::new(path);
        fs::read(path)
            .map_err(|e| CbrError::Storage(format!("Failed to read {}: {}", path.display(), e)))
    }
}
