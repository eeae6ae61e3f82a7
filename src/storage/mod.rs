//! Artifact storage layer
//!
//! Byte-oriented save/load keyed by a logical path, backed by either the
//! local filesystem or S3. The backend is selected by path scheme:
//! `s3://bucket/prefix` goes to S3, anything else is a local path. The
//! backup and restore runners are agnostic to which backend is active.

use async_trait::async_trait;

use crate::error::{CbrError, CbrResult};

mod local;
mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

/// Byte-oriented artifact persistence
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Logical path where a new artifact named `filename` should be written
    fn object_path(&self, filename: &str) -> String;

    async fn save(&self, data: &[u8], path: &str) -> CbrResult<()>;

    async fn load(&self, path: &str) -> CbrResult<Vec<u8>>;
}

/// Create the artifact store matching a backup path's scheme
pub async fn for_path(path: &str) -> CbrResult<Box<dyn ArtifactStore>> {
    match path.strip_prefix("s3://") {
        Some(rest) => {
            let (bucket, prefix) = split_bucket_prefix(rest)?;
            Ok(Box::new(S3Store::connect(bucket, prefix).await))
        }
        None => Ok(Box::new(LocalStore::new(path))),
    }
}

/// The key an artifact is loaded under: for S3 URIs the trailing object
/// filename (the bucket and prefix live in the store), for local paths the
/// path itself.
pub fn artifact_key(path: &str) -> &str {
    if path.starts_with("s3://") {
        path.rsplit('/').next().unwrap_or(path)
    } else {
        path
    }
}

/// Split the part after `s3://` into bucket and key prefix, dropping the
/// trailing segment (a filename, or empty from a trailing slash).
fn split_bucket_prefix(rest: &str) -> CbrResult<(String, String)> {
    let mut parts = rest.splitn(2, '/');
    let bucket = parts.next().unwrap_or_default();
    if bucket.is_empty() {
        return Err(CbrError::Config(format!(
            "S3 path is missing a bucket name: s3://{}",
            rest
        )));
    }

    let mut prefix = parts.next().unwrap_or_default().to_string();
    match prefix.rfind('/') {
        Some(last_slash) => prefix.truncate(last_slash),
        None => prefix.clear(),
    }

    Ok((bucket.to_string(), prefix))
}
