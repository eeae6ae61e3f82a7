//! Run configuration
//!
//! One immutable [`Config`] value per invocation, built from CLI flags and
//! passed by reference into the backup and restore runners. Core logic never
//! reads ambient process state, which keeps both runners testable with
//! substitutable fakes for the Cognito client and the artifact store.

/// Upper bound Cognito accepts for MaxResults on list calls.
pub const MAX_PAGE_SIZE: i32 = 50;

/// Configuration for one backup or restore run
#[derive(Debug, Clone)]
pub struct Config {
    /// Pool ID: the source pool for backup, the target pool for restore
    pub pool_id: String,
    /// AWS region
    pub region: String,
    /// Where artifacts live: a local directory/file or `s3://bucket/prefix`
    pub backup_path: String,
    /// Restore only groups and users
    pub users_only: bool,
    /// Requested page size for bounded list calls
    pub max_results: i32,
    /// Temporary password for non-SSO users; required whenever the snapshot
    /// contains a user without an `identities` attribute
    pub default_password: Option<String>,
}

impl Config {
    /// Effective page size for list calls, clamped to `(0, 50]`.
    ///
    /// Values outside the valid range fall back to the Cognito maximum of 50.
    pub fn page_size(&self) -> i32 {
        if self.max_results <= 0 || self.max_results > MAX_PAGE_SIZE {
            return MAX_PAGE_SIZE;
        }
        self.max_results
    }
}
