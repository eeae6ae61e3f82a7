//! cbr - AWS Cognito user pool backup and restore
//!
//! This library provides the core functionality for snapshotting a Cognito
//! user pool's configuration (pool settings, users, groups, resource servers,
//! app clients, identity providers) into a JSON artifact and restoring it
//! into a target pool, typically in another environment.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Immutable per-run configuration
//! - `error`: Custom error types
//! - `snapshot`: The in-memory snapshot model and artifact format
//! - `cognito`: The Cognito client seam and its AWS SDK implementation
//! - `storage`: Artifact persistence (local filesystem or S3)
//! - `backup`: The backup assembler
//! - `restore`: The restore reconciler
//!
//! Every run is fully sequential: reads are drained in page order and writes
//! happen in a fixed dependency order (pool settings, resource servers, app
//! clients, identity providers, groups, users), since later steps may depend
//! on identifiers or scopes created earlier.

pub mod backup;
pub mod cognito;
pub mod config;
pub mod error;
pub mod restore;
pub mod snapshot;
pub mod storage;

pub use error::{CbrError, CbrResult};
