//! Restore reconciler
//!
//! Reconstructs a target pool's state from a snapshot artifact. The run is a
//! fixed sequence:
//!
//! 1. Load and deserialize the snapshot (fatal on parse failure).
//! 2. In users-only mode, skip straight to principal restore.
//! 3. Pool resolution: describe the target pool ID. If it exists, update it
//!    in place; if not, create a new pool from the snapshot's settings (name
//!    forced to the requested target ID) and adopt the newly assigned pool ID
//!    for every subsequent call.
//! 4. Full restore: pool settings, then resource servers, then app clients,
//!    then identity providers. Clients and providers may reference
//!    resource-server scopes, so that order is fixed.
//! 5. Principal restore (both modes): groups first, then users. Group
//!    membership is not replayed.
//!
//! The first failure aborts the remaining sequence; already-created resources
//! are not rolled back, so the target pool keeps whatever the completed steps
//! produced.

use tracing::{debug, info};

use crate::cognito::CognitoApi;
use crate::config::Config;
use crate::error::{CbrError, CbrResult};
use crate::snapshot::{PoolSnapshot, UserRecord};
use crate::storage::{self, ArtifactStore};

/// Replays one snapshot into a target pool
pub struct Restore<'a, C: CognitoApi> {
    client: &'a C,
    store: &'a dyn ArtifactStore,
    config: &'a Config,
}

impl<'a, C: CognitoApi> Restore<'a, C> {
    pub fn new(client: &'a C, store: &'a dyn ArtifactStore, config: &'a Config) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Run the restore against the configured target pool
    pub async fn execute(&self) -> CbrResult<()> {
        let snapshot = self.load_snapshot().await?;

        if self.config.users_only {
            self.restore_principals(&snapshot, &self.config.pool_id)
                .await?;
            info!(pool_id = %self.config.pool_id, "users-only restore complete");
            return Ok(());
        }

        let pool_id = self.resolve_target_pool(&snapshot).await?;
        self.restore_pool_resources(&snapshot, &pool_id).await?;
        self.restore_principals(&snapshot, &pool_id).await?;

        info!(pool_id = %pool_id, "restore complete");
        Ok(())
    }

    async fn load_snapshot(&self) -> CbrResult<PoolSnapshot> {
        let key = storage::artifact_key(&self.config.backup_path);
        let data = self.store.load(key).await?;
        PoolSnapshot::from_json(&data)
    }

    /// Decide between the update path (pool exists, keep the requested ID)
    /// and the create path (pool absent, create from the snapshot's settings
    /// and adopt the newly assigned ID).
    async fn resolve_target_pool(&self, snapshot: &PoolSnapshot) -> CbrResult<String> {
        if self
            .client
            .describe_pool(&self.config.pool_id)
            .await?
            .is_some()
        {
            info!(pool_id = %self.config.pool_id, "using existing pool");
            return Ok(self.config.pool_id.clone());
        }

        let mut template = snapshot.pool_config.clone();
        template.name = Some(self.config.pool_id.clone());

        let new_pool_id = self.client.create_pool(&template).await?;
        info!(pool_id = %new_pool_id, "created new pool");
        Ok(new_pool_id)
    }

    /// Replay pool settings and dependent resources in dependency order
    async fn restore_pool_resources(
        &self,
        snapshot: &PoolSnapshot,
        pool_id: &str,
    ) -> CbrResult<()> {
        self.client.update_pool(pool_id, &snapshot.pool_config).await?;

        for server in &snapshot.resource_servers {
            debug!(identifier = %server.identifier, "creating resource server");
            self.client.create_resource_server(pool_id, server).await?;
        }

        for client in &snapshot.clients {
            debug!(name = %client.client_name, "creating app client");
            self.client.create_client(pool_id, client).await?;
        }

        for provider in &snapshot.identity_providers {
            debug!(name = %provider.provider_name, "creating identity provider");
            self.client.create_identity_provider(pool_id, provider).await?;
        }

        Ok(())
    }

    /// Recreate groups, then users. Executed in both modes.
    async fn restore_principals(&self, snapshot: &PoolSnapshot, pool_id: &str) -> CbrResult<()> {
        for group in &snapshot.groups {
            debug!(name = %group.name, "creating group");
            self.client.create_group(pool_id, group).await?;
        }

        for user in &snapshot.users {
            self.create_user(pool_id, user).await?;
        }

        Ok(())
    }

    /// Provision one user.
    ///
    /// SSO-origin users (with an `identities` attribute) get no temporary
    /// password; for everyone else the configured default password is a hard
    /// precondition, checked before the create call. `sub` and `identities`
    /// are stripped from the replayed attributes, and the welcome
    /// notification is always suppressed.
    async fn create_user(&self, pool_id: &str, user: &UserRecord) -> CbrResult<()> {
        let temporary_password = if user.is_sso() {
            debug!(username = %user.username, "skipping password for SSO user");
            None
        } else {
            match self.config.default_password.as_deref() {
                Some(password) => Some(password),
                None => return Err(CbrError::MissingDefaultPassword(user.username.clone())),
            }
        };

        let attributes = user.replayable_attributes();
        self.client
            .create_user(pool_id, &user.username, &attributes, temporary_password)
            .await
    }
}
