//! Backup assembler
//!
//! Reads a source pool's full configuration into a [`PoolSnapshot`] and
//! writes it as a single timestamped artifact. There is no partial-backup
//! mode: a failure on any call aborts the whole run, and the snapshot is
//! serialized exactly once, after every collection has been drained.
//!
//! Re-running produces a new, differently-named artifact; prior backups are
//! never overwritten. Retention is an operational concern outside this tool.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::cognito::CognitoApi;
use crate::config::Config;
use crate::error::{CbrError, CbrResult};
use crate::snapshot::{
    ClientRecord, GroupRecord, PoolSnapshot, ProviderRecord, ResourceServerRecord, UserRecord,
};
use crate::storage::ArtifactStore;

/// Artifact filename for a pool backed up at the given instant
pub fn artifact_filename(pool_id: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "cognito-backup-{}-{}.json",
        pool_id,
        timestamp.format("%Y%m%d-%H%M%S")
    )
}

/// Assembles and persists one pool snapshot
pub struct Backup<'a, C: CognitoApi> {
    client: &'a C,
    store: &'a dyn ArtifactStore,
    config: &'a Config,
}

impl<'a, C: CognitoApi> Backup<'a, C> {
    pub fn new(client: &'a C, store: &'a dyn ArtifactStore, config: &'a Config) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Run the backup and return the path the artifact was written to
    pub async fn execute(&self) -> CbrResult<String> {
        let snapshot = self.collect().await?;
        let data = snapshot.to_json()?;

        let filename = artifact_filename(&self.config.pool_id, Utc::now());
        let path = self.store.object_path(&filename);
        self.store.save(&data, &path).await?;

        info!(
            path = %path,
            users = snapshot.users.len(),
            groups = snapshot.groups.len(),
            clients = snapshot.clients.len(),
            "backup written"
        );
        Ok(path)
    }

    /// Drain every collection from the source pool, in page order
    async fn collect(&self) -> CbrResult<PoolSnapshot> {
        let pool_id = &self.config.pool_id;

        let pool_config = self.client.describe_pool(pool_id).await?.ok_or_else(|| {
            CbrError::service("DescribeUserPool", pool_id.clone(), "user pool does not exist")
        })?;

        Ok(PoolSnapshot {
            pool_config,
            users: self.collect_users().await?,
            groups: self.collect_groups().await?,
            resource_servers: self.collect_resource_servers().await?,
            clients: self.collect_clients().await?,
            identity_providers: self.collect_identity_providers().await?,
        })
    }

    async fn collect_users(&self) -> CbrResult<Vec<UserRecord>> {
        let mut users = Vec::new();
        let mut token = None;
        loop {
            let page = self.client.list_users(&self.config.pool_id, token).await?;
            users.extend(page.items);
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }
        debug!(count = users.len(), "drained users");
        Ok(users)
    }

    async fn collect_groups(&self) -> CbrResult<Vec<GroupRecord>> {
        let mut groups = Vec::new();
        let mut token = None;
        loop {
            let page = self.client.list_groups(&self.config.pool_id, token).await?;
            groups.extend(page.items);
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }
        debug!(count = groups.len(), "drained groups");
        Ok(groups)
    }

    async fn collect_clients(&self) -> CbrResult<Vec<ClientRecord>> {
        let mut clients = Vec::new();
        let mut token = None;
        loop {
            let page = self.client.list_clients(&self.config.pool_id, token).await?;
            clients.extend(page.items);
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }
        debug!(count = clients.len(), "drained app clients");
        Ok(clients)
    }

    async fn collect_resource_servers(&self) -> CbrResult<Vec<ResourceServerRecord>> {
        let mut servers = Vec::new();
        let mut token = None;
        loop {
            let page = self
                .client
                .list_resource_servers(&self.config.pool_id, self.config.page_size(), token)
                .await?;
            servers.extend(page.items);
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }
        debug!(count = servers.len(), "drained resource servers");
        Ok(servers)
    }

    async fn collect_identity_providers(&self) -> CbrResult<Vec<ProviderRecord>> {
        let mut providers = Vec::new();
        let mut token = None;
        loop {
            let page = self
                .client
                .list_identity_providers(&self.config.pool_id, self.config.page_size(), token)
                .await?;
            providers.extend(page.items);
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }
        debug!(count = providers.len(), "drained identity providers");
        Ok(providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognito::fake::FakeCognito;
    use crate::snapshot::{AttributeRecord, PoolConfig};
    use crate::storage::LocalStore;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn backup_config(path: &str) -> Config {
        Config {
            pool_id: "us-east-1_source".into(),
            region: "us-east-1".into(),
            backup_path: path.into(),
            users_only: false,
            max_results: 50,
            default_password: None,
        }
    }

    fn user(username: &str) -> UserRecord {
        UserRecord {
            username: username.into(),
            attributes: vec![AttributeRecord::new(
                "email",
                format!("{}@example.com", username),
            )],
            enabled: true,
            status: Some("CONFIRMED".into()),
        }
    }

    fn group(name: &str) -> GroupRecord {
        GroupRecord {
            name: name.into(),
            description: None,
            precedence: None,
            role_arn: None,
        }
    }

    #[test]
    fn test_artifact_filename_format() {
        let timestamp = Utc.with_ymd_and_hms(2026, 8, 30, 14, 30, 22).unwrap();
        assert_eq!(
            artifact_filename("us-east-1_abc", timestamp),
            "cognito-backup-us-east-1_abc-20260830-143022.json"
        );
    }

    #[tokio::test]
    async fn test_backup_drains_pages_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let config = backup_config(&temp_dir.path().to_string_lossy());
        let store = LocalStore::new(temp_dir.path());

        let client = FakeCognito {
            pool: Some(PoolConfig {
                name: Some("source-pool".into()),
                ..Default::default()
            }),
            user_pages: vec![vec![user("alice"), user("bob")], vec![user("carol")]],
            group_pages: vec![vec![group("admins")], vec![group("readers")]],
            client_pages: vec![vec![ClientRecord {
                client_name: "web".into(),
                client_id: None,
            }]],
            ..Default::default()
        };

        let path = Backup::new(&client, &store, &config).execute().await.unwrap();
        assert!(path.contains("cognito-backup-us-east-1_source-"));

        let data = std::fs::read(&path).unwrap();
        let snapshot = PoolSnapshot::from_json(&data).unwrap();

        let usernames: Vec<_> = snapshot.users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(usernames, ["alice", "bob", "carol"]);

        let groups: Vec<_> = snapshot.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(groups, ["admins", "readers"]);

        assert_eq!(snapshot.clients.len(), 1);
        assert_eq!(snapshot.pool_config.name.as_deref(), Some("source-pool"));
    }

    #[tokio::test]
    async fn test_backup_paginates_resource_servers_and_providers() {
        let temp_dir = TempDir::new().unwrap();
        let config = backup_config(&temp_dir.path().to_string_lossy());
        let store = LocalStore::new(temp_dir.path());

        let server = |identifier: &str| ResourceServerRecord {
            identifier: identifier.into(),
            name: identifier.into(),
            scopes: vec![],
        };
        let provider = |name: &str| ProviderRecord {
            provider_name: name.into(),
            provider_type: "SAML".into(),
        };

        let client = FakeCognito {
            pool: Some(PoolConfig::default()),
            resource_server_pages: vec![
                vec![server("https://a.example.com"), server("https://b.example.com")],
                vec![server("https://c.example.com")],
            ],
            provider_pages: vec![vec![provider("corp-saml")], vec![provider("google")]],
            ..Default::default()
        };

        let path = Backup::new(&client, &store, &config).execute().await.unwrap();
        let snapshot = PoolSnapshot::from_json(&std::fs::read(&path).unwrap()).unwrap();

        // Entries beyond the first page are kept, in page order
        let identifiers: Vec<_> = snapshot
            .resource_servers
            .iter()
            .map(|s| s.identifier.as_str())
            .collect();
        assert_eq!(
            identifiers,
            [
                "https://a.example.com",
                "https://b.example.com",
                "https://c.example.com",
            ]
        );

        let providers: Vec<_> = snapshot
            .identity_providers
            .iter()
            .map(|p| p.provider_name.as_str())
            .collect();
        assert_eq!(providers, ["corp-saml", "google"]);
    }

    #[tokio::test]
    async fn test_backup_of_empty_pool_writes_empty_collections() {
        let temp_dir = TempDir::new().unwrap();
        let config = backup_config(&temp_dir.path().to_string_lossy());
        let store = LocalStore::new(temp_dir.path());

        let client = FakeCognito {
            pool: Some(PoolConfig::default()),
            ..Default::default()
        };

        let path = Backup::new(&client, &store, &config).execute().await.unwrap();

        // The collections must be present in the artifact, not absent
        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        for field in ["Users", "Groups", "ResourceServers", "Clients", "IdentityProviders"] {
            let collection = value.get(field).and_then(|v| v.as_array());
            assert_eq!(collection.map(|c| c.len()), Some(0), "field {}", field);
        }
    }

    #[tokio::test]
    async fn test_backup_fails_when_pool_missing() {
        let temp_dir = TempDir::new().unwrap();
        let config = backup_config(&temp_dir.path().to_string_lossy());
        let store = LocalStore::new(temp_dir.path());

        let client = FakeCognito::default();

        let err = Backup::new(&client, &store, &config).execute().await.unwrap_err();
        assert!(matches!(err, CbrError::Service { .. }));

        // Nothing was written
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
