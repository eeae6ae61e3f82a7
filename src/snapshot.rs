//! Snapshot model
//!
//! The canonical in-memory representation of one user pool's complete
//! configuration, and the unit of backup and restore. A snapshot is created
//! fresh on every backup run, serialized exactly once after every collection
//! has been drained from the source, and consumed read-only by a restore run.
//!
//! # Artifact format
//!
//! Snapshots are stored as pretty-printed JSON with the top-level field names
//! `PoolConfig`, `Users`, `Groups`, `ResourceServers`, `Clients` and
//! `IdentityProviders`, so artifacts stay forward-readable across
//! reimplementations. Any collection may be absent from an artifact; a
//! missing collection deserializes to empty and means "nothing to restore in
//! that category".

use serde::{Deserialize, Serialize};

use crate::error::CbrResult;

/// Service-assigned, immutable user attribute; never replayed on restore.
pub const SUB_ATTRIBUTE: &str = "sub";

/// Federation marker attribute. Its presence classifies a user as SSO-origin;
/// it is not settable and never replayed on restore.
pub const IDENTITIES_ATTRIBUTE: &str = "identities";

/// Complete point-in-time capture of one user pool's configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Pool-level settings (policies, verification, MFA, email/SMS)
    #[serde(rename = "PoolConfig", default)]
    pub pool_config: PoolConfig,
    /// Principal records, in the page order they were listed
    #[serde(rename = "Users", default)]
    pub users: Vec<UserRecord>,
    /// Group records, in the page order they were listed
    #[serde(rename = "Groups", default)]
    pub groups: Vec<GroupRecord>,
    /// Resource server definitions (API scopes)
    #[serde(rename = "ResourceServers", default)]
    pub resource_servers: Vec<ResourceServerRecord>,
    /// Registered app clients
    #[serde(rename = "Clients", default)]
    pub clients: Vec<ClientRecord>,
    /// Federated login sources
    #[serde(rename = "IdentityProviders", default)]
    pub identity_providers: Vec<ProviderRecord>,
}

impl PoolSnapshot {
    /// Serialize the snapshot to its artifact form
    pub fn to_json(&self) -> CbrResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Deserialize a snapshot from artifact bytes
    pub fn from_json(data: &[u8]) -> CbrResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Pool-level settings captured at backup time and replayed on restore
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool name; forced to the requested target ID when a restore creates
    /// a new pool
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password_policy: Option<PasswordPolicy>,
    /// Attributes Cognito verifies automatically (e.g. `email`)
    #[serde(default)]
    pub auto_verified_attributes: Vec<String>,
    /// MFA mode: `ON`, `OFF` or `OPTIONAL`
    #[serde(default)]
    pub mfa_configuration: Option<String>,
    #[serde(default)]
    pub email_configuration: Option<EmailConfig>,
    #[serde(default)]
    pub sms_configuration: Option<SmsConfig>,
}

/// Password complexity rules for locally-managed accounts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PasswordPolicy {
    #[serde(default)]
    pub minimum_length: Option<i32>,
    #[serde(default)]
    pub require_uppercase: bool,
    #[serde(default)]
    pub require_lowercase: bool,
    #[serde(default)]
    pub require_numbers: bool,
    #[serde(default)]
    pub require_symbols: bool,
    #[serde(default)]
    pub temporary_password_validity_days: i32,
}

/// Email sending configuration for the pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub source_arn: Option<String>,
    #[serde(default)]
    pub reply_to_email_address: Option<String>,
    #[serde(default)]
    pub email_sending_account: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

/// SMS sending configuration for the pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub sns_caller_arn: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub sns_region: Option<String>,
}

/// One principal record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique within the pool
    pub username: String,
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Account status as reported at backup time (e.g. `CONFIRMED`);
    /// informational only, Cognito assigns status on recreation
    #[serde(default)]
    pub status: Option<String>,
}

fn enabled_default() -> bool {
    true
}

impl UserRecord {
    /// An SSO-origin user is federated from an external identity provider and
    /// requires no locally-managed password.
    pub fn is_sso(&self) -> bool {
        self.attributes
            .iter()
            .any(|attr| attr.name == IDENTITIES_ATTRIBUTE)
    }

    /// Attributes to replay on recreation: everything except the
    /// service-assigned `sub` and the federation marker `identities`.
    pub fn replayable_attributes(&self) -> Vec<AttributeRecord> {
        self.attributes
            .iter()
            .filter(|attr| attr.name != SUB_ATTRIBUTE && attr.name != IDENTITIES_ATTRIBUTE)
            .cloned()
            .collect()
    }
}

/// One name/value user attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl AttributeRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// One group record. Membership is not captured: groups and users are
/// recreated independently on restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Unique within the pool
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub precedence: Option<i32>,
    #[serde(default)]
    pub role_arn: Option<String>,
}

/// One resource server (API scope definition)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceServerRecord {
    /// Unique within the pool
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub scopes: Vec<ScopeRecord>,
}

/// One OAuth scope belonging to a resource server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeRecord {
    pub name: String,
    pub description: String,
}

/// One registered app client, as captured at backup time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    pub client_name: String,
    /// Source pool's client ID; informational, Cognito assigns a new one
    #[serde(default)]
    pub client_id: Option<String>,
}

/// One federated login source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Unique within the pool
    pub provider_name: String,
    /// Provider type, e.g. `SAML`, `OIDC`, `Google`
    pub provider_type: String,
}
