//! Cognito identity directory client
//!
//! [`CognitoApi`] is the seam between the backup/restore core and AWS: every
//! operation the runners need, expressed over the snapshot model's domain
//! types with explicit page tokens. [`CognitoClient`] is the real
//! implementation over the AWS SDK; tests substitute the in-memory recording
//! fake from the `fake` submodule.
//!
//! `describe_pool` maps `ResourceNotFoundException` to `Ok(None)` so the
//! restore path can branch on pool existence without inspecting errors.

use async_trait::async_trait;

use aws_sdk_cognitoidentityprovider::error::SdkError;
use aws_sdk_cognitoidentityprovider::types::{
    AttributeType, EmailConfigurationType, EmailSendingAccountType, IdentityProviderTypeType,
    MessageActionType, PasswordPolicyType, ResourceServerScopeType, ResourceServerType,
    SmsConfigurationType, UserPoolMfaType, UserPoolPolicyType, UserPoolType, UserType,
    VerifiedAttributeType,
};
use aws_smithy_types::error::display::DisplayErrorContext;

use crate::error::{CbrError, CbrResult};
use crate::snapshot::{
    AttributeRecord, ClientRecord, EmailConfig, GroupRecord, PasswordPolicy, PoolConfig,
    ProviderRecord, ResourceServerRecord, ScopeRecord, SmsConfig, UserRecord,
};

/// One page of a listed collection
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

/// Capability set the backup and restore runners consume
#[async_trait]
pub trait CognitoApi: Send + Sync {
    /// Describe a pool; `Ok(None)` means the pool does not exist
    async fn describe_pool(&self, pool_id: &str) -> CbrResult<Option<PoolConfig>>;

    async fn list_users(
        &self,
        pool_id: &str,
        page_token: Option<String>,
    ) -> CbrResult<Page<UserRecord>>;

    async fn list_groups(
        &self,
        pool_id: &str,
        page_token: Option<String>,
    ) -> CbrResult<Page<GroupRecord>>;

    async fn list_clients(
        &self,
        pool_id: &str,
        page_token: Option<String>,
    ) -> CbrResult<Page<ClientRecord>>;

    async fn list_resource_servers(
        &self,
        pool_id: &str,
        page_size: i32,
        page_token: Option<String>,
    ) -> CbrResult<Page<ResourceServerRecord>>;

    async fn list_identity_providers(
        &self,
        pool_id: &str,
        page_size: i32,
        page_token: Option<String>,
    ) -> CbrResult<Page<ProviderRecord>>;

    /// Create a pool from the given settings and return its assigned ID
    async fn create_pool(&self, config: &PoolConfig) -> CbrResult<String>;

    async fn update_pool(&self, pool_id: &str, config: &PoolConfig) -> CbrResult<()>;

    async fn create_group(&self, pool_id: &str, group: &GroupRecord) -> CbrResult<()>;

    /// Admin-provision a user with the welcome notification suppressed
    async fn create_user(
        &self,
        pool_id: &str,
        username: &str,
        attributes: &[AttributeRecord],
        temporary_password: Option<&str>,
    ) -> CbrResult<()>;

    async fn create_resource_server(
        &self,
        pool_id: &str,
        server: &ResourceServerRecord,
    ) -> CbrResult<()>;

    async fn create_client(&self, pool_id: &str, client: &ClientRecord) -> CbrResult<()>;

    async fn create_identity_provider(
        &self,
        pool_id: &str,
        provider: &ProviderRecord,
    ) -> CbrResult<()>;
}

/// Real Cognito client over the AWS SDK
pub struct CognitoClient {
    client: aws_sdk_cognitoidentityprovider::Client,
}

/// Connect a Cognito client for the given region using the default AWS
/// credential chain
pub async fn connect(region: &str) -> CognitoClient {
    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await;

    CognitoClient {
        client: aws_sdk_cognitoidentityprovider::Client::new(&sdk_config),
    }
}

fn service_error<E>(operation: &'static str, entity: &str, err: SdkError<E>) -> CbrError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CbrError::service(operation, entity, DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl CognitoApi for CognitoClient {
    async fn describe_pool(&self, pool_id: &str) -> CbrResult<Option<PoolConfig>> {
        match self
            .client
            .describe_user_pool()
            .user_pool_id(pool_id)
            .send()
            .await
        {
            Ok(output) => {
                let pool = output.user_pool().ok_or_else(|| {
                    CbrError::service("DescribeUserPool", pool_id, "response contained no pool")
                })?;
                Ok(Some(pool_config_from_sdk(pool)))
            }
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception())
                {
                    Ok(None)
                } else {
                    Err(service_error("DescribeUserPool", pool_id, err))
                }
            }
        }
    }

    async fn list_users(
        &self,
        pool_id: &str,
        page_token: Option<String>,
    ) -> CbrResult<Page<UserRecord>> {
        let output = self
            .client
            .list_users()
            .user_pool_id(pool_id)
            .set_pagination_token(page_token)
            .send()
            .await
            .map_err(|err| service_error("ListUsers", pool_id, err))?;

        Ok(Page {
            items: output.users().iter().map(user_from_sdk).collect(),
            next_token: output.pagination_token().map(str::to_string),
        })
    }

    async fn list_groups(
        &self,
        pool_id: &str,
        page_token: Option<String>,
    ) -> CbrResult<Page<GroupRecord>> {
        let output = self
            .client
            .list_groups()
            .user_pool_id(pool_id)
            .set_next_token(page_token)
            .send()
            .await
            .map_err(|err| service_error("ListGroups", pool_id, err))?;

        let items = output
            .groups()
            .iter()
            .map(|group| GroupRecord {
                name: group.group_name().unwrap_or_default().to_string(),
                description: group.description().map(str::to_string),
                precedence: group.precedence(),
                role_arn: group.role_arn().map(str::to_string),
            })
            .collect();

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_clients(
        &self,
        pool_id: &str,
        page_token: Option<String>,
    ) -> CbrResult<Page<ClientRecord>> {
        let output = self
            .client
            .list_user_pool_clients()
            .user_pool_id(pool_id)
            .set_next_token(page_token)
            .send()
            .await
            .map_err(|err| service_error("ListUserPoolClients", pool_id, err))?;

        let items = output
            .user_pool_clients()
            .iter()
            .map(|client| ClientRecord {
                client_name: client.client_name().unwrap_or_default().to_string(),
                client_id: client.client_id().map(str::to_string),
            })
            .collect();

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_resource_servers(
        &self,
        pool_id: &str,
        page_size: i32,
        page_token: Option<String>,
    ) -> CbrResult<Page<ResourceServerRecord>> {
        let output = self
            .client
            .list_resource_servers()
            .user_pool_id(pool_id)
            .max_results(page_size)
            .set_next_token(page_token)
            .send()
            .await
            .map_err(|err| service_error("ListResourceServers", pool_id, err))?;

        let items = output
            .resource_servers()
            .iter()
            .map(resource_server_from_sdk)
            .collect();

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_identity_providers(
        &self,
        pool_id: &str,
        page_size: i32,
        page_token: Option<String>,
    ) -> CbrResult<Page<ProviderRecord>> {
        let output = self
            .client
            .list_identity_providers()
            .user_pool_id(pool_id)
            .max_results(page_size)
            .set_next_token(page_token)
            .send()
            .await
            .map_err(|err| service_error("ListIdentityProviders", pool_id, err))?;

        let items = output
            .providers()
            .iter()
            .map(|provider| ProviderRecord {
                provider_name: provider.provider_name().unwrap_or_default().to_string(),
                provider_type: provider
                    .provider_type()
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_default(),
            })
            .collect();

        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn create_pool(&self, config: &PoolConfig) -> CbrResult<String> {
        let name = config
            .name
            .clone()
            .ok_or_else(|| CbrError::Snapshot("pool config has no name".into()))?;

        let output = self
            .client
            .create_user_pool()
            .pool_name(&name)
            .set_policies(policies_to_sdk(config))
            .set_auto_verified_attributes(auto_verified_to_sdk(config))
            .set_mfa_configuration(mfa_to_sdk(config))
            .set_email_configuration(email_to_sdk(config))
            .set_sms_configuration(sms_to_sdk(config))
            .send()
            .await
            .map_err(|err| service_error("CreateUserPool", &name, err))?;

        let pool_id = output
            .user_pool()
            .and_then(|pool| pool.id())
            .ok_or_else(|| {
                CbrError::service("CreateUserPool", &name, "response contained no pool ID")
            })?;

        Ok(pool_id.to_string())
    }

    async fn update_pool(&self, pool_id: &str, config: &PoolConfig) -> CbrResult<()> {
        self.client
            .update_user_pool()
            .user_pool_id(pool_id)
            .set_policies(policies_to_sdk(config))
            .set_auto_verified_attributes(auto_verified_to_sdk(config))
            .set_mfa_configuration(mfa_to_sdk(config))
            .set_email_configuration(email_to_sdk(config))
            .set_sms_configuration(sms_to_sdk(config))
            .send()
            .await
            .map_err(|err| service_error("UpdateUserPool", pool_id, err))?;

        Ok(())
    }

    async fn create_group(&self, pool_id: &str, group: &GroupRecord) -> CbrResult<()> {
        self.client
            .create_group()
            .user_pool_id(pool_id)
            .group_name(&group.name)
            .set_description(group.description.clone())
            .set_precedence(group.precedence)
            .set_role_arn(group.role_arn.clone())
            .send()
            .await
            .map_err(|err| service_error("CreateGroup", &group.name, err))?;

        Ok(())
    }

    async fn create_user(
        &self,
        pool_id: &str,
        username: &str,
        attributes: &[AttributeRecord],
        temporary_password: Option<&str>,
    ) -> CbrResult<()> {
        let user_attributes = attributes
            .iter()
            .map(|attr| {
                AttributeType::builder()
                    .name(&attr.name)
                    .set_value(attr.value.clone())
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| CbrError::service("AdminCreateUser", username, err.to_string()))?;

        self.client
            .admin_create_user()
            .user_pool_id(pool_id)
            .username(username)
            .set_user_attributes(Some(user_attributes))
            .message_action(MessageActionType::Suppress)
            .set_temporary_password(temporary_password.map(str::to_string))
            .send()
            .await
            .map_err(|err| service_error("AdminCreateUser", username, err))?;

        Ok(())
    }

    async fn create_resource_server(
        &self,
        pool_id: &str,
        server: &ResourceServerRecord,
    ) -> CbrResult<()> {
        let scopes = server
            .scopes
            .iter()
            .map(|scope| {
                ResourceServerScopeType::builder()
                    .scope_name(&scope.name)
                    .scope_description(&scope.description)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                CbrError::service("CreateResourceServer", &server.identifier, err.to_string())
            })?;

        self.client
            .create_resource_server()
            .user_pool_id(pool_id)
            .identifier(&server.identifier)
            .name(&server.name)
            .set_scopes(if scopes.is_empty() { None } else { Some(scopes) })
            .send()
            .await
            .map_err(|err| service_error("CreateResourceServer", &server.identifier, err))?;

        Ok(())
    }

    async fn create_client(&self, pool_id: &str, client: &ClientRecord) -> CbrResult<()> {
        self.client
            .create_user_pool_client()
            .user_pool_id(pool_id)
            .client_name(&client.client_name)
            .send()
            .await
            .map_err(|err| service_error("CreateUserPoolClient", &client.client_name, err))?;

        Ok(())
    }

    async fn create_identity_provider(
        &self,
        pool_id: &str,
        provider: &ProviderRecord,
    ) -> CbrResult<()> {
        // Provider details are not part of the listing output and cannot be
        // replayed; providers are recreated by name and type only.
        self.client
            .create_identity_provider()
            .user_pool_id(pool_id)
            .provider_name(&provider.provider_name)
            .provider_type(IdentityProviderTypeType::from(
                provider.provider_type.as_str(),
            ))
            .send()
            .await
            .map_err(|err| service_error("CreateIdentityProvider", &provider.provider_name, err))?;

        Ok(())
    }
}

fn pool_config_from_sdk(pool: &UserPoolType) -> PoolConfig {
    PoolConfig {
        name: pool.name().map(str::to_string),
        password_policy: pool
            .policies()
            .and_then(|policies| policies.password_policy())
            .map(|policy| PasswordPolicy {
                minimum_length: policy.minimum_length(),
                require_uppercase: policy.require_uppercase(),
                require_lowercase: policy.require_lowercase(),
                require_numbers: policy.require_numbers(),
                require_symbols: policy.require_symbols(),
                temporary_password_validity_days: policy.temporary_password_validity_days(),
            }),
        auto_verified_attributes: pool
            .auto_verified_attributes()
            .iter()
            .map(|attr| attr.as_str().to_string())
            .collect(),
        mfa_configuration: pool
            .mfa_configuration()
            .map(|mfa| mfa.as_str().to_string()),
        email_configuration: pool.email_configuration().map(|email| EmailConfig {
            source_arn: email.source_arn().map(str::to_string),
            reply_to_email_address: email.reply_to_email_address().map(str::to_string),
            email_sending_account: email
                .email_sending_account()
                .map(|account| account.as_str().to_string()),
            from: email.from().map(str::to_string),
        }),
        sms_configuration: pool.sms_configuration().map(|sms| SmsConfig {
            sns_caller_arn: sms.sns_caller_arn().to_string(),
            external_id: sms.external_id().map(str::to_string),
            sns_region: sms.sns_region().map(str::to_string),
        }),
    }
}

fn user_from_sdk(user: &UserType) -> UserRecord {
    UserRecord {
        username: user.username().unwrap_or_default().to_string(),
        attributes: user
            .attributes()
            .iter()
            .map(|attr| AttributeRecord {
                name: attr.name().to_string(),
                value: attr.value().map(str::to_string),
            })
            .collect(),
        enabled: user.enabled(),
        status: user.user_status().map(|status| status.as_str().to_string()),
    }
}

fn resource_server_from_sdk(server: &ResourceServerType) -> ResourceServerRecord {
    ResourceServerRecord {
        identifier: server.identifier().unwrap_or_default().to_string(),
        name: server.name().unwrap_or_default().to_string(),
        scopes: server
            .scopes()
            .iter()
            .map(|scope| ScopeRecord {
                name: scope.scope_name().to_string(),
                description: scope.scope_description().to_string(),
            })
            .collect(),
    }
}

fn policies_to_sdk(config: &PoolConfig) -> Option<UserPoolPolicyType> {
    config.password_policy.as_ref().map(|policy| {
        UserPoolPolicyType::builder()
            .password_policy(
                PasswordPolicyType::builder()
                    .set_minimum_length(policy.minimum_length)
                    .require_uppercase(policy.require_uppercase)
                    .require_lowercase(policy.require_lowercase)
                    .require_numbers(policy.require_numbers)
                    .require_symbols(policy.require_symbols)
                    .temporary_password_validity_days(policy.temporary_password_validity_days)
                    .build(),
            )
            .build()
    })
}

fn auto_verified_to_sdk(config: &PoolConfig) -> Option<Vec<VerifiedAttributeType>> {
    if config.auto_verified_attributes.is_empty() {
        return None;
    }
    Some(
        config
            .auto_verified_attributes
            .iter()
            .map(|attr| VerifiedAttributeType::from(attr.as_str()))
            .collect(),
    )
}

fn mfa_to_sdk(config: &PoolConfig) -> Option<UserPoolMfaType> {
    config
        .mfa_configuration
        .as_deref()
        .map(UserPoolMfaType::from)
}

fn email_to_sdk(config: &PoolConfig) -> Option<EmailConfigurationType> {
    config.email_configuration.as_ref().map(|email| {
        EmailConfigurationType::builder()
            .set_source_arn(email.source_arn.clone())
            .set_reply_to_email_address(email.reply_to_email_address.clone())
            .set_email_sending_account(
                email
                    .email_sending_account
                    .as_deref()
                    .map(EmailSendingAccountType::from),
            )
            .set_from(email.from.clone())
            .build()
    })
}

fn sms_to_sdk(config: &PoolConfig) -> Option<SmsConfigurationType> {
    config.sms_configuration.as_ref().map(|sms| {
        SmsConfigurationType::builder()
            .sns_caller_arn(&sms.sns_caller_arn)
            .set_external_id(sms.external_id.clone())
            .set_sns_region(sms.sns_region.clone())
            .build()
    })
}


#[cfg(test)]
pub(crate) mod fake {
    //! In-memory recording fake for [`CognitoApi`], shared by the backup and
    //! restore tests.

    use std::sync::Mutex;

    use super::*;

    /// One recorded AdminCreateUser call
    #[derive(Debug, Clone)]
    pub struct CreatedUser {
        pub pool_id: String,
        pub username: String,
        pub attributes: Vec<AttributeRecord>,
        pub temporary_password: Option<String>,
    }

    /// Configurable fake pool. List results are served from the `*_pages`
    /// fields one inner Vec per page; write calls are recorded in order in
    /// `calls` as `Operation:<pool_id>` strings.
    #[derive(Default)]
    pub struct FakeCognito {
        /// `describe_pool` result; `None` simulates a missing pool
        pub pool: Option<PoolConfig>,
        /// Pool ID handed out by `create_pool`
        pub new_pool_id: String,
        pub user_pages: Vec<Vec<UserRecord>>,
        pub group_pages: Vec<Vec<GroupRecord>>,
        pub client_pages: Vec<Vec<ClientRecord>>,
        pub resource_server_pages: Vec<Vec<ResourceServerRecord>>,
        pub provider_pages: Vec<Vec<ProviderRecord>>,
        pub calls: Mutex<Vec<String>>,
        pub created_users: Mutex<Vec<CreatedUser>>,
        pub created_groups: Mutex<Vec<(String, String)>>,
    }

    impl FakeCognito {
        pub fn record(&self, operation: &str, pool_id: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{}", operation, pool_id));
        }

        pub fn operations(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|call| call.split(':').next().unwrap_or_default().to_string())
                .collect()
        }
    }

    fn page_of<T: Clone>(pages: &[Vec<T>], token: Option<String>) -> Page<T> {
        let index = token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
        let next_token = if index + 1 < pages.len() {
            Some((index + 1).to_string())
        } else {
            None
        };
        Page {
            items: pages.get(index).cloned().unwrap_or_default(),
            next_token,
        }
    }

    #[async_trait]
    impl CognitoApi for FakeCognito {
        async fn describe_pool(&self, pool_id: &str) -> CbrResult<Option<PoolConfig>> {
            self.record("DescribeUserPool", pool_id);
            Ok(self.pool.clone())
        }

        async fn list_users(
            &self,
            pool_id: &str,
            page_token: Option<String>,
        ) -> CbrResult<Page<UserRecord>> {
            self.record("ListUsers", pool_id);
            Ok(page_of(&self.user_pages, page_token))
        }

        async fn list_groups(
            &self,
            pool_id: &str,
            page_token: Option<String>,
        ) -> CbrResult<Page<GroupRecord>> {
            self.record("ListGroups", pool_id);
            Ok(page_of(&self.group_pages, page_token))
        }

        async fn list_clients(
            &self,
            pool_id: &str,
            page_token: Option<String>,
        ) -> CbrResult<Page<ClientRecord>> {
            self.record("ListUserPoolClients", pool_id);
            Ok(page_of(&self.client_pages, page_token))
        }

        async fn list_resource_servers(
            &self,
            pool_id: &str,
            _page_size: i32,
            page_token: Option<String>,
        ) -> CbrResult<Page<ResourceServerRecord>> {
            self.record("ListResourceServers", pool_id);
            Ok(page_of(&self.resource_server_pages, page_token))
        }

        async fn list_identity_providers(
            &self,
            pool_id: &str,
            _page_size: i32,
            page_token: Option<String>,
        ) -> CbrResult<Page<ProviderRecord>> {
            self.record("ListIdentityProviders", pool_id);
            Ok(page_of(&self.provider_pages, page_token))
        }

        async fn create_pool(&self, config: &PoolConfig) -> CbrResult<String> {
            self.record(
                "CreateUserPool",
                config.name.as_deref().unwrap_or_default(),
            );
            Ok(self.new_pool_id.clone())
        }

        async fn update_pool(&self, pool_id: &str, _config: &PoolConfig) -> CbrResult<()> {
            self.record("UpdateUserPool", pool_id);
            Ok(())
        }

        async fn create_group(&self, pool_id: &str, group: &GroupRecord) -> CbrResult<()> {
            self.record("CreateGroup", pool_id);
            self.created_groups
                .lock()
                .unwrap()
                .push((pool_id.to_string(), group.name.clone()));
            Ok(())
        }

        async fn create_user(
            &self,
            pool_id: &str,
            username: &str,
            attributes: &[AttributeRecord],
            temporary_password: Option<&str>,
        ) -> CbrResult<()> {
            self.record("AdminCreateUser", pool_id);
            self.created_users.lock().unwrap().push(CreatedUser {
                pool_id: pool_id.to_string(),
                username: username.to_string(),
                attributes: attributes.to_vec(),
                temporary_password: temporary_password.map(str::to_string),
            });
            Ok(())
        }

        async fn create_resource_server(
            &self,
            pool_id: &str,
            _server: &ResourceServerRecord,
        ) -> CbrResult<()> {
            self.record("CreateResourceServer", pool_id);
            Ok(())
        }

        async fn create_client(&self, pool_id: &str, _client: &ClientRecord) -> CbrResult<()> {
            self.record("CreateUserPoolClient", pool_id);
            Ok(())
        }

        async fn create_identity_provider(
            &self,
            pool_id: &str,
            _provider: &ProviderRecord,
        ) -> CbrResult<()> {
            self.record("CreateIdentityProvider", pool_id);
            Ok(())
        }
    }
}
