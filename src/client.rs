//! Keyspaces client module.
//!
//! Provides a Keyspaces client that supports multiple credential sources:
//! - Environment variables
//! - Hardcoded credentials
//! - AWS profiles
//! - Assumed IAM roles

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::retry::RetryConfig;
use aws_config::sts::AssumeRoleProvider;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_keyspaces::config::{Credentials, Region};
use aws_sdk_keyspaces::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::api::{CreateTableRequest, TableApi, TaggingApi, UpdateTableRequest};
use crate::config::ConfigError;
use crate::conversions::{
    capacity_to_sdk, comment_to_sdk, point_in_time_recovery_to_sdk, schema_to_sdk,
    table_description_from_sdk, tags_from_sdk, tags_to_sdk, ttl_to_sdk,
};
use crate::errors::{ApiError, ApiErrorKind, ValidationError, map_sdk_error};
use crate::model::{TableChange, TableDescription};
use crate::tags::Tags;

/// Connection settings for the AWS SDK.
///
/// Credentials priority: hardcoded > profile > default chain. When `role_arn`
/// is set, that role is assumed using the resolved base credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub role_session_name: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    /// Custom endpoint (localstack and similar).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub connect_timeout: Option<f64>,
    /// Seconds.
    #[serde(default)]
    pub read_timeout: Option<f64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl AwsConfig {
    /// `connect_timeout` as a `Duration`; negative, NaN or overflowing values are rejected.
    pub fn connect_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        seconds("aws.connect_timeout", self.connect_timeout)
    }

    pub fn read_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        seconds("aws.read_timeout", self.read_timeout)
    }
}

fn seconds(field: &'static str, value: Option<f64>) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|secs| {
            Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid {
                field,
                reason: format!("{} seconds: {}", secs, e),
            })
        })
        .transpose()
}

/// Build the AWS SDK Keyspaces client with the given configuration.
pub async fn build_client(config: &AwsConfig) -> Result<Client, ConfigError> {
    // Region priority: param > env var > default
    let region_provider = RegionProviderChain::first_try(config.region.clone().map(Region::new))
        .or_default_provider()
        .or_else("us-east-1");

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

    if let (Some(ak), Some(sk)) = (&config.access_key, &config.secret_key) {
        let creds = Credentials::new(
            ak,
            sk,
            config.session_token.clone(),
            None,
            "keyspaces-table-hardcoded",
        );
        config_loader = config_loader.credentials_provider(creds);
    } else if let Some(profile_name) = &config.profile {
        let profile_provider = ProfileFileCredentialsProvider::builder()
            .profile_name(profile_name)
            .build();
        config_loader = config_loader.credentials_provider(profile_provider);
    }
    // else: uses default credential chain (env vars, instance profile, etc)

    let mut timeouts = TimeoutConfig::builder();
    if let Some(timeout) = config.connect_timeout()? {
        timeouts = timeouts.connect_timeout(timeout);
    }
    if let Some(timeout) = config.read_timeout()? {
        timeouts = timeouts.read_timeout(timeout);
    }
    config_loader = config_loader.timeout_config(timeouts.build());

    if let Some(max_retries) = config.max_retries {
        config_loader =
            config_loader.retry_config(RetryConfig::standard().with_max_attempts(max_retries + 1));
    }

    let sdk_config = config_loader.load().await;

    let mut keyspaces_config = aws_sdk_keyspaces::config::Builder::from(&sdk_config);

    if let Some(role_arn) = &config.role_arn {
        let mut role = AssumeRoleProvider::builder(role_arn).session_name(
            config
                .role_session_name
                .clone()
                .unwrap_or_else(|| "keyspaces-table".to_string()),
        );
        if let Some(external_id) = &config.external_id {
            role = role.external_id(external_id);
        }
        keyspaces_config =
            keyspaces_config.credentials_provider(role.configure(&sdk_config).build().await);
    }

    if let Some(url) = &config.endpoint_url {
        keyspaces_config = keyspaces_config.endpoint_url(url);
    }

    Ok(Client::from_conf(keyspaces_config.build()))
}

/// `TableApi` and `TaggingApi` over the AWS SDK.
#[derive(Debug, Clone)]
pub struct KeyspacesClient {
    client: Client,
}

impl KeyspacesClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn from_config(config: &AwsConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(build_client(config).await?))
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn invalid_request(err: ValidationError) -> ApiError {
    ApiError::new(ApiErrorKind::Validation, err.to_string())
}

#[async_trait]
impl TableApi for KeyspacesClient {
    async fn create_table(&self, request: CreateTableRequest) -> Result<String, ApiError> {
        let mut req = self
            .client
            .create_table()
            .keyspace_name(&request.keyspace_name)
            .table_name(&request.table_name);

        if let Some(schema) = &request.schema_definition {
            req = req.schema_definition(schema_to_sdk(schema).map_err(invalid_request)?);
        }
        if let Some(comment) = &request.comment {
            req = req.comment(comment_to_sdk(comment).map_err(invalid_request)?);
        }
        let settings = &request.settings;
        if let Some(capacity) = settings.capacity {
            req = req.capacity_specification(capacity_to_sdk(capacity).map_err(invalid_request)?);
        }
        if let Some(enabled) = settings.point_in_time_recovery {
            req = req.point_in_time_recovery(
                point_in_time_recovery_to_sdk(enabled).map_err(invalid_request)?,
            );
        }
        // A disabled TTL is the service default; only an enable is sent.
        if settings.ttl_enabled == Some(true) {
            req = req.ttl(ttl_to_sdk(true).map_err(invalid_request)?);
        }
        if let Some(seconds) = settings.default_time_to_live {
            req = req.default_time_to_live(seconds);
        }
        if let Some(tags) = &request.tags
            && !tags.is_empty()
        {
            req = req.set_tags(Some(tags_to_sdk(tags).map_err(invalid_request)?));
        }

        let output = req.send().await.map_err(map_sdk_error)?;
        Ok(output.resource_arn().to_string())
    }

    async fn update_table(&self, request: UpdateTableRequest) -> Result<String, ApiError> {
        let mut req = self
            .client
            .update_table()
            .keyspace_name(&request.keyspace_name)
            .table_name(&request.table_name);

        req = match request.change {
            TableChange::Capacity(capacity) => {
                req.capacity_specification(capacity_to_sdk(capacity).map_err(invalid_request)?)
            }
            TableChange::PointInTimeRecovery(enabled) => req.point_in_time_recovery(
                point_in_time_recovery_to_sdk(enabled).map_err(invalid_request)?,
            ),
            TableChange::Ttl(enabled) => req.ttl(ttl_to_sdk(enabled).map_err(invalid_request)?),
            TableChange::DefaultTimeToLive(seconds) => req.default_time_to_live(seconds),
        };

        let output = req.send().await.map_err(map_sdk_error)?;
        Ok(output.resource_arn().to_string())
    }

    async fn delete_table(&self, keyspace_name: &str, table_name: &str) -> Result<(), ApiError> {
        self.client
            .delete_table()
            .keyspace_name(keyspace_name)
            .table_name(table_name)
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }

    async fn get_table(
        &self,
        keyspace_name: &str,
        table_name: &str,
    ) -> Result<TableDescription, ApiError> {
        let output = self
            .client
            .get_table()
            .keyspace_name(keyspace_name)
            .table_name(table_name)
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(table_description_from_sdk(&output))
    }
}

#[async_trait]
impl TaggingApi for KeyspacesClient {
    async fn list_tags(&self, arn: &str) -> Result<Tags, ApiError> {
        let mut tags = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_tags_for_resource()
                .resource_arn(arn)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(map_sdk_error)?;

            tags.extend(tags_from_sdk(output.tags()));

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(tags.into_iter().collect())
    }

    async fn update_tags(&self, arn: &str, old: &Tags, new: &Tags) -> Result<(), ApiError> {
        let diff = old.diff(new);

        if !diff.to_remove.is_empty() {
            debug!(arn, keys = diff.to_remove.len(), "untagging resource");
            self.client
                .untag_resource()
                .resource_arn(arn)
                .set_tags(Some(tags_to_sdk(&diff.to_remove).map_err(invalid_request)?))
                .send()
                .await
                .map_err(map_sdk_error)?;
        }

        if !diff.to_add.is_empty() {
            debug!(arn, keys = diff.to_add.len(), "tagging resource");
            self.client
                .tag_resource()
                .resource_arn(arn)
                .set_tags(Some(tags_to_sdk(&diff.to_add).map_err(invalid_request)?))
                .send()
                .await
                .map_err(map_sdk_error)?;
        }

        Ok(())
    }
}
