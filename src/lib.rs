//! Reconciler for Amazon Keyspaces tables.
//!
//! Drives a declared [`TableConfig`] onto the remote service through
//! create/read/update/delete, blocking on the table status after every
//! asynchronous change:
//!
//! ```ignore
//! use keyspaces_table::{KeyspacesClient, ProviderConfig, ReadMode, TableConfig, TableReconciler};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ProviderConfig::from_path("provider.json")?;
//! let client = KeyspacesClient::from_config(&config.aws).await?;
//! let reconciler = TableReconciler::new(client, &config);
//! let cancel = CancellationToken::new();
//!
//! let table = TableConfig::new("my_keyspace", "orders").with_tag("env", "prod");
//! let id = reconciler.create(&table, &cancel).await?;
//! let state = reconciler.read(&id.to_string(), ReadMode::AfterCreate, &cancel).await?;
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod conversions;
pub mod errors;
pub mod identity;
pub mod logging;
pub mod model;
pub mod reconciler;
pub mod tags;
pub mod wait;

pub use api::{CreateTableRequest, TableApi, TaggingApi, UpdateTableRequest};
pub use client::{AwsConfig, KeyspacesClient, build_client};
pub use config::{ConfigError, ProviderConfig, Timeouts};
pub use errors::{ApiError, ApiErrorKind, Operation, ReconcileError, ValidationError, WaitError};
pub use identity::{TABLE_ID_SEPARATOR, TableId, validate_name};
pub use logging::{init_logging, try_init_logging};
pub use model::{
    CapacitySpecification, SchemaDefinition, TableChange, TableConfig, TableDescription,
    TableSettings, TableState, TableStatus, requires_replacement,
};
pub use reconciler::{ReadMode, ReadOutcome, TableReconciler};
pub use tags::{DefaultTagsConfig, IgnoreTagsConfig, TagDiff, Tags};
pub use wait::StateChangeConf;

// Re-export cancellation so callers need not depend on tokio-util directly
pub use tokio_util::sync::CancellationToken;
