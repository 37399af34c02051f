//! Remote collaborators of the reconciler.
//!
//! `TableApi` is the control plane for table lifecycle calls and `TaggingApi`
//! the resource tagging service. [`KeyspacesClient`](crate::client::KeyspacesClient)
//! implements both over the AWS SDK; tests substitute an in-memory fake.

use async_trait::async_trait;

use crate::errors::ApiError;
use crate::model::{SchemaDefinition, TableChange, TableDescription, TableSettings};
use crate::tags::Tags;

/// Input to `CreateTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableRequest {
    pub keyspace_name: String,
    pub table_name: String,
    pub schema_definition: Option<SchemaDefinition>,
    pub comment: Option<String>,
    pub settings: TableSettings,
    /// Never `Some` with an empty map; the service rejects an explicit empty tag set.
    pub tags: Option<Tags>,
}

/// Input to `UpdateTable`: exactly one setting change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTableRequest {
    pub keyspace_name: String,
    pub table_name: String,
    pub change: TableChange,
}

#[async_trait]
pub trait TableApi: Send + Sync {
    /// Returns the ARN of the table being created.
    async fn create_table(&self, request: CreateTableRequest) -> Result<String, ApiError>;

    /// Returns the ARN of the table being updated.
    async fn update_table(&self, request: UpdateTableRequest) -> Result<String, ApiError>;

    async fn delete_table(&self, keyspace_name: &str, table_name: &str) -> Result<(), ApiError>;

    /// Fails with an `ApiErrorKind::NotFound` error when the table does not exist.
    async fn get_table(
        &self,
        keyspace_name: &str,
        table_name: &str,
    ) -> Result<TableDescription, ApiError>;
}

#[async_trait]
pub trait TaggingApi: Send + Sync {
    async fn list_tags(&self, arn: &str) -> Result<Tags, ApiError>;

    /// Apply the delta between `old` and `new`. Idempotent.
    async fn update_tags(&self, arn: &str, old: &Tags, new: &Tags) -> Result<(), ApiError>;
}
