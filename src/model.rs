//! Declared table configuration and the remote table description.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;
use crate::identity::{TableId, validate_name};
use crate::tags::Tags;

/// Remote table status as reported by `GetTable`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    /// Any status this resource never expects to observe (RESTORING, DELETED, ...).
    Other(String),
}

impl TableStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TableStatus::Creating => "CREATING",
            TableStatus::Active => "ACTIVE",
            TableStatus::Updating => "UPDATING",
            TableStatus::Deleting => "DELETING",
            TableStatus::Other(s) => s,
        }
    }
}

impl From<&str> for TableStatus {
    fn from(value: &str) -> Self {
        match value {
            "CREATING" => TableStatus::Creating,
            "ACTIVE" => TableStatus::Active,
            "UPDATING" => TableStatus::Updating,
            "DELETING" => TableStatus::Deleting,
            other => TableStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringKey {
    pub name: String,
    pub order_by: SortOrder,
}

/// CQL schema of a table. Immutable once the table exists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub columns: Vec<ColumnDefinition>,
    pub partition_keys: Vec<String>,
    #[serde(default)]
    pub clustering_keys: Vec<ClusteringKey>,
    #[serde(default)]
    pub static_columns: Vec<String>,
}

impl SchemaDefinition {
    /// Every key column must be declared and at least one partition key given.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.partition_keys.is_empty() {
            return Err(ValidationError::Field {
                field: "schema_definition",
                reason: "at least one partition key is required".to_string(),
            });
        }
        let key_names = self
            .partition_keys
            .iter()
            .chain(self.clustering_keys.iter().map(|k| &k.name))
            .chain(self.static_columns.iter());
        for name in key_names {
            if !self.columns.iter().any(|c| &c.name == name) {
                return Err(ValidationError::Field {
                    field: "schema_definition",
                    reason: format!("column '{}' is not defined", name),
                });
            }
        }
        Ok(())
    }
}

/// Read/write capacity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "throughput_mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapacitySpecification {
    PayPerRequest,
    Provisioned {
        read_capacity_units: i64,
        write_capacity_units: i64,
    },
}

/// Settings that can change in place through `UpdateTable`.
///
/// `None` means the setting is not managed and is left as the service has it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSettings {
    #[serde(default)]
    pub capacity: Option<CapacitySpecification>,
    #[serde(default)]
    pub point_in_time_recovery: Option<bool>,
    #[serde(default)]
    pub ttl_enabled: Option<bool>,
    #[serde(default)]
    pub default_time_to_live: Option<i32>,
}

/// One in-place change; the service accepts a single setting per `UpdateTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableChange {
    Capacity(CapacitySpecification),
    PointInTimeRecovery(bool),
    Ttl(bool),
    DefaultTimeToLive(i32),
}

impl TableSettings {
    /// Changes needed to move from `current` to `self`.
    pub fn changes_from(&self, current: &TableSettings) -> Vec<TableChange> {
        let mut changes = Vec::new();
        if let Some(capacity) = self.capacity
            && current.capacity != Some(capacity)
        {
            changes.push(TableChange::Capacity(capacity));
        }
        if let Some(enabled) = self.point_in_time_recovery
            && current.point_in_time_recovery != Some(enabled)
        {
            changes.push(TableChange::PointInTimeRecovery(enabled));
        }
        if let Some(enabled) = self.ttl_enabled
            && current.ttl_enabled != Some(enabled)
        {
            changes.push(TableChange::Ttl(enabled));
        }
        if let Some(seconds) = self.default_time_to_live
            && current.default_time_to_live != Some(seconds)
        {
            changes.push(TableChange::DefaultTimeToLive(seconds));
        }
        changes
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(CapacitySpecification::Provisioned {
            read_capacity_units,
            write_capacity_units,
        }) = self.capacity
            && (read_capacity_units < 1 || write_capacity_units < 1)
        {
            return Err(ValidationError::Field {
                field: "capacity",
                reason: "provisioned capacity units must be at least 1".to_string(),
            });
        }
        if let Some(seconds) = self.default_time_to_live
            && !(0..=630_720_000).contains(&seconds)
        {
            return Err(ValidationError::Field {
                field: "default_time_to_live",
                reason: format!("{} is outside 0..=630720000 seconds", seconds),
            });
        }
        Ok(())
    }
}

/// Caller-owned desired state of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub keyspace_name: String,
    pub table_name: String,
    #[serde(default)]
    pub schema_definition: Option<SchemaDefinition>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub settings: TableSettings,
    #[serde(default)]
    pub tags: Tags,
}

impl TableConfig {
    pub fn new(keyspace_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            keyspace_name: keyspace_name.into(),
            table_name: table_name.into(),
            schema_definition: None,
            comment: None,
            settings: TableSettings::default(),
            tags: Tags::default(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    pub fn id(&self) -> TableId {
        TableId::new(&self.keyspace_name, &self.table_name)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("keyspace_name", &self.keyspace_name)?;
        validate_name("table_name", &self.table_name)?;
        if let Some(schema) = &self.schema_definition {
            schema.validate()?;
        }
        self.settings.validate()
    }
}

/// Table as described by `GetTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub arn: String,
    pub keyspace_name: String,
    pub table_name: String,
    pub status: TableStatus,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub schema_definition: Option<SchemaDefinition>,
    pub comment: Option<String>,
    pub settings: TableSettings,
}

/// Authoritative state returned by a successful read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableState {
    pub id: String,
    pub arn: String,
    pub keyspace_name: String,
    pub table_name: String,
    pub status: String,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub schema_definition: Option<SchemaDefinition>,
    pub comment: Option<String>,
    pub settings: TableSettings,
    /// Tags owned by this resource (provider defaults removed).
    pub tags: Tags,
    /// Every tag on the table after ignore rules.
    pub tags_all: Tags,
}

/// True when moving from `prior` to `desired` cannot be done in place.
pub fn requires_replacement(prior: &TableState, desired: &TableConfig) -> bool {
    prior.keyspace_name != desired.keyspace_name
        || prior.table_name != desired.table_name
        || (desired.schema_definition.is_some()
            && prior.schema_definition != desired.schema_definition)
        || (desired.comment.is_some() && prior.comment != desired.comment)
}
