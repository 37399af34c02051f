//! Type conversions between the crate model and Keyspaces SDK types.

use aws_sdk_keyspaces::operation::get_table::GetTableOutput;
use aws_sdk_keyspaces::primitives::DateTime as SdkDateTime;
use aws_sdk_keyspaces::types::{
    self as sdk, PointInTimeRecoveryStatus, ThroughputMode, TimeToLiveStatus,
};
use chrono::{DateTime, Utc};

use crate::errors::ValidationError;
use crate::model::{
    CapacitySpecification, ClusteringKey, ColumnDefinition, SchemaDefinition, SortOrder,
    TableDescription, TableSettings, TableStatus,
};
use crate::tags::Tags;

/// Wrap an SDK builder error as a field validation error.
fn build_error(field: &'static str, err: impl std::fmt::Display) -> ValidationError {
    ValidationError::Field {
        field,
        reason: err.to_string(),
    }
}

pub fn schema_to_sdk(schema: &SchemaDefinition) -> Result<sdk::SchemaDefinition, ValidationError> {
    let columns = schema
        .columns
        .iter()
        .map(|c| {
            sdk::ColumnDefinition::builder()
                .name(&c.name)
                .r#type(&c.column_type)
                .build()
                .map_err(|e| build_error("schema_definition.columns", e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let partition_keys = schema
        .partition_keys
        .iter()
        .map(|name| {
            sdk::PartitionKey::builder()
                .name(name)
                .build()
                .map_err(|e| build_error("schema_definition.partition_keys", e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let clustering_keys = schema
        .clustering_keys
        .iter()
        .map(|k| {
            let order = match k.order_by {
                SortOrder::Asc => sdk::SortOrder::Asc,
                SortOrder::Desc => sdk::SortOrder::Desc,
            };
            sdk::ClusteringKey::builder()
                .name(&k.name)
                .order_by(order)
                .build()
                .map_err(|e| build_error("schema_definition.clustering_keys", e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let static_columns = schema
        .static_columns
        .iter()
        .map(|name| {
            sdk::StaticColumn::builder()
                .name(name)
                .build()
                .map_err(|e| build_error("schema_definition.static_columns", e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    sdk::SchemaDefinition::builder()
        .set_all_columns(Some(columns))
        .set_partition_keys(Some(partition_keys))
        .set_clustering_keys((!clustering_keys.is_empty()).then_some(clustering_keys))
        .set_static_columns((!static_columns.is_empty()).then_some(static_columns))
        .build()
        .map_err(|e| build_error("schema_definition", e))
}

pub fn schema_from_sdk(schema: &sdk::SchemaDefinition) -> SchemaDefinition {
    SchemaDefinition {
        columns: schema
            .all_columns()
            .iter()
            .map(|c| ColumnDefinition {
                name: c.name().to_string(),
                column_type: c.r#type().to_string(),
            })
            .collect(),
        partition_keys: schema
            .partition_keys()
            .iter()
            .map(|k| k.name().to_string())
            .collect(),
        clustering_keys: schema
            .clustering_keys()
            .iter()
            .map(|k| ClusteringKey {
                name: k.name().to_string(),
                order_by: match k.order_by() {
                    sdk::SortOrder::Desc => SortOrder::Desc,
                    _ => SortOrder::Asc,
                },
            })
            .collect(),
        static_columns: schema
            .static_columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect(),
    }
}

pub fn capacity_to_sdk(
    capacity: CapacitySpecification,
) -> Result<sdk::CapacitySpecification, ValidationError> {
    let builder = match capacity {
        CapacitySpecification::PayPerRequest => {
            sdk::CapacitySpecification::builder().throughput_mode(ThroughputMode::PayPerRequest)
        }
        CapacitySpecification::Provisioned {
            read_capacity_units,
            write_capacity_units,
        } => sdk::CapacitySpecification::builder()
            .throughput_mode(ThroughputMode::Provisioned)
            .read_capacity_units(read_capacity_units)
            .write_capacity_units(write_capacity_units),
    };
    builder.build().map_err(|e| build_error("capacity", e))
}

fn capacity_from_sdk(summary: &sdk::CapacitySpecificationSummary) -> CapacitySpecification {
    match summary.throughput_mode() {
        ThroughputMode::Provisioned => CapacitySpecification::Provisioned {
            read_capacity_units: summary.read_capacity_units().unwrap_or_default(),
            write_capacity_units: summary.write_capacity_units().unwrap_or_default(),
        },
        _ => CapacitySpecification::PayPerRequest,
    }
}

pub fn point_in_time_recovery_to_sdk(
    enabled: bool,
) -> Result<sdk::PointInTimeRecovery, ValidationError> {
    let status = if enabled {
        PointInTimeRecoveryStatus::Enabled
    } else {
        PointInTimeRecoveryStatus::Disabled
    };
    sdk::PointInTimeRecovery::builder()
        .status(status)
        .build()
        .map_err(|e| build_error("point_in_time_recovery", e))
}

/// TTL can only be switched on; the service has no disabled status.
pub fn ttl_to_sdk(enabled: bool) -> Result<sdk::TimeToLive, ValidationError> {
    if !enabled {
        return Err(build_error(
            "ttl_enabled",
            "TTL cannot be disabled once enabled on a Keyspaces table",
        ));
    }
    sdk::TimeToLive::builder()
        .status(TimeToLiveStatus::Enabled)
        .build()
        .map_err(|e| build_error("ttl_enabled", e))
}

pub fn comment_to_sdk(comment: &str) -> Result<sdk::Comment, ValidationError> {
    sdk::Comment::builder()
        .message(comment)
        .build()
        .map_err(|e| build_error("comment", e))
}

pub fn tags_to_sdk(tags: &Tags) -> Result<Vec<sdk::Tag>, ValidationError> {
    tags.iter()
        .map(|(k, v)| {
            sdk::Tag::builder()
                .key(k)
                .value(v)
                .build()
                .map_err(|e| build_error("tags", e))
        })
        .collect()
}

pub fn tags_from_sdk(tags: &[sdk::Tag]) -> Tags {
    tags.iter()
        .map(|t| (t.key().to_string(), t.value().to_string()))
        .collect()
}

pub fn timestamp_from_sdk(ts: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos())
}

/// Flatten a `GetTable` response into a `TableDescription`.
pub fn table_description_from_sdk(output: &GetTableOutput) -> TableDescription {
    let settings = TableSettings {
        capacity: output.capacity_specification().map(capacity_from_sdk),
        point_in_time_recovery: output
            .point_in_time_recovery()
            .map(|p| *p.status() == PointInTimeRecoveryStatus::Enabled),
        ttl_enabled: output
            .ttl()
            .map(|t| *t.status() == TimeToLiveStatus::Enabled),
        default_time_to_live: output.default_time_to_live(),
    };

    TableDescription {
        arn: output.resource_arn().to_string(),
        keyspace_name: output.keyspace_name().to_string(),
        table_name: output.table_name().to_string(),
        status: output
            .status()
            .map(|s| TableStatus::from(s.as_str()))
            .unwrap_or_else(|| TableStatus::Other(String::new())),
        creation_timestamp: output.creation_timestamp().and_then(timestamp_from_sdk),
        schema_definition: output.schema_definition().map(schema_from_sdk),
        comment: output
            .comment()
            .map(|c| c.message().to_string())
            .filter(|m| !m.is_empty()),
        settings,
    }
}
