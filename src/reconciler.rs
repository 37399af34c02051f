//! Table reconciler: create, read, update and delete a Keyspaces table and
//! wait for every asynchronous change to settle.
//!
//! Every mutating call returns as soon as the service accepts it; the table
//! then moves through `CREATING`, `UPDATING` or `DELETING`. Each operation
//! issues its request and blocks on [`StateChangeConf`] until the table is
//! `ACTIVE` again (or gone, for deletes), the configured timeout elapses, or
//! the caller's cancellation token fires.
//!
//! Operations for one identifier must be serialized by the caller.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{CreateTableRequest, TableApi, TaggingApi, UpdateTableRequest};
use crate::config::{ProviderConfig, Timeouts};
use crate::errors::{Operation, ReconcileError, ValidationError, WaitError};
use crate::identity::TableId;
use crate::model::{TableChange, TableConfig, TableDescription, TableState, TableStatus};
use crate::tags::{DefaultTagsConfig, IgnoreTagsConfig, Tags};
use crate::wait::StateChangeConf;

/// How a missing table is reported by [`TableReconciler::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// The table is already tracked; a missing table was deleted out of band.
    Refresh,
    /// Immediately after a successful create; a missing table is inconsistent.
    AfterCreate,
}

/// Result of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Found(TableState),
    /// The table no longer exists and should be dropped from tracked state.
    Gone,
}

impl ReadOutcome {
    pub fn found(self) -> Option<TableState> {
        match self {
            ReadOutcome::Found(state) => Some(state),
            ReadOutcome::Gone => None,
        }
    }
}

/// Status transition a mutating call waits for.
#[derive(Debug, Clone, Copy)]
enum Transition {
    Created,
    Updated,
    Deleted,
}

impl Transition {
    fn operation(self) -> Operation {
        match self {
            Transition::Created => Operation::Create,
            Transition::Updated => Operation::Update,
            Transition::Deleted => Operation::Delete,
        }
    }

    fn pending(self) -> Vec<TableStatus> {
        match self {
            Transition::Created => vec![TableStatus::Creating],
            Transition::Updated => vec![TableStatus::Updating],
            Transition::Deleted => vec![TableStatus::Deleting],
        }
    }

    /// Empty for deletes: absence is the target.
    fn target(self) -> Vec<TableStatus> {
        match self {
            Transition::Created | Transition::Updated => vec![TableStatus::Active],
            Transition::Deleted => vec![],
        }
    }
}

/// Reconciles declared [`TableConfig`]s against the remote service.
#[derive(Debug, Clone)]
pub struct TableReconciler<A> {
    api: A,
    timeouts: Timeouts,
    default_tags: DefaultTagsConfig,
    ignore_tags: IgnoreTagsConfig,
}

impl<A> TableReconciler<A>
where
    A: TableApi + TaggingApi,
{
    pub fn new(api: A, config: &ProviderConfig) -> Self {
        Self {
            api,
            timeouts: config.timeouts,
            default_tags: config.default_tags.clone(),
            ignore_tags: config.ignore_tags.clone(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Create the table and wait until it is `ACTIVE`.
    ///
    /// A rejected request returns [`ReconcileError::Create`] and no identifier.
    /// A failed wait returns [`ReconcileError::Wait`] carrying the identifier
    /// of the table that now exists remotely.
    pub async fn create(
        &self,
        config: &TableConfig,
        cancel: &CancellationToken,
    ) -> Result<TableId, ReconcileError> {
        config.validate()?;
        let id = config.id();

        // Ignore rules filter what is read back, never what the caller declares.
        let tags = config
            .tags
            .clone()
            .merge_defaults(&self.default_tags)
            .ignore_aws();
        let request = CreateTableRequest {
            keyspace_name: config.keyspace_name.clone(),
            table_name: config.table_name.clone(),
            schema_definition: config.schema_definition.clone(),
            comment: config.comment.clone(),
            settings: config.settings.clone(),
            // The service rejects an explicit empty tag set.
            tags: (!tags.is_empty()).then_some(tags),
        };

        debug!(%id, tags = request.tags.as_ref().map_or(0, Tags::len), "creating Keyspaces Table");
        let arn = cancellable(cancel, Operation::Create, &id, self.api.create_table(request))
            .await?
            .map_err(|source| ReconcileError::Create {
                id: id.clone(),
                source,
            })?;
        debug!(%id, %arn, "Keyspaces Table create accepted");

        self.wait_for_table(&id, Transition::Created, self.timeouts.create, cancel)
            .await?;
        info!(%id, "Keyspaces Table created");

        Ok(id)
    }

    /// Read the authoritative table state, including its tags.
    pub async fn read(
        &self,
        id: &str,
        mode: ReadMode,
        cancel: &CancellationToken,
    ) -> Result<ReadOutcome, ReconcileError> {
        let id = TableId::parse(id)?;

        let found = cancellable(
            cancel,
            Operation::Read,
            &id,
            self.api.get_table(id.keyspace_name(), id.table_name()),
        )
        .await?;

        let table = match found {
            Ok(table) => table,
            Err(err) if err.is_not_found() => {
                return match mode {
                    ReadMode::Refresh => {
                        warn!(%id, "Keyspaces Table not found, removing from state");
                        Ok(ReadOutcome::Gone)
                    }
                    ReadMode::AfterCreate => Err(ReconcileError::NotFoundAfterCreate { id }),
                };
            }
            Err(source) => return Err(ReconcileError::Read { id, source }),
        };

        let remote_tags = cancellable(cancel, Operation::Read, &id, self.api.list_tags(&table.arn))
            .await?
            .map_err(|source| ReconcileError::ListTags {
                id: id.clone(),
                source,
            })?;

        let tags_all = remote_tags.ignore_aws().ignore_config(&self.ignore_tags);
        let tags = tags_all.clone().remove_defaults(&self.default_tags);

        Ok(ReadOutcome::Found(TableState {
            id: id.to_string(),
            arn: table.arn,
            keyspace_name: table.keyspace_name,
            table_name: table.table_name,
            status: table.status.to_string(),
            creation_timestamp: table.creation_timestamp,
            schema_definition: table.schema_definition,
            comment: table.comment,
            settings: table.settings,
            tags,
            tags_all,
        }))
    }

    /// Move the table from `prior` to `desired` in place.
    ///
    /// Changes to the keyspace name, table name, schema or comment must be
    /// handled by replacing the table (see [`crate::model::requires_replacement`]);
    /// they are not inspected here. Settings are applied one request at a
    /// time, each followed by a wait for `ACTIVE`. Tags are synchronised
    /// afterwards and independently.
    pub async fn update(
        &self,
        id: &str,
        prior: &TableState,
        desired: &TableConfig,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        let id = TableId::parse(id)?;
        desired.settings.validate()?;

        let changes = desired.settings.changes_from(&prior.settings);
        if changes.contains(&TableChange::Ttl(false)) {
            return Err(ValidationError::Field {
                field: "ttl_enabled",
                reason: "TTL cannot be disabled once enabled".to_string(),
            }
            .into());
        }

        for change in changes {
            debug!(%id, ?change, "updating Keyspaces Table");
            let request = UpdateTableRequest {
                keyspace_name: id.keyspace_name().to_string(),
                table_name: id.table_name().to_string(),
                change,
            };
            cancellable(cancel, Operation::Update, &id, self.api.update_table(request))
                .await?
                .map_err(|source| ReconcileError::Update {
                    id: id.clone(),
                    source,
                })?;

            self.wait_for_table(&id, Transition::Updated, self.timeouts.update, cancel)
                .await?;
        }

        let new_tags = self.diffable_tags(&desired.tags);
        if !prior.tags_all.diff(&new_tags).is_empty() {
            debug!(%id, "updating Keyspaces Table tags");
            cancellable(
                cancel,
                Operation::Update,
                &id,
                self.api.update_tags(&prior.arn, &prior.tags_all, &new_tags),
            )
            .await?
            .map_err(|source| ReconcileError::Tags {
                id: id.clone(),
                source,
            })?;
        }

        info!(%id, "Keyspaces Table updated");
        Ok(())
    }

    /// Delete the table and wait until it can no longer be found.
    ///
    /// Deleting a table that is already gone succeeds.
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), ReconcileError> {
        let id = TableId::parse(id)?;

        debug!(%id, "deleting Keyspaces Table");
        let deleted = cancellable(
            cancel,
            Operation::Delete,
            &id,
            self.api.delete_table(id.keyspace_name(), id.table_name()),
        )
        .await?;

        match deleted {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!(%id, "Keyspaces Table already deleted");
                return Ok(());
            }
            Err(source) => return Err(ReconcileError::Delete { id, source }),
        }

        self.wait_for_table(&id, Transition::Deleted, self.timeouts.delete, cancel)
            .await?;
        info!(%id, "Keyspaces Table deleted");

        Ok(())
    }

    /// Declared tags in the same shape as `TableState::tags_all`: defaults
    /// merged in, reserved and ignored keys removed.
    fn diffable_tags(&self, tags: &Tags) -> Tags {
        tags.clone()
            .merge_defaults(&self.default_tags)
            .ignore_aws()
            .ignore_config(&self.ignore_tags)
    }

    async fn wait_for_table(
        &self,
        id: &TableId,
        transition: Transition,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Option<TableDescription>, ReconcileError> {
        let conf = StateChangeConf::new(transition.pending(), transition.target(), timeout)
            .with_poll_interval(self.timeouts.poll_interval)
            .with_delay(self.timeouts.delay);

        let api = &self.api;
        let refresh = move || async move {
            match api.get_table(id.keyspace_name(), id.table_name()).await {
                Ok(table) => {
                    let status = table.status.clone();
                    Ok(Some((table, status)))
                }
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            }
        };

        let operation = transition.operation();
        conf.wait_for_state(cancel, refresh)
            .await
            .map_err(|source| match source {
                WaitError::Cancelled => ReconcileError::Cancelled {
                    operation,
                    id: id.clone(),
                },
                source => ReconcileError::Wait {
                    operation,
                    id: id.clone(),
                    source,
                },
            })
    }
}

/// Race a remote call against cancellation.
async fn cancellable<T>(
    cancel: &CancellationToken,
    operation: Operation,
    id: &TableId,
    call: impl Future<Output = T>,
) -> Result<T, ReconcileError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ReconcileError::Cancelled {
            operation,
            id: id.clone(),
        }),
        out = call => Ok(out),
    }
}
