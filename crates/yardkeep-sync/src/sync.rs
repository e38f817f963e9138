//! Replication of local records into the remote list store
//!
//! `import` pushes every part and command that has no remote identifier yet,
//! writing each assigned identifier back to the local record as soon as it
//! is known. Remote failures are per record: they are logged, collected in
//! the report, and the batch moves on. So is a record removed locally while
//! its remote create was in flight. Digest refresh and local store failures
//! abort the run.

use serde::Serialize;

use yardkeep_core::{
    Command, Inventory, InventoryError, Part, PartChanges, Reconciled, RecordStore,
};

use crate::client::{ListKind, ListStore};
use crate::error::{Result, SyncError};
use crate::mapping::{changed_part_fields, command_fields, part_fields};

/// One record that could not be pushed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub list: String,
    pub part_number: String,
    pub message: String,
    /// Timeouts, throttling and server errors; worth another `import` later
    pub transient: bool,
}

/// Outcome of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub parts_created: usize,
    pub commands_created: usize,
    /// Records skipped because they already carry a remote identifier
    pub already_synced: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn created(&self) -> usize {
        self.parts_created + self.commands_created
    }

    fn fail(&mut self, list: ListKind, part_number: &str, err: &SyncError) {
        tracing::warn!(
            part_number = %part_number,
            error = %err,
            "Failed to create {} item",
            list
        );
        self.failures.push(SyncFailure {
            list: list.to_string(),
            part_number: part_number.to_string(),
            message: err.to_string(),
            transient: err.is_transient(),
        });
    }
}

/// Pushes a local inventory into a remote list store
pub struct Replicator<S, L> {
    inventory: Inventory<S>,
    remote: L,
}

impl<S: RecordStore, L: ListStore> Replicator<S, L> {
    pub fn new(inventory: Inventory<S>, remote: L) -> Self {
        Self { inventory, remote }
    }

    pub fn inventory(&self) -> &Inventory<S> {
        &self.inventory
    }

    pub fn remote(&self) -> &L {
        &self.remote
    }

    /// Push all unsynced parts, refresh the digest, then push all unsynced commands
    pub async fn import(&mut self) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        tracing::info!("Importing parts");
        self.import_parts(&mut report).await?;

        self.remote.refresh_digest().await?;

        tracing::info!("Importing commands");
        self.import_commands(&mut report).await?;

        tracing::info!(
            created = report.created(),
            failed = report.failures.len(),
            "Import finished"
        );
        Ok(report)
    }

    async fn import_parts(&mut self, report: &mut SyncReport) -> Result<()> {
        for part in self.inventory.parts() {
            if part.remote_id.is_some() {
                report.already_synced += 1;
                continue;
            }

            match self.remote.create_item(ListKind::Parts, part_fields(&part)).await {
                Ok(created) => match self.inventory.set_part_remote_id(&part.part_number, created.id) {
                    Ok(()) => {
                        report.parts_created += 1;
                        tracing::info!(part_number = %part.part_number, id = created.id, "Created part item");
                    }
                    Err(e @ InventoryError::NotFound(_)) => {
                        report.fail(ListKind::Parts, &part.part_number, &SyncError::from(e))
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(e) => report.fail(ListKind::Parts, &part.part_number, &e),
            }
        }
        Ok(())
    }

    async fn import_commands(&mut self, report: &mut SyncReport) -> Result<()> {
        for (idx, command) in self.inventory.commands().into_iter().enumerate() {
            if command.remote_id.is_some() {
                report.already_synced += 1;
                continue;
            }

            let created = match command_fields(&command) {
                Ok(fields) => self.remote.create_item(ListKind::Commands, fields).await,
                Err(e) => Err(e),
            };

            match created {
                Ok(created) => match self.inventory.set_command_remote_id(idx, created.id) {
                    Ok(()) => {
                        report.commands_created += 1;
                        tracing::info!(part_number = %command.part_number, id = created.id, "Created command item");
                    }
                    Err(e @ InventoryError::NotFound(_)) => {
                        report.fail(ListKind::Commands, &command.part_number, &SyncError::from(e))
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(e) => report.fail(ListKind::Commands, &command.part_number, &e),
            }
        }
        Ok(())
    }

    /// Create a brand-new part remotely, then store it locally with its identifier
    pub async fn add_part(&mut self, mut part: Part) -> Result<Part> {
        if self.inventory.find_part_ignore_case(&part.part_number).is_some() {
            return Err(SyncError::Duplicate(part.part_number));
        }

        let created = self
            .remote
            .create_item(ListKind::Parts, part_fields(&part))
            .await?;
        part.remote_id = Some(created.id);

        Ok(self.inventory.insert_part(part)?)
    }

    /// Apply `changes` locally, then merge the changed fields remotely.
    ///
    /// The part must already carry a remote identifier.
    pub async fn update_part(&mut self, part_number: &str, changes: &PartChanges) -> Result<Part> {
        let existing = self
            .inventory
            .find_part_ignore_case(part_number)
            .ok_or_else(|| SyncError::NotFound(part_number.to_string()))?;
        let remote_id = existing
            .remote_id
            .ok_or_else(|| SyncError::MissingRemoteId(existing.part_number.clone()))?;

        let updated = self.inventory.update_part(part_number, changes)?;

        let fields = changed_part_fields(changes);
        if !fields.is_empty() {
            self.remote
                .update_item(ListKind::Parts, remote_id, fields)
                .await?;
        }

        Ok(updated)
    }

    /// Create a command remotely, then record it locally through the engine
    pub async fn log_command(&mut self, mut command: Command) -> Result<Reconciled> {
        let fields = command_fields(&command)?;
        let created = self.remote.create_item(ListKind::Commands, fields).await?;
        command.remote_id = Some(created.id);

        Ok(self.inventory.record_command(command)?)
    }
}
