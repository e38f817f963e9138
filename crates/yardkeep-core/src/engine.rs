//! Mutation engine for the part snapshot and command log
//!
//! Every operation reloads both collections, mutates in memory, and writes
//! back. The engine holds no state between calls.
//!
//! # Write ordering
//!
//! `record_command` persists the command log before the snapshot. If the
//! snapshot write fails (or the process dies between the two writes), the log
//! holds a command the snapshot does not yet reflect. The reverse, a snapshot
//! change without its audit record, cannot happen.

use crate::error::{InventoryError, Result};
use crate::model::{Command, Part};
use crate::store::RecordStore;

/// Outcome of recording one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// The command as appended to the log
    pub command: Command,
    /// The part after the change was folded in
    pub part: Part,
}

/// Partial field changes for an existing part
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartChanges {
    pub description: Option<String>,
    pub quantity_on_hand: Option<u64>,
    pub yard: Option<String>,
}

impl PartChanges {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.quantity_on_hand.is_none() && self.yard.is_none()
    }

    fn apply_to(&self, part: &mut Part) {
        if let Some(ref description) = self.description {
            part.description = description.clone();
        }
        if let Some(quantity) = self.quantity_on_hand {
            part.quantity_on_hand = quantity;
        }
        if let Some(ref yard) = self.yard {
            part.yard = Some(yard.clone());
        }
    }
}

/// Fold one command into the snapshot and return the index of the affected part.
///
/// Quantities never go below zero: the clamp applies per step, so a later
/// positive change starts from zero rather than from the unclamped total.
/// An existing part keeps its description; an unseen part is created with
/// the command's description.
pub fn reconcile(parts: &mut Vec<Part>, command: &Command) -> usize {
    match parts.iter().position(|p| p.matches(&command.part_number)) {
        Some(idx) => {
            let part = &mut parts[idx];
            part.quantity_on_hand = apply_change(part.quantity_on_hand, command.quantity_change);
            idx
        }
        None => {
            parts.push(Part::new(
                command.part_number.clone(),
                command.description.clone(),
                apply_change(0, command.quantity_change),
            ));
            parts.len() - 1
        }
    }
}

fn apply_change(on_hand: u64, change: i64) -> u64 {
    let next = i128::from(on_hand) + i128::from(change);
    u64::try_from(next.max(0)).unwrap_or(u64::MAX)
}

/// Inventory operations over a record store
#[derive(Debug)]
pub struct Inventory<S> {
    store: S,
}

impl<S: RecordStore> Inventory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The full snapshot, in stored order
    pub fn parts(&self) -> Vec<Part> {
        self.store.load_parts()
    }

    /// The full command log, in append order
    pub fn commands(&self) -> Vec<Command> {
        self.store.load_commands()
    }

    /// Append a command to the log and fold it into the snapshot
    pub fn record_command(&self, command: Command) -> Result<Reconciled> {
        let mut commands = self.store.load_commands();
        commands.push(command.clone());
        self.store.save_commands(&commands)?;

        let mut parts = self.store.load_parts();
        let idx = reconcile(&mut parts, &command);
        let part = parts[idx].clone();
        self.store.save_parts(&parts)?;

        tracing::info!(
            part_number = %command.part_number,
            quantity_change = command.quantity_change,
            on_hand = part.quantity_on_hand,
            "Recorded command"
        );

        Ok(Reconciled { command, part })
    }

    /// Overwrite a part by exact part number, or append it if absent.
    ///
    /// Not audited. The remote identifier of an existing part is kept.
    pub fn upsert_part(&self, mut part: Part) -> Result<Part> {
        let mut parts = self.store.load_parts();

        match parts.iter_mut().find(|p| p.matches(&part.part_number)) {
            Some(existing) => {
                if part.remote_id.is_none() {
                    part.remote_id = existing.remote_id;
                }
                *existing = part.clone();
                tracing::info!(part_number = %part.part_number, "Replaced part");
            }
            None => {
                parts.push(part.clone());
                tracing::info!(part_number = %part.part_number, "Added part");
            }
        }

        self.store.save_parts(&parts)?;
        Ok(part)
    }

    /// Append a brand-new part, refusing any case-insensitive duplicate
    pub fn insert_part(&self, part: Part) -> Result<Part> {
        let mut parts = self.store.load_parts();
        if parts.iter().any(|p| p.matches_ignore_case(&part.part_number)) {
            return Err(InventoryError::Duplicate(part.part_number));
        }

        parts.push(part.clone());
        self.store.save_parts(&parts)?;
        tracing::info!(part_number = %part.part_number, "Inserted part");
        Ok(part)
    }

    /// Remove a part by exact part number. The command log is untouched.
    pub fn delete_part(&self, part_number: &str) -> Result<Part> {
        let mut parts = self.store.load_parts();
        let idx = parts
            .iter()
            .position(|p| p.matches(part_number))
            .ok_or_else(|| InventoryError::NotFound(format!("Part {part_number}")))?;

        let removed = parts.remove(idx);
        self.store.save_parts(&parts)?;
        tracing::info!(part_number = %part_number, "Deleted part");
        Ok(removed)
    }

    /// Look up a part ignoring case
    pub fn find_part_ignore_case(&self, part_number: &str) -> Option<Part> {
        self.store
            .load_parts()
            .into_iter()
            .find(|p| p.matches_ignore_case(part_number))
    }

    /// Apply partial changes to the part matching `part_number` (ignoring case).
    ///
    /// The part number and remote identifier are never changed.
    pub fn update_part(&self, part_number: &str, changes: &PartChanges) -> Result<Part> {
        let mut parts = self.store.load_parts();
        let part = parts
            .iter_mut()
            .find(|p| p.matches_ignore_case(part_number))
            .ok_or_else(|| InventoryError::NotFound(format!("Part {part_number}")))?;

        changes.apply_to(part);
        let updated = part.clone();

        self.store.save_parts(&parts)?;
        tracing::info!(part_number = %updated.part_number, "Updated part");
        Ok(updated)
    }

    /// Record the remote identifier for a part
    pub fn set_part_remote_id(&self, part_number: &str, remote_id: i64) -> Result<()> {
        let mut parts = self.store.load_parts();
        let part = parts
            .iter_mut()
            .find(|p| p.matches(part_number))
            .ok_or_else(|| InventoryError::NotFound(format!("Part {part_number}")))?;
        part.remote_id = Some(remote_id);
        self.store.save_parts(&parts)?;
        Ok(())
    }

    /// Record the remote identifier for the command at `index` in the log.
    ///
    /// This is the only change ever made to an appended command.
    pub fn set_command_remote_id(&self, index: usize, remote_id: i64) -> Result<()> {
        let mut commands = self.store.load_commands();
        let command = commands
            .get_mut(index)
            .ok_or_else(|| InventoryError::NotFound(format!("Command #{index}")))?;
        command.remote_id = Some(remote_id);
        self.store.save_commands(&commands)?;
        Ok(())
    }
}
