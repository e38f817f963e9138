//! Yardkeep Core - Inventory tracking for yard parts
//!
//! This crate provides the storage and reconciliation logic behind the
//! yardkeep server and sync tool:
//!
//! - **Model**: `Part` (current-quantity snapshot entry) and `Command`
//!   (immutable audit-log entry)
//! - **Store**: Whole-collection load/save over flat JSON files
//! - **Engine**: Appends commands and folds them into the snapshot under a
//!   zero-floor clamp
//! - **Config**: Location of the collection files
//!
//! # Architecture
//!
//! The command log is the record of what happened; the snapshot is a
//! derived, overwritable cache of what is true now. Commands are appended and
//! never edited, apart from recording a remote identifier after sync.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;

pub use config::StoreConfig;
pub use engine::{reconcile, Inventory, PartChanges, Reconciled};
pub use error::{InventoryError, Result, StoreError};
pub use model::{Command, Part};
pub use store::{InMemoryStore, JsonFileStore, RecordStore};
