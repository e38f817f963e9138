//! Yardkeep Sync - Replication into a SharePoint list store
//!
//! - **Client**: Typed create/update calls against the list REST API, with
//!   token, write digest and entity types acquired once per session
//! - **Mapping**: Local field → remote column translation tables
//! - **Sync**: Batch import plus single-record add, update and log operations
//! - **Config**: Site, credentials and data location for a run

pub mod client;
pub mod config;
pub mod error;
pub mod mapping;
pub mod sync;

pub use client::{CreatedItem, ListKind, ListStore, SharePointClient};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use sync::{Replicator, SyncFailure, SyncReport};
