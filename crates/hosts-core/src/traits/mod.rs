//! Core traits for the hosts updater
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`SnapshotSource`]: Observe hosts on a router or DHCP server
//! - [`TableStore`]: Load and persist the resolution table

pub mod snapshot_source;
pub mod table_store;

pub use snapshot_source::{SnapshotSource, SnapshotSourceFactory};
pub use table_store::TableStore;
