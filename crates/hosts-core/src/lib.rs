// # hosts-core
//
// Core library for keeping a hosts file in step with what a router's DHCP
// server knows.
//
// ## Architecture Overview
//
// - **Table / Entry**: The local resolution table (hosts file rows)
// - **Mapping / NamePolicy**: Observed hosts turned into a name → address snapshot
// - **reconcile()**: Pure, idempotent alignment of a Table with a Mapping
// - **SnapshotSource**: Trait for observing hosts on a router or DHCP server
// - **TableStore**: Trait for loading and saving the table
// - **SourceRegistry**: Provider identifier → source factory, built at startup
// - **Updater**: The load → fetch → reconcile → save pipeline
//
// ## Design Principles
//
// 1. **Pure core**: reconciliation does no I/O and cannot fail
// 2. **Conservative**: addresses missing from a snapshot are left alone
// 3. **Plugin-Based**: Sources are registered explicitly, no hard-coded if-else
// 4. **All or nothing**: a failed run never writes a partial table

pub mod config;
pub mod error;
pub mod mapping;
pub mod reconcile;
pub mod registry;
pub mod store;
pub mod table;
pub mod traits;
pub mod updater;

// Re-export core types for convenience
pub use config::{FlagSpec, SourceConfig, StoreConfig, UpdaterConfig};
pub use error::{Error, Result};
pub use mapping::{HardwareAddr, Host, Mapping, NamePolicy};
pub use reconcile::{TableChange, diff, reconcile};
pub use registry::SourceRegistry;
pub use store::{FileTableStore, MemoryTableStore, create_store};
pub use table::{Entry, Table};
pub use traits::{SnapshotSource, SnapshotSourceFactory, TableStore};
pub use updater::{UpdateSummary, Updater};
