// # Table Store Trait
//
// Defines the interface for loading and persisting the resolution table.
//
// ## Implementations
//
// - File-based: the system hosts file (`FileTableStore`)
// - In-memory: tests and embedding (`MemoryTableStore`)

use async_trait::async_trait;

use crate::table::Table;

/// Trait for table store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call from any task. A single update run
/// calls `load` once and `save` at most once.
///
/// # Errors
///
/// Parse failures must be aggregated into a single
/// [`Error::Parse`](crate::Error::Parse) so that a half-read table is
/// never reconciled and written back.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Load the current table
    async fn load(&self) -> Result<Table, crate::Error>;

    /// Persist `table`, replacing what was stored
    async fn save(&self, table: &Table) -> Result<(), crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}
