// # Memory Table Store
//
// In-memory implementation of TableStore.
//
// Useful for testing, for embedding the updater in another program that
// owns persistence itself, and for previewing a run without touching disk.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::table::Table;
use crate::traits::TableStore;

/// In-memory table store
///
/// Clones share the same table.
///
/// # Example
///
/// ```rust,no_run
/// use hosts_core::store::MemoryTableStore;
/// use hosts_core::traits::TableStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryTableStore::new();
///
///     let mut table = store.load().await?;
///     table.push(hosts_core::Entry::new("nas", "192.168.1.20".parse()?));
///     store.save(&table).await?;
///
///     assert_eq!(store.snapshot().await.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTableStore {
    inner: Arc<RwLock<Table>>,
}

impl MemoryTableStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `table`
    pub fn with_table(table: Table) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    /// Copy of the stored table
    pub async fn snapshot(&self) -> Table {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn load(&self) -> Result<Table> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, table: &Table) -> Result<()> {
        *self.inner.write().await = table.clone();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
