// # Table Store Implementations
//
// This module provides implementations of the TableStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileTableStore;
pub use memory::MemoryTableStore;

use crate::config::StoreConfig;
use crate::traits::TableStore;

/// Create a table store from configuration
pub fn create_store(config: &StoreConfig) -> Box<dyn TableStore> {
    match config {
        StoreConfig::File { path } => Box::new(FileTableStore::new(path)),
        StoreConfig::Memory => Box::new(MemoryTableStore::new()),
    }
}
