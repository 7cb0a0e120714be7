//! Update pipeline
//!
//! The Updater runs one complete pass:
//!
//! ```text
//! ┌──────────────────┐   Vec<Host>   ┌────────────┐   Mapping
//! │ SnapshotSource   │──────────────▶│ NamePolicy │─────────────┐
//! └──────────────────┘               └────────────┘             │
//!                                                               ▼
//! ┌──────────────────┐     Table     ┌────────────┐      ┌─────────────┐
//! │ TableStore::load │──────────────▶│  before    │      │ reconcile() │
//! └──────────────────┘               └────────────┘      └─────────────┘
//!                                          │                    │
//!                                          └──────▶ diff() ◀────┘
//!                                                     │
//!                                          ┌──────────▼─────────┐
//!                                          │ TableStore::save   │
//!                                          └────────────────────┘
//! ```
//!
//! Any error before the save aborts the run; a partially reconciled table
//! is never persisted.

use tracing::{debug, info};

use crate::config::{SourceConfig, UpdaterConfig};
use crate::error::Result;
use crate::reconcile::{TableChange, diff, reconcile};
use crate::registry::SourceRegistry;
use crate::table::Table;
use crate::traits::TableStore;

/// Outcome of one update run
#[derive(Debug, Clone)]
pub struct UpdateSummary {
    /// Provider the hosts came from
    pub provider: String,
    /// Hosts reported by the source
    pub observed: usize,
    /// Names left after the name policy was applied
    pub mapped: usize,
    /// What the reconciliation changed
    pub changes: Vec<TableChange>,
    /// Whether the table was written back
    ///
    /// Only set when `changes` is non-empty. [`diff`] matches entries by
    /// (address, name), so a pass that only moves an entry to the end of
    /// the table (evicted and re-added within the same address) reports no
    /// change and the stored order is kept.
    pub saved: bool,
    /// The reconciled table
    pub table: Table,
}

impl UpdateSummary {
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }

    /// (added, removed, enabled)
    pub fn counts(&self) -> (usize, usize, usize) {
        self.changes
            .iter()
            .fold((0, 0, 0), |(a, r, e), change| match change {
                TableChange::Added(_) => (a + 1, r, e),
                TableChange::Removed(_) => (a, r + 1, e),
                TableChange::Enabled(_) => (a, r, e + 1),
            })
    }
}

/// Runs the load → fetch → reconcile → save pipeline
///
/// The registry is borrowed; it is built once by the caller and shared.
pub struct Updater<'a> {
    registry: &'a SourceRegistry,
    store: Box<dyn TableStore>,
    config: UpdaterConfig,
}

impl<'a> Updater<'a> {
    /// Create a new updater
    pub fn new(
        registry: &'a SourceRegistry,
        store: Box<dyn TableStore>,
        config: UpdaterConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    /// Update the table from the source described by `source`
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateSummary)`: The run completed (and saved, unless dry-run
    ///   or nothing changed)
    /// - `Err(Error)`: Source, load or save failure; nothing was written
    ///   unless the failure was in the save itself
    pub async fn update(&self, source: &SourceConfig) -> Result<UpdateSummary> {
        let snapshot_source = self.registry.create_source(source)?;

        let hosts = snapshot_source.get_hosts().await?;
        let observed = hosts.len();
        let mapping = self.config.name_policy.build_mapping(hosts);
        info!(
            "{} reported {} host(s), {} named",
            snapshot_source.source_name(),
            observed,
            mapping.len()
        );

        let before = self.store.load().await?;
        debug!(
            "Loaded {} entries from {} store",
            before.len(),
            self.store.store_name()
        );

        let mut table = before.clone();
        reconcile(&mapping, &mut table);
        let changes = diff(&before, &table);

        for change in &changes {
            info!("{}", change);
        }

        let saved = if self.config.dry_run {
            info!("Dry run: {} change(s) not saved", changes.len());
            false
        } else if changes.is_empty() {
            info!("Table already up to date");
            false
        } else {
            self.store.save(&table).await?;
            info!("Saved {} change(s)", changes.len());
            true
        };

        Ok(UpdateSummary {
            provider: source.provider.clone(),
            observed,
            mapped: mapping.len(),
            changes,
            saved,
            table,
        })
    }

    /// The store this updater writes to
    pub fn store(&self) -> &dyn TableStore {
        self.store.as_ref()
    }
}
