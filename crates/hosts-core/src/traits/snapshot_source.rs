// # Snapshot Source Trait
//
// Defines the interface for observing which hosts a router or DHCP server
// knows about right now.
//
// ## Implementations
//
// - EdgeOS: `hosts-source-edgeos` crate
// - UniFi Dream Machine Pro: `hosts-source-udm` crate
//
// ## Usage
//
// ```rust,ignore
// use hosts_core::{NamePolicy, SnapshotSource};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* SnapshotSource implementation */;
//
//     let hosts = source.get_hosts().await?;
//     let mapping = NamePolicy::new().build_mapping(hosts);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::config::{FlagSpec, SourceConfig};
use crate::mapping::Host;

/// Trait for snapshot source implementations
///
/// A source performs one complete observation per call and returns every
/// host it saw. It does not name-normalise, deduplicate, or touch the
/// table; those belong to the caller.
///
/// Addresses that cannot be parsed are the source's problem: they must be
/// dropped (with a warning) rather than handed on.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Observe the hosts currently known to the server
    ///
    /// Hosts are returned in the order the source wants them applied; when
    /// two hosts share a name the later one wins.
    async fn get_hosts(&self) -> Result<Vec<Host>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Constructs a snapshot source and describes the flags it accepts
pub trait SnapshotSourceFactory: Send + Sync {
    /// Provider identifier used to select this source (e.g. "edgeos")
    fn id(&self) -> &'static str;

    /// One-line description for help output
    fn description(&self) -> &'static str;

    /// Flags this source understands
    fn flags(&self) -> &'static [FlagSpec];

    /// Create a source from already-validated configuration
    ///
    /// The registry checks `config` against [`flags`](Self::flags) before
    /// calling this, so every required flag is present.
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn SnapshotSource>, crate::Error>;
}
