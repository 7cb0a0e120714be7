//! Test doubles and common utilities for pipeline contract tests
//!
//! This module provides minimal test doubles that record how the updater
//! uses its collaborators.

#![allow(dead_code)]

use hosts_core::error::{Error, Result};
use hosts_core::{
    Entry, FlagSpec, Host, SnapshotSource, SnapshotSourceFactory, SourceConfig, SourceRegistry,
    Table, TableStore,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test address")
}

/// What a scripted source returns from `get_hosts`
#[derive(Clone)]
pub enum Script {
    Hosts(Vec<Host>),
    Fail(&'static str),
}

/// A snapshot source that replays a script
pub struct ScriptedSource {
    script: Script,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl SnapshotSource for ScriptedSource {
    async fn get_hosts(&self) -> Result<Vec<Host>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Hosts(hosts) => Ok(hosts.clone()),
            Script::Fail(message) => Err(Error::provider("scripted", *message)),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

const SCRIPTED_FLAGS: &[FlagSpec] = &[
    FlagSpec::required("address", "the address of the scripted server"),
    FlagSpec::optional("password", "unused").secret(),
];

/// Factory for [`ScriptedSource`], sharing a call counter with the test
pub struct ScriptedFactory {
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl SnapshotSourceFactory for ScriptedFactory {
    fn id(&self) -> &'static str {
        "scripted"
    }

    fn description(&self) -> &'static str {
        "Replays canned hosts"
    }

    fn flags(&self) -> &'static [FlagSpec] {
        SCRIPTED_FLAGS
    }

    fn create(&self, _config: &SourceConfig) -> Result<Box<dyn SnapshotSource>> {
        Ok(Box::new(ScriptedSource {
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

/// Registry holding one scripted source, plus its call counter
pub fn scripted_registry(script: Script) -> (SourceRegistry, Arc<AtomicUsize>) {
    let factory = ScriptedFactory::new(script);
    let calls = factory.calls();
    (SourceRegistry::new().with_source(Box::new(factory)), calls)
}

/// Source configuration that satisfies the scripted source
pub fn scripted_config() -> SourceConfig {
    SourceConfig::new("scripted").with_flag("address", "10.0.0.254")
}

/// A table store that counts calls and can be told to fail
#[derive(Clone)]
pub struct RecordingStore {
    table: Arc<std::sync::Mutex<Table>>,
    fail_load: bool,
    load_count: Arc<AtomicUsize>,
    save_count: Arc<AtomicUsize>,
}

impl RecordingStore {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            table: Arc::new(std::sync::Mutex::new(Table::from_entries(entries))),
            fail_load: false,
            load_count: Arc::new(AtomicUsize::new(0)),
            save_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn table(&self) -> Table {
        self.table.lock().unwrap().clone()
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TableStore for RecordingStore {
    async fn load(&self) -> Result<Table> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(Error::store("disk on fire"));
        }
        Ok(self.table.lock().unwrap().clone())
    }

    async fn save(&self, table: &Table) -> Result<()> {
        self.save_count.fetch_add(1, Ordering::SeqCst);
        *self.table.lock().unwrap() = table.clone();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}
