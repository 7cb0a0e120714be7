//! The local name-resolution table
//!
//! A [`Table`] is an ordered list of [`Entry`] rows. Order is insertion
//! order and only changes when an entry is removed.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// One row of the persisted resolution table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Hostname, stored with the casing it was first written with
    pub name: String,
    /// Address the name resolves to
    pub address: IpAddr,
    /// Disabled entries are kept in the table but do not resolve
    pub enabled: bool,
}

impl Entry {
    /// Create an enabled entry
    pub fn new(name: impl Into<String>, address: IpAddr) -> Self {
        Self {
            name: name.into(),
            address,
            enabled: true,
        }
    }

    /// Create a disabled entry
    pub fn disabled(name: impl Into<String>, address: IpAddr) -> Self {
        Self {
            enabled: false,
            ..Self::new(name, address)
        }
    }

    /// Case-insensitive hostname comparison
    pub fn has_name(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

/// Hostnames are compared case-insensitively everywhere in this crate.
pub fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Whether `name` can be written as a single hosts-file field
///
/// Whitespace separates names and `#` starts a comment, so a name holding
/// either would read back as something else.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c == '#')
}

/// Ordered collection of entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    entries: Vec<Entry>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from entries, keeping their order
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// All entries in table order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Consume the table, returning its entries
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry points at `address`
    pub fn contains_address(&self, address: &IpAddr) -> bool {
        self.entries.iter().any(|e| &e.address == address)
    }

    /// Every entry pointing at `address`, in table order
    pub fn filter_by_address<'a>(
        &'a self,
        address: &'a IpAddr,
    ) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries.iter().filter(move |e| &e.address == address)
    }

    /// Append an entry at the end of the table
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub(crate) fn entries_mut(&mut self) -> std::slice::IterMut<'_, Entry> {
        self.entries.iter_mut()
    }

    pub(crate) fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Entry) -> bool,
    {
        self.entries.retain(keep);
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<Entry> for Table {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
