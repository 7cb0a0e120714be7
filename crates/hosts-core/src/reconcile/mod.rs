//! Reconciliation of a [`Mapping`] into a [`Table`]
//!
//! For every named address in the mapping:
//!
//! - an entry with that address and the same name (case-insensitive) is
//!   kept and re-enabled if it was disabled;
//! - entries with that address under any other name are removed;
//! - if no entry with the same name existed, a new enabled entry is
//!   appended.
//!
//! Addresses that do not appear in the mapping are never touched. The pass
//! is pure, silent and idempotent; callers that want to report what
//! happened compare the table before and after with [`diff`].

use std::collections::HashMap;
use std::net::IpAddr;

use crate::mapping::Mapping;
use crate::table::{Entry, Table};

/// Bring `table` in line with `mapping`
pub fn reconcile(mapping: &Mapping, table: &mut Table) {
    for (name, address) in mapping.iter() {
        if name.is_empty() {
            continue;
        }
        reconcile_address(name, *address, table);
    }
}

/// Apply one `(name, address)` pair
///
/// Matches are decided against the table as it stands before any change
/// for this address; removal then goes by (address, non-matching name)
/// rather than by position, so no entry is skipped or visited twice.
fn reconcile_address(name: &str, address: IpAddr, table: &mut Table) {
    if !table.contains_address(&address) {
        table.push(Entry::new(name, address));
        return;
    }

    let found = table.filter_by_address(&address).any(|e| e.has_name(name));

    for entry in table.entries_mut() {
        if entry.address == address && entry.has_name(name) && !entry.enabled {
            entry.enabled = true;
        }
    }

    table.retain(|e| e.address != address || e.has_name(name));

    if !found {
        table.push(Entry::new(name, address));
    }
}

/// A single observable difference between two tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableChange {
    /// Entry present only in the new table
    Added(Entry),
    /// Entry present only in the old table
    Removed(Entry),
    /// Entry present in both, disabled before and enabled now
    Enabled(Entry),
}

impl std::fmt::Display for TableChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableChange::Added(e) => write!(f, "+ {} {}", e.address, e.name),
            TableChange::Removed(e) => write!(f, "- {} {}", e.address, e.name),
            TableChange::Enabled(e) => write!(f, "~ {} {} (enabled)", e.address, e.name),
        }
    }
}

/// Compare two tables entry by entry
///
/// Entries are keyed by (address, lowercased name). Removals are listed
/// first in `before` order, then additions and enable transitions in
/// `after` order.
pub fn diff(before: &Table, after: &Table) -> Vec<TableChange> {
    fn key(e: &Entry) -> (IpAddr, String) {
        (e.address, e.name.to_lowercase())
    }

    let mut remaining: HashMap<(IpAddr, String), Vec<&Entry>> = HashMap::new();
    for entry in before {
        remaining.entry(key(entry)).or_default().push(entry);
    }

    let mut changes = Vec::new();
    let mut later = Vec::new();

    for entry in after {
        let matched = remaining
            .get_mut(&key(entry))
            .and_then(|candidates| {
                if candidates.is_empty() {
                    None
                } else {
                    Some(candidates.remove(0))
                }
            });

        match matched {
            Some(old) if !old.enabled && entry.enabled => {
                later.push(TableChange::Enabled(entry.clone()));
            }
            Some(_) => {}
            None => later.push(TableChange::Added(entry.clone())),
        }
    }

    for entry in before {
        if let Some(candidates) = remaining.get_mut(&key(entry)) {
            if let Some(pos) = candidates.iter().position(|c| std::ptr::eq(*c, entry)) {
                candidates.remove(pos);
                changes.push(TableChange::Removed(entry.clone()));
            }
        }
    }

    changes.extend(later);
    changes
}
