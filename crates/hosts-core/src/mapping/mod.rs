//! Snapshot observations and the name → address mapping built from them
//!
//! Sources report [`Host`] observations. The caller turns them into a
//! [`Mapping`] through a [`NamePolicy`], which applies hardware-address
//! overrides and whitespace normalisation before the reconciler sees any
//! names.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::table::is_valid_name;

/// A MAC address, kept in canonical lowercase form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HardwareAddr([u8; 6]);

impl HardwareAddr {
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for HardwareAddr {
    type Err = Error;

    /// Accepts `aa:bb:cc:dd:ee:ff` and `aa-bb-cc-dd-ee-ff`, any case.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let separator = if s.contains('-') { '-' } else { ':' };
        let mut octets = [0u8; 6];
        let mut count = 0;

        for part in s.split(separator) {
            if count == octets.len() || part.len() != 2 {
                return Err(Error::invalid_input(format!(
                    "invalid hardware address {:?}",
                    s
                )));
            }
            octets[count] = u8::from_str_radix(part, 16).map_err(|_| {
                Error::invalid_input(format!("invalid hardware address {:?}", s))
            })?;
            count += 1;
        }

        if count != octets.len() {
            return Err(Error::invalid_input(format!(
                "invalid hardware address {:?}",
                s
            )));
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for HardwareAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HardwareAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One host as reported by a snapshot source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Name reported by the source (may be empty)
    pub name: String,
    /// Address currently leased or assigned
    pub address: IpAddr,
    /// Hardware address, when the source reports one
    pub hardware: Option<HardwareAddr>,
}

impl Host {
    pub fn new(name: impl Into<String>, address: IpAddr) -> Self {
        Self {
            name: name.into(),
            address,
            hardware: None,
        }
    }

    pub fn with_hardware(mut self, hardware: HardwareAddr) -> Self {
        self.hardware = Some(hardware);
        self
    }
}

/// Authoritative name → address snapshot
///
/// Names are unique keys; inserting an existing name replaces its address.
/// Iteration is in name order so that a reconciliation pass is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping {
    hosts: BTreeMap<String, IpAddr>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a name, returning the address it replaced
    pub fn insert(&mut self, name: impl Into<String>, address: IpAddr) -> Option<IpAddr> {
        self.hosts.insert(name.into(), address)
    }

    /// Merge another mapping into this one; `other` wins on shared names
    pub fn extend(&mut self, other: Mapping) {
        self.hosts.extend(other.hosts);
    }

    pub fn get(&self, name: &str) -> Option<&IpAddr> {
        self.hosts.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IpAddr)> {
        self.hosts.iter().map(|(name, address)| (name.as_str(), address))
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, IpAddr)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (N, IpAddr)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (name, address) in iter {
            mapping.insert(name, address);
        }
        mapping
    }
}

/// Caller-side naming rules applied before a mapping is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePolicy {
    /// Preferred names keyed by hardware address
    #[serde(default)]
    pub overrides: HashMap<HardwareAddr, String>,

    /// Replace whitespace inside names with `-`
    #[serde(default = "default_replace_whitespace")]
    pub replace_whitespace: bool,
}

fn default_replace_whitespace() -> bool {
    true
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
            replace_whitespace: default_replace_whitespace(),
        }
    }
}

impl NamePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hardware-address override
    pub fn with_override(mut self, hardware: HardwareAddr, name: impl Into<String>) -> Self {
        self.overrides.insert(hardware, name.into());
        self
    }

    /// Enable or disable whitespace replacement
    pub fn with_replace_whitespace(mut self, replace: bool) -> Self {
        self.replace_whitespace = replace;
        self
    }

    /// Parse `mac=name` override arguments into a policy
    pub fn from_override_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut policy = Self::new();
        for arg in args {
            let (hardware, name) = parse_override(arg.as_ref())?;
            policy.overrides.insert(hardware, name);
        }
        Ok(policy)
    }

    /// The name a host will be published under
    ///
    /// An override, when present, replaces the reported name; either one is
    /// then trimmed and, unless disabled, has its whitespace replaced.
    pub fn resolve_name(&self, host: &Host) -> String {
        let raw = host
            .hardware
            .and_then(|hw| self.overrides.get(&hw))
            .unwrap_or(&host.name);

        if self.replace_whitespace {
            raw.trim()
                .chars()
                .map(|c| if c.is_whitespace() { '-' } else { c })
                .collect()
        } else {
            raw.clone()
        }
    }

    /// Build the mapping handed to the reconciler
    ///
    /// Hosts are applied in order, so a later host wins a name collision.
    /// Hosts whose resolved name is empty, or cannot be written as a single
    /// hosts-file field, are dropped.
    pub fn build_mapping<I>(&self, hosts: I) -> Mapping
    where
        I: IntoIterator<Item = Host>,
    {
        let mut mapping = Mapping::new();
        for host in hosts {
            let name = self.resolve_name(&host);
            if name.is_empty() {
                tracing::debug!("Dropping unnamed host at {}", host.address);
                continue;
            }
            if !is_valid_name(&name) {
                tracing::warn!(
                    "Dropping host {:?} at {}: name contains whitespace or '#'",
                    name,
                    host.address
                );
                continue;
            }
            if let Some(previous) = mapping.insert(name.clone(), host.address) {
                if previous != host.address {
                    tracing::debug!(
                        "{} reported at {} and {}, keeping {}",
                        name,
                        previous,
                        host.address,
                        host.address
                    );
                }
            }
        }
        mapping
    }
}

/// Parse one `mac=name` override argument
pub fn parse_override(raw: &str) -> Result<(HardwareAddr, String)> {
    let parts: Vec<&str> = raw.split('=').collect();
    if parts.len() != 2 {
        return Err(Error::config(format!(
            "MAC override {:?} was not properly formatted as mac=overridden-hostname",
            raw
        )));
    }

    let hardware: HardwareAddr = parts[0]
        .parse()
        .map_err(|e| Error::config(format!("MAC override {:?}: {}", raw, e)))?;

    let name = parts[1].trim();
    if name.is_empty() {
        return Err(Error::config(format!(
            "MAC override {:?} has an empty hostname",
            raw
        )));
    }
    if name.contains('#') {
        return Err(Error::config(format!(
            "MAC override {:?} has a '#' in its hostname",
            raw
        )));
    }

    Ok((hardware, name.to_string()))
}
