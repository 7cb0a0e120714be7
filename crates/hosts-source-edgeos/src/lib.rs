// # EdgeOS Snapshot Source
//
// Reads the DHCP view of an EdgeRouter through the EdgeOS web UI API.
//
// ## Behaviour
//
// - One login per snapshot; the session cookie lives in the client's jar
// - Dynamic leases first, static mappings second, so a static mapping wins
//   a name collision once the name policy builds the mapping
// - Any failed request aborts the snapshot; nothing partial is returned
// - Lease or mapping addresses that do not parse are skipped with a warning
//
// ## Security
//
// - The password never appears in logs or `Debug` output
// - TLS verification is off unless `verify-tls` is set (routers ship
//   self-signed certificates)
//
// ## API Reference
//
// - Login: POST `/` (form: `username`, `password`)
// - Dynamic leases: GET `/api/edge/data.json?data=dhcp_leases`
// - Static mappings: GET `/api/edge/get.json`

use async_trait::async_trait;
use hosts_core::config::{FlagSpec, SourceConfig, base_url};
use hosts_core::traits::{SnapshotSource, SnapshotSourceFactory};
use hosts_core::{Error, HardwareAddr, Host, Result, SourceRegistry};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

/// Provider identifier
pub const PROVIDER: &str = "edgeos";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const DYNAMIC_HOSTS_PATH: &str = "/api/edge/data.json?data=dhcp_leases";
const STATIC_HOSTS_PATH: &str = "/api/edge/get.json";

/// Flags understood by the EdgeOS source
pub const FLAGS: &[FlagSpec] = &[
    FlagSpec::required("address", "the address of the edgeos server"),
    FlagSpec::required("username", "the username for the edgeos server"),
    FlagSpec::required("password", "the password for the edgeos server").secret(),
    FlagSpec::optional(
        "verify-tls",
        "verify the server's TLS certificate (default false)",
    ),
];

// Dynamic lease response

#[derive(Debug, Deserialize)]
struct LeasesResponse {
    output: LeasesOutput,
}

#[derive(Debug, Default, Deserialize)]
struct LeasesOutput {
    #[serde(rename = "dhcp-server-leases", default)]
    pools: BTreeMap<String, LeasePool>,
}

/// Leases of one DHCP pool, keyed by address
///
/// EdgeOS reports a pool without leases as a string (usually `""`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LeasePool {
    Leases(BTreeMap<String, Lease>),
    Empty(String),
}

#[derive(Debug, Deserialize)]
struct Lease {
    #[serde(rename = "client-hostname", default)]
    client_hostname: String,
    #[serde(default)]
    mac: Option<String>,
}

// Static mapping response

#[derive(Debug, Deserialize)]
struct ConfigResponse {
    #[serde(rename = "GET")]
    get: ConfigTree,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigTree {
    #[serde(default)]
    service: ServiceConfig,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceConfig {
    #[serde(rename = "dhcp-server", default)]
    dhcp_server: DhcpServerConfig,
}

#[derive(Debug, Default, Deserialize)]
struct DhcpServerConfig {
    #[serde(rename = "shared-network-name", default)]
    shared_networks: BTreeMap<String, SharedNetwork>,
}

#[derive(Debug, Default, Deserialize)]
struct SharedNetwork {
    #[serde(default)]
    subnet: BTreeMap<String, Subnet>,
}

#[derive(Debug, Default, Deserialize)]
struct Subnet {
    #[serde(rename = "static-mapping", default)]
    static_mappings: BTreeMap<String, StaticMapping>,
}

#[derive(Debug, Deserialize)]
struct StaticMapping {
    #[serde(rename = "ip-address", default)]
    ip_address: String,
    #[serde(rename = "mac-address", default)]
    mac_address: Option<String>,
}

/// Build a host, skipping unusable addresses
fn observed_host(name: &str, address: &str, mac: Option<&str>) -> Option<Host> {
    let address: IpAddr = match address.trim().parse() {
        Ok(address) => address,
        Err(_) => {
            tracing::warn!("Skipping {:?}: invalid address {:?}", name, address);
            return None;
        }
    };

    let mut host = Host::new(name, address);
    if let Some(mac) = mac.filter(|m| !m.is_empty()) {
        match mac.parse::<HardwareAddr>() {
            Ok(hardware) => host = host.with_hardware(hardware),
            Err(_) => tracing::debug!("Ignoring invalid MAC {:?} for {}", mac, name),
        }
    }
    Some(host)
}

fn lease_hosts(response: LeasesResponse) -> Vec<Host> {
    let mut hosts = Vec::new();
    for (pool, leases) in response.output.pools {
        let leases = match leases {
            LeasePool::Leases(leases) => leases,
            LeasePool::Empty(_) => {
                tracing::debug!("Pool {} has no leases", pool);
                continue;
            }
        };
        for (address, lease) in leases {
            hosts.extend(observed_host(
                &lease.client_hostname,
                &address,
                lease.mac.as_deref(),
            ));
        }
    }
    hosts
}

fn static_hosts(response: ConfigResponse) -> Vec<Host> {
    let mut hosts = Vec::new();
    for network in response.get.service.dhcp_server.shared_networks.into_values() {
        for subnet in network.subnet.into_values() {
            for (name, mapping) in subnet.static_mappings {
                hosts.extend(observed_host(
                    &name,
                    &mapping.ip_address,
                    mapping.mac_address.as_deref(),
                ));
            }
        }
    }
    hosts
}

/// EdgeOS snapshot source
///
/// # Security
///
/// The Debug implementation does NOT expose the password.
pub struct EdgeOsSource {
    base_url: String,
    username: String,
    /// ⚠️ NEVER log this value
    password: String,
    verify_tls: bool,
    client: reqwest::Client,
}

impl std::fmt::Debug for EdgeOsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeOsSource")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

impl EdgeOsSource {
    /// Create a new EdgeOS source
    ///
    /// # Parameters
    ///
    /// - `base_url`: Scheme and authority of the router (e.g. `https://192.168.1.1`)
    /// - `username`, `password`: Web UI credentials
    /// - `verify_tls`: Reject self-signed certificates
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        verify_tls: bool,
    ) -> Result<Self> {
        let password = password.into();
        if password.is_empty() {
            return Err(Error::config("EdgeOS password cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .cookie_store(true)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| Error::http(format!("could not build edgeos client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password,
            verify_tls,
            client,
        })
    }

    /// Open a web UI session
    ///
    /// EdgeOS answers a rejected login with the login page itself, so the
    /// status code is not a reliable signal; a missing session shows up as a
    /// failure of the next request.
    async fn login(&self) -> Result<()> {
        let url = format!("{}/", self.base_url);
        tracing::debug!("Logging in to {} as {}", url, self.username);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::source(format!("edgeos login request failed: {}", e)))?;

        tracing::debug!("Login answered with status {}", response.status());
        Ok(())
    }

    /// GET a JSON document, naming `what` in every error
    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Requesting {} from {}", what, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::source(format!("edgeos: could not get {}: {}", what, e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::provider(
                PROVIDER,
                format!(
                    "request for {} returned a non 200 status code \"{}\"",
                    what,
                    status.as_u16()
                ),
            ));
        }

        let body = response.text().await.map_err(|e| {
            Error::source(format!("edgeos: could not read response of {}: {}", what, e))
        })?;

        serde_json::from_str(&body).map_err(|e| {
            Error::provider(
                PROVIDER,
                format!("could not unmarshal response of {}: {}", what, e),
            )
        })
    }

    async fn dynamic_hosts(&self) -> Result<Vec<Host>> {
        let response: LeasesResponse = self.get_json(DYNAMIC_HOSTS_PATH, "dynamic hosts").await?;
        Ok(lease_hosts(response))
    }

    async fn static_hosts(&self) -> Result<Vec<Host>> {
        let response: ConfigResponse = self.get_json(STATIC_HOSTS_PATH, "static hosts").await?;
        Ok(static_hosts(response))
    }
}

#[async_trait]
impl SnapshotSource for EdgeOsSource {
    /// Log in, then read dynamic leases followed by static mappings
    async fn get_hosts(&self) -> Result<Vec<Host>> {
        self.login().await?;

        let mut hosts = self.dynamic_hosts().await?;
        let dynamic = hosts.len();
        hosts.extend(self.static_hosts().await?);

        tracing::info!(
            "EdgeOS reported {} lease(s) and {} static mapping(s)",
            dynamic,
            hosts.len() - dynamic
        );
        Ok(hosts)
    }

    fn source_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating EdgeOS sources
pub struct EdgeOsFactory;

impl SnapshotSourceFactory for EdgeOsFactory {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn description(&self) -> &'static str {
        "EdgeRouter DHCP leases and static mappings"
    }

    fn flags(&self) -> &'static [FlagSpec] {
        FLAGS
    }

    fn create(&self, config: &SourceConfig) -> Result<Box<dyn SnapshotSource>> {
        let verify_tls = config.flag_enabled("verify-tls", false)?;
        if !verify_tls {
            tracing::debug!("EdgeOS TLS certificate verification disabled");
        }

        Ok(Box::new(EdgeOsSource::new(
            base_url(config.required("address")?),
            config.required("username")?,
            config.required("password")?,
            verify_tls,
        )?))
    }
}

/// Register the EdgeOS source with a registry
///
/// # Example
///
/// ```rust
/// use hosts_core::SourceRegistry;
///
/// let mut registry = SourceRegistry::new();
/// hosts_source_edgeos::register(&mut registry);
/// assert!(registry.has_source("edgeos"));
/// ```
pub fn register(registry: &mut SourceRegistry) {
    registry.register(Box::new(EdgeOsFactory));
}
