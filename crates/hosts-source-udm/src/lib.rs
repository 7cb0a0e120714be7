// # UDM Pro Snapshot Source
//
// Reads the active clients of a UniFi Dream Machine Pro through the UniFi
// OS network application.
//
// ## Behaviour
//
// - Login with a JSON body; a rejected login is an authentication error
// - The site comes from the `site` flag, or the first site the controller
//   reports
// - A client without a hostname is named after its display name
// - A client with an unparseable MAC aborts the snapshot
// - Clients without a usable IP (offline, IPv6-only reservations) are
//   skipped with a warning
//
// ## API Reference
//
// - Login: POST `/api/auth/login` (`{"username": .., "password": ..}`)
// - Sites: GET `/proxy/network/api/self/sites`
// - Clients: GET `/proxy/network/v2/api/site/{site}/clients/active`

use async_trait::async_trait;
use hosts_core::config::{FlagSpec, SourceConfig, base_url};
use hosts_core::traits::{SnapshotSource, SnapshotSourceFactory};
use hosts_core::{Error, HardwareAddr, Host, Result, SourceRegistry};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::time::Duration;

/// Provider identifier
pub const PROVIDER: &str = "udm-pro";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Flags understood by the UDM Pro source
pub const FLAGS: &[FlagSpec] = &[
    FlagSpec::required("address", "the address of the udm pro"),
    FlagSpec::required("username", "the username for the udm pro"),
    FlagSpec::required("password", "the password for the udm pro").secret(),
    FlagSpec::optional(
        "site",
        "the network site to read clients from (default: first site)",
    ),
    FlagSpec::optional(
        "verify-tls",
        "verify the server's TLS certificate (default false)",
    ),
];

#[derive(Debug, Deserialize)]
struct SitesResponse {
    #[serde(default)]
    data: Vec<Site>,
}

#[derive(Debug, Deserialize)]
struct Site {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ActiveClient {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    mac: String,
}

fn client_hosts(clients: Vec<ActiveClient>) -> Result<Vec<Host>> {
    let mut hosts = Vec::with_capacity(clients.len());

    for client in clients {
        let hardware: HardwareAddr = client.mac.parse().map_err(|e| {
            Error::provider(
                PROVIDER,
                format!("client {:?} has an invalid MAC: {}", client.display_name, e),
            )
        })?;

        let name = if client.hostname.is_empty() {
            client.display_name
        } else {
            client.hostname
        };

        let Some(raw_ip) = client.ip.filter(|ip| !ip.is_empty()) else {
            tracing::warn!("Skipping {:?} ({}): no IP address", name, hardware);
            continue;
        };
        let Ok(address) = raw_ip.parse::<IpAddr>() else {
            tracing::warn!("Skipping {:?} ({}): invalid IP {:?}", name, hardware, raw_ip);
            continue;
        };

        hosts.push(Host::new(name, address).with_hardware(hardware));
    }

    Ok(hosts)
}

/// UDM Pro snapshot source
///
/// The Debug implementation does NOT expose the password.
pub struct UdmProSource {
    base_url: String,
    username: String,
    password: String,
    site: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for UdmProSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdmProSource")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("site", &self.site)
            .finish()
    }
}

impl UdmProSource {
    /// Create a new UDM Pro source
    ///
    /// `site` of `None` means the first site the controller reports.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        site: Option<String>,
        verify_tls: bool,
    ) -> Result<Self> {
        let password = password.into();
        if password.is_empty() {
            return Err(Error::config("UDM Pro password cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .cookie_store(true)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| Error::http(format!("could not build udm pro client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password,
            site,
            client,
        })
    }

    async fn login(&self) -> Result<()> {
        let url = format!("{}/api/auth/login", self.base_url);
        tracing::debug!("Logging in to {} as {}", url, self.username);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|e| Error::source(format!("udm pro login request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::auth(format!(
                "udm pro rejected login for {} with status {}",
                self.username,
                status.as_u16()
            )));
        }
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Requesting {} from {}", what, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::source(format!("udm pro: could not get {}: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => Error::auth(format!(
                    "request for {} was refused with status {}",
                    what,
                    status.as_u16()
                )),
                code => Error::provider(
                    PROVIDER,
                    format!("request for {} returned status code \"{}\"", what, code),
                ),
            });
        }

        let body = response.text().await.map_err(|e| {
            Error::source(format!("udm pro: could not read response of {}: {}", what, e))
        })?;

        serde_json::from_str(&body).map_err(|e| {
            Error::provider(
                PROVIDER,
                format!("could not unmarshal response of {}: {}", what, e),
            )
        })
    }

    async fn resolve_site(&self) -> Result<String> {
        if let Some(ref site) = self.site {
            tracing::debug!("Using configured site {}", site);
            return Ok(site.clone());
        }

        let sites: SitesResponse = self
            .get_json("/proxy/network/api/self/sites", "sites")
            .await?;
        let site = sites
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::provider(PROVIDER, "controller reported no sites"))?;

        tracing::debug!("Using first reported site {}", site.name);
        Ok(site.name)
    }
}

#[async_trait]
impl SnapshotSource for UdmProSource {
    async fn get_hosts(&self) -> Result<Vec<Host>> {
        self.login().await?;
        let site = self.resolve_site().await?;

        let path = format!("/proxy/network/v2/api/site/{}/clients/active", site);
        let clients: Vec<ActiveClient> = self.get_json(&path, "active clients").await?;
        let reported = clients.len();

        let hosts = client_hosts(clients)?;
        tracing::info!(
            "UDM Pro site {} reported {} active client(s), {} with an address",
            site,
            reported,
            hosts.len()
        );
        Ok(hosts)
    }

    fn source_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating UDM Pro sources
pub struct UdmProFactory;

impl SnapshotSourceFactory for UdmProFactory {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn description(&self) -> &'static str {
        "UniFi Dream Machine Pro active clients"
    }

    fn flags(&self) -> &'static [FlagSpec] {
        FLAGS
    }

    fn create(&self, config: &SourceConfig) -> Result<Box<dyn SnapshotSource>> {
        Ok(Box::new(UdmProSource::new(
            base_url(config.required("address")?),
            config.required("username")?,
            config.required("password")?,
            config.optional("site").map(str::to_string),
            config.flag_enabled("verify-tls", false)?,
        )?))
    }
}

/// Register the UDM Pro source with a registry
pub fn register(registry: &mut SourceRegistry) {
    registry.register(Box::new(UdmProFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clients(json: &str) -> Vec<ActiveClient> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_hostname_falls_back_to_display_name() {
        let hosts = client_hosts(clients(
            r#"[
                {"display_name": "Living Room TV", "ip": "192.168.1.30", "hostname": "", "mac": "aa:bb:cc:dd:ee:01"},
                {"display_name": "Laptop", "ip": "192.168.1.31", "hostname": "work-laptop", "mac": "aa:bb:cc:dd:ee:02"}
            ]"#,
        ))
        .unwrap();

        let names: Vec<&str> = hosts.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Living Room TV", "work-laptop"]);
        assert_eq!(
            hosts[0].hardware,
            Some("aa:bb:cc:dd:ee:01".parse().unwrap())
        );
    }

    #[test]
    fn test_invalid_mac_is_an_error() {
        let result = client_hosts(clients(
            r#"[{"display_name": "Broken", "ip": "192.168.1.30", "hostname": "broken", "mac": "not-a-mac"}]"#,
        ));

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn test_clients_without_ip_are_skipped() {
        let hosts = client_hosts(clients(
            r#"[
                {"display_name": "Offline", "hostname": "offline", "mac": "aa:bb:cc:dd:ee:01"},
                {"display_name": "Odd", "ip": "", "hostname": "odd", "mac": "aa:bb:cc:dd:ee:02"},
                {"display_name": "Garbled", "ip": "300.1.1.1", "hostname": "garbled", "mac": "aa:bb:cc:dd:ee:03"}
            ]"#,
        ))
        .unwrap();

        assert!(hosts.is_empty());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let hosts = client_hosts(clients(
            r#"[{"display_name": "NAS", "ip": "192.168.1.20", "hostname": "nas",
                 "mac": "AA-BB-CC-DD-EE-04", "oui": "Synology", "uptime": 1234}]"#,
        ))
        .unwrap();

        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].address, "192.168.1.20".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_password_not_exposed_in_debug() {
        let source = UdmProSource::new(
            "https://192.168.1.1",
            "admin",
            "secret_password_123",
            None,
            false,
        )
        .unwrap();

        let debug_str = format!("{:?}", source);
        assert!(!debug_str.contains("secret_password_123"));
        assert!(debug_str.contains("UdmProSource"));
    }

    #[test]
    fn test_factory_flags() {
        let factory = UdmProFactory;
        assert_eq!(factory.id(), "udm-pro");

        let required: Vec<&str> = factory
            .flags()
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        assert_eq!(required, vec!["address", "username", "password"]);
    }
}
