//! Server catalog fetchers

use super::ovpn::parse_remotes;
use super::unzip::Unzipper;
use crate::common::cancel::cancellable;
use crate::common::error::ResultExt;
use crate::common::http::redact_url;
use crate::common::Logger;
use crate::dns::{ParallelResolver, ParallelSettings};
use crate::models::{Protocol, Server, VpnType};
use crate::provider::Provider;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Source of candidate servers for a provider
#[async_trait]
pub trait ServerFetcher: Send + Sync {
    /// Fetch at least `min_servers` servers; 0 disables the threshold
    async fn fetch_servers(&self, cancel: &CancellationToken, min_servers: usize) -> Result<Vec<Server>>;
}

fn ensure_enough(found: usize, min_servers: usize) -> Result<()> {
    if found < min_servers {
        return Err(Error::NotEnoughServers {
            found,
            min: min_servers,
        });
    }
    Ok(())
}

/// Host collected from the profiles, before resolution
#[derive(Debug, Default)]
struct HostEntry {
    tcp_ports: BTreeSet<u16>,
    udp_ports: BTreeSet<u16>,
    tcp: bool,
    udp: bool,
    country: String,
}

impl HostEntry {
    /// Port pinned by the profiles, only when it is unambiguous
    fn port(&self) -> Option<u16> {
        let ports = match (self.tcp, self.udp) {
            (true, false) => &self.tcp_ports,
            (false, true) => &self.udp_ports,
            _ => return None,
        };
        if ports.len() == 1 {
            ports.iter().next().copied()
        } else {
            None
        }
    }
}

/// Builds the catalog from a zip archive of OpenVPN profiles.
///
/// Every `remote` host becomes a server; the parent directory of a profile
/// inside the archive, if any, is used as the server country.
pub struct ArchiveServerFetcher {
    provider: Provider,
    url: String,
    unzipper: Unzipper,
    resolver: Arc<ParallelResolver>,
    settings: ParallelSettings,
    logger: Arc<dyn Logger>,
}

impl ArchiveServerFetcher {
    /// `settings` carries the resolution policy; its host list is replaced
    /// by the hosts found in the archive
    pub fn new(
        provider: Provider,
        url: String,
        unzipper: Unzipper,
        resolver: Arc<ParallelResolver>,
        settings: ParallelSettings,
        logger: Arc<dyn Logger>,
    ) -> Self {
        ArchiveServerFetcher {
            provider,
            url,
            unzipper,
            resolver,
            settings,
            logger,
        }
    }

    fn collect_hosts(&self, contents: &super::Contents) -> BTreeMap<String, HostEntry> {
        let mut hosts: BTreeMap<String, HostEntry> = BTreeMap::new();

        // sorted so a host listed under several directories always gets the same country
        let mut names: Vec<&String> = contents.keys().collect();
        names.sort();

        for name in names {
            let data = &contents[name];
            if !name.ends_with(".ovpn") {
                continue;
            }
            let profile = String::from_utf8_lossy(data);
            let remotes = parse_remotes(&profile);
            if remotes.is_empty() {
                self.logger
                    .warn(&format!("no remote found in OpenVPN profile {}", name));
                continue;
            }

            let country = Path::new(name)
                .parent()
                .and_then(|p| p.file_name())
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();

            for remote in remotes {
                let entry = hosts.entry(remote.host).or_default();
                let ports = match remote.protocol {
                    Protocol::Tcp => {
                        entry.tcp = true;
                        &mut entry.tcp_ports
                    }
                    Protocol::Udp => {
                        entry.udp = true;
                        &mut entry.udp_ports
                    }
                };
                ports.extend(remote.port);
                if entry.country.is_empty() {
                    entry.country = country.clone();
                }
            }
        }

        hosts
    }
}

#[async_trait]
impl ServerFetcher for ArchiveServerFetcher {
    async fn fetch_servers(&self, cancel: &CancellationToken, min_servers: usize) -> Result<Vec<Server>> {
        let contents = self
            .unzipper
            .fetch_and_extract(cancel, &self.url)
            .await
            .context("fetching server archive")?;

        let hosts = self.collect_hosts(&contents);
        ensure_enough(hosts.len(), min_servers)?;

        let mut settings = self.settings.clone();
        settings.hosts = hosts.keys().cloned().collect();
        let resolution = self
            .resolver
            .resolve(cancel, &settings)
            .await
            .context("resolving server hosts")?;
        for warning in &resolution.warnings {
            self.logger.warn(warning);
        }

        // BTreeMap iteration keeps the output sorted by hostname
        let mut host_to_ips = resolution.host_to_ips;
        let servers: Vec<Server> = hosts
            .into_iter()
            .filter_map(|(hostname, entry)| {
                let ips = host_to_ips.remove(&hostname)?;
                Some(Server {
                    provider: self.provider.to_string(),
                    vpn: VpnType::OpenVpn,
                    hostname,
                    ips,
                    port: entry.port(),
                    tcp: entry.tcp,
                    udp: entry.udp,
                    country: entry.country,
                    ..Default::default()
                })
            })
            .collect();

        ensure_enough(servers.len(), min_servers)?;
        debug!("Fetched {} {} servers", servers.len(), self.provider);
        Ok(servers)
    }
}

/// Fetches the catalog from an HTTP endpoint returning a JSON server list.
///
/// Entries listed without addresses are resolved by hostname; entries that
/// still have no address afterwards are dropped with a warning.
pub struct ApiServerFetcher {
    provider: Provider,
    url: String,
    client: reqwest::Client,
    resolver: Arc<ParallelResolver>,
    settings: ParallelSettings,
    logger: Arc<dyn Logger>,
}

impl ApiServerFetcher {
    pub fn new(
        provider: Provider,
        url: String,
        client: reqwest::Client,
        resolver: Arc<ParallelResolver>,
        settings: ParallelSettings,
        logger: Arc<dyn Logger>,
    ) -> Self {
        ApiServerFetcher {
            provider,
            url,
            client,
            resolver,
            settings,
            logger,
        }
    }

    async fn resolve_missing(&self, cancel: &CancellationToken, servers: &mut Vec<Server>) -> Result<()> {
        let hosts: BTreeSet<String> = servers
            .iter()
            .filter(|s| s.addresses().is_empty() && !s.hostname.trim().is_empty())
            .map(|s| s.hostname.trim().to_string())
            .collect();

        if !hosts.is_empty() {
            let mut settings = self.settings.clone();
            settings.hosts = hosts.into_iter().collect();
            // the server count is checked against min_servers instead
            settings.min_found = 0;
            let resolution = self
                .resolver
                .resolve(cancel, &settings)
                .await
                .context("resolving server hosts")?;
            for warning in &resolution.warnings {
                self.logger.warn(warning);
            }
            for server in servers.iter_mut().filter(|s| s.ips.is_empty()) {
                if let Some(ips) = resolution.host_to_ips.get(server.hostname.trim()) {
                    server.ips = ips.clone();
                }
            }
        }

        servers.retain(|server| {
            let usable = !server.addresses().is_empty();
            if !usable {
                self.logger
                    .warn(&format!("server {:?} has no address, skipping it", server.hostname));
            }
            usable
        });
        Ok(())
    }
}

#[async_trait]
impl ServerFetcher for ApiServerFetcher {
    async fn fetch_servers(&self, cancel: &CancellationToken, min_servers: usize) -> Result<Vec<Server>> {
        let url = url::Url::parse(&self.url)
            .map_err(|e| Error::config(format!("invalid server list URL {:?}: {}", self.url, e)))?;
        let display_url = redact_url(&url);

        let body = cancellable(cancel, async {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(Error::BadHttpStatus {
                    url: display_url.clone(),
                    status,
                });
            }
            Ok(response.bytes().await?)
        })
        .await?;

        let mut servers: Vec<Server> =
            serde_json::from_slice(&body).map_err(|e| Error::decode("server list", e))?;
        ensure_enough(servers.len(), min_servers)?;

        self.resolve_missing(cancel, &mut servers).await?;
        ensure_enough(servers.len(), min_servers)?;

        for server in &mut servers {
            if server.provider.is_empty() {
                server.provider = self.provider.to_string();
            }
        }
        servers.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        debug!("Fetched {} {} servers", servers.len(), self.provider);
        Ok(servers)
    }
}

/// Fixed catalog, mostly useful for tests and pinned setups
pub struct StaticServerFetcher {
    servers: Vec<Server>,
}

impl StaticServerFetcher {
    pub fn new(servers: Vec<Server>) -> Self {
        StaticServerFetcher { servers }
    }
}

#[async_trait]
impl ServerFetcher for StaticServerFetcher {
    async fn fetch_servers(&self, cancel: &CancellationToken, min_servers: usize) -> Result<Vec<Server>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        ensure_enough(self.servers.len(), min_servers)?;
        Ok(self.servers.clone())
    }
}
