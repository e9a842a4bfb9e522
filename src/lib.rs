//! VPN Resolver - VPN endpoint resolution and public IP lookup
//!
//! This crate turns a VPN provider's published server catalog into a single
//! connection endpoint, and reports what the outside world sees as our
//! public address:
//! - Server catalogs from a zip archive of OpenVPN profiles or a JSON API
//! - Bounded-concurrency hostname resolution with per-host warnings
//! - Filtered, reproducible connection selection with provider defaults
//! - Pluggable public IP APIs with normalized results
//!
//! # Architecture
//!
//! ```text
//!  +-------------+     +-------------+     +-------------+     +--------------+
//!  |  updater/   | --> |  updater/   | --> |    dns/     | --> |  provider/   |
//!  |   (unzip)   |     | (fetchers)  |     | (parallel)  |     | (selection)  |
//!  +-------------+     +-------------+     +-------------+     +--------------+
//!                                                                      |
//!                                                              Connection
//!
//!  +-------------+
//!  |  publicip/  |  independent, checks the exit address
//!  +-------------+
//! ```

pub mod common;
pub mod config;
pub mod constants;
pub mod dns;
pub mod models;
pub mod provider;
pub mod publicip;
pub mod updater;

pub use common::error::{Error, ErrorKind, Result};
pub use config::Config;

use common::error::ResultExt;
use common::{Logger, RandomSource, TracingLogger};
use dns::{HickoryLookup, HostLookup, ParallelResolver, Resolution};
use models::{Connection, PublicIp, Server};
use provider::{get_connection, Provider, ServerSelection};
use publicip::{ApiRegistry, ResilientFetcher};
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use updater::{ApiServerFetcher, ArchiveServerFetcher, ServerFetcher, Unzipper};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolver instance wiring the catalog, DNS and public IP components
pub struct VpnResolver {
    config: Config,
    provider: Provider,
    resolver: Arc<ParallelResolver>,
    fetcher: Option<Arc<dyn ServerFetcher>>,
    public_ip: ResilientFetcher,
    logger: Arc<dyn Logger>,
}

impl VpnResolver {
    /// Create a new resolver from configuration, using hickory for DNS
    pub fn new(config: Config) -> Result<Self> {
        let lookup = Arc::new(HickoryLookup::new(&config.dns)?);
        Self::with_parts(config, lookup, Arc::new(TracingLogger))
    }

    /// Create a resolver with an explicit DNS backend and logger
    pub fn with_parts(
        config: Config,
        lookup: Arc<dyn HostLookup>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self> {
        config.validate()?;
        info!("Initializing VPN Resolver v{}", VERSION);

        let provider: Provider = config.provider.parse()?;
        let client = common::http::build_client(config.http.timeout())?;
        let resolver = Arc::new(ParallelResolver::new(lookup));

        let fetcher: Option<Arc<dyn ServerFetcher>> = if !config.updater.archive_url.is_empty() {
            Some(Arc::new(ArchiveServerFetcher::new(
                provider,
                config.updater.archive_url.clone(),
                Unzipper::new(client.clone()),
                resolver.clone(),
                config.parallel_settings(Vec::new()),
                logger.clone(),
            )))
        } else if !config.updater.api_url.is_empty() {
            Some(Arc::new(ApiServerFetcher::new(
                provider,
                config.updater.api_url.clone(),
                client.clone(),
                resolver.clone(),
                config.parallel_settings(Vec::new()),
                logger.clone(),
            )))
        } else {
            None
        };

        let registry = ApiRegistry::default();
        let apis = config
            .public_ip
            .apis
            .iter()
            .map(|name| registry.create(name, client.clone(), config.public_ip.token.clone()))
            .collect::<Result<Vec<_>>>()?;
        debug!("Public IP APIs: {:?}", config.public_ip.apis);

        Ok(VpnResolver {
            config,
            provider,
            resolver,
            fetcher,
            public_ip: ResilientFetcher::new(apis),
            logger,
        })
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Fetch the provider's server catalog
    pub async fn fetch_servers(&self, cancel: &CancellationToken) -> Result<Vec<Server>> {
        let fetcher = self.fetcher.as_ref().ok_or_else(|| {
            Error::config("no server source configured: set updater archive-url or api-url")
        })?;
        fetcher
            .fetch_servers(cancel, self.config.updater.min_servers)
            .await
            .context(format!("fetching {} servers", self.provider))
    }

    /// Fetch the catalog and pick one connection matching `selection`
    pub async fn connect(
        &self,
        cancel: &CancellationToken,
        selection: &ServerSelection,
        rand_source: &mut dyn RandomSource,
    ) -> Result<Connection> {
        let servers = self.fetch_servers(cancel).await?;
        info!("Fetched {} {} servers", servers.len(), self.provider);

        get_connection(
            self.provider,
            &servers,
            selection,
            self.provider.connection_defaults(),
            rand_source,
        )
    }

    /// Resolve arbitrary hostnames with the configured policy
    pub async fn resolve_hosts(
        &self,
        cancel: &CancellationToken,
        hosts: Vec<String>,
    ) -> Result<Resolution> {
        let settings = self.config.parallel_settings(hosts);
        let resolution = self.resolver.resolve(cancel, &settings).await?;
        for warning in &resolution.warnings {
            self.logger.warn(warning);
        }
        Ok(resolution)
    }

    /// Public IP information for `ip`, or for ourselves when `None`
    pub async fn public_ip(
        &self,
        cancel: &CancellationToken,
        ip: Option<IpAddr>,
    ) -> Result<PublicIp> {
        self.public_ip
            .fetch_info(cancel, self.logger.as_ref(), ip)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::logger::MemoryLogger;
    use async_trait::async_trait;

    struct NoLookup;

    #[async_trait]
    impl HostLookup for NoLookup {
        async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
            Err(Error::dns(format!("no such host {}", host)))
        }
    }

    fn resolver(config: Config) -> Result<VpnResolver> {
        VpnResolver::with_parts(config, Arc::new(NoLookup), Arc::new(MemoryLogger::new()))
    }

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_missing_server_source() {
        let vpn = resolver(Config::default()).unwrap();
        let err = vpn
            .fetch_servers(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_public_ip_api() {
        let mut config = Config::default();
        config.public_ip.apis = vec!["ipinfo".to_string(), "nope".to_string()];
        let err = resolver(config).err().unwrap();
        assert_eq!(err.kind(), Some(ErrorKind::ProviderNotValid));
    }

    #[tokio::test]
    async fn test_resolve_hosts_warns() {
        let logger = Arc::new(MemoryLogger::new());
        let vpn = VpnResolver::with_parts(Config::default(), Arc::new(NoLookup), logger.clone())
            .unwrap();
        let resolution = vpn
            .resolve_hosts(&CancellationToken::new(), vec!["a.example".to_string()])
            .await
            .unwrap();
        assert!(resolution.host_to_ips.is_empty());
        assert_eq!(resolution.warnings.len(), 1);
        assert_eq!(
            logger.messages(crate::common::logger::Level::Warn),
            resolution.warnings
        );
    }
}
