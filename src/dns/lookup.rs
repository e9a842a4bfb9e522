//! Single-host lookup backends

use crate::config::DnsConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::debug;

/// Resolves one hostname to its addresses
#[async_trait]
pub trait HostLookup: Send + Sync {
    /// Addresses for `host`; an empty answer is an error
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>>;
}

/// Lookup backed by hickory, using either the system configuration or
/// an explicit nameserver list
pub struct HickoryLookup {
    resolver: TokioAsyncResolver,
}

impl HickoryLookup {
    /// Create new lookup from config
    pub fn new(config: &DnsConfig) -> Result<Self> {
        let resolver = Self::build_resolver(config)?;
        Ok(HickoryLookup { resolver })
    }

    /// Build resolver from nameserver list
    fn build_resolver(config: &DnsConfig) -> Result<TokioAsyncResolver> {
        if config.nameservers.is_empty() {
            // Use system default
            let resolver = TokioAsyncResolver::tokio_from_system_conf()
                .map_err(|e| Error::dns(format!("Failed to create system resolver: {}", e)))?;
            return Ok(resolver);
        }

        let mut resolver_config = ResolverConfig::new();
        for ns in &config.nameservers {
            let ns_config = Self::parse_nameserver(ns)
                .ok_or_else(|| Error::config(format!("invalid nameserver {:?}", ns)))?;
            resolver_config.add_name_server(ns_config);
        }

        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(config.timeout_secs);
        opts.attempts = config.attempts;
        opts.rotate = true;

        Ok(TokioAsyncResolver::tokio(resolver_config, opts))
    }

    /// Parse nameserver string
    fn parse_nameserver(ns: &str) -> Option<NameServerConfig> {
        // Handle different formats:
        // - 1.1.1.1
        // - 1.1.1.1:53
        // - tls://1.1.1.1#cloudflare-dns.com

        if let Some(rest) = ns.strip_prefix("tls://") {
            let (addr, name) = match rest.split_once('#') {
                Some((addr, name)) => (addr, name.to_string()),
                None => (rest, rest.split(':').next()?.to_string()),
            };
            let socket_addr = parse_socket_addr(addr, 853)?;
            return Some(NameServerConfig {
                socket_addr,
                protocol: Protocol::Tls,
                tls_dns_name: Some(name),
                trust_negative_responses: true,
                bind_addr: None,
                tls_config: None,
            });
        }

        // Plain UDP
        Some(NameServerConfig {
            socket_addr: parse_socket_addr(ns, 53)?,
            protocol: Protocol::Udp,
            tls_dns_name: None,
            trust_negative_responses: true,
            bind_addr: None,
            tls_config: None,
        })
    }
}

fn parse_socket_addr(s: &str, default_port: u16) -> Option<SocketAddr> {
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Some(addr);
    }
    let ip: IpAddr = s.parse().ok()?;
    Some(SocketAddr::new(ip, default_port))
}

#[async_trait]
impl HostLookup for HickoryLookup {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        // Check if it's already an IP
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let response = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| Error::dns(format!("resolving {}: {}", host, e)))?;

        let ips: Vec<IpAddr> = response.iter().collect();
        if ips.is_empty() {
            return Err(Error::dns(format!("no IP found for {}", host)));
        }

        debug!("DNS {} -> {:?}", host, ips);
        Ok(ips)
    }
}
