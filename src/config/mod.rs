//! Configuration module

use crate::dns::{ParallelSettings, DEFAULT_HOST_TIMEOUT, DEFAULT_MAX_CONCURRENCY};
use crate::models::{Protocol, VpnType};
use crate::provider::{Provider, ServerSelection};
use crate::publicip::ApiRegistry;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Log level
    pub log_level: String,

    /// VPN provider name
    pub provider: String,

    /// Outbound HTTP client
    pub http: HttpConfig,

    /// DNS upstream configuration
    pub dns: DnsConfig,

    /// Parallel resolution settings
    pub resolver: ResolverConfig,

    /// Server catalog source
    pub updater: UpdaterConfig,

    /// Server selection criteria
    pub selection: ServerSelection,

    /// Public IP lookup
    pub public_ip: PublicIpConfig,
}

impl Config {
    /// Load configuration from file (synchronous)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from file (async)
    pub async fn load_async<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_str(&content)
    }

    /// Load from string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.provider.parse::<Provider>()?;

        if self.http.timeout_secs == 0 {
            return Err(Error::config("http timeout-secs cannot be 0"));
        }
        if self.dns.timeout_secs == 0 {
            return Err(Error::config("dns timeout-secs cannot be 0"));
        }
        if self.resolver.max_concurrency == 0 {
            return Err(Error::config("resolver max-concurrency cannot be 0"));
        }
        if self.resolver.timeout_secs == 0 {
            return Err(Error::config("resolver timeout-secs cannot be 0"));
        }
        if !self.updater.archive_url.is_empty() && !self.updater.api_url.is_empty() {
            return Err(Error::config(
                "updater archive-url and api-url cannot both be set",
            ));
        }
        if self.selection.vpn == VpnType::Wireguard && self.selection.protocol == Some(Protocol::Tcp)
        {
            return Err(Error::config("wireguard only supports udp"));
        }
        if self.selection.port == Some(0) {
            return Err(Error::config("selection port cannot be 0"));
        }

        let registry = ApiRegistry::default();
        if self.public_ip.apis.is_empty() {
            return Err(Error::config("public-ip apis cannot be empty"));
        }
        for name in &self.public_ip.apis {
            registry.check(name)?;
        }

        Ok(())
    }

    /// Resolution settings for a batch of hosts
    pub fn parallel_settings(&self, hosts: Vec<String>) -> ParallelSettings {
        ParallelSettings {
            hosts,
            max_concurrency: self.resolver.max_concurrency,
            host_timeout: Duration::from_secs(self.resolver.timeout_secs),
            min_found: self.resolver.min_found,
            fail_early: self.resolver.fail_early,
        }
    }

    /// Save configuration to file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: "info".to_string(),
            provider: Provider::PrivateVpn.to_string(),
            http: HttpConfig::default(),
            dns: DnsConfig::default(),
            resolver: ResolverConfig::default(),
            updater: UpdaterConfig::default(),
            selection: ServerSelection::default(),
            public_ip: PublicIpConfig::default(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Request timeout
    pub timeout_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig { timeout_secs: 15 }
    }
}

/// DNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DnsConfig {
    /// Nameservers; empty uses the system configuration
    pub nameservers: Vec<String>,

    /// Query timeout
    pub timeout_secs: u64,

    /// Attempts per query
    pub attempts: usize,
}

impl Default for DnsConfig {
    fn default() -> Self {
        DnsConfig {
            nameservers: Vec::new(),
            timeout_secs: 5,
            attempts: 2,
        }
    }
}

/// Parallel resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    pub max_concurrency: usize,
    pub timeout_secs: u64,
    pub min_found: usize,
    pub fail_early: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_secs: DEFAULT_HOST_TIMEOUT.as_secs(),
            min_found: 0,
            fail_early: false,
        }
    }
}

/// Server catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UpdaterConfig {
    /// Zip archive of OpenVPN profiles
    pub archive_url: String,

    /// JSON server list endpoint
    pub api_url: String,

    /// Minimum number of servers a fetch must yield
    pub min_servers: usize,
}

/// Public IP lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PublicIpConfig {
    /// API names, tried in order
    pub apis: Vec<String>,

    /// API token, shared by the configured APIs
    pub token: String,
}

impl Default for PublicIpConfig {
    fn default() -> Self {
        PublicIpConfig {
            apis: vec!["ipinfo".to_string()],
            token: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.provider, "privatevpn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
log-level: debug
provider: HideMyAss
dns:
  nameservers:
    - 1.1.1.1
    - 9.9.9.9
resolver:
  max-concurrency: 8
  min-found: 2
updater:
  archive-url: "https://example.com/configs.zip"
  min-servers: 5
selection:
  protocol: tcp
  countries:
    - Sweden
public-ip:
  apis: [ipapi, ipinfo]
  token: abc
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.dns.nameservers.len(), 2);
        assert_eq!(config.resolver.max_concurrency, 8);
        assert_eq!(config.resolver.timeout_secs, 10);
        assert_eq!(config.updater.min_servers, 5);
        assert_eq!(config.selection.protocol, Some(Protocol::Tcp));
        assert_eq!(config.selection.countries, vec!["Sweden"]);
        assert_eq!(config.public_ip.apis, vec!["ipapi", "ipinfo"]);

        let settings = config.parallel_settings(vec!["a.example".to_string()]);
        assert_eq!(settings.max_concurrency, 8);
        assert_eq!(settings.min_found, 2);
    }

    #[test]
    fn test_config_rejects_unknown_names() {
        let err = Config::from_str("provider: nope\n").unwrap_err();
        assert!(matches!(err, Error::ProviderNotValid(_)));

        let err = Config::from_str("public-ip:\n  apis: [whatismyip]\n").unwrap_err();
        assert!(matches!(err, Error::ProviderNotValid(_)));
    }

    #[tokio::test]
    async fn test_config_save_and_load() {
        let path = std::env::temp_dir().join(format!("vpn-resolver-{}.yaml", std::process::id()));
        let mut config = Config::default();
        config.provider = "expressvpn".to_string();
        config.selection.countries = vec!["Japan".to_string()];
        config.save(&path).await.unwrap();

        let loaded = Config::load_async(&path).await.unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.provider, "expressvpn");
        assert_eq!(loaded.selection, config.selection);
        assert_eq!(loaded.public_ip.apis, vec!["ipinfo"]);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(Config::from_str("resolver:\n  max-concurrency: 0\n").is_err());
        assert!(Config::from_str("http:\n  timeout-secs: 0\n").is_err());
        assert!(Config::from_str("selection:\n  vpn: wireguard\n  protocol: tcp\n").is_err());
        assert!(Config::from_str(
            "updater:\n  archive-url: https://a.example/x.zip\n  api-url: https://a.example/servers\n"
        )
        .is_err());
    }

    #[test]
    fn test_config_rejects_zero_port_and_dns_timeout() {
        let err = Config::from_str("selection:\n  port: 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(Config::from_str("selection:\n  port: 1194\n").is_ok());

        let err = Config::from_str("dns:\n  timeout-secs: 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(Config::from_str("dns:\n  timeout-secs: 2\n").is_ok());
    }
}
