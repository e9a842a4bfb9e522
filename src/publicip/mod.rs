//! Public IP information
//!
//! Each upstream API is a [`PublicIpApi`] plugin. Plugins are looked up by
//! name through an [`ApiRegistry`] and all produce the same normalized
//! [`PublicIp`] record. HTTP statuses are classified the same way for every
//! plugin:
//!
//! - 401 with a token supplied: `TokenNotValid`
//! - 403 or 429: `TooManyRequests`
//! - anything else but 200: `BadHttpStatus`
//! - undecodable body: `Decode`

mod ip2location;
mod ipapi;
mod ipinfo;
mod iplocation;
mod request;
mod resilient;

pub use ip2location::Ip2Location;
pub use ipapi::IpApi;
pub use ipinfo::IpInfo;
pub use iplocation::IpLocation;
pub use resilient::ResilientFetcher;

use crate::common::Logger;
use crate::models::PublicIp;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A public IP metadata API
#[async_trait]
pub trait PublicIpApi: Send + Sync {
    /// Registry identifier
    fn name(&self) -> &str;

    /// Look up `ip`, or the caller's own address when `ip` is `None` or
    /// unspecified
    async fn fetch_info(
        &self,
        cancel: &CancellationToken,
        logger: &dyn Logger,
        ip: Option<IpAddr>,
    ) -> Result<PublicIp>;
}

/// Builds an API from the shared HTTP client and a token (possibly empty)
pub type ApiConstructor = fn(reqwest::Client, String) -> Arc<dyn PublicIpApi>;

/// Name to constructor table
pub struct ApiRegistry {
    constructors: BTreeMap<&'static str, ApiConstructor>,
}

impl ApiRegistry {
    pub fn empty() -> Self {
        ApiRegistry {
            constructors: BTreeMap::new(),
        }
    }

    /// Register a constructor under a lowercase name
    pub fn register(&mut self, name: &'static str, constructor: ApiConstructor) {
        self.constructors.insert(name, constructor);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }

    fn lookup(&self, name: &str) -> Result<(&'static str, ApiConstructor)> {
        let wanted = name.trim().to_lowercase();
        self.constructors
            .iter()
            .find(|(registered, _)| **registered == wanted)
            .map(|(registered, constructor)| (*registered, *constructor))
            .ok_or_else(|| {
                let valid: Vec<String> = self.names().iter().map(|n| format!("{:?}", n)).collect();
                Error::provider_not_valid(format!(
                    "{:?} can only be one of {}",
                    name,
                    valid.join(", ")
                ))
            })
    }

    /// Canonical name for `name`, matched case-insensitively
    pub fn check(&self, name: &str) -> Result<&'static str> {
        self.lookup(name).map(|(registered, _)| registered)
    }

    pub fn create(
        &self,
        name: &str,
        client: reqwest::Client,
        token: String,
    ) -> Result<Arc<dyn PublicIpApi>> {
        let (_, constructor) = self.lookup(name)?;
        Ok(constructor(client, token))
    }
}

fn new_ipinfo(client: reqwest::Client, token: String) -> Arc<dyn PublicIpApi> {
    Arc::new(IpInfo::new(client, token))
}

fn new_ip2location(client: reqwest::Client, token: String) -> Arc<dyn PublicIpApi> {
    Arc::new(Ip2Location::new(client, token))
}

fn new_ipapi(client: reqwest::Client, token: String) -> Arc<dyn PublicIpApi> {
    Arc::new(IpApi::new(client, token))
}

fn new_iplocation(client: reqwest::Client, token: String) -> Arc<dyn PublicIpApi> {
    Arc::new(IpLocation::new(client, token))
}

impl Default for ApiRegistry {
    fn default() -> Self {
        let mut registry = ApiRegistry::empty();
        registry.register("ipinfo", new_ipinfo);
        registry.register("ip2location", new_ip2location);
        registry.register("ipapi", new_ipapi);
        registry.register("iplocation", new_iplocation);
        registry
    }
}
