//! ipinfo.io

use super::request::{
    endpoint, get_json, null_as_empty, optional_ip, push_segments, requested_ip,
};
use super::PublicIpApi;
use crate::common::Logger;
use crate::constants::normalize_country;
use crate::models::PublicIp;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://ipinfo.io/";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Response {
    #[serde(deserialize_with = "optional_ip")]
    ip: Option<IpAddr>,
    #[serde(deserialize_with = "null_as_empty")]
    hostname: String,
    #[serde(deserialize_with = "null_as_empty")]
    city: String,
    #[serde(deserialize_with = "null_as_empty")]
    region: String,
    /// Two letter country code
    #[serde(deserialize_with = "null_as_empty")]
    country: String,
    #[serde(deserialize_with = "null_as_empty")]
    loc: String,
    #[serde(deserialize_with = "null_as_empty")]
    org: String,
    #[serde(deserialize_with = "null_as_empty")]
    postal: String,
    #[serde(deserialize_with = "null_as_empty")]
    timezone: String,
}

pub struct IpInfo {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl IpInfo {
    pub fn new(client: reqwest::Client, token: String) -> Self {
        IpInfo {
            client,
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PublicIpApi for IpInfo {
    fn name(&self) -> &str {
        "ipinfo"
    }

    async fn fetch_info(
        &self,
        cancel: &CancellationToken,
        _logger: &dyn Logger,
        ip: Option<IpAddr>,
    ) -> Result<PublicIp> {
        let ip = requested_ip(ip);
        let mut url = endpoint(&self.base_url)?;
        if let Some(ip) = ip {
            push_segments(&mut url, &[&ip.to_string()])?;
        }
        if !self.token.is_empty() {
            url.query_pairs_mut().append_pair("token", &self.token);
        }

        let data: Response =
            get_json(&self.client, cancel, url, !self.token.is_empty(), "ipinfo response").await?;

        Ok(PublicIp {
            ip: data.ip.or(ip),
            region: data.region,
            country: normalize_country(&data.country),
            city: data.city,
            hostname: data.hostname,
            location: data.loc,
            organization: data.org,
            postal_code: data.postal,
            timezone: data.timezone,
        })
    }
}
