//! ipapi.co

use super::request::{
    endpoint, get_json, null_as_empty, optional_ip, push_segments, requested_ip,
    string_or_number,
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

const BASE_URL: &str = "https://ipapi.co/";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Response {
    #[serde(deserialize_with = "optional_ip")]
    ip: Option<IpAddr>,
    #[serde(deserialize_with = "null_as_empty")]
    region: String,
    #[serde(deserialize_with = "null_as_empty")]
    country_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    city: String,
    #[serde(deserialize_with = "null_as_empty")]
    hostname: String,
    #[serde(deserialize_with = "string_or_number")]
    latitude: String,
    #[serde(deserialize_with = "string_or_number")]
    longitude: String,
    #[serde(deserialize_with = "null_as_empty")]
    org: String,
    #[serde(deserialize_with = "null_as_empty")]
    postal: String,
    #[serde(deserialize_with = "null_as_empty")]
    timezone: String,
}

pub struct IpApi {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl IpApi {
    pub fn new(client: reqwest::Client, token: String) -> Self {
        IpApi {
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
impl PublicIpApi for IpApi {
    fn name(&self) -> &str {
        "ipapi"
    }

    /// `GET /<ip>/json/`, or `GET /json/` for the caller's own address
    async fn fetch_info(
        &self,
        cancel: &CancellationToken,
        _logger: &dyn Logger,
        ip: Option<IpAddr>,
    ) -> Result<PublicIp> {
        let ip = requested_ip(ip);
        let mut url = endpoint(&self.base_url)?;
        match ip {
            Some(ip) => push_segments(&mut url, &[&ip.to_string(), "json", ""])?,
            None => push_segments(&mut url, &["json", ""])?,
        }
        if !self.token.is_empty() {
            url.query_pairs_mut().append_pair("key", &self.token);
        }

        let data: Response =
            get_json(&self.client, cancel, url, !self.token.is_empty(), "ipapi response").await?;

        Ok(PublicIp {
            ip: data.ip.or(ip),
            region: data.region,
            country: normalize_country(&data.country_name),
            city: data.city,
            hostname: data.hostname,
            location: PublicIp::join_location(&data.latitude, &data.longitude),
            organization: data.org,
            postal_code: data.postal,
            timezone: data.timezone,
        })
    }
}
