//! api.ip2location.io

use super::request::{
    endpoint, get_json, null_as_empty, optional_ip, requested_ip, string_or_number,
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

const BASE_URL: &str = "https://api.ip2location.io/";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Response {
    #[serde(deserialize_with = "optional_ip")]
    ip: Option<IpAddr>,
    #[serde(deserialize_with = "null_as_empty")]
    country_code: String,
    #[serde(deserialize_with = "null_as_empty")]
    country_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    region_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    city_name: String,
    #[serde(deserialize_with = "string_or_number")]
    latitude: String,
    #[serde(deserialize_with = "string_or_number")]
    longitude: String,
    #[serde(deserialize_with = "null_as_empty")]
    zip_code: String,
    #[serde(deserialize_with = "null_as_empty")]
    time_zone: String,
    #[serde(rename = "as", deserialize_with = "null_as_empty")]
    autonomous_system: String,
}

pub struct Ip2Location {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl Ip2Location {
    pub fn new(client: reqwest::Client, token: String) -> Self {
        Ip2Location {
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
impl PublicIpApi for Ip2Location {
    fn name(&self) -> &str {
        "ip2location"
    }

    async fn fetch_info(
        &self,
        cancel: &CancellationToken,
        _logger: &dyn Logger,
        ip: Option<IpAddr>,
    ) -> Result<PublicIp> {
        let ip = requested_ip(ip);
        let mut url = endpoint(&self.base_url)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(ip) = ip {
                query.append_pair("ip", &ip.to_string());
            }
            if !self.token.is_empty() {
                query.append_pair("key", &self.token);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let data: Response = get_json(
            &self.client,
            cancel,
            url,
            !self.token.is_empty(),
            "ip2location response",
        )
        .await?;

        let country = if data.country_code.is_empty() {
            data.country_name
        } else {
            data.country_code
        };

        Ok(PublicIp {
            ip: data.ip.or(ip),
            region: data.region_name,
            country: normalize_country(&country),
            city: data.city_name,
            hostname: String::new(),
            location: PublicIp::join_location(&data.latitude, &data.longitude),
            organization: data.autonomous_system,
            postal_code: data.zip_code,
            timezone: data.time_zone,
        })
    }
}
