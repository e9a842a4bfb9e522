//! api.iplocation.net
//!
//! The lookup endpoint needs an explicit address, so the caller's own
//! address is first discovered with `?cmd=get-ip`. The discovered address
//! is never kept between calls.

use super::request::{endpoint, get_json, null_as_empty, optional_ip, requested_ip};
use super::PublicIpApi;
use crate::common::Logger;
use crate::constants::normalize_country;
use crate::models::PublicIp;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::de::Error as _;
use serde::Deserialize;
use std::net::IpAddr;
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://api.iplocation.net/";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SelfIpResponse {
    #[serde(deserialize_with = "optional_ip")]
    ip: Option<IpAddr>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Response {
    #[serde(deserialize_with = "optional_ip")]
    ip: Option<IpAddr>,
    #[serde(deserialize_with = "null_as_empty")]
    country_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    country_code2: String,
    #[serde(deserialize_with = "null_as_empty")]
    isp: String,
}

pub struct IpLocation {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl IpLocation {
    pub fn new(client: reqwest::Client, token: String) -> Self {
        IpLocation {
            client,
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn self_ip(&self, cancel: &CancellationToken) -> Result<IpAddr> {
        let mut url = endpoint(&self.base_url)?;
        url.query_pairs_mut().append_pair("cmd", "get-ip");

        let data: SelfIpResponse =
            get_json(&self.client, cancel, url, false, "iplocation get-ip response").await?;
        data.ip.ok_or_else(|| {
            Error::decode(
                "iplocation get-ip response",
                serde_json::Error::custom("missing ip field"),
            )
        })
    }
}

#[async_trait]
impl PublicIpApi for IpLocation {
    fn name(&self) -> &str {
        "iplocation"
    }

    async fn fetch_info(
        &self,
        cancel: &CancellationToken,
        logger: &dyn Logger,
        ip: Option<IpAddr>,
    ) -> Result<PublicIp> {
        let ip = match requested_ip(ip) {
            Some(ip) => ip,
            None => {
                let ip = self.self_ip(cancel).await?;
                logger.info(&format!("iplocation: discovered own public address {}", ip));
                ip
            }
        };

        let mut url = endpoint(&self.base_url)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("ip", &ip.to_string());
            if !self.token.is_empty() {
                query.append_pair("key", &self.token);
            }
        }

        let data: Response = get_json(
            &self.client,
            cancel,
            url,
            !self.token.is_empty(),
            "iplocation response",
        )
        .await?;

        let country = if data.country_name.is_empty() {
            data.country_code2
        } else {
            data.country_name
        };

        Ok(PublicIp {
            ip: data.ip.or(Some(ip)),
            country: normalize_country(&country),
            organization: data.isp,
            ..Default::default()
        })
    }
}
