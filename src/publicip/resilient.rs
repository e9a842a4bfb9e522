//! Fallback across several public IP APIs

use super::PublicIpApi;
use crate::common::error::ErrorKind;
use crate::common::Logger;
use crate::models::PublicIp;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Tries each API in order until one answers.
///
/// An API that reports rate limiting is skipped for the lifetime of the
/// fetcher.
pub struct ResilientFetcher {
    apis: Vec<Arc<dyn PublicIpApi>>,
    banned: Mutex<HashSet<String>>,
}

impl ResilientFetcher {
    pub fn new(apis: Vec<Arc<dyn PublicIpApi>>) -> Self {
        ResilientFetcher {
            apis,
            banned: Mutex::new(HashSet::new()),
        }
    }

    /// Names of the APIs currently skipped
    pub fn banned(&self) -> Vec<String> {
        let mut names: Vec<String> = self.banned.lock().iter().cloned().collect();
        names.sort();
        names
    }

    pub async fn fetch_info(
        &self,
        cancel: &CancellationToken,
        logger: &dyn Logger,
        ip: Option<IpAddr>,
    ) -> Result<PublicIp> {
        let mut last_error = None;

        for api in &self.apis {
            if self.banned.lock().contains(api.name()) {
                continue;
            }

            match api.fetch_info(cancel, logger, ip).await {
                Ok(info) => return Ok(info),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    if e.kind() == Some(ErrorKind::TooManyRequests) {
                        self.banned.lock().insert(api.name().to_string());
                    }
                    logger.warn(&format!("public IP API {}: {}", api.name(), e));
                    last_error = Some(e.context(format!("fetching public IP with {}", api.name())));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::config("no public IP API available")))
    }
}
