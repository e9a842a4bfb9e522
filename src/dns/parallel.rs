//! Concurrent resolution of a batch of hostnames
//!
//! Each host is resolved by its own worker, at most `max_concurrency` at a
//! time. A host that cannot be resolved is dropped from the result and
//! reported as a warning; the batch only fails on invalid settings,
//! cancellation, or when the configured failure policy says so.

use super::HostLookup;
use crate::common::cancel::cancellable;
use crate::{Error, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default number of hosts resolved at the same time
pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// Default time budget for a single host
pub const DEFAULT_HOST_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for one resolution batch
#[derive(Debug, Clone)]
pub struct ParallelSettings {
    /// Hostnames to resolve; duplicates are collapsed
    pub hosts: Vec<String>,
    /// Upper bound on in-flight lookups
    pub max_concurrency: usize,
    /// Per-host timeout; an expired host becomes a warning
    pub host_timeout: Duration,
    /// Fail the batch when fewer hosts than this resolve (0 disables)
    pub min_found: usize,
    /// Fail the batch on the first unresolvable host
    pub fail_early: bool,
}

impl ParallelSettings {
    pub fn new(hosts: Vec<String>) -> Self {
        ParallelSettings {
            hosts,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            host_timeout: DEFAULT_HOST_TIMEOUT,
            min_found: 0,
            fail_early: false,
        }
    }

    /// Validate settings and return the de-duplicated host list
    fn validated_hosts(&self) -> Result<Vec<String>> {
        if self.max_concurrency == 0 {
            return Err(Error::config("resolver max concurrency cannot be 0"));
        }
        if self.host_timeout.is_zero() {
            return Err(Error::config("resolver host timeout cannot be 0"));
        }

        let mut seen = BTreeSet::new();
        let mut hosts = Vec::with_capacity(self.hosts.len());
        for host in &self.hosts {
            let host = host.trim();
            if host.is_empty() {
                return Err(Error::config("hostname cannot be empty"));
            }
            if seen.insert(host.to_string()) {
                hosts.push(host.to_string());
            }
        }

        if self.min_found > hosts.len() {
            return Err(Error::config(format!(
                "minimum of {} resolved hosts exceeds the {} hosts given",
                self.min_found,
                hosts.len()
            )));
        }
        Ok(hosts)
    }
}

/// Outcome of a batch: one map entry per resolved host and one warning
/// per host that was not
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub host_to_ips: HashMap<String, Vec<IpAddr>>,
    /// Sorted warnings
    pub warnings: Vec<String>,
}

/// What a single worker produced
enum HostOutcome {
    Resolved(String, Vec<IpAddr>),
    Failed(String),
}

/// Resolves batches of hostnames concurrently
pub struct ParallelResolver {
    lookup: Arc<dyn HostLookup>,
}

impl ParallelResolver {
    pub fn new(lookup: Arc<dyn HostLookup>) -> Self {
        ParallelResolver { lookup }
    }

    /// Resolve every host in `settings`.
    ///
    /// On success the number of map entries plus the number of warnings
    /// equals the number of distinct input hosts.
    pub async fn resolve(
        &self,
        cancel: &CancellationToken,
        settings: &ParallelSettings,
    ) -> Result<Resolution> {
        let hosts = settings.validated_hosts()?;
        let total = hosts.len();
        debug!(
            "Resolving {} hosts with concurrency {}",
            total, settings.max_concurrency
        );

        let outcomes: Vec<HostOutcome> = cancellable(
            cancel,
            stream::iter(hosts)
                .map(|host| self.resolve_one(host, settings))
                .buffer_unordered(settings.max_concurrency)
                .try_collect(),
        )
        .await?;

        // Fan-in only once every worker is done
        let mut resolution = Resolution::default();
        for outcome in outcomes {
            match outcome {
                HostOutcome::Resolved(host, ips) => {
                    resolution.host_to_ips.insert(host, ips);
                }
                HostOutcome::Failed(warning) => resolution.warnings.push(warning),
            }
        }
        resolution.warnings.sort();

        let found = resolution.host_to_ips.len();
        if found < settings.min_found {
            return Err(Error::dns(format!(
                "resolved {} of {} hosts, expected at least {}",
                found, total, settings.min_found
            )));
        }

        debug!(
            "Resolved {} hosts with {} warnings",
            found,
            resolution.warnings.len()
        );
        Ok(resolution)
    }

    async fn resolve_one(&self, host: String, settings: &ParallelSettings) -> Result<HostOutcome> {
        let warning = match tokio::time::timeout(settings.host_timeout, self.lookup.lookup(&host)).await
        {
            Ok(Ok(ips)) => {
                let ips = sorted_unique(ips);
                if !ips.is_empty() {
                    return Ok(HostOutcome::Resolved(host, ips));
                }
                format!("{}: no address found", host)
            }
            Ok(Err(e)) => format!("{}: {}", host, e),
            Err(_) => format!(
                "{}: resolution timed out after {:?}",
                host, settings.host_timeout
            ),
        };

        if settings.fail_early {
            return Err(Error::dns(warning));
        }
        Ok(HostOutcome::Failed(warning))
    }
}

fn sorted_unique(mut ips: Vec<IpAddr>) -> Vec<IpAddr> {
    ips.sort();
    ips.dedup();
    ips
}
