//! Hostname resolution

mod lookup;
mod parallel;

pub use lookup::{HickoryLookup, HostLookup};
pub use parallel::{
    ParallelResolver, ParallelSettings, Resolution, DEFAULT_HOST_TIMEOUT, DEFAULT_MAX_CONCURRENCY,
};
