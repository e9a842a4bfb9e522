//! Common utilities and types

pub mod cancel;
pub mod error;
pub mod http;
pub mod logger;
pub mod random;

pub use error::{Error, ErrorKind, Result, ResultExt};
pub use logger::{Logger, TracingLogger};
pub use random::{RandomSource, SplitMix64};
