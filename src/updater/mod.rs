//! Server catalog updating: archive download, profile parsing and the
//! fetchers building candidate server lists

mod fetcher;
mod ovpn;
mod unzip;

pub use fetcher::{ApiServerFetcher, ArchiveServerFetcher, ServerFetcher, StaticServerFetcher};
pub use ovpn::{parse_remotes, Remote};
pub use unzip::{extract, Contents, Unzipper};
