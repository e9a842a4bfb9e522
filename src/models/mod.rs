//! Data model shared by the fetchers, the selector and the public IP APIs

mod connection;
mod publicip;
mod server;

pub use connection::Connection;
pub use publicip::PublicIp;
pub use server::{Protocol, Server, VpnType};
