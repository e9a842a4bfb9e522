//! Materialized connection returned by the selector

use super::{Protocol, VpnType};
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Endpoint the tunnel should connect to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub vpn: VpnType,
    pub ip: IpAddr,
    pub port: u16,
    pub protocol: Protocol,
    /// Hostname of the server the address belongs to
    pub hostname: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pubkey: String,
}

impl Connection {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} ({}) via {}",
            self.vpn,
            self.ip,
            self.port,
            self.protocol,
            self.hostname
        )
    }
}
