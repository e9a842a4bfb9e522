//! Server catalog entries

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Transport protocol of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            _ => Err(Error::config(format!(
                "protocol {:?} can only be \"tcp\" or \"udp\"",
                s
            ))),
        }
    }
}

/// VPN flavour a server speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VpnType {
    #[default]
    OpenVpn,
    Wireguard,
}

impl fmt::Display for VpnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VpnType::OpenVpn => write!(f, "openvpn"),
            VpnType::Wireguard => write!(f, "wireguard"),
        }
    }
}

impl FromStr for VpnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openvpn" => Ok(VpnType::OpenVpn),
            "wireguard" => Ok(VpnType::Wireguard),
            _ => Err(Error::config(format!(
                "VPN type {:?} can only be \"openvpn\" or \"wireguard\"",
                s
            ))),
        }
    }
}

/// A candidate server as returned by a catalog fetcher
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    /// Provider identifier
    pub provider: String,
    pub vpn: VpnType,
    /// Hostname or literal address
    pub hostname: String,
    /// Resolved addresses
    pub ips: Vec<IpAddr>,
    /// Port advertised by the server entry, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub tcp: bool,
    pub udp: bool,
    pub country: String,
    pub region: String,
    pub city: String,
    /// WireGuard public key
    #[serde(rename = "wgpubkey", skip_serializing_if = "String::is_empty")]
    pub wg_pubkey: String,
}

impl Server {
    /// Whether the server accepts `protocol` for its VPN type
    pub fn supports(&self, protocol: Protocol) -> bool {
        match (self.vpn, protocol) {
            (VpnType::Wireguard, Protocol::Udp) => true,
            (VpnType::Wireguard, Protocol::Tcp) => false,
            (VpnType::OpenVpn, Protocol::Tcp) => self.tcp,
            (VpnType::OpenVpn, Protocol::Udp) => self.udp,
        }
    }

    /// Addresses to connect to: resolved IPs, or the hostname itself when
    /// it is a literal address and nothing was resolved
    pub fn addresses(&self) -> Vec<IpAddr> {
        if !self.ips.is_empty() {
            return self.ips.clone();
        }
        self.hostname.parse::<IpAddr>().into_iter().collect()
    }
}
