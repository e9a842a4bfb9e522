//! VPN providers
//!
//! Each provider contributes its connection defaults; everything else
//! (filtering, port choice, the random pick) is shared and lives in
//! [`get_connection`].

mod connection;
mod selection;

pub use connection::get_connection;
pub use selection::ServerSelection;

use crate::common::RandomSource;
use crate::models::{Connection, Protocol, Server, VpnType};
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Supported VPN providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Expressvpn,
    HideMyAss,
    PrivateVpn,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Expressvpn, Provider::HideMyAss, Provider::PrivateVpn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Expressvpn => "expressvpn",
            Provider::HideMyAss => "hidemyass",
            Provider::PrivateVpn => "privatevpn",
        }
    }

    /// Static connection defaults of this provider
    pub fn connection_defaults(&self) -> ConnectionDefaults {
        match self {
            Provider::Expressvpn => ConnectionDefaults::new(0, 1195, 0),
            Provider::HideMyAss => ConnectionDefaults::new(8080, 553, 0),
            Provider::PrivateVpn => ConnectionDefaults::new(443, 1194, 0),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| {
                let names: Vec<String> =
                    Provider::ALL.iter().map(|p| format!("{:?}", p.as_str())).collect();
                Error::provider_not_valid(format!(
                    "{:?} can only be one of {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Provider-specific default ports. A port of 0 means the provider does
/// not offer that combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionDefaults {
    pub openvpn_tcp_port: u16,
    pub openvpn_udp_port: u16,
    pub wireguard_port: u16,
    /// OpenVPN protocol used when the selection does not name one
    pub preferred_protocol: Protocol,
}

impl ConnectionDefaults {
    pub const fn new(openvpn_tcp_port: u16, openvpn_udp_port: u16, wireguard_port: u16) -> Self {
        ConnectionDefaults {
            openvpn_tcp_port,
            openvpn_udp_port,
            wireguard_port,
            preferred_protocol: Protocol::Udp,
        }
    }

    pub const fn with_preferred_protocol(mut self, protocol: Protocol) -> Self {
        self.preferred_protocol = protocol;
        self
    }

    /// Default port for a VPN type and protocol
    pub fn port(&self, vpn: VpnType, protocol: Protocol) -> u16 {
        match (vpn, protocol) {
            (VpnType::Wireguard, _) => self.wireguard_port,
            (VpnType::OpenVpn, Protocol::Tcp) => self.openvpn_tcp_port,
            (VpnType::OpenVpn, Protocol::Udp) => self.openvpn_udp_port,
        }
    }
}

/// A provider bound to its fetched servers and its own random source
pub struct VpnProvider<R> {
    provider: Provider,
    servers: Vec<Server>,
    rand_source: R,
}

impl<R: RandomSource> VpnProvider<R> {
    pub fn new(provider: Provider, servers: Vec<Server>, rand_source: R) -> Self {
        VpnProvider {
            provider,
            servers,
            rand_source,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Pick a connection matching `selection`
    pub fn get_connection(&mut self, selection: &ServerSelection) -> Result<Connection> {
        get_connection(
            self.provider,
            &self.servers,
            selection,
            self.provider.connection_defaults(),
            &mut self.rand_source,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SplitMix64;

    #[test]
    fn test_provider_parse_case_insensitive() {
        assert_eq!("PrivateVPN".parse::<Provider>().unwrap(), Provider::PrivateVpn);
        assert_eq!("HIDEMYASS".parse::<Provider>().unwrap(), Provider::HideMyAss);
        assert_eq!("expressvpn".parse::<Provider>().unwrap(), Provider::Expressvpn);
    }

    #[test]
    fn test_provider_parse_error_names_valid_set() {
        let err = "nordvpn".parse::<Provider>().unwrap_err();
        assert!(matches!(err, Error::ProviderNotValid(_)));
        let message = err.to_string();
        for provider in Provider::ALL {
            assert!(message.contains(provider.as_str()));
        }
    }

    #[test]
    fn test_defaults_table() {
        let d = Provider::HideMyAss.connection_defaults();
        assert_eq!(d.port(VpnType::OpenVpn, Protocol::Tcp), 8080);
        assert_eq!(d.port(VpnType::OpenVpn, Protocol::Udp), 553);
        assert_eq!(d.preferred_protocol, Protocol::Udp);

        let d = Provider::Expressvpn.connection_defaults();
        assert_eq!(d.port(VpnType::OpenVpn, Protocol::Tcp), 0);
        assert_eq!(d.port(VpnType::OpenVpn, Protocol::Udp), 1195);
    }

    #[test]
    fn test_vpn_provider_get_connection() {
        let servers = vec![Server {
            provider: "privatevpn".to_string(),
            hostname: "se-sto.example.com".to_string(),
            ips: vec!["10.0.0.1".parse().unwrap()],
            tcp: true,
            udp: true,
            ..Default::default()
        }];
        let mut provider = VpnProvider::new(Provider::PrivateVpn, servers, SplitMix64::new(1));

        let connection = provider.get_connection(&ServerSelection::default()).unwrap();
        assert_eq!(connection.port, 1194);
        assert_eq!(connection.protocol, Protocol::Udp);

        let selection = ServerSelection {
            protocol: Some(Protocol::Tcp),
            ..Default::default()
        };
        assert_eq!(provider.get_connection(&selection).unwrap().port, 443);
    }
}
