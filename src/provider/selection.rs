//! User-supplied server selection criteria

use super::ConnectionDefaults;
use crate::models::{Protocol, Server, VpnType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Filters narrowing the candidate servers before the random pick.
///
/// Empty lists match everything; list entries match case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerSelection {
    pub vpn: VpnType,
    /// OpenVPN protocol; `None` defers to the provider preference
    pub protocol: Option<Protocol>,
    /// Port overriding server and provider defaults
    pub port: Option<u16>,
    /// Only connect to this address
    pub target_ip: Option<IpAddr>,
    pub countries: Vec<String>,
    pub regions: Vec<String>,
    pub cities: Vec<String>,
    pub hostnames: Vec<String>,
}

impl ServerSelection {
    /// Protocol to use given the provider defaults
    pub fn protocol(&self, defaults: &ConnectionDefaults) -> Protocol {
        match self.vpn {
            VpnType::Wireguard => Protocol::Udp,
            VpnType::OpenVpn => self.protocol.unwrap_or(defaults.preferred_protocol),
        }
    }

    /// Whether `server` passes every filter for `protocol`
    pub fn matches(&self, server: &Server, protocol: Protocol) -> bool {
        server.vpn == self.vpn
            && server.supports(protocol)
            && matches_any(&self.countries, &server.country)
            && matches_any(&self.regions, &server.region)
            && matches_any(&self.cities, &server.city)
            && matches_any(&self.hostnames, &server.hostname)
    }
}

fn matches_any(filter: &[String], value: &str) -> bool {
    filter.is_empty() || filter.iter().any(|f| f.eq_ignore_ascii_case(value))
}

impl fmt::Display for ServerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.vpn)?;
        if let Some(protocol) = self.protocol {
            write!(f, " {}", protocol)?;
        }
        for (label, values) in [
            ("countries", &self.countries),
            ("regions", &self.regions),
            ("cities", &self.cities),
            ("hostnames", &self.hostnames),
        ] {
            if !values.is_empty() {
                write!(f, " {} {}", label, values.join(", "))?;
            }
        }
        if let Some(ip) = self.target_ip {
            write!(f, " target ip {}", ip)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(country: &str, tcp: bool, udp: bool) -> Server {
        Server {
            hostname: format!("{}.example.com", country.to_lowercase()),
            country: country.to_string(),
            tcp,
            udp,
            ..Default::default()
        }
    }

    #[test]
    fn test_matches_countries_case_insensitive() {
        let selection = ServerSelection {
            countries: vec!["sweden".to_string()],
            ..Default::default()
        };
        assert!(selection.matches(&server("Sweden", false, true), Protocol::Udp));
        assert!(!selection.matches(&server("Norway", false, true), Protocol::Udp));
    }

    #[test]
    fn test_matches_protocol_support() {
        let selection = ServerSelection::default();
        assert!(!selection.matches(&server("Sweden", false, true), Protocol::Tcp));
        assert!(selection.matches(&server("Sweden", true, false), Protocol::Tcp));
    }

    #[test]
    fn test_protocol_resolution() {
        let defaults = ConnectionDefaults::new(443, 1194, 51820);
        let mut selection = ServerSelection::default();
        assert_eq!(selection.protocol(&defaults), Protocol::Udp);

        let tcp_first = defaults.with_preferred_protocol(Protocol::Tcp);
        assert_eq!(selection.protocol(&tcp_first), Protocol::Tcp);

        selection.protocol = Some(Protocol::Udp);
        assert_eq!(selection.protocol(&tcp_first), Protocol::Udp);

        selection.vpn = VpnType::Wireguard;
        selection.protocol = Some(Protocol::Tcp);
        assert_eq!(selection.protocol(&tcp_first), Protocol::Udp);
    }

    #[test]
    fn test_display() {
        let selection = ServerSelection {
            protocol: Some(Protocol::Tcp),
            countries: vec!["Sweden".to_string(), "Norway".to_string()],
            ..Default::default()
        };
        assert_eq!(selection.to_string(), "openvpn tcp countries Sweden, Norway");
    }
}
