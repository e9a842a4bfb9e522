//! Deterministic connection selection

use super::{ConnectionDefaults, Provider, ServerSelection};
use crate::common::RandomSource;
use crate::models::{Connection, Server};
use crate::{Error, Result};
use tracing::debug;

/// Pick one connection for `provider` out of `servers`.
///
/// Servers are filtered by `selection`, every address of every remaining
/// server becomes a candidate, and `rand_source` picks one of them. The
/// same inputs and the same random state always give the same connection.
pub fn get_connection(
    provider: Provider,
    servers: &[Server],
    selection: &ServerSelection,
    defaults: ConnectionDefaults,
    rand_source: &mut dyn RandomSource,
) -> Result<Connection> {
    let protocol = selection.protocol(&defaults);

    let filtered: Vec<&Server> = servers
        .iter()
        .filter(|server| selection.matches(server, protocol))
        .collect();
    if filtered.is_empty() {
        return Err(Error::NoServerFound(format!(
            "{} has no server matching {}",
            provider, selection
        )));
    }

    // 0 means unset at every level
    let default_port = Some(defaults.port(selection.vpn, protocol)).filter(|p| *p != 0);
    let selection_port = selection.port.filter(|p| *p != 0);

    let mut candidates = Vec::new();
    let mut portless = 0;
    for server in filtered {
        let Some(port) = selection_port
            .or(server.port.filter(|p| *p != 0))
            .or(default_port)
        else {
            portless += 1;
            continue;
        };

        for ip in server.addresses() {
            if selection.target_ip.is_some_and(|target| target != ip) {
                continue;
            }
            candidates.push(Connection {
                vpn: selection.vpn,
                ip,
                port,
                protocol,
                hostname: server.hostname.clone(),
                pubkey: server.wg_pubkey.clone(),
            });
        }
    }

    if candidates.is_empty() && portless > 0 {
        return Err(Error::config(format!(
            "{} has no default {} port for {} and {} matching servers pin none",
            provider, selection.vpn, protocol, portless
        )));
    }
    if candidates.is_empty() {
        return Err(Error::NoServerFound(format!(
            "{} has no address for servers matching {}",
            provider, selection
        )));
    }

    let index = rand_source.next_index(candidates.len());
    let connection = candidates.swap_remove(index);
    debug!("Selected {} out of {} candidates", connection, candidates.len() + 1);
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::random::seeded;
    use crate::common::SplitMix64;
    use crate::models::{Protocol, VpnType};
    use std::net::IpAddr;

    fn servers() -> Vec<Server> {
        let mk = |hostname: &str, country: &str, ips: &[&str], tcp: bool| Server {
            provider: "privatevpn".to_string(),
            hostname: hostname.to_string(),
            country: country.to_string(),
            ips: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
            tcp,
            udp: true,
            ..Default::default()
        };
        vec![
            mk("se1.example.com", "Sweden", &["10.0.1.1", "10.0.1.2"], true),
            mk("se2.example.com", "Sweden", &["10.0.2.1"], false),
            mk("no1.example.com", "Norway", &["10.0.3.1"], true),
            mk("de1.example.com", "Germany", &[], true),
        ]
    }

    fn defaults() -> ConnectionDefaults {
        Provider::PrivateVpn.connection_defaults()
    }

    #[test]
    fn test_empty_after_filter() {
        let selection = ServerSelection {
            countries: vec!["Japan".to_string()],
            ..Default::default()
        };
        let err = get_connection(
            Provider::PrivateVpn,
            &servers(),
            &selection,
            defaults(),
            &mut SplitMix64::new(1),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoServerFound(_)));
    }

    #[test]
    fn test_result_stays_in_filtered_set() {
        let selection = ServerSelection {
            countries: vec!["Sweden".to_string()],
            protocol: Some(Protocol::Tcp),
            ..Default::default()
        };
        let mut rng = seeded(99);
        for _ in 0..50 {
            let connection =
                get_connection(Provider::PrivateVpn, &servers(), &selection, defaults(), &mut rng)
                    .unwrap();
            // only se1 is a Swedish TCP server
            assert_eq!(connection.hostname, "se1.example.com");
            assert_eq!(connection.port, 443);
            assert_eq!(connection.protocol, Protocol::Tcp);
        }
    }

    #[test]
    fn test_same_seed_same_connection() {
        let selection = ServerSelection::default();
        let first = get_connection(
            Provider::PrivateVpn,
            &servers(),
            &selection,
            defaults(),
            &mut seeded(1234),
        )
        .unwrap();
        for _ in 0..10 {
            let again = get_connection(
                Provider::PrivateVpn,
                &servers(),
                &selection,
                defaults(),
                &mut seeded(1234),
            )
            .unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_port_precedence() {
        let mut list = servers();
        list[2].port = Some(1300);
        let selection = ServerSelection {
            countries: vec!["Norway".to_string()],
            ..Default::default()
        };
        let connection = get_connection(
            Provider::PrivateVpn,
            &list,
            &selection,
            defaults(),
            &mut SplitMix64::new(3),
        )
        .unwrap();
        assert_eq!(connection.port, 1300);

        let selection = ServerSelection {
            port: Some(8443),
            ..selection
        };
        let connection = get_connection(
            Provider::PrivateVpn,
            &list,
            &selection,
            defaults(),
            &mut SplitMix64::new(3),
        )
        .unwrap();
        assert_eq!(connection.port, 8443);
    }

    #[test]
    fn test_unsupported_default_port() {
        let selection = ServerSelection {
            protocol: Some(Protocol::Tcp),
            ..Default::default()
        };
        let err = get_connection(
            Provider::Expressvpn,
            &servers(),
            &selection,
            Provider::Expressvpn.connection_defaults(),
            &mut SplitMix64::new(3),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_pinned_port_without_default() {
        let mut list = servers();
        list[0].port = Some(443);
        let selection = ServerSelection {
            protocol: Some(Protocol::Tcp),
            ..Default::default()
        };
        for seed in 0..20 {
            let connection = get_connection(
                Provider::Expressvpn,
                &list,
                &selection,
                Provider::Expressvpn.connection_defaults(),
                &mut SplitMix64::new(seed),
            )
            .unwrap();
            assert_eq!(connection.hostname, "se1.example.com");
            assert_eq!(connection.port, 443);
        }
    }

    #[test]
    fn test_zero_port_is_unset() {
        let mut list = servers();
        list[2].port = Some(0);
        let selection = ServerSelection {
            countries: vec!["Norway".to_string()],
            port: Some(0),
            ..Default::default()
        };
        let connection = get_connection(
            Provider::PrivateVpn,
            &list,
            &selection,
            defaults(),
            &mut SplitMix64::new(3),
        )
        .unwrap();
        assert_eq!(connection.port, 1194);

        let selection = ServerSelection {
            countries: vec!["Norway".to_string()],
            protocol: Some(Protocol::Tcp),
            ..Default::default()
        };
        let err = get_connection(
            Provider::Expressvpn,
            &list,
            &selection,
            Provider::Expressvpn.connection_defaults(),
            &mut SplitMix64::new(3),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_target_ip() {
        let target: IpAddr = "10.0.1.2".parse().unwrap();
        let selection = ServerSelection {
            target_ip: Some(target),
            ..Default::default()
        };
        let connection = get_connection(
            Provider::PrivateVpn,
            &servers(),
            &selection,
            defaults(),
            &mut SplitMix64::new(5),
        )
        .unwrap();
        assert_eq!(connection.ip, target);
        assert_eq!(connection.hostname, "se1.example.com");

        let selection = ServerSelection {
            target_ip: Some("192.0.2.1".parse().unwrap()),
            ..Default::default()
        };
        let err = get_connection(
            Provider::PrivateVpn,
            &servers(),
            &selection,
            defaults(),
            &mut SplitMix64::new(5),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoServerFound(_)));
    }

    #[test]
    fn test_wireguard_only_matches_wireguard_servers() {
        let mut list = servers();
        list.push(Server {
            vpn: VpnType::Wireguard,
            hostname: "wg1.example.com".to_string(),
            ips: vec!["10.0.9.1".parse().unwrap()],
            wg_pubkey: "pubkey".to_string(),
            ..Default::default()
        });
        let selection = ServerSelection {
            vpn: VpnType::Wireguard,
            port: Some(51820),
            ..Default::default()
        };
        let connection = get_connection(
            Provider::PrivateVpn,
            &list,
            &selection,
            defaults(),
            &mut SplitMix64::new(5),
        )
        .unwrap();
        assert_eq!(connection.hostname, "wg1.example.com");
        assert_eq!(connection.protocol, Protocol::Udp);
        assert_eq!(connection.pubkey, "pubkey");
    }
}
