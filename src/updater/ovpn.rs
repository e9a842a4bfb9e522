//! OpenVPN profile parsing for archive based catalogs

use crate::models::Protocol;

/// A `remote` directive with the protocol it applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub host: String,
    pub port: Option<u16>,
    pub protocol: Protocol,
}

/// Extract the remotes of a profile.
///
/// A `remote host [port] [proto]` line wins over the profile-wide `proto`
/// directive; profiles without either default to UDP like OpenVPN does.
pub fn parse_remotes(profile: &str) -> Vec<Remote> {
    let mut default_protocol = Protocol::Udp;
    let mut raw = Vec::new();

    for line in profile.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("proto") => {
                if let Some(proto) = fields.next().and_then(parse_proto) {
                    default_protocol = proto;
                }
            }
            Some("remote") => {
                let Some(host) = fields.next() else { continue };
                let port = fields.next().and_then(|p| p.parse::<u16>().ok());
                let proto = fields.next().and_then(parse_proto);
                raw.push((host.to_string(), port, proto));
            }
            _ => {}
        }
    }

    raw.into_iter()
        .map(|(host, port, proto)| Remote {
            host,
            port,
            protocol: proto.unwrap_or(default_protocol),
        })
        .collect()
}

fn parse_proto(s: &str) -> Option<Protocol> {
    let s = s.to_ascii_lowercase();
    if s.starts_with("tcp") {
        Some(Protocol::Tcp)
    } else if s.starts_with("udp") {
        Some(Protocol::Udp)
    } else {
        None
    }
}
