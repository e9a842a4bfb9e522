//! Normalized public IP information

use serde::Serialize;
use std::fmt;
use std::net::IpAddr;

/// Public IP metadata, identical in shape whatever API produced it.
///
/// Text fields are empty when the upstream API left them out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PublicIp {
    pub ip: Option<IpAddr>,
    pub region: String,
    /// Country name, never a raw code when the code is known
    pub country: String,
    pub city: String,
    pub hostname: String,
    /// "latitude,longitude"
    pub location: String,
    pub organization: String,
    pub postal_code: String,
    pub timezone: String,
}

impl PublicIp {
    /// Join latitude and longitude, empty when both are unknown
    pub fn join_location(lat: &str, lng: &str) -> String {
        if lat.is_empty() && lng.is_empty() {
            return String::new();
        }
        format!("{},{}", lat, lng)
    }
}

impl fmt::Display for PublicIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            Some(ip) => write!(f, "Public IP address is {}", ip)?,
            None => write!(f, "Public IP address is unknown")?,
        }

        let place: Vec<&str> = [&self.city, &self.region, &self.country]
            .into_iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        if !place.is_empty() {
            write!(f, " ({})", place.join(", "))?;
        }
        if !self.organization.is_empty() {
            write!(f, " - {}", self.organization)?;
        }
        Ok(())
    }
}
