//! HTTP plumbing shared by the public IP APIs

use crate::common::cancel::cancellable;
use crate::common::http::redact_url;
use crate::{Error, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::net::IpAddr;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Parse an API base URL
pub(crate) fn endpoint(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| Error::config(format!("invalid API URL {:?}: {}", base, e)))
}

/// Append path segments to `url`, keeping a single separator
pub(crate) fn push_segments(url: &mut Url, segments: &[&str]) -> Result<()> {
    let display = url.to_string();
    let mut path = url
        .path_segments_mut()
        .map_err(|_| Error::config(format!("API URL {} cannot have a path", display)))?;
    path.pop_if_empty();
    for segment in segments {
        path.push(segment);
    }
    Ok(())
}

/// The address to look up, `None` meaning the caller's own address
pub(crate) fn requested_ip(ip: Option<IpAddr>) -> Option<IpAddr> {
    ip.filter(|ip| !ip.is_unspecified())
}

/// Classify a response status.
///
/// 401 only means a bad token when a token was actually sent; 403 and 429
/// are rate limiting; anything else that is not 200 is a bad status.
pub(crate) fn check_status(url: &str, status: StatusCode, token_supplied: bool) -> Result<()> {
    if token_supplied && status == StatusCode::UNAUTHORIZED {
        return Err(Error::TokenNotValid(status));
    }

    match status {
        StatusCode::OK => Ok(()),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => Err(Error::TooManyRequests {
            url: url.to_string(),
            status,
        }),
        _ => Err(Error::BadHttpStatus {
            url: url.to_string(),
            status,
        }),
    }
}

/// GET `url`, classify the status and decode the JSON body
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    cancel: &CancellationToken,
    url: Url,
    token_supplied: bool,
    what: &str,
) -> Result<T> {
    let display_url = redact_url(&url);
    cancellable(cancel, async {
        let response = client.get(url).send().await?;
        check_status(&display_url, response.status(), token_supplied)?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| Error::decode(what, e))
    })
    .await
}

/// Accept a JSON string, number or null as a string field
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Accept a JSON string or null, null becoming an empty string
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept an IP address, with null or an empty string meaning absent
pub(crate) fn optional_ip<'de, D>(deserializer: D) -> std::result::Result<Option<IpAddr>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.trim().is_empty() => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ErrorKind;

    fn kind(status: u16, token_supplied: bool) -> Option<ErrorKind> {
        let status = StatusCode::from_u16(status).unwrap();
        check_status("https://api.example", status, token_supplied)
            .err()
            .and_then(|e| e.kind())
    }

    #[test]
    fn test_check_status_classification() {
        assert!(check_status("u", StatusCode::OK, true).is_ok());
        assert_eq!(kind(401, true), Some(ErrorKind::TokenNotValid));
        assert_eq!(kind(401, false), Some(ErrorKind::BadHttpStatus));
        assert_eq!(kind(429, false), Some(ErrorKind::TooManyRequests));
        assert_eq!(kind(429, true), Some(ErrorKind::TooManyRequests));
        assert_eq!(kind(403, false), Some(ErrorKind::TooManyRequests));
        assert_eq!(kind(500, true), Some(ErrorKind::BadHttpStatus));
        assert_eq!(kind(204, false), Some(ErrorKind::BadHttpStatus));
    }

    #[test]
    fn test_push_segments() {
        let mut url = endpoint("https://ipapi.co/").unwrap();
        push_segments(&mut url, &["2001:db8::1", "json", ""]).unwrap();
        assert_eq!(url.as_str(), "https://ipapi.co/2001:db8::1/json/");

        let mut url = endpoint("http://127.0.0.1:8080").unwrap();
        push_segments(&mut url, &["json"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/json");

        let mut url = endpoint("mailto:someone@example.com").unwrap();
        let err = push_segments(&mut url, &["json"]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("mailto:someone@example.com"));
    }

    #[test]
    fn test_requested_ip() {
        assert_eq!(requested_ip(None), None);
        assert_eq!(requested_ip(Some("0.0.0.0".parse().unwrap())), None);
        assert_eq!(requested_ip(Some("::".parse().unwrap())), None);
        let ip: IpAddr = "1.2.3.4".parse().unwrap();
        assert_eq!(requested_ip(Some(ip)), Some(ip));
    }

    #[test]
    fn test_string_or_number() {
        #[derive(Deserialize)]
        struct Data {
            #[serde(default, deserialize_with = "string_or_number")]
            lat: String,
            #[serde(default, deserialize_with = "string_or_number")]
            lng: String,
            #[serde(default, deserialize_with = "string_or_number")]
            alt: String,
        }
        let data: Data = serde_json::from_str(r#"{"lat": 52.5, "lng": "13.4", "alt": null}"#).unwrap();
        assert_eq!(data.lat, "52.5");
        assert_eq!(data.lng, "13.4");
        assert_eq!(data.alt, "");
    }

    #[test]
    fn test_null_and_empty_fields() {
        #[derive(Deserialize)]
        struct Data {
            #[serde(default, deserialize_with = "optional_ip")]
            ip: Option<IpAddr>,
            #[serde(default, deserialize_with = "null_as_empty")]
            org: String,
            #[serde(default, deserialize_with = "null_as_empty")]
            postal: String,
        }

        let data: Data = serde_json::from_str(r#"{"ip": "", "org": null}"#).unwrap();
        assert_eq!(data.ip, None);
        assert_eq!(data.org, "");
        assert_eq!(data.postal, "");

        let data: Data = serde_json::from_str(r#"{"ip": null, "org": "AS1"}"#).unwrap();
        assert_eq!(data.ip, None);
        assert_eq!(data.org, "AS1");

        let data: Data = serde_json::from_str(r#"{"ip": "2001:db8::1"}"#).unwrap();
        assert_eq!(data.ip, Some("2001:db8::1".parse().unwrap()));

        assert!(serde_json::from_str::<Data>(r#"{"ip": "not-an-ip"}"#).is_err());
    }
}
