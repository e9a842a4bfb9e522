//! Download a zip archive and extract it in memory

use crate::common::cancel::cancellable;
use crate::common::http::redact_url;
use crate::{Error, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// File name inside the archive mapped to its raw bytes
pub type Contents = HashMap<String, Vec<u8>>;

/// Fetches zip archives over HTTP; stateless apart from the shared client
#[derive(Clone)]
pub struct Unzipper {
    client: reqwest::Client,
}

impl Unzipper {
    pub fn new(client: reqwest::Client) -> Self {
        Unzipper { client }
    }

    /// Download `url` and extract every regular file it contains
    pub async fn fetch_and_extract(&self, cancel: &CancellationToken, url: &str) -> Result<Contents> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::config(format!("invalid archive URL {:?}: {}", url, e)))?;
        let display_url = redact_url(&parsed);

        let bytes = cancellable(cancel, async {
            let response = self.client.get(parsed.clone()).send().await?;
            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(Error::BadHttpStatus {
                    url: display_url.clone(),
                    status,
                });
            }
            Ok(response.bytes().await?)
        })
        .await?;

        debug!("Downloaded {} bytes from {}", bytes.len(), display_url);
        extract(&bytes)
    }
}

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_PREALLOC: u64 = 1 << 20;

fn prealloc(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// Extract all regular files of an in-memory zip archive
pub fn extract(bytes: &[u8]) -> Result<Contents> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut contents = HashMap::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(prealloc(file.size()));
        file.read_to_end(&mut data)
            .map_err(|e| Error::archive(format!("reading {}: {}", file.name(), e)))?;
        contents.insert(file.name().to_string(), data);
    }

    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
                continue;
            }
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_skips_directories() {
        let bytes = build_zip(&[
            ("Sweden/", ""),
            ("Sweden/se1.ovpn", "remote se1.example.com 1194"),
            ("readme.txt", "hello"),
        ]);
        let contents = extract(&bytes).unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents["readme.txt"], b"hello");
        assert_eq!(contents["Sweden/se1.ovpn"], b"remote se1.example.com 1194");
    }

    #[test]
    fn test_prealloc_ignores_huge_declared_size() {
        assert_eq!(prealloc(0), 0);
        assert_eq!(prealloc(512), 512);
        assert_eq!(prealloc(u64::MAX), MAX_PREALLOC as usize);
        assert_eq!(prealloc(u32::MAX as u64), MAX_PREALLOC as usize);
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let err = extract(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
    }

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let unzipper = Unzipper::new(reqwest::Client::new());
        let err = unzipper
            .fetch_and_extract(&CancellationToken::new(), "not a url")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
