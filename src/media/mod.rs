//! Media upload collaborator and temp-file spooling.
//!
//! Uploaded avatars/covers are written to a local spool file by the HTTP
//! layer, handed to a [`MediaStore`], and the returned URL is persisted on the
//! user record. The store is injected as a trait object so handlers never
//! touch upload credentials directly.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

mod spool;

pub use spool::SpooledFile;

/// Reference returned by the media service for a stored asset.
#[derive(Clone, Debug)]
pub struct UploadedMedia {
    pub url: String,
}

/// Media delivery abstraction used by the upload routes.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Push a spooled file to the media service and return its public URL.
    async fn upload(&self, file: &SpooledFile) -> Result<UploadedMedia>;
}

#[derive(Clone, Debug)]
pub struct MediaCredentials {
    pub base_url: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

/// Cloudinary-style upload client: multipart POST with a signed timestamp.
pub struct CloudMediaStore {
    http: reqwest::Client,
    credentials: MediaCredentials,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudMediaStore {
    /// Build the HTTP client once at startup; credentials stay inside the store.
    pub fn new(credentials: MediaCredentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::api::APP_USER_AGENT)
            .build()
            .context("failed to build media upload client")?;
        Ok(Self { http, credentials })
    }

    fn upload_url(&self) -> String {
        let base = self.credentials.base_url.trim_end_matches('/');
        format!("{base}/v1_1/{}/auto/upload", self.credentials.cloud_name)
    }
}

#[async_trait]
impl MediaStore for CloudMediaStore {
    async fn upload(&self, file: &SpooledFile) -> Result<UploadedMedia> {
        let bytes = tokio::fs::read(file.path())
            .await
            .context("failed to read spooled upload")?;

        let timestamp = unix_timestamp()?;
        let signature = sign_request(timestamp, self.credentials.api_secret.expose_secret());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file.file_name().to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .context("media upload request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("media upload rejected with status {status}");
        }

        let body: UploadResponse = response
            .json()
            .await
            .context("failed to decode media upload response")?;

        Ok(UploadedMedia {
            url: body.secure_url,
        })
    }
}

fn unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?
        .as_secs())
}

/// Sign the upload parameters the way the media API expects:
/// hex(sha256("timestamp=<ts><secret>")).
fn sign_request(timestamp: u64, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("timestamp={timestamp}"));
    hasher.update(api_secret.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> MediaCredentials {
        MediaCredentials {
            base_url: "https://media.test/".to_string(),
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: SecretString::from("secret".to_string()),
        }
    }

    #[test]
    fn upload_url_joins_cloud_name() -> Result<()> {
        let store = CloudMediaStore::new(credentials())?;
        assert_eq!(store.upload_url(), "https://media.test/v1_1/demo/auto/upload");
        Ok(())
    }

    #[test]
    fn sign_request_is_deterministic() {
        let first = sign_request(1_700_000_000, "secret");
        let second = sign_request(1_700_000_000, "secret");
        let different = sign_request(1_700_000_000, "other");
        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 64);
    }
}
