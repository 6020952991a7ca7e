//! Client configuration

use std::path::PathBuf;

use crate::error::{ClientError, ClientResult};

/// Default API base URL when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";

/// Passphrase used to derive the session encryption key
pub const DEFAULT_STORAGE_SECRET: &str = "app.resarchHound753";

/// Client configuration for connecting to the certificate backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL (e.g., "https://api.example.com/api/")
    pub base_url: String,

    /// Directory holding the encrypted session blobs
    pub storage_dir: PathBuf,

    /// Passphrase the session encryption key is derived from
    pub storage_secret: String,

    /// Request timeout in seconds; `None` leaves the transport default (unbounded)
    pub timeout: Option<u64>,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            storage_dir: default_storage_dir(),
            storage_secret: DEFAULT_STORAGE_SECRET.to_string(),
            timeout: None,
        }
    }

    /// Load configuration from environment variables (after `.env`)
    ///
    /// - `CERTDESK_API_BASE_URL`
    /// - `CERTDESK_STORAGE_DIR`
    /// - `CERTDESK_STORAGE_SECRET`
    /// - `CERTDESK_TIMEOUT_SECS`
    pub fn from_env() -> ClientResult<Self> {
        let _ = dotenvy::dotenv();

        let base_url = std::env::var("CERTDESK_API_BASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut config = Self::new(base_url);

        if let Some(dir) = std::env::var("CERTDESK_STORAGE_DIR").ok().filter(|s| !s.is_empty()) {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(secret) = std::env::var("CERTDESK_STORAGE_SECRET").ok().filter(|s| !s.is_empty()) {
            config.storage_secret = secret;
        }
        if let Ok(raw) = std::env::var("CERTDESK_TIMEOUT_SECS") {
            let secs = raw
                .parse()
                .map_err(|_| ClientError::Config(format!("CERTDESK_TIMEOUT_SECS is not a number: {raw}")))?;
            config.timeout = Some(secs);
        }

        Ok(config)
    }

    /// Set the session storage directory
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Set the storage passphrase
    pub fn with_storage_secret(mut self, secret: impl Into<String>) -> Self {
        self.storage_secret = secret.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Base URL with exactly one trailing slash
    pub fn normalized_base_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("certdesk")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_base_url() {
        assert_eq!(
            ClientConfig::new("https://api.example.com/api").normalized_base_url(),
            "https://api.example.com/api/"
        );
        assert_eq!(
            ClientConfig::new("https://api.example.com/api//").normalized_base_url(),
            "https://api.example.com/api/"
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::default()
            .with_storage_dir("/tmp/certdesk-test")
            .with_storage_secret("s3cret")
            .with_timeout(5);
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/certdesk-test"));
        assert_eq!(config.storage_secret, "s3cret");
        assert_eq!(config.timeout, Some(5));
        assert_eq!(ClientConfig::default().timeout, None);
    }
}
