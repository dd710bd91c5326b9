use std::time::Duration;

use crate::error::{Error, Result};

/// Default API endpoint.
pub const API_URL: &str = "https://eu.api.mega.co.nz";
/// Base URL for exported public links.
pub const DOWNLOAD_URL: &str = "https://mega.co.nz";

pub const RETRIES: usize = 10;
pub const DOWNLOAD_WORKERS: usize = 3;
pub const UPLOAD_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 30;
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Protocol-level options for a [`Mega`](crate::client::Mega) handle.
///
/// Worker counts are capped at [`MAX_WORKERS`]; [`Options::validate`] is
/// called at handle construction and rejects anything above the cap.
#[derive(Debug, Clone)]
pub struct Options {
    pub base_url: String,
    pub retries: usize,
    pub download_workers: usize,
    pub upload_workers: usize,
    pub timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_url: API_URL.to_string(),
            retries: RETRIES,
            download_workers: DOWNLOAD_WORKERS,
            upload_workers: UPLOAD_WORKERS,
            timeout: TIMEOUT,
        }
    }
}

impl Options {
    pub fn validate(&self) -> Result<()> {
        if self.download_workers > MAX_WORKERS || self.upload_workers > MAX_WORKERS {
            return Err(Error::WorkerLimitExceeded(MAX_WORKERS));
        }
        Ok(())
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn api_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert_eq!(opts.base_url, "https://eu.api.mega.co.nz");
        assert_eq!(opts.retries, 10);
        assert_eq!(opts.download_workers, 3);
        assert_eq!(opts.upload_workers, 1);
        assert_eq!(opts.timeout, Duration::from_secs(10));
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_worker_cap() {
        let opts = Options {
            download_workers: 31,
            ..Options::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(Error::WorkerLimitExceeded(30))
        ));
    }

    #[test]
    fn test_api_base_strips_trailing_slash() {
        let opts = Options {
            base_url: "https://example.test/".to_string(),
            ..Options::default()
        };
        assert_eq!(opts.api_base(), "https://example.test");
    }
}
