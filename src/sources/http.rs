//! HTTP archive fetcher.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use url::Url;

use crate::sources::archive::{self, ArchiveFormat};
use crate::sources::{FetchError, PackageFetcher, StagedArchive};
use crate::util::hash::sha256_bytes;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Downloads archives over HTTP(S) with a blocking client.
///
/// A request that exceeds the timeout is cancelled and reported as an
/// error; transient failures are retried up to `retries` extra times.
pub struct HttpArchiveFetcher {
    client: Client,
    retries: u32,
    offline: bool,
    progress: bool,
}

impl HttpArchiveFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("berth/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(HttpArchiveFetcher {
            client,
            retries: 0,
            offline: false,
            progress: false,
        })
    }

    /// Retry transient failures this many extra times.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Refuse all network access.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Show a spinner while downloading.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn download(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let http_error = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().map_err(http_error)?;

        let status = response.status();
        tracing::debug!("HTTP {} for {}", status, url);
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().map_err(http_error)?.to_vec())
    }

    fn download_with_retries(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        retry_transient(self.retries, || self.download(url))
    }

    fn spinner(&self, url: &Url) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Downloading {}", url));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Run `attempt`, retrying transient failures up to `retries` extra times.
fn retry_transient<T>(
    retries: u32,
    mut attempt: impl FnMut() -> Result<T, FetchError>,
) -> Result<T, FetchError> {
    let mut failures = 0;
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && failures < retries => {
                failures += 1;
                tracing::warn!("{}; retrying ({}/{})", e, failures, retries);
            }
            Err(e) => return Err(e),
        }
    }
}

impl PackageFetcher for HttpArchiveFetcher {
    fn fetch_and_stage(&self, url: &Url, destination: &Path) -> Result<StagedArchive, FetchError> {
        let format = ArchiveFormat::from_name(url.path()).ok_or_else(|| {
            FetchError::UnsupportedArchive {
                url: url.to_string(),
            }
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }

        if self.offline {
            return Err(FetchError::Offline {
                url: url.to_string(),
            });
        }

        tracing::info!("Fetching {}", url);

        let spinner = self.spinner(url);
        let result = self.download_with_retries(url);
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        let bytes = result?;

        let sha256 = sha256_bytes(&bytes);
        tracing::debug!("downloaded {} bytes, sha256 {}", bytes.len(), &sha256[..16]);

        archive::extract(&bytes, format, destination, url.as_str())?;
        let root = archive::staged_root(destination)?;

        tracing::info!("Staged {} in {}", url, root.display());

        Ok(StagedArchive {
            root,
            source_url: url.to_string(),
            sha256,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fetcher() -> HttpArchiveFetcher {
        HttpArchiveFetcher::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS)).unwrap()
    }

    #[test]
    fn test_offline_refuses_download() {
        let tmp = TempDir::new().unwrap();
        let url = Url::parse("https://example.com/v1.0.0.zip").unwrap();

        let err = fetcher()
            .offline(true)
            .fetch_and_stage(&url, tmp.path())
            .unwrap_err();
        assert!(matches!(err, FetchError::Offline { .. }));
    }

    #[test]
    fn test_unsupported_archive() {
        let tmp = TempDir::new().unwrap();
        let url = Url::parse("https://example.com/v1.0.0.tar.xz").unwrap();

        let err = fetcher().fetch_and_stage(&url, tmp.path()).unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedArchive { .. }));
    }

    #[test]
    fn test_unsupported_scheme() {
        let tmp = TempDir::new().unwrap();
        let url = Url::parse("ftp://example.com/v1.0.0.zip").unwrap();

        let err = fetcher().fetch_and_stage(&url, tmp.path()).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            url: "https://example.com/v1.0.0.zip".to_string(),
            status: code,
        }
    }

    #[test]
    fn test_transient_failure_is_retried() {
        let mut calls = 0;
        let bytes = retry_transient(2, || {
            calls += 1;
            if calls == 1 {
                Err(status(503))
            } else {
                Ok(vec![1, 2, 3])
            }
        })
        .unwrap();

        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_retries_are_bounded() {
        let mut calls = 0;
        let err = retry_transient::<Vec<u8>>(2, || {
            calls += 1;
            Err(status(503))
        })
        .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let mut calls = 0;
        let err = retry_transient::<Vec<u8>>(3, || {
            calls += 1;
            Err(status(404))
        })
        .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_no_retries_by_default() {
        let mut calls = 0;
        let _ = retry_transient::<Vec<u8>>(0, || {
            calls += 1;
            Err(status(503))
        });
        assert_eq!(calls, 1);
    }
}
