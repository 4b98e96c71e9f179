//! Package sources.
//!
//! Vendored packages are fetched as remote archives, staged on disk, and
//! then installed by copying selected files into a package directory. The
//! resolver never touches the network itself; it goes through the two
//! traits defined here so that both steps can be swapped out in tests.

pub mod archive;
pub mod http;
pub mod installer;

pub use archive::ArchiveFormat;
pub use http::HttpArchiveFetcher;
pub use installer::GlobInstaller;

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::core::recipe::PackageFileRule;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Fetches a remote archive and unpacks it.
pub trait PackageFetcher {
    /// Download `url` and extract it under `destination`.
    fn fetch_and_stage(&self, url: &Url, destination: &Path) -> Result<StagedArchive, FetchError>;
}

/// Copies files out of a staged archive.
pub trait FileInstaller {
    /// Apply `rules` to `staged`, copying matches under `destination`.
    fn install(
        &self,
        staged: &StagedArchive,
        rules: &[PackageFileRule],
        destination: &Path,
    ) -> Result<InstallManifest, InstallError>;
}

/// An archive that has been downloaded and extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedArchive {
    /// Directory holding the archive contents, with the single top-level
    /// directory (if any) already descended into
    pub root: PathBuf,

    /// Where the archive came from
    pub source_url: String,

    /// SHA-256 of the downloaded bytes
    pub sha256: String,
}

impl StagedArchive {
    pub fn new(root: impl Into<PathBuf>, source_url: impl Into<String>, sha256: impl Into<String>) -> Self {
        StagedArchive {
            root: root.into(),
            source_url: source_url.into(),
            sha256: sha256.into(),
        }
    }

    /// Path of a directory inside the staged tree.
    pub fn subdir(&self, relative: &str) -> PathBuf {
        match relative {
            "" | "." => self.root.clone(),
            rel => self.root.join(rel),
        }
    }
}

/// Files written by an install, relative to its destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallManifest {
    pub destination: PathBuf,
    pub files: Vec<PathBuf>,
}

impl InstallManifest {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        InstallManifest {
            destination: destination.into(),
            files: Vec::new(),
        }
    }

    /// Check whether a relative path was installed.
    pub fn contains(&self, relative: impl AsRef<Path>) -> bool {
        self.files.iter().any(|f| f == relative.as_ref())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Error while fetching or staging an archive.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to download {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to download {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to extract {url}: {message}")]
    Archive { url: String, message: String },

    #[error("archive entry `{entry}` escapes the destination directory")]
    UnsafePath { entry: String },

    #[error("unsupported archive format: {url}")]
    UnsupportedArchive { url: String },

    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("cannot download {url} in offline mode")]
    Offline { url: String },
}

impl FetchError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        FetchError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http { source, .. } => source.is_timeout() || source.is_connect(),
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            FetchError::Http { source, .. } => diag
                .with_context(source.to_string())
                .with_suggestion(suggestions::FETCH_FAILED),
            FetchError::Status { status: 404, .. } => diag
                .with_suggestion("Check the `[source] url` template and the requested version"),
            FetchError::Status { .. } => diag.with_suggestion(suggestions::FETCH_FAILED),
            FetchError::Offline { .. } => {
                diag.with_suggestion("Unset `net.offline` in .berth/config.toml")
            }
            FetchError::UnsupportedArchive { .. } => {
                diag.with_context("supported formats: .zip, .tar.gz, .tgz")
            }
            _ => diag,
        }
    }
}

/// Error while installing files from a staged archive.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid file pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("no files matching `{pattern}` under `{src}`")]
    NoMatches { pattern: String, src: String },
}

impl InstallError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        InstallError::Io {
            context: context.into(),
            source,
        }
    }
}
