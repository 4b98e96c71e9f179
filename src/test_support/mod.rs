//! Test utilities and mocks for Berth unit tests.
//!
//! Provides recipe fixtures and in-memory stand-ins for the fetch and
//! install adapters, so vendoring can be exercised without a network.

pub mod fixtures;

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;

use url::Url;

use crate::core::recipe::PackageFileRule;
use crate::sources::archive::staged_root;
use crate::sources::{
    FetchError, FileInstaller, InstallError, InstallManifest, PackageFetcher, StagedArchive,
};
use crate::util::fs::is_contained;
use crate::util::hash::Fingerprint;

/// Fetcher that "downloads" a fixed set of files.
#[derive(Debug, Default)]
pub struct MockFetcher {
    files: Vec<(String, Vec<u8>)>,
    failure: RefCell<Option<FetchError>>,
    requests: RefCell<Vec<String>>,
}

impl MockFetcher {
    /// Create a fetcher whose archive is empty.
    pub fn new() -> Self {
        MockFetcher::default()
    }

    /// Create a fetcher that fails its first request.
    pub fn failing(error: FetchError) -> Self {
        MockFetcher {
            failure: RefCell::new(Some(error)),
            ..Default::default()
        }
    }

    /// Add a file to the archive, by its path inside the archive.
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.to_string(), contents.into()));
        self
    }

    /// URLs requested so far.
    pub fn requested(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl PackageFetcher for MockFetcher {
    fn fetch_and_stage(&self, url: &Url, destination: &Path) -> Result<StagedArchive, FetchError> {
        self.requests.borrow_mut().push(url.to_string());

        if let Some(error) = self.failure.borrow_mut().take() {
            return Err(error);
        }

        let mut digest = Fingerprint::new();
        for (path, contents) in &self.files {
            let output = destination.join(path);
            if !is_contained(destination, &output) {
                return Err(FetchError::UnsafePath { entry: path.clone() });
            }
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| FetchError::io(format!("failed to create {}", parent.display()), e))?;
            }
            fs::write(&output, contents)
                .map_err(|e| FetchError::io(format!("failed to write {}", output.display()), e))?;

            digest.update_str(path);
            digest.update_str(&String::from_utf8_lossy(contents));
        }

        Ok(StagedArchive {
            root: staged_root(destination)?,
            source_url: url.to_string(),
            sha256: digest.finish(),
        })
    }
}

/// Installer that records what it was asked to do and installs nothing.
#[derive(Debug, Default)]
pub struct MockInstaller {
    rules: Cell<usize>,
}

impl MockInstaller {
    pub fn new() -> Self {
        MockInstaller::default()
    }

    /// Number of rules passed to the last install.
    pub fn rule_count(&self) -> usize {
        self.rules.get()
    }
}

impl FileInstaller for MockInstaller {
    fn install(
        &self,
        _staged: &StagedArchive,
        rules: &[PackageFileRule],
        destination: &Path,
    ) -> Result<InstallManifest, InstallError> {
        self.rules.set(rules.len());
        Ok(InstallManifest::new(destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mock_fetcher_stages_files() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new().with_file("pkg-1.0/LICENSE", "MIT");
        let url = Url::parse("https://example.com/v1.0.zip").unwrap();

        let staged = fetcher.fetch_and_stage(&url, tmp.path()).unwrap();
        assert_eq!(staged.root, tmp.path().join("pkg-1.0"));
        assert!(staged.root.join("LICENSE").is_file());
        assert_eq!(fetcher.requested(), vec![url.to_string()]);
    }

    #[test]
    fn test_mock_fetcher_failure_is_one_shot() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::failing(FetchError::Offline {
            url: "https://example.com".to_string(),
        });
        let url = Url::parse("https://example.com/v1.0.zip").unwrap();

        assert!(fetcher.fetch_and_stage(&url, tmp.path()).is_err());
        assert!(fetcher.fetch_and_stage(&url, tmp.path()).is_ok());
    }
}
