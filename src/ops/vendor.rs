//! Vendoring: fetch a recipe's source archive and install its package files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::recipe::Recipe;
use crate::sources::{FileInstaller, InstallManifest, PackageFetcher};
use crate::util::fs::ensure_dir;

/// Options for vendoring a package.
#[derive(Debug, Clone)]
pub struct VendorOptions {
    /// Version to fetch; defaults to the recipe's version
    pub version: Option<String>,

    /// Directory to install into
    pub dest: PathBuf,
}

/// Result of vendoring a package.
#[derive(Debug, Clone, Serialize)]
pub struct VendorResult {
    pub package: String,
    pub version: String,
    pub url: String,
    pub sha256: String,
    pub installed: InstallManifest,
    /// Consumer metadata from `[package-info]`, passed through unchanged
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub package_info: BTreeMap<String, String>,
}

/// Fetch, stage and install a vendored package.
pub fn vendor(
    recipe: &Recipe,
    opts: &VendorOptions,
    fetcher: &dyn PackageFetcher,
    installer: &dyn FileInstaller,
) -> Result<VendorResult> {
    let version = recipe
        .effective_version(opts.version.as_deref())
        .with_context(|| {
            format!(
                "recipe `{}` has no version; pass `--version`",
                recipe.name()
            )
        })?
        .to_string();

    let url = recipe.source_url(&version)?;

    let staging = tempfile::tempdir().context("failed to create staging directory")?;
    let staged = fetcher
        .fetch_and_stage(&url, staging.path())
        .with_context(|| format!("failed to fetch {} {}", recipe.name(), version))?;

    ensure_dir(&opts.dest)?;
    let installed = installer
        .install(&staged, recipe.package_files(), &opts.dest)
        .with_context(|| format!("failed to install {} {}", recipe.name(), version))?;

    tracing::info!(
        "Installed {} files for {} {} into {}",
        installed.len(),
        recipe.name(),
        version,
        opts.dest.display()
    );

    Ok(VendorResult {
        package: recipe.name().to_string(),
        version,
        url: url.to_string(),
        sha256: staged.sha256,
        installed,
        package_info: recipe.package_info().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FetchError, GlobInstaller, InstallError};
    use crate::test_support::fixtures;
    use crate::test_support::{MockFetcher, MockInstaller};
    use tempfile::TempDir;

    fn oup_fetcher() -> MockFetcher {
        MockFetcher::new()
            .with_file("observable_unique_ptr-0.7.2/LICENSE", "MIT")
            .with_file(
                "observable_unique_ptr-0.7.2/include/oup/observable_unique_ptr.hpp",
                "#pragma once",
            )
            .with_file("observable_unique_ptr-0.7.2/README.md", "# oup")
    }

    #[test]
    fn test_vendor_header_library() {
        let recipe = fixtures::observable_unique_ptr();
        let out = TempDir::new().unwrap();
        let fetcher = oup_fetcher();
        let opts = VendorOptions {
            version: None,
            dest: out.path().join("package"),
        };

        let result = vendor(&recipe, &opts, &fetcher, &GlobInstaller::new()).unwrap();

        assert_eq!(result.version, "0.7.2");
        assert_eq!(
            result.url,
            "https://github.com/cschreib/observable_unique_ptr/archive/refs/tags/v0.7.2.zip"
        );
        assert_eq!(fetcher.requested(), vec![result.url.clone()]);
        assert!(result.installed.contains("licenses/LICENSE"));
        assert!(result.installed.contains("include/oup/observable_unique_ptr.hpp"));
        assert!(!out.path().join("package/README.md").exists());
        assert_eq!(result.package_info["cmake_file_name"], "oup");
    }

    #[test]
    fn test_vendor_explicit_version() {
        let recipe = fixtures::observable_unique_ptr();
        let out = TempDir::new().unwrap();
        let fetcher = MockFetcher::new()
            .with_file("observable_unique_ptr-0.6.0/LICENSE", "MIT")
            .with_file("observable_unique_ptr-0.6.0/include/oup.hpp", "");
        let opts = VendorOptions {
            version: Some("0.6.0".to_string()),
            dest: out.path().to_path_buf(),
        };

        let result = vendor(&recipe, &opts, &fetcher, &GlobInstaller::new()).unwrap();
        assert_eq!(result.version, "0.6.0");
        assert!(result.url.ends_with("v0.6.0.zip"));
    }

    #[test]
    fn test_vendor_fetch_failure() {
        let recipe = fixtures::observable_unique_ptr();
        let out = TempDir::new().unwrap();
        let fetcher = MockFetcher::failing(FetchError::Status {
            url: "https://example.com".to_string(),
            status: 404,
        });
        let opts = VendorOptions {
            version: None,
            dest: out.path().to_path_buf(),
        };

        let err = vendor(&recipe, &opts, &fetcher, &MockInstaller::new()).unwrap_err();
        assert!(err.downcast_ref::<FetchError>().is_some());
    }

    #[test]
    fn test_vendor_required_license_missing() {
        let recipe = fixtures::observable_unique_ptr();
        let out = TempDir::new().unwrap();
        let fetcher = MockFetcher::new().with_file("oup/include/oup.hpp", "");
        let opts = VendorOptions {
            version: None,
            dest: out.path().to_path_buf(),
        };

        let err = vendor(&recipe, &opts, &fetcher, &GlobInstaller::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::NoMatches { .. })
        ));
    }

    #[test]
    fn test_vendor_without_source() {
        let recipe = fixtures::lxgui();
        let out = TempDir::new().unwrap();
        let opts = VendorOptions {
            version: Some("2.0.0".to_string()),
            dest: out.path().to_path_buf(),
        };

        let err = vendor(&recipe, &opts, &MockFetcher::new(), &MockInstaller::new()).unwrap_err();
        assert!(err.to_string().contains("no [source] section"));
    }

    #[test]
    fn test_vendor_passes_rules_to_installer() {
        let recipe = fixtures::observable_unique_ptr();
        let out = TempDir::new().unwrap();
        let installer = MockInstaller::new();
        let opts = VendorOptions {
            version: None,
            dest: out.path().to_path_buf(),
        };

        vendor(&recipe, &opts, &oup_fetcher(), &installer).unwrap();
        assert_eq!(installer.rule_count(), recipe.package_files().len());
    }
}
