//! Glob-based file installer.

use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::core::recipe::PackageFileRule;
use crate::sources::{FileInstaller, InstallError, InstallManifest, StagedArchive};
use crate::util::fs::{is_contained, relative_path};

/// Copies files matching glob patterns, preserving their layout below
/// the rule's source directory.
///
/// Patterns are matched against the path relative to `src` with `/`
/// separators, and `*` may cross directory boundaries, so `*.hpp` picks
/// up headers at any depth.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobInstaller;

impl GlobInstaller {
    pub fn new() -> Self {
        GlobInstaller
    }

    fn matching_files(base: &Path, pattern: &Pattern) -> Result<Vec<PathBuf>, InstallError> {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        let mut matches = Vec::new();
        for entry in WalkDir::new(base).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let context = format!("failed to walk {}", base.display());
                InstallError::io(context, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_path(base, entry.path());
            let normalized = relative.to_string_lossy().replace('\\', "/");
            if pattern.matches_with(&normalized, options) {
                matches.push(relative);
            }
        }

        Ok(matches)
    }
}

impl FileInstaller for GlobInstaller {
    fn install(
        &self,
        staged: &StagedArchive,
        rules: &[PackageFileRule],
        destination: &Path,
    ) -> Result<InstallManifest, InstallError> {
        let mut manifest = InstallManifest::new(destination);

        for rule in rules {
            let pattern = Pattern::new(&rule.pattern).map_err(|e| InstallError::Pattern {
                pattern: rule.pattern.clone(),
                message: e.to_string(),
            })?;

            let base = staged.subdir(&rule.src);
            let dst_dir = match rule.dst.as_str() {
                "" | "." => destination.to_path_buf(),
                dst => destination.join(dst),
            };

            if !is_contained(&staged.root, &base) || !is_contained(destination, &dst_dir) {
                return Err(InstallError::Pattern {
                    pattern: rule.to_string(),
                    message: "`src` and `dst` must stay inside their directories".to_string(),
                });
            }

            let matches = if base.is_dir() {
                Self::matching_files(&base, &pattern)?
            } else {
                Vec::new()
            };

            if matches.is_empty() {
                if rule.required {
                    return Err(InstallError::NoMatches {
                        pattern: rule.pattern.clone(),
                        src: rule.src.clone(),
                    });
                }
                tracing::warn!("package-files rule `{}` matched nothing", rule);
                continue;
            }

            for relative in matches {
                let from = base.join(&relative);
                let to = dst_dir.join(&relative);

                if let Some(parent) = to.parent() {
                    fs::create_dir_all(parent).map_err(|e| {
                        InstallError::io(format!("failed to create {}", parent.display()), e)
                    })?;
                }
                fs::copy(&from, &to).map_err(|e| {
                    InstallError::io(
                        format!("failed to copy {} to {}", from.display(), to.display()),
                        e,
                    )
                })?;

                let installed = relative_path(destination, &to);
                tracing::debug!("installed {}", installed.display());
                if !manifest.contains(&installed) {
                    manifest.files.push(installed);
                }
            }
        }

        Ok(manifest)
    }
}
