//! Archive extraction.
//!
//! Supports `.zip` and gzip-compressed tarballs. Every entry is checked
//! before it is written; an entry whose path would land outside the
//! destination aborts the extraction.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use zip::ZipArchive;

use crate::sources::FetchError;
use crate::util::fs::is_contained;

/// Archive formats that can be staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from a file name or URL path.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else {
            None
        }
    }
}

/// Extract archive bytes into `dest`.
///
/// `origin` names the archive in error messages.
pub fn extract(
    data: &[u8],
    format: ArchiveFormat,
    dest: &Path,
    origin: &str,
) -> Result<(), FetchError> {
    fs::create_dir_all(dest)
        .map_err(|e| FetchError::io(format!("failed to create {}", dest.display()), e))?;

    match format {
        ArchiveFormat::Zip => extract_zip(data, dest, origin),
        ArchiveFormat::TarGz => extract_tar_gz(data, dest, origin),
    }
}

fn extract_zip(data: &[u8], dest: &Path, origin: &str) -> Result<(), FetchError> {
    let archive_error = |e: zip::result::ZipError| FetchError::Archive {
        url: origin.to_string(),
        message: e.to_string(),
    };

    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(archive_error)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(archive_error)?;

        let relative = file
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| FetchError::UnsafePath {
                entry: file.name().to_string(),
            })?;
        let output = checked_output(dest, &relative, file.name())?;

        if file.is_dir() {
            fs::create_dir_all(&output)
                .map_err(|e| FetchError::io(format!("failed to create {}", output.display()), e))?;
            continue;
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| FetchError::io(format!("failed to create {}", parent.display()), e))?;
        }

        let mut out = fs::File::create(&output)
            .map_err(|e| FetchError::io(format!("failed to create {}", output.display()), e))?;
        io::copy(&mut file, &mut out)
            .map_err(|e| FetchError::io(format!("failed to write {}", output.display()), e))?;
    }

    Ok(())
}

fn extract_tar_gz(data: &[u8], dest: &Path, origin: &str) -> Result<(), FetchError> {
    let archive_error = |e: io::Error| FetchError::Archive {
        url: origin.to_string(),
        message: e.to_string(),
    };

    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        let relative = entry.path().map_err(archive_error)?.into_owned();
        let entry_name = relative.to_string_lossy().into_owned();
        let output = checked_output(dest, &relative, &entry_name)?;

        match entry.header().entry_type() {
            tar::EntryType::Directory => {
                fs::create_dir_all(&output).map_err(|e| {
                    FetchError::io(format!("failed to create {}", output.display()), e)
                })?;
            }
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                if let Some(parent) = output.parent() {
                    fs::create_dir_all(parent).map_err(|e| {
                        FetchError::io(format!("failed to create {}", parent.display()), e)
                    })?;
                }
                entry.unpack(&output).map_err(|e| {
                    FetchError::io(format!("failed to extract {}", output.display()), e)
                })?;
            }
            other => {
                tracing::debug!("skipping {:?} entry `{}`", other, entry_name);
            }
        }
    }

    Ok(())
}

fn checked_output(dest: &Path, relative: &Path, entry: &str) -> Result<PathBuf, FetchError> {
    let escapes = relative
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)));
    let output = dest.join(relative);

    if escapes || !is_contained(dest, &output) {
        return Err(FetchError::UnsafePath {
            entry: entry.to_string(),
        });
    }

    Ok(output)
}

/// The directory to treat as the archive root.
///
/// Source archives usually wrap everything in one `{name}-{version}/`
/// directory; when that is the case it is returned, otherwise `dest`.
pub fn staged_root(dest: &Path) -> Result<PathBuf, FetchError> {
    let entries: Vec<PathBuf> = fs::read_dir(dest)
        .map_err(|e| FetchError::io(format!("failed to read {}", dest.display()), e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();

    match entries.as_slice() {
        [single] if single.is_dir() => {
            tracing::debug!("using single top-level directory {}", single.display());
            Ok(single.clone())
        }
        _ => Ok(dest.to_path_buf()),
    }
}
