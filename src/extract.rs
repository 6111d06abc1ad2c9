//! Archive extraction through external tools.
//!
//! The archive format is decided purely by file extension:
//!
//! | extension | tool  | arguments      |
//! |-----------|-------|----------------|
//! | `tgz`     | `tar` | `-xf <path>`   |
//! | `zip`     | `7z`  | `x <path>`     |
//!
//! The tool runs in the extraction directory with the caller's stdio, so its
//! progress output is visible. It produces a directory named after the archive
//! with the extension stripped; [`archive_base_name`] computes that name
//! without touching the filesystem.
//!
//! # Examples
//!
//! ```no_run
//! use ovfetch::extract::Extractor;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let install_dir = Extractor::default()
//!         .extract(Path::new("openvino_2023.1_ubuntu20_x86_64.tgz"), Path::new("."))
//!         .await?;
//!     println!("Extracted to: {}", install_dir.display());
//!     Ok(())
//! }
//! ```

use crate::error::{FetchError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tgz,
    Zip,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match extension {
            "tgz" => Ok(ArchiveFormat::Tgz),
            "zip" => Ok(ArchiveFormat::Zip),
            "" => Err(FetchError::UnsupportedFormat(format!(
                "{} has no extension",
                path.display()
            ))),
            other => Err(FetchError::UnsupportedFormat(other.to_string())),
        }
    }

    fn args(&self, archive: &Path) -> Vec<OsString> {
        let flag = match self {
            ArchiveFormat::Tgz => "-xf",
            ArchiveFormat::Zip => "x",
        };
        vec![OsString::from(flag), archive.as_os_str().to_owned()]
    }
}

/// Directory an archive unpacks into: its file name minus the extension
pub fn archive_base_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            FetchError::UnsupportedFormat(format!("{} has no usable file name", path.display()))
        })
}

/// Runs the external extraction tools
#[derive(Debug, Clone)]
pub struct Extractor {
    tar: String,
    zip: String,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            tar: "tar".to_string(),
            zip: "7z".to_string(),
        }
    }
}

impl Extractor {
    pub fn new(tar: impl Into<String>, zip: impl Into<String>) -> Self {
        Self {
            tar: tar.into(),
            zip: zip.into(),
        }
    }

    /// Program and arguments that would extract `archive`
    pub fn command_for(&self, archive: &Path) -> Result<(&str, Vec<OsString>)> {
        let format = ArchiveFormat::from_path(archive)?;
        let program = match format {
            ArchiveFormat::Tgz => self.tar.as_str(),
            ArchiveFormat::Zip => self.zip.as_str(),
        };
        Ok((program, format.args(archive)))
    }

    /// Extract `archive` inside `work_dir` and return the expected install
    /// directory as an absolute path.
    ///
    /// Whether that directory was actually produced is left to the caller. The
    /// child process is killed if this future is dropped before it exits.
    pub async fn extract(&self, archive: &Path, work_dir: &Path) -> Result<PathBuf> {
        let extraction_error = |reason: String| FetchError::Extraction {
            path: archive.display().to_string(),
            reason,
        };

        let base_name = archive_base_name(archive)?;
        let absolute = std::path::absolute(archive)
            .map_err(|e| extraction_error(format!("cannot resolve path: {}", e)))?;
        let (program, args) = self.command_for(&absolute)?;

        info!("Extracting {} into {}", archive.display(), work_dir.display());
        debug!("Running {} {:?}", program, args);

        let status = Command::new(program)
            .args(&args)
            .current_dir(work_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| extraction_error(format!("failed to run {}: {}", program, e)))?;

        if !status.success() {
            return Err(extraction_error(format!("{} exited with {}", program, status)));
        }

        std::path::absolute(work_dir.join(base_name))
            .map_err(|e| extraction_error(format!("cannot resolve install directory: {}", e)))
    }
}
