//! Runtime settings: defaults, then environment, then command-line overrides.

use crate::cache;
use crate::error::{FetchError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INDEX_URL: &str = "https://storage.openvinotoolkit.org/filetree.json";
pub const DEFAULT_BASE_URL: &str = "https://storage.openvinotoolkit.org/repositories/openvino/packages";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub index_url: String,
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub work_dir: PathBuf,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: cache::cache_dir(),
            work_dir: PathBuf::from("."),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Settings {
    /// Defaults with `OVFETCH_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] but reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(url) = lookup("OVFETCH_INDEX_URL") {
            settings.index_url = url;
        }
        if let Some(url) = lookup("OVFETCH_BASE_URL") {
            settings.base_url = url;
        }
        if let Some(dir) = lookup("OVFETCH_CACHE_DIR") {
            settings.cache_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("OVFETCH_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                FetchError::Config(format!("OVFETCH_TIMEOUT_SECS is not a number: '{}'", secs))
            })?;
            settings.timeout = Duration::from_secs(secs);
        }

        Ok(settings)
    }
}
