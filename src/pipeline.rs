//! End-to-end resolution and install.
//!
//! ```text
//! request ─▶ release ─▶ index ─▶ URL ─▶ cache ─▶ extract ─▶ InstallOutcome
//! ```
//!
//! Every step either succeeds or ends the run with a single [`FetchError`];
//! nothing is reported until the whole chain has completed.

use crate::cache::CacheStore;
use crate::config::Settings;
use crate::error::{FetchError, Result};
use crate::extract::Extractor;
use crate::index::IndexLoader;
use crate::os_release::OsRelease;
use crate::platform::{self, Os, PlatformTuple};
use crate::release::resolve_release;
use crate::resolve::build_url;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// What the caller asked for; unset fields fall back to the host
#[derive(Debug, Clone, Default)]
pub struct InstallRequest {
    pub version: Option<String>,
    pub os: Option<Os>,
    pub arch: Option<String>,
    pub release: Option<String>,
}

/// Facts about the machine we run on
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub os: Os,
    pub arch: String,
    pub os_release: Option<OsRelease>,
}

impl HostInfo {
    pub fn detect() -> Self {
        let os = Os::host();
        let os_release = if os == Os::Linux {
            OsRelease::load()
        } else {
            None
        };
        Self {
            os,
            arch: platform::host_arch(),
            os_release,
        }
    }
}

/// A request pinned down to one artifact URL
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub tuple: PlatformTuple,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Result of a completed install
#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub install_dir: PathBuf,
    pub release: Option<String>,
    pub url: String,
    pub archive: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl InstallOutcome {
    /// `KEY=VALUE` lines for an enclosing build script
    pub fn env_lines(&self) -> Vec<String> {
        vec![
            format!("OPENVINO_INSTALL_DIR={}", self.install_dir.display()),
            format!("OPENVINO_RELEASE={}", self.release.as_deref().unwrap_or_default()),
        ]
    }
}

pub struct Pipeline {
    store: Arc<CacheStore>,
    loader: IndexLoader,
    extractor: Extractor,
    index_url: String,
    base_url: String,
    work_dir: PathBuf,
}

impl Pipeline {
    pub fn new(settings: &Settings, show_progress: bool) -> Result<Self> {
        let store = CacheStore::new(
            &settings.cache_dir,
            settings.connect_timeout,
            settings.timeout,
        )?
        .with_progress(show_progress);

        Ok(Self::from_store(Arc::new(store), settings))
    }

    pub fn from_store(store: Arc<CacheStore>, settings: &Settings) -> Self {
        Self {
            loader: IndexLoader::new(store.clone()),
            store,
            extractor: Extractor::default(),
            index_url: settings.index_url.clone(),
            base_url: settings.base_url.clone(),
            work_dir: settings.work_dir.clone(),
        }
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Fill in host defaults and pick the release. No network access.
    pub fn platform_tuple(
        &self,
        request: &InstallRequest,
        host: &HostInfo,
    ) -> Result<(PlatformTuple, Option<String>)> {
        let version = request
            .version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| FetchError::Config("a package version is required".into()))?;

        let os = request.os.clone().unwrap_or_else(|| host.os.clone());
        let arch = request
            .arch
            .as_deref()
            .map(platform::normalize_arch)
            .unwrap_or_else(|| host.arch.clone());

        let resolution = resolve_release(
            request.release.as_deref(),
            &os,
            version,
            host.os_release.as_ref(),
        )?;

        let tuple = PlatformTuple::new(version, os, arch).with_release(resolution.release);
        Ok((tuple, resolution.warning))
    }

    /// Resolve the request to a URL; only the index is fetched
    pub async fn resolve(&self, request: &InstallRequest, host: &HostInfo) -> Result<Resolution> {
        let (tuple, warning) = self.platform_tuple(request, host)?;
        let index = self.loader.load(&self.index_url).await?;
        let url = build_url(&index, &self.base_url, &tuple)?;
        debug!("Resolved {} to {}", tuple, url);
        Ok(Resolution {
            tuple,
            url,
            warning,
        })
    }

    /// Resolve, download (or reuse) and extract the artifact
    pub async fn install(
        &self,
        request: &InstallRequest,
        host: &HostInfo,
    ) -> Result<InstallOutcome> {
        let resolution = self.resolve(request, host).await?;
        let archive = self.store.fetch_cached(&resolution.url, None).await?;
        let install_dir = self.extractor.extract(&archive, &self.work_dir).await?;

        info!("Installed {} into {}", resolution.tuple, install_dir.display());
        Ok(InstallOutcome {
            install_dir,
            release: resolution.tuple.release,
            url: resolution.url,
            archive,
            warning: resolution.warning,
        })
    }

    /// Re-download the index, replacing any cached copy
    pub async fn refresh_index(&self) -> Result<usize> {
        let index = self.loader.refresh(&self.index_url).await?;
        Ok(index.versions().count())
    }
}
