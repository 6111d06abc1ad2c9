//! Download cache keyed by filename.
//!
//! `fetch_cached` returns the local copy of a remote resource, downloading it
//! only when nothing exists at the computed path. Presence is the only check:
//! there is no TTL and no checksum.
//!
//! Downloads stream into a hidden temporary file in the cache directory and are
//! moved into place only after the body is complete and synced, so a failed or
//! interrupted transfer never leaves a file that later runs would trust. The
//! final move never overwrites: if another process finished first, its copy is
//! kept and ours is discarded.

use crate::error::{FetchError, Result};
use crate::progress;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

const PARTIAL_SUFFIX: &str = ".part";

/// Get the cache directory (~/.cache/ovfetch/ or equivalent)
pub fn cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("OVFETCH_CACHE_DIR") {
        PathBuf::from(dir)
    } else if let Some(cache_home) = std::env::var_os("XDG_CACHE_HOME") {
        PathBuf::from(cache_home).join("ovfetch")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".cache/ovfetch")
    } else {
        PathBuf::from(".cache/ovfetch")
    }
}

/// Default cache key: the final path segment of the URL
pub fn key_for_url(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::retrieval(url, e))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FetchError::retrieval(url, "URL has no file name to cache under"))
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(FetchError::Config(format!("invalid cache key '{}'", key)));
    }
    Ok(())
}

fn not_a_file(url: &str, path: &Path) -> FetchError {
    FetchError::retrieval(url, format!("{} exists and is not a regular file", path.display()))
}

/// A file present in the cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
}

pub struct CacheStore {
    dir: PathBuf,
    client: reqwest::Client,
    show_progress: bool,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .user_agent(format!("ovfetch/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            dir: dir.into(),
            client,
            show_progress: false,
            key_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Draw a progress bar while downloading (only when stderr is a terminal)
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Return the local copy of `url`, downloading it if absent.
    ///
    /// `key` overrides the file name used inside the cache directory.
    pub async fn fetch_cached(&self, url: &str, key: Option<&str>) -> Result<PathBuf> {
        let key = match key {
            Some(key) => key.to_string(),
            None => key_for_url(url)?,
        };
        validate_key(&key)?;
        let path = self.path_for(&key);

        if path.is_file() {
            debug!("Cache hit for {} at {}", key, path.display());
            return Ok(path);
        }
        if path.exists() {
            return Err(not_a_file(url, &path));
        }

        let lock = self.key_lock(&key).await;
        let result = {
            let _guard = lock.lock().await;
            self.fill(url, &key, &path).await
        };
        self.release_key_lock(&key, lock).await;

        result.map(|()| path)
    }

    async fn fill(&self, url: &str, key: &str, path: &Path) -> Result<()> {
        // Another task may have finished the same key while we waited
        if path.is_file() {
            debug!("Cache filled concurrently for {}", key);
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| FetchError::retrieval(url, format!("cannot create cache directory: {}", e)))?;

        info!("Downloading {} to {}", url, path.display());
        self.download(url, key, path).await
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Forget the lock for `key` once no other task holds or waits on it
    async fn release_key_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.key_locks.lock().await;
        // Ours plus the map's copy; clones are only handed out under this lock
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    /// Number of keys with a download in flight or queued
    pub async fn pending_keys(&self) -> usize {
        self.key_locks.lock().await.len()
    }

    async fn download(&self, url: &str, key: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::retrieval(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::retrieval(url, format!("HTTP {}", status)));
        }

        // Removed on drop unless persisted below
        let partial = tempfile::Builder::new()
            .prefix(&format!(".{}.", key))
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| FetchError::retrieval(url, e))?;
        let std_file = partial
            .as_file()
            .try_clone()
            .map_err(|e| FetchError::retrieval(url, e))?;
        let mut file = tokio::fs::File::from_std(std_file);

        let bar = self
            .show_progress
            .then(|| progress::download_bar(key, response.content_length()));
        let mut downloaded: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::retrieval(url, e))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::retrieval(url, e))?;
            downloaded += chunk.len() as u64;
            if let Some(bar) = &bar {
                bar.set_position(downloaded);
            }
        }

        file.flush().await.map_err(|e| FetchError::retrieval(url, e))?;
        file.sync_all()
            .await
            .map_err(|e| FetchError::retrieval(url, e))?;
        drop(file);

        if let Some(bar) = &bar {
            bar.finish_and_clear();
        }

        match partial.persist_noclobber(dest) {
            Ok(_) => {
                debug!("Stored {} bytes as {}", downloaded, dest.display());
                Ok(())
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                if !dest.is_file() {
                    return Err(not_a_file(url, dest));
                }
                debug!("{} was cached by another process, keeping it", dest.display());
                Ok(())
            }
            Err(e) => Err(FetchError::retrieval(url, e.error)),
        }
    }

    /// Remove one cached file; returns whether anything was removed
    pub fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FetchError::retrieval(&path.display().to_string(), e)),
        }
    }

    /// List completed cache files, sorted by key
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        if !self.dir.exists() {
            return Ok(entries);
        }

        let read_dir = std::fs::read_dir(&self.dir).map_err(|e| self.dir_error(e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| self.dir_error(e))?;
            let key = entry.file_name().to_string_lossy().into_owned();
            let metadata = entry.metadata().map_err(|e| self.dir_error(e))?;
            if !metadata.is_file() || key.starts_with('.') {
                continue;
            }
            entries.push(CacheEntry {
                key,
                path: entry.path(),
                size: metadata.len(),
            });
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// Delete every cached file, leftover partial downloads included
    pub fn clear(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let read_dir = std::fs::read_dir(&self.dir).map_err(|e| self.dir_error(e))?;
        for entry in read_dir {
            let path = entry.map_err(|e| self.dir_error(e))?.path();
            if path.is_file() {
                std::fs::remove_file(&path).map_err(|e| self.dir_error(e))?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn dir_error(&self, e: std::io::Error) -> FetchError {
        FetchError::retrieval(&self.dir.display().to_string(), e)
    }
}
