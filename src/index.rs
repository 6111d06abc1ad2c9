//! Remote platform index ("filetree").
//!
//! The index is a JSON tree whose nesting encodes
//! `version → os → release → arch → relative path`:
//!
//! ```text
//! {
//!   "2023.1": {
//!     "linux": { "ubuntu20": { "x86_64": "openvino_2023.1_ubuntu20_x86_64.tgz" } },
//!     "windows": { "x86_64": "openvino_2023.1_windows_x86_64.zip" }
//!   }
//! }
//! ```
//!
//! It is fetched through the [`CacheStore`] under a fixed file name and parsed
//! once per process. The [`IndexLoader`] keeps parsed trees in memory keyed by
//! URL; a refresh replaces an entry wholesale, never patches it.

use crate::cache::CacheStore;
use crate::error::{FetchError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Local cache file name for the downloaded index
pub const INDEX_CACHE_KEY: &str = "filetree.json";

/// One level of the index tree
///
/// Arrays, numbers and nulls are kept as [`IndexNode::Other`] so that a
/// foreign entry only fails lookups that pass through it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IndexNode {
    Leaf(String),
    Branch(BTreeMap<String, IndexNode>),
    Other(serde_json::Value),
}

impl IndexNode {
    pub fn child(&self, key: &str) -> Option<&IndexNode> {
        match self {
            IndexNode::Branch(children) => children.get(key),
            IndexNode::Leaf(_) | IndexNode::Other(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            IndexNode::Leaf(path) => Some(path),
            IndexNode::Branch(_) | IndexNode::Other(_) => None,
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            IndexNode::Branch(children) => children.keys().map(String::as_str).collect(),
            IndexNode::Leaf(_) | IndexNode::Other(_) => Vec::new(),
        }
    }
}

/// Parsed, read-only platform index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformIndex {
    root: BTreeMap<String, IndexNode>,
}

impl PlatformIndex {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        let root = serde_json::from_str(content)?;
        Ok(Self { root })
    }

    pub fn version(&self, version: &str) -> Option<&IndexNode> {
        self.root.get(version)
    }

    /// Follow `path` from the root, returning the node it ends at
    pub fn get(&self, path: &[&str]) -> Option<&IndexNode> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.root.get(*first)?, |node, key| node.child(key))
    }

    /// Top-level version keys in index order
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }
}

/// Loads indexes through the cache and memoizes the parsed result
pub struct IndexLoader {
    store: Arc<CacheStore>,
    parsed: moka::future::Cache<String, Arc<PlatformIndex>>,
}

impl IndexLoader {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            parsed: moka::future::Cache::new(8),
        }
    }

    /// Load the index at `url`, reusing the in-memory copy when present
    pub async fn load(&self, url: &str) -> Result<Arc<PlatformIndex>> {
        if let Some(index) = self.parsed.get(url).await {
            return Ok(index);
        }

        let index = Arc::new(load_index(&self.store, url).await?);
        self.parsed.insert(url.to_string(), index.clone()).await;
        Ok(index)
    }

    /// Drop both the cached file and the parsed copy, then load again
    pub async fn refresh(&self, url: &str) -> Result<Arc<PlatformIndex>> {
        self.parsed.invalidate(url).await;
        self.store.remove(INDEX_CACHE_KEY).map_err(|e| FetchError::IndexLoad {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        self.load(url).await
    }
}

/// Fetch (or reuse) the index file and parse it
pub async fn load_index(store: &CacheStore, url: &str) -> Result<PlatformIndex> {
    let index_error = |reason: String| FetchError::IndexLoad {
        url: url.to_string(),
        reason,
    };

    let path = store
        .fetch_cached(url, Some(INDEX_CACHE_KEY))
        .await
        .map_err(|e| index_error(e.to_string()))?;

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| index_error(format!("cannot read {}: {}", path.display(), e)))?;

    let index = PlatformIndex::from_json(&content)
        .map_err(|e| index_error(format!("invalid index JSON in {}: {}", path.display(), e)))?;

    debug!("Loaded index with {} versions", index.root.len());
    Ok(index)
}
