//! Library interface for ovfetch
//!
//! Resolves a `(version, os, arch, release)` tuple against a remote platform
//! index, downloads the matching archive into a local cache and extracts it.

pub mod apt;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod os_release;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod release;
pub mod resolve;

// Re-export commonly used items
pub use cache::CacheStore;
pub use error::{FetchError, Result};
pub use index::{PlatformIndex, load_index};
pub use pipeline::{HostInfo, InstallOutcome, InstallRequest, Pipeline};
pub use platform::{Os, PlatformTuple};
pub use resolve::{build_url, normalize_version};
