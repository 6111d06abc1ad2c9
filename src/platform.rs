//! Platform tuples and host detection.
//!
//! A [`PlatformTuple`] identifies exactly one downloadable build:
//! - **version**: dotted numeric package version, e.g. `2024.1.0`
//! - **os**: `linux`, `macos`, `windows` (anything else is kept verbatim)
//! - **release**: OS-specific discriminator such as `ubuntu22` or `12_6`
//! - **arch**: CPU architecture as the index names it, e.g. `x86_64`, `arm64`
//!
//! Host detection only answers "what are we running on"; choosing a release
//! for that host is the job of [`crate::release`].

use crate::error::{FetchError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Operating system component of a platform tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Os {
    Linux,
    Macos,
    Windows,
    Other(String),
}

impl Os {
    pub fn as_str(&self) -> &str {
        match self {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
            Os::Other(name) => name,
        }
    }

    /// Operating system this binary was compiled for
    pub fn host() -> Self {
        std::env::consts::OS.parse().unwrap_or(Os::Other(std::env::consts::OS.to_string()))
    }
}

impl FromStr for Os {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "" => Err(FetchError::Config("empty operating system name".into())),
            "linux" => Ok(Os::Linux),
            "macos" | "darwin" | "osx" => Ok(Os::Macos),
            "windows" | "win" => Ok(Os::Windows),
            _ => Ok(Os::Other(lower)),
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Os> for String {
    fn from(os: Os) -> String {
        os.as_str().to_string()
    }
}

/// CPU architecture of the host, spelled the way the index spells it.
///
/// The index uses `arm64` rather than Rust's `aarch64`.
pub fn host_arch() -> String {
    normalize_arch(std::env::consts::ARCH)
}

pub fn normalize_arch(arch: &str) -> String {
    match arch.trim().to_ascii_lowercase().as_str() {
        "aarch64" => "arm64".to_string(),
        "amd64" | "x64" => "x86_64".to_string(),
        other => other.to_string(),
    }
}

/// Structured dotted version with numeric ordering.
///
/// Missing components are zero, so `2024.1` equals `2024.1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for Version {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || FetchError::Config(format!("invalid version '{}'", s));

        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }

        let mut nums = [0u64; 3];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Version::new(nums[0], nums[1], nums[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The lookup key for one artifact in the platform index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformTuple {
    pub version: String,
    pub os: Os,
    pub arch: String,
    pub release: Option<String>,
}

impl PlatformTuple {
    pub fn new(version: impl Into<String>, os: Os, arch: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            os,
            arch: arch.into(),
            release: None,
        }
    }

    pub fn with_release(mut self, release: Option<String>) -> Self {
        self.release = release;
        self
    }
}

impl fmt::Display for PlatformTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.release {
            Some(release) => write!(f, "{}/{}/{}/{}", self.version, self.os, release, self.arch),
            None => write!(f, "{}/{}/{}", self.version, self.os, self.arch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_aliases() {
        assert_eq!("Darwin".parse::<Os>().unwrap(), Os::Macos);
        assert_eq!("linux".parse::<Os>().unwrap(), Os::Linux);
        assert_eq!("win".parse::<Os>().unwrap(), Os::Windows);
        assert_eq!(
            "FreeBSD".parse::<Os>().unwrap(),
            Os::Other("freebsd".to_string())
        );
        assert!("".parse::<Os>().is_err());
    }

    #[test]
    fn test_host_detection() {
        let arch = host_arch();
        assert!(!arch.is_empty());
        #[cfg(target_arch = "aarch64")]
        assert_eq!(arch, "arm64");
        #[cfg(target_arch = "x86_64")]
        assert_eq!(arch, "x86_64");
        #[cfg(target_os = "linux")]
        assert_eq!(Os::host(), Os::Linux);
    }

    #[test]
    fn test_version_ordering_is_numeric() {
        let v = |s: &str| s.parse::<Version>().unwrap();
        assert!(v("2024.10.0") > v("2024.2.0"));
        assert!(v("2024.1.0") >= v("2024.1"));
        assert!(v("2023.3.0") < v("2024.1.0"));
        assert_eq!(v("2024.1"), Version::new(2024, 1, 0));
    }

    #[test]
    fn test_version_rejects_garbage() {
        assert!("2024.x".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_tuple_display() {
        let tuple = PlatformTuple::new("2023.1", Os::Linux, "x86_64")
            .with_release(Some("ubuntu20".into()));
        assert_eq!(tuple.to_string(), "2023.1/linux/ubuntu20/x86_64");

        let tuple = PlatformTuple::new("2023.1", Os::Windows, "x86_64");
        assert_eq!(tuple.to_string(), "2023.1/windows/x86_64");
    }
}
