//! OS release selection.
//!
//! Each package version ships separate builds per OS release, so the release
//! discriminator must be known before the index can be walked:
//! - **Linux**: distro id plus major version (`ubuntu20`, `ubuntu22`, `rhel8`)
//! - **macOS**: minimum deployment target (`10_15`, `12_6`)
//! - **Windows** and others: no discriminator
//!
//! One combination is known to be missing upstream: the `2022.x` series has no
//! `ubuntu22` builds. Such requests are downgraded to `ubuntu20` with a warning.

use crate::error::{FetchError, Result};
use crate::os_release::OsRelease;
use crate::platform::{Os, Version};
use tracing::warn;

/// Newest Linux release alias that lacks builds for old version series
pub const NEWEST_LINUX_RELEASE: &str = "ubuntu22";
/// Compatible alias used in its place
pub const FALLBACK_LINUX_RELEASE: &str = "ubuntu20";
/// Version series without builds for [`NEWEST_LINUX_RELEASE`]
pub const UNSUPPORTED_SERIES_PREFIX: &str = "2022.";

/// First version whose macOS builds require the newer deployment target
pub const MACOS_TARGET_THRESHOLD: Version = Version::new(2024, 1, 0);
pub const MACOS_LEGACY_TARGET: &str = "10_15";
pub const MACOS_CURRENT_TARGET: &str = "12_6";

/// Outcome of release selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseResolution {
    pub release: Option<String>,
    pub warning: Option<String>,
}

/// Pick the release discriminator for a request.
///
/// `host` is only consulted for Linux when no explicit release is given.
/// Never touches the network.
pub fn resolve_release(
    explicit: Option<&str>,
    os: &Os,
    version: &str,
    host: Option<&OsRelease>,
) -> Result<ReleaseResolution> {
    let release = match explicit.map(str::trim).filter(|r| !r.is_empty()) {
        Some(release) => Some(release.to_string()),
        None => default_release(os, version, host)?,
    };

    if release.as_deref() == Some(NEWEST_LINUX_RELEASE)
        && version.starts_with(UNSUPPORTED_SERIES_PREFIX)
    {
        let message = format!(
            "{} has no {} builds, using {} instead",
            version, NEWEST_LINUX_RELEASE, FALLBACK_LINUX_RELEASE
        );
        warn!("{}", message);
        return Ok(ReleaseResolution {
            release: Some(FALLBACK_LINUX_RELEASE.to_string()),
            warning: Some(message),
        });
    }

    Ok(ReleaseResolution {
        release,
        warning: None,
    })
}

fn default_release(os: &Os, version: &str, host: Option<&OsRelease>) -> Result<Option<String>> {
    match os {
        Os::Linux => {
            let host = host.ok_or_else(|| {
                FetchError::Config(
                    "no --release given and the host release descriptor is unavailable".into(),
                )
            })?;
            Ok(Some(linux_release(host)))
        }
        Os::Macos => {
            let target = if version.parse::<Version>()? >= MACOS_TARGET_THRESHOLD {
                MACOS_CURRENT_TARGET
            } else {
                MACOS_LEGACY_TARGET
            };
            Ok(Some(target.to_string()))
        }
        _ => Ok(None),
    }
}

/// `ubuntu` + `22.04` → `ubuntu22`
pub fn linux_release(host: &OsRelease) -> String {
    let major = host.version.split('.').next().unwrap_or_default();
    format!("{}{}", host.id, major)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ubuntu(version: &str) -> OsRelease {
        OsRelease {
            id: "ubuntu".into(),
            version: version.into(),
        }
    }

    #[test]
    fn test_explicit_release_kept() {
        let r = resolve_release(Some("ubuntu20"), &Os::Linux, "2023.1.0", None).unwrap();
        assert_eq!(r.release.as_deref(), Some("ubuntu20"));
        assert!(r.warning.is_none());
    }

    #[test]
    fn test_newest_release_downgraded_for_old_series() {
        for version in ["2022.3.0", "2022.1", "2022.3.1"] {
            let r = resolve_release(Some("ubuntu22"), &Os::Linux, version, None).unwrap();
            assert_eq!(r.release.as_deref(), Some("ubuntu20"));
            assert!(r.warning.as_deref().unwrap().contains("ubuntu20"));
        }
    }

    #[test]
    fn test_newest_release_kept_for_new_series() {
        let r = resolve_release(Some("ubuntu22"), &Os::Linux, "2023.0.0", None).unwrap();
        assert_eq!(r.release.as_deref(), Some("ubuntu22"));
        assert!(r.warning.is_none());
    }

    #[test]
    fn test_linux_default_from_host() {
        let host = ubuntu("20.04");
        let r = resolve_release(None, &Os::Linux, "2023.1.0", Some(&host)).unwrap();
        assert_eq!(r.release.as_deref(), Some("ubuntu20"));

        let rhel = OsRelease {
            id: "rhel".into(),
            version: "8.6".into(),
        };
        let r = resolve_release(None, &Os::Linux, "2023.1.0", Some(&rhel)).unwrap();
        assert_eq!(r.release.as_deref(), Some("rhel8"));
    }

    #[test]
    fn test_linux_default_is_downgraded_too() {
        let host = ubuntu("22.04");
        let r = resolve_release(None, &Os::Linux, "2022.3.0", Some(&host)).unwrap();
        assert_eq!(r.release.as_deref(), Some("ubuntu20"));
        assert!(r.warning.is_some());
    }

    #[test]
    fn test_linux_default_without_host_is_config_error() {
        let err = resolve_release(None, &Os::Linux, "2023.1.0", None).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_macos_target_uses_structured_compare() {
        let target = |v: &str| {
            resolve_release(None, &Os::Macos, v, None)
                .unwrap()
                .release
                .unwrap()
        };
        assert_eq!(target("2023.3.0"), "10_15");
        assert_eq!(target("2024.1.0"), "12_6");
        assert_eq!(target("2024.10.0"), "12_6");
        assert_eq!(target("2025.0"), "12_6");
    }

    #[test]
    fn test_windows_has_no_release() {
        let r = resolve_release(None, &Os::Windows, "2024.0.0", None).unwrap();
        assert_eq!(r.release, None);
    }
}
