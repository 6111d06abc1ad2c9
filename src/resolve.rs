//! Turn a platform tuple into a download URL by walking the index.

use crate::error::{FetchError, Result};
use crate::index::{IndexNode, PlatformIndex};
use crate::platform::PlatformTuple;

/// Strip one trailing `.0` component; the index omits it.
///
/// `2023.1.0` → `2023.1` and `2024.0` → `2024`, while `2023.1.2` and
/// `2023.10` are unchanged.
pub fn normalize_version(version: &str) -> &str {
    version.strip_suffix(".0").unwrap_or(version)
}

/// Resolve `tuple` to an absolute artifact URL under `base_url`.
///
/// A miss at any level is a [`FetchError::Resolution`] naming the first
/// missing level. The index is only read.
pub fn build_url(index: &PlatformIndex, base_url: &str, tuple: &PlatformTuple) -> Result<String> {
    let relative = lookup(index, tuple)?;
    Ok(join_url(base_url, relative))
}

/// Relative artifact path for `tuple`
pub fn lookup<'a>(index: &'a PlatformIndex, tuple: &PlatformTuple) -> Result<&'a str> {
    let version = normalize_version(&tuple.version);
    let miss = |missing: String| FetchError::Resolution {
        tuple: tuple.to_string(),
        missing,
    };

    let mut node = index.version(version).ok_or_else(|| {
        let known: Vec<&str> = index.versions().collect();
        miss(with_suggestion(format!("version {}", version), version, &known))
    })?;

    let mut levels = vec![("os", tuple.os.as_str())];
    if let Some(release) = &tuple.release {
        levels.push(("release", release.as_str()));
    }
    levels.push(("arch", tuple.arch.as_str()));

    for (level, key) in levels {
        node = match node {
            IndexNode::Branch(children) => children.get(key).ok_or_else(|| {
                let known: Vec<&str> = children.keys().map(String::as_str).collect();
                miss(with_suggestion(format!("{} {}", level, key), key, &known))
            })?,
            IndexNode::Leaf(_) => return Err(miss(format!("{} {} (index ends early)", level, key))),
            IndexNode::Other(_) => {
                return Err(miss(format!("{} {} (unexpected index entry)", level, key)));
            }
        };
    }

    node.as_leaf()
        .ok_or_else(|| miss(format!("file name for arch {}", tuple.arch)))
}

/// Minimum Jaro-Winkler similarity for a key to be offered as a suggestion
const SUGGESTION_THRESHOLD: f64 = 0.85;

fn with_suggestion(missing: String, wanted: &str, known: &[&str]) -> String {
    let best = known
        .iter()
        .map(|candidate| (strsim::jaro_winkler(wanted, candidate), *candidate))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0));

    match best {
        Some((_, candidate)) => format!("{} (did you mean {}?)", missing, candidate),
        None => missing,
    }
}

fn join_url(base: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Os;

    const BASE: &str = "https://storage.example.org/packages/";

    fn index() -> PlatformIndex {
        PlatformIndex::from_json(
            r#"{"2023.1": {
                "linux": {"ubuntu20": {"x86_64": "openvino_2023.1_ubuntu20_x86_64.tgz"}},
                "windows": {"x86_64": "/windows/openvino_2023.1_windows_x86_64.zip"}
            }}"#,
        )
        .unwrap()
    }

    fn linux(version: &str, release: &str, arch: &str) -> PlatformTuple {
        PlatformTuple::new(version, Os::Linux, arch).with_release(Some(release.to_string()))
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(normalize_version("2023.1.0"), "2023.1");
        assert_eq!(normalize_version("2024.0.0"), "2024.0");
        assert_eq!(normalize_version("2024.0"), "2024");
        assert_eq!(normalize_version("2023.1.2"), "2023.1.2");
        assert_eq!(normalize_version("2023.1.10"), "2023.1.10");
        assert_eq!(normalize_version("2023.10"), "2023.10");
        assert_eq!(normalize_version("2023.1"), "2023.1");
    }

    #[test]
    fn test_build_url() {
        let url = build_url(&index(), BASE, &linux("2023.1.0", "ubuntu20", "x86_64")).unwrap();
        assert_eq!(
            url,
            "https://storage.example.org/packages/openvino_2023.1_ubuntu20_x86_64.tgz"
        );
    }

    #[test]
    fn test_build_url_without_release() {
        let tuple = PlatformTuple::new("2023.1", Os::Windows, "x86_64");
        let url = build_url(&index(), BASE, &tuple).unwrap();
        assert_eq!(
            url,
            "https://storage.example.org/packages/windows/openvino_2023.1_windows_x86_64.zip"
        );
    }

    #[test]
    fn test_build_url_is_repeatable() {
        let index = index();
        let before = index.clone();
        let tuple = linux("2023.1.0", "ubuntu20", "x86_64");
        let first = build_url(&index, BASE, &tuple).unwrap();
        let second = build_url(&index, BASE, &tuple).unwrap();
        assert_eq!(first, second);
        assert_eq!(index, before);
    }

    #[test]
    fn test_miss_names_first_missing_level() {
        let index = index();

        let err = build_url(&index, BASE, &linux("2022.3.0", "ubuntu20", "x86_64")).unwrap_err();
        assert!(matches!(&err, FetchError::Resolution { missing, .. } if missing.starts_with("version 2022.3")));

        let err = build_url(&index, BASE, &linux("2023.1.0", "rhel8", "x86_64")).unwrap_err();
        assert!(matches!(&err, FetchError::Resolution { missing, .. } if missing == "release rhel8"));

        let err = build_url(&index, BASE, &linux("2023.1.0", "ubuntu20", "arm64")).unwrap_err();
        assert!(matches!(&err, FetchError::Resolution { missing, .. } if missing == "arch arm64"));
        assert!(err.to_string().contains("2023.1.0/linux/ubuntu20/arm64"));

        let tuple = PlatformTuple::new("2023.1.0", Os::Macos, "arm64");
        let err = build_url(&index, BASE, &tuple).unwrap_err();
        assert!(matches!(&err, FetchError::Resolution { missing, .. } if missing == "os macos"));
    }

    #[test]
    fn test_miss_suggests_close_key() {
        let err = build_url(&index(), BASE, &linux("2023.1.0", "ubuntu22", "x86_64")).unwrap_err();
        assert!(
            err.to_string().ends_with("missing release ubuntu22 (did you mean ubuntu20?)"),
            "{}",
            err
        );
    }

    #[test]
    fn test_shape_mismatch_is_a_miss() {
        let index = index();

        // Windows has no release level, so the arch key lands on a leaf
        let tuple = PlatformTuple::new("2023.1", Os::Windows, "x86_64")
            .with_release(Some("x86_64".to_string()));
        assert_eq!(build_url(&index, BASE, &tuple).unwrap_err().kind(), "resolution");

        // Linux without a release stops on a branch
        let tuple = PlatformTuple::new("2023.1", Os::Linux, "ubuntu20");
        assert_eq!(build_url(&index, BASE, &tuple).unwrap_err().kind(), "resolution");
    }

    #[test]
    fn test_foreign_entry_is_a_miss_at_its_level() {
        let index = PlatformIndex::from_json(
            r#"{
                "2023.1": {"linux": {"ubuntu20": {"x86_64": "a.tgz"}, "ubuntu22": ["x86_64"]}},
                "latest": ["2023.1"]
            }"#,
        )
        .unwrap();

        let url = build_url(&index, BASE, &linux("2023.1.0", "ubuntu20", "x86_64")).unwrap();
        assert_eq!(url, "https://storage.example.org/packages/a.tgz");

        let err = build_url(&index, BASE, &linux("2023.1.0", "ubuntu22", "x86_64")).unwrap_err();
        assert!(
            matches!(&err, FetchError::Resolution { missing, .. } if missing.starts_with("arch x86_64")),
            "{}",
            err
        );

        let err = build_url(&index, BASE, &linux("latest", "ubuntu20", "x86_64")).unwrap_err();
        assert!(
            matches!(&err, FetchError::Resolution { missing, .. } if missing.starts_with("os linux")),
            "{}",
            err
        );
    }
}
