//! Host release descriptor (`/etc/os-release`) parsing.

use std::path::Path;
use tracing::debug;

const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Distribution identity read from the host release descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub version: String,
}

impl OsRelease {
    /// Parse `KEY=VALUE` lines, keeping `ID` and `VERSION_ID`.
    ///
    /// Returns `None` when either key is missing.
    pub fn parse(content: &str) -> Option<Self> {
        let mut id = None;
        let mut version = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            match key.trim() {
                "ID" => id = Some(value.to_string()),
                "VERSION_ID" => version = Some(value.to_string()),
                _ => {}
            }
        }

        Some(Self {
            id: id?,
            version: version?,
        })
    }

    pub fn load_from(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Self::parse(&content)
    }

    /// Read the descriptor from its conventional locations
    pub fn load() -> Option<Self> {
        OS_RELEASE_PATHS.iter().find_map(|p| {
            let found = Self::load_from(Path::new(p));
            if let Some(os) = &found {
                debug!("Host release from {}: {} {}", p, os.id, os.version);
            }
            found
        })
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ubuntu() {
        let content = r#"
PRETTY_NAME="Ubuntu 22.04.3 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
VERSION="22.04.3 LTS (Jammy Jellyfish)"
ID=ubuntu
ID_LIKE=debian
"#;
        let os = OsRelease::parse(content).unwrap();
        assert_eq!(os.id, "ubuntu");
        assert_eq!(os.version, "22.04");
    }

    #[test]
    fn test_parse_single_quotes_and_comments() {
        let content = "# comment\nID='rhel'\n\nVERSION_ID='8.6'\n";
        let os = OsRelease::parse(content).unwrap();
        assert_eq!(os.id, "rhel");
        assert_eq!(os.version, "8.6");
    }

    #[test]
    fn test_parse_missing_version() {
        assert!(OsRelease::parse("ID=arch\nBUILD_ID=rolling\n").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("os-release");
        std::fs::write(&path, "ID=debian\nVERSION_ID=\"12\"\n").unwrap();

        let os = OsRelease::load_from(&path).unwrap();
        assert_eq!(os.id, "debian");
        assert_eq!(os.version, "12");
        assert!(OsRelease::load_from(&dir.path().join("missing")).is_none());
    }
}
