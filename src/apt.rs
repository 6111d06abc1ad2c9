//! System package manager path: hand the request to an installer script.

use crate::error::{FetchError, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Environment passed to the installer script
pub fn delegate_env(version: &str, release: Option<&str>) -> Vec<(&'static str, String)> {
    let year = version.split('.').next().unwrap_or(version);
    vec![
        ("OPENVINO_VERSION", version.to_string()),
        ("OPENVINO_VERSION_YEAR", year.to_string()),
        ("OPENVINO_RELEASE", release.unwrap_or_default().to_string()),
    ]
}

/// Run the shell `script` with the version, version year and release in its
/// environment
pub async fn install(script: &Path, version: &str, release: Option<&str>) -> Result<()> {
    let delegate_error = |reason: String| FetchError::Delegate {
        script: script.display().to_string(),
        reason,
    };

    info!("Delegating install of {} to {}", version, script.display());

    let status = Command::new("sh")
        .arg(script)
        .envs(delegate_env(version, release))
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| delegate_error(e.to_string()))?;

    if !status.success() {
        return Err(delegate_error(format!("exited with {}", status)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegate_env() {
        let env = delegate_env("2023.1.0", Some("ubuntu20"));
        assert_eq!(
            env,
            vec![
                ("OPENVINO_VERSION", "2023.1.0".to_string()),
                ("OPENVINO_VERSION_YEAR", "2023".to_string()),
                ("OPENVINO_RELEASE", "ubuntu20".to_string()),
            ]
        );

        let env = delegate_env("2024.0", None);
        assert_eq!(env[2].1, "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_sees_environment() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let script = dir.path().join("install.sh");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$OPENVINO_VERSION $OPENVINO_VERSION_YEAR $OPENVINO_RELEASE\" > {}\n",
                out.display()
            ),
        )
        .unwrap();

        install(&script, "2023.1.0", Some("ubuntu20")).await.unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.trim(), "2023.1.0 2023 ubuntu20");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_script() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("install.sh");
        std::fs::write(&script, "exit 3\n").unwrap();

        let err = install(&script, "2023.1.0", None).await.unwrap_err();
        assert_eq!(err.kind(), "delegate");
    }
}
