use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load index from {url}: {reason}")]
    IndexLoad { url: String, reason: String },

    #[error("Failed to retrieve {url}: {reason}")]
    Retrieval { url: String, reason: String },

    #[error("No artifact for {tuple}: missing {missing}")]
    Resolution { tuple: String, missing: String },

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction of {path} failed: {reason}")]
    Extraction { path: String, reason: String },

    #[error("Installer script {script} failed: {reason}")]
    Delegate { script: String, reason: String },
}

/// Serialized form of an error, printed next to the message on exit.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Config(_) => "config",
            FetchError::IndexLoad { .. } => "index_load",
            FetchError::Retrieval { .. } => "retrieval",
            FetchError::Resolution { .. } => "resolution",
            FetchError::UnsupportedFormat(_) => "unsupported_format",
            FetchError::Extraction { .. } => "extraction",
            FetchError::Delegate { .. } => "delegate",
        }
    }

    /// Network and filesystem failures while fetching; rerunning the whole
    /// invocation is safe because cache writes are all-or-nothing.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::IndexLoad { .. } | FetchError::Retrieval { .. }
        )
    }

    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            kind: self.kind(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }

    pub(crate) fn retrieval(url: &str, reason: impl std::fmt::Display) -> Self {
        FetchError::Retrieval {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_is_distinct_from_network_errors() {
        let miss = FetchError::Resolution {
            tuple: "2023.1/linux/ubuntu20/x86_64".into(),
            missing: "version 2023.1".into(),
        };
        let net = FetchError::retrieval("https://example.invalid/a.tgz", "connection refused");

        assert_eq!(miss.kind(), "resolution");
        assert_eq!(net.kind(), "retrieval");
        assert!(!miss.is_retryable());
        assert!(net.is_retryable());
        assert!(miss.to_string().starts_with("No artifact for"));
    }

    #[test]
    fn test_detail_serializes() {
        let err = FetchError::UnsupportedFormat("rar".into());
        let json = serde_json::to_value(err.detail()).unwrap();
        assert_eq!(json["kind"], "unsupported_format");
        assert_eq!(json["retryable"], false);
        assert_eq!(json["message"], "Unsupported archive format: rar");
    }
}
