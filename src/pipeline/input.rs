//! Document acquisition: where the résumé bytes come from.
//!
//! A deployment picks one [`DocumentSource`]: a file on disk, an HTTP(S)
//! URL, or bytes already held in memory (a form upload). Whatever the
//! source, the pipeline only ever sees the raw bytes; validation of those
//! bytes belongs to [`crate::pipeline::render`].

use crate::error::MatchError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where to read the résumé PDF from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A local file.
    Path(PathBuf),
    /// An HTTP or HTTPS URL, downloaded on load.
    Url(String),
    /// Bytes supplied directly, e.g. from an upload widget.
    Upload(Vec<u8>),
}

impl DocumentSource {
    /// Interpret a CLI-style argument: URLs are downloaded, anything else is a path.
    pub fn parse(input: &str) -> Self {
        if is_url(input) {
            DocumentSource::Url(input.to_string())
        } else {
            DocumentSource::Path(PathBuf::from(input))
        }
    }

    /// Short human description for logs.
    pub fn describe(&self) -> String {
        match self {
            DocumentSource::Path(p) => p.display().to_string(),
            DocumentSource::Url(u) => u.clone(),
            DocumentSource::Upload(b) => format!("upload ({} bytes)", b.len()),
        }
    }

    /// Read the document into memory.
    pub async fn load(&self, timeout_secs: u64) -> Result<Vec<u8>, MatchError> {
        match self {
            DocumentSource::Path(path) => read_local(path).await,
            DocumentSource::Url(url) => download_url(url, timeout_secs).await,
            DocumentSource::Upload(bytes) => Ok(bytes.clone()),
        }
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(bytes: Vec<u8>) -> Self {
        DocumentSource::Upload(bytes)
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

async fn read_local(path: &Path) -> Result<Vec<u8>, MatchError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(MatchError::FileNotFound { path: path.to_path_buf() })
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(MatchError::PermissionDenied { path: path.to_path_buf() })
        }
        Err(e) => Err(MatchError::Internal(format!(
            "reading {}: {e}",
            path.display()
        ))),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, MatchError> {
    info!("Downloading résumé from: {}", url);
    let failed = |reason: String| MatchError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/cv.pdf"));
        assert!(is_url("http://example.com/cv.pdf"));
        assert!(!is_url("/tmp/cv.pdf"));
        assert!(!is_url("cv.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn parse_picks_variant() {
        assert_eq!(
            DocumentSource::parse("https://x.io/a.pdf"),
            DocumentSource::Url("https://x.io/a.pdf".into())
        );
        assert_eq!(
            DocumentSource::parse("cv.pdf"),
            DocumentSource::Path(PathBuf::from("cv.pdf"))
        );
    }

    #[tokio::test]
    async fn upload_returns_its_bytes() {
        let src = DocumentSource::from(b"%PDF-1.7".to_vec());
        assert_eq!(src.load(1).await.unwrap(), b"%PDF-1.7");
        assert!(src.describe().contains("8 bytes"));
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let src = DocumentSource::Path(PathBuf::from("/definitely/not/here.pdf"));
        let err = src.load(1).await.unwrap_err();
        assert!(matches!(err, MatchError::FileNotFound { .. }), "got {err:?}");
    }
}
