//! # pdfium-backend
//!
//! Resolve which [PDFium](https://pdfium.googlesource.com/pdfium/) shared
//! library `pdfium-render` should bind to, and bind it.
//!
//! ## Resolution order
//!
//! [`BackendLocator::locate`] checks, first match wins:
//!
//! 1. An explicit path handed in by the caller (`--pdfium-lib`, config file).
//!    A missing explicit path is an error, never silently skipped.
//! 2. `PDFIUM_LIB_PATH`, captured once by [`BackendLocator::from_env`].
//! 3. The per-version cache directory
//!    (`~/.cache/resume-match/pdfium-{VERSION}/` on Linux,
//!    overridable with `PDFIUM_CACHE_DIR`).
//! 4. The system library search path (`libpdfium.so` via the dynamic loader).
//!
//! With the `fetch` feature, [`BackendLocator::fetch`] downloads the platform
//! build from [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//! into the cache directory so step 3 succeeds on the next run.
//!
//! ```rust,no_run
//! use pdfium_backend::BackendLocator;
//!
//! let locator = BackendLocator::from_env();
//! println!("using {}", locator.locate().expect("explicit path exists"));
//! let pdfium = locator.bind().expect("pdfium available");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, warn};

/// The pdfium-binaries release tag used for the cache layout and downloads.
pub const PDFIUM_VERSION: &str = "7690";

/// Environment variable naming an existing pdfium library.
pub const LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "PDFIUM_CACHE_DIR";

#[cfg(feature = "fetch")]
const RELEASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

// ── Errors ───────────────────────────────────────────────────────────────────

/// Everything that can go wrong while finding or loading pdfium.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unsupported platform for pdfium: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// The caller named a library file that does not exist.
    #[error("pdfium library not found at '{path}'")]
    MissingLibrary { path: PathBuf },

    /// The dynamic loader could not load the library.
    #[error("Failed to load pdfium from {source_desc}: {reason}")]
    Bind { source_desc: String, reason: String },

    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Archive extraction failed: {0}")]
    Extract(String),
}

// ── Platform table ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Platform {
    /// Release asset, e.g. `pdfium-linux-x64.tgz`.
    archive: &'static str,
    /// Library location inside the archive.
    member: &'static str,
    /// File name on disk.
    lib_name: &'static str,
}

const MAC_LIB: (&str, &str) = ("lib/libpdfium.dylib", "libpdfium.dylib");
const LINUX_LIB: (&str, &str) = ("lib/libpdfium.so", "libpdfium.so");
const WIN_LIB: (&str, &str) = ("bin/pdfium.dll", "pdfium.dll");

fn current_platform() -> Result<Platform, BackendError> {
    let (archive, (member, lib_name)) = match (std::env::consts::OS, std::env::consts::ARCH) {
        ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", MAC_LIB),
        ("macos", "x86_64") => ("pdfium-mac-x64.tgz", MAC_LIB),
        ("linux", "x86_64") => ("pdfium-linux-x64.tgz", LINUX_LIB),
        ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", LINUX_LIB),
        ("windows", "x86_64") => ("pdfium-win-x64.tgz", WIN_LIB),
        ("windows", "aarch64") => ("pdfium-win-arm64.tgz", WIN_LIB),
        ("windows", "x86") => ("pdfium-win-x86.tgz", WIN_LIB),
        (os, arch) => {
            return Err(BackendError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            })
        }
    };
    Ok(Platform {
        archive,
        member,
        lib_name,
    })
}

/// Default cache root: `{platform cache dir}/resume-match/pdfium-{VERSION}`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("resume-match")
        .join(format!("pdfium-{PDFIUM_VERSION}"))
}

// ── Library source ───────────────────────────────────────────────────────────

/// Where the library that will be bound comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySource {
    Explicit(PathBuf),
    Environment(PathBuf),
    Cache(PathBuf),
    /// Let the dynamic loader search its usual paths.
    System,
}

impl LibrarySource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            LibrarySource::Explicit(p) | LibrarySource::Environment(p) | LibrarySource::Cache(p) => {
                Some(p)
            }
            LibrarySource::System => None,
        }
    }
}

impl fmt::Display for LibrarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibrarySource::Explicit(p) => write!(f, "'{}' (explicit)", p.display()),
            LibrarySource::Environment(p) => write!(f, "'{}' ({LIB_PATH_ENV})", p.display()),
            LibrarySource::Cache(p) => write!(f, "'{}' (cache)", p.display()),
            LibrarySource::System => write!(f, "the system library path"),
        }
    }
}

// ── Locator ──────────────────────────────────────────────────────────────────

/// Resolves and binds the pdfium library.
///
/// Environment variables are read only in [`BackendLocator::from_env`]; the
/// locator itself is plain data and cheap to clone.
#[derive(Debug, Clone)]
pub struct BackendLocator {
    explicit: Option<PathBuf>,
    env_path: Option<PathBuf>,
    cache_dir: PathBuf,
}

impl Default for BackendLocator {
    fn default() -> Self {
        Self::new(default_cache_dir())
    }
}

impl BackendLocator {
    /// A locator rooted at `cache_dir` that ignores the environment.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            explicit: None,
            env_path: None,
            cache_dir: cache_dir.into(),
        }
    }

    /// Snapshot `PDFIUM_LIB_PATH` and `PDFIUM_CACHE_DIR`.
    pub fn from_env() -> Self {
        let cache_dir = match std::env::var(CACHE_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => {
                PathBuf::from(dir).join(format!("pdfium-{PDFIUM_VERSION}"))
            }
            _ => default_cache_dir(),
        };
        let env_path = std::env::var(LIB_PATH_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self {
            explicit: None,
            env_path,
            cache_dir,
        }
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path the cached library would occupy on this platform.
    pub fn cached_library(&self) -> Result<PathBuf, BackendError> {
        Ok(self.cache_dir.join(current_platform()?.lib_name))
    }

    /// Pick the library to bind. Only an explicit path that does not exist
    /// is an error; every other miss falls through to the next candidate.
    pub fn locate(&self) -> Result<LibrarySource, BackendError> {
        if let Some(path) = &self.explicit {
            if path.exists() {
                return Ok(LibrarySource::Explicit(path.clone()));
            }
            return Err(BackendError::MissingLibrary { path: path.clone() });
        }

        if let Some(path) = &self.env_path {
            if path.exists() {
                return Ok(LibrarySource::Environment(path.clone()));
            }
            warn!("{LIB_PATH_ENV}='{}' does not exist; ignoring", path.display());
        }

        if let Ok(cached) = self.cached_library() {
            if cached.exists() {
                return Ok(LibrarySource::Cache(cached));
            }
        }

        Ok(LibrarySource::System)
    }

    /// Locate and load the library.
    pub fn bind(&self) -> Result<Pdfium, BackendError> {
        let source = self.locate()?;
        debug!("Binding pdfium from {source}");
        let bindings = match source.path() {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| BackendError::Bind {
            source_desc: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Pdfium::new(bindings))
    }

    /// Download the platform library into the cache directory, unless it is
    /// already there. `on_progress` receives `(downloaded, total)` bytes.
    #[cfg(feature = "fetch")]
    pub fn fetch(
        &self,
        on_progress: Option<&dyn Fn(u64, Option<u64>)>,
    ) -> Result<PathBuf, BackendError> {
        let platform = current_platform()?;
        let target = self.cache_dir.join(platform.lib_name);
        if target.exists() {
            debug!("pdfium already cached at {}", target.display());
            return Ok(target);
        }

        std::fs::create_dir_all(&self.cache_dir).map_err(BackendError::CacheDir)?;
        let url = format!(
            "{RELEASE_URL}/chromium%2F{PDFIUM_VERSION}/{}",
            platform.archive
        );
        tracing::info!("Downloading pdfium from {url}");
        let archive = fetch::download(&url, on_progress)?;
        fetch::unpack_member(&archive, platform.member, &target)?;
        Ok(target)
    }
}

#[cfg(feature = "fetch")]
mod fetch {
    use super::BackendError;
    use std::io::Read;
    use std::path::Path;

    pub(super) fn download(
        url: &str,
        on_progress: Option<&dyn Fn(u64, Option<u64>)>,
    ) -> Result<Vec<u8>, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("pdfium-backend/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| BackendError::Download(e.to_string()))?;

        let mut response = client
            .get(url)
            .send()
            .map_err(|e| BackendError::Download(format!("GET {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(BackendError::Download(format!(
                "HTTP {} for {url}",
                response.status()
            )));
        }

        let total = response.content_length();
        let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunk = [0u8; 64 * 1024];
        loop {
            let n = match response.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(BackendError::Download(format!("read: {e}"))),
            };
            body.extend_from_slice(&chunk[..n]);
            if let Some(report) = on_progress {
                report(body.len() as u64, total);
            }
        }
        Ok(body)
    }

    pub(super) fn unpack_member(
        archive: &[u8],
        member: &str,
        dest: &Path,
    ) -> Result<(), BackendError> {
        let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
        let entries = tar
            .entries()
            .map_err(|e| BackendError::Extract(e.to_string()))?;
        for entry in entries {
            let mut entry = entry.map_err(|e| BackendError::Extract(e.to_string()))?;
            let is_member = entry
                .path()
                .map(|p| p.to_string_lossy() == member)
                .unwrap_or(false);
            if is_member {
                entry
                    .unpack(dest)
                    .map_err(|e| BackendError::Extract(format!("unpack {member}: {e}")))?;
                return Ok(());
            }
        }
        Err(BackendError::Extract(format!("'{member}' not in archive")))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
