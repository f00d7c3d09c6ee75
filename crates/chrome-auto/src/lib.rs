//! # chrome-auto
//!
//! Find a Chromium-family executable for headless rendering, or download and
//! cache a pinned [Chrome for Testing](https://googlechromelabs.github.io/chrome-for-testing/)
//! `chrome-headless-shell` build when none is installed.
//!
//! ## How it works
//!
//! [`locate_chrome`] walks a fallback chain and returns the first hit:
//!
//! 1. An explicit path (from the caller, else `CHROME_PATH`).
//! 2. A previously downloaded `chrome-headless-shell` in
//!    `~/.cache/article2pdf/chrome-{VERSION}/`.
//! 3. Well-known system install locations for the current OS.
//! 4. `PATH` lookup for the usual executable names.
//!
//! [`ensure_chrome`] does the same, then downloads and extracts the pinned
//! build into the cache when the chain comes up empty.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrome_auto::{ensure_chrome, locate_chrome};
//!
//! // Option A: only use what is already on the machine
//! let found = locate_chrome(None).expect("lookup failed");
//!
//! // Option B: download with progress if nothing is installed
//! let path = ensure_chrome(None, Some(&|downloaded, total| {
//!     if let Some(t) = total {
//!         eprint!("\rDownloading Chromium: {}/{} bytes", downloaded, t);
//!     }
//! })).expect("download failed");
//! ```
//!
//! ## Environment variable overrides
//!
//! - `CHROME_PATH` — path to an existing browser executable; skips lookup.
//! - `CHROME_AUTO_CACHE_DIR` — override the default cache directory.

use std::io::Cursor;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// The Chrome for Testing release downloaded by [`ensure_chrome`].
pub const CHROME_VERSION: &str = "131.0.6778.85";

/// Chrome for Testing download bucket.
const BASE_URL: &str = "https://storage.googleapis.com/chrome-for-testing-public";

/// Executable names probed on `PATH`, in order.
const PATH_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "chrome-headless-shell",
];

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by chrome-auto operations.
#[derive(Error, Debug)]
pub enum ChromeAutoError {
    /// The current OS/architecture combination has no Chrome for Testing build.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// An explicit executable path was given but nothing exists there.
    #[error("Browser executable not found at '{path}'")]
    ExplicitPathMissing { path: PathBuf },

    /// No executable was found and downloading was not requested.
    #[error(
        "No Chromium-family browser found.\n\
Install Chromium or Google Chrome, set CHROME_PATH, or allow the download of chrome-headless-shell {CHROME_VERSION}."
    )]
    NotFound,

    /// Could not create or navigate the local cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Network download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// zip extraction failed.
    #[error("Archive extraction failed: {0}")]
    Extract(String),
}

// ── Internal: platform metadata ──────────────────────────────────────────────

struct PlatformInfo {
    /// Chrome for Testing platform tag, e.g. `mac-arm64`.
    tag: &'static str,
    /// Executable filename inside the extracted folder.
    exe_name: &'static str,
}

impl PlatformInfo {
    fn archive_name(&self) -> String {
        format!("chrome-headless-shell-{}.zip", self.tag)
    }

    /// Path of the executable relative to the cache directory.
    fn exe_relative(&self) -> PathBuf {
        PathBuf::from(format!("chrome-headless-shell-{}", self.tag)).join(self.exe_name)
    }
}

fn detect_platform() -> Result<PlatformInfo, ChromeAutoError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    match (os, arch) {
        ("macos", "aarch64") => Ok(PlatformInfo {
            tag: "mac-arm64",
            exe_name: "chrome-headless-shell",
        }),
        ("macos", "x86_64") => Ok(PlatformInfo {
            tag: "mac-x64",
            exe_name: "chrome-headless-shell",
        }),
        ("linux", "x86_64") => Ok(PlatformInfo {
            tag: "linux64",
            exe_name: "chrome-headless-shell",
        }),
        ("windows", "x86_64") => Ok(PlatformInfo {
            tag: "win64",
            exe_name: "chrome-headless-shell.exe",
        }),
        ("windows", "x86") => Ok(PlatformInfo {
            tag: "win32",
            exe_name: "chrome-headless-shell.exe",
        }),
        (os, arch) => Err(ChromeAutoError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        }),
    }
}

/// Well-known absolute install locations for the current OS.
fn system_candidates() -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();

    if cfg!(target_os = "macos") {
        out.push("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome".into());
        out.push("/Applications/Chromium.app/Contents/MacOS/Chromium".into());
        if let Some(home) = dirs::home_dir() {
            out.push(home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"));
        }
    } else if cfg!(target_os = "windows") {
        for var in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(base) = std::env::var(var) {
                out.push(
                    PathBuf::from(base)
                        .join("Google")
                        .join("Chrome")
                        .join("Application")
                        .join("chrome.exe"),
                );
            }
        }
    } else {
        for p in [
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ] {
            out.push(p.into());
        }
    }

    out
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Returns the per-version cache directory for the downloaded browser.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/article2pdf/chrome-{VERSION}/`
/// - **Linux**: `~/.cache/article2pdf/chrome-{VERSION}/`
/// - **Windows**: `%LOCALAPPDATA%\article2pdf\chrome-{VERSION}\`
///
/// Override by setting `CHROME_AUTO_CACHE_DIR`.
pub fn chrome_cache_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var("CHROME_AUTO_CACHE_DIR") {
        return cache_dir_under(Path::new(&override_dir));
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    cache_dir_under(&base.join("article2pdf"))
}

fn cache_dir_under(base: &Path) -> PathBuf {
    base.join(format!("chrome-{CHROME_VERSION}"))
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns the on-disk path of a previously downloaded `chrome-headless-shell`,
/// or `None` if nothing is cached.
pub fn cached_chrome_path() -> Option<PathBuf> {
    let info = detect_platform().ok()?;
    let p = chrome_cache_dir().join(info.exe_relative());
    p.is_file().then_some(p)
}

/// Finds a browser executable without touching the network.
///
/// `explicit` takes precedence over `CHROME_PATH`; either one that points at
/// a missing file is an error rather than a silent fallback. Returns
/// `Ok(None)` when the whole chain comes up empty.
pub fn locate_chrome(explicit: Option<&Path>) -> Result<Option<PathBuf>, ChromeAutoError> {
    let env_path = std::env::var_os("CHROME_PATH").map(PathBuf::from);
    let path_var = std::env::var_os("PATH");
    locate_with(
        explicit,
        env_path.as_deref(),
        cached_chrome_path(),
        &system_candidates(),
        path_var.as_deref(),
    )
}

/// Finds a browser executable, downloading `chrome-headless-shell` into the
/// cache when none is installed.
///
/// `on_progress` receives `(bytes_downloaded, total_size_option)` during
/// the download.  Pass `None` to suppress progress callbacks.
///
/// # Thread safety
///
/// Safe to call from multiple threads simultaneously; the lookup result is
/// memoised for the process lifetime once it succeeds.
pub fn ensure_chrome(
    explicit: Option<&Path>,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, ChromeAutoError> {
    if explicit.is_none() {
        if let Some(path) = RESOLVED_PATH.get() {
            return Ok(path.clone());
        }
    }

    let path = match locate_chrome(explicit)? {
        Some(p) => p,
        None => download_chrome(on_progress)?,
    };

    if explicit.is_none() {
        let _ = RESOLVED_PATH.set(path.clone());
    }

    Ok(path)
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn locate_with(
    explicit: Option<&Path>,
    env_path: Option<&Path>,
    cached: Option<PathBuf>,
    system: &[PathBuf],
    path_var: Option<&std::ffi::OsStr>,
) -> Result<Option<PathBuf>, ChromeAutoError> {
    // 1. Explicit path or CHROME_PATH.
    if let Some(p) = explicit.or(env_path) {
        if p.is_file() {
            return Ok(Some(p.to_path_buf()));
        }
        return Err(ChromeAutoError::ExplicitPathMissing {
            path: p.to_path_buf(),
        });
    }

    // 2. Downloaded build.
    if let Some(p) = cached {
        return Ok(Some(p));
    }

    // 3. System install locations.
    if let Some(p) = system.iter().find(|p| p.is_file()) {
        return Ok(Some(p.clone()));
    }

    // 4. PATH lookup.
    Ok(path_var.and_then(search_path))
}

fn search_path(path_var: &std::ffi::OsStr) -> Option<PathBuf> {
    let suffix = if cfg!(windows) { ".exe" } else { "" };
    for name in PATH_CANDIDATES {
        for dir in std::env::split_paths(path_var) {
            let candidate = dir.join(format!("{name}{suffix}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn download_chrome(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, ChromeAutoError> {
    let info = detect_platform()?;
    let cache_dir = chrome_cache_dir();
    let exe_path = cache_dir.join(info.exe_relative());

    if exe_path.is_file() {
        return Ok(exe_path);
    }

    let url = format!(
        "{}/{}/{}/{}",
        BASE_URL,
        CHROME_VERSION,
        info.tag,
        info.archive_name()
    );

    // Extract into a sibling staging dir and rename so an interrupted
    // extraction never looks like a complete cache entry.
    let staging = cache_dir.with_file_name(format!("chrome-{CHROME_VERSION}.partial"));
    if staging.exists() {
        std::fs::remove_dir_all(&staging).map_err(ChromeAutoError::CacheDir)?;
    }
    std::fs::create_dir_all(&staging).map_err(ChromeAutoError::CacheDir)?;

    let archive_bytes = download_bytes(&url, on_progress)?;
    extract_archive(&archive_bytes, &staging)?;
    mark_executable(&staging.join(info.exe_relative()))?;

    if cache_dir.exists() {
        std::fs::remove_dir_all(&cache_dir).map_err(ChromeAutoError::CacheDir)?;
    }
    std::fs::rename(&staging, &cache_dir).map_err(ChromeAutoError::CacheDir)?;

    Ok(exe_path)
}

/// Streams a URL into a `Vec<u8>`, calling `on_progress` every 64 KiB.
fn download_bytes(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, ChromeAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("chrome-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(None)
        .build()
        .map_err(|e| ChromeAutoError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| ChromeAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(ChromeAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let capacity = total.unwrap_or(100 * 1024 * 1024) as usize;
    let mut buf = Vec::with_capacity(capacity);

    let mut stream = response;
    let mut chunk = vec![0u8; 64 * 1024]; // 64 KiB
    let mut downloaded: u64 = 0;

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                downloaded += n as u64;
                if let Some(cb) = on_progress {
                    cb(downloaded, total);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ChromeAutoError::Download(format!("Read error: {e}")));
            }
        }
    }

    Ok(buf)
}

/// Unpacks a zip archive into `dest_dir`.
fn extract_archive(archive_bytes: &[u8], dest_dir: &Path) -> Result<(), ChromeAutoError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| ChromeAutoError::Extract(e.to_string()))?;
    archive
        .extract(dest_dir)
        .map_err(|e| ChromeAutoError::Extract(format!("Unpack failed: {e}")))
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<(), ChromeAutoError> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(path).map_err(|e| {
        ChromeAutoError::Extract(format!("'{}' missing from archive: {e}", path.display()))
    })?;
    let mut perms = meta.permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms).map_err(ChromeAutoError::CacheDir)
}

#[cfg(not(unix))]
fn mark_executable(path: &Path) -> Result<(), ChromeAutoError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ChromeAutoError::Extract(format!(
            "'{}' missing from archive",
            path.display()
        )))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"#!/bin/sh\n").unwrap();
    }

    #[test]
    fn cache_dir_is_versioned() {
        let d = cache_dir_under(Path::new("/tmp/chrome_auto_base"));
        assert!(d.starts_with("/tmp/chrome_auto_base"));
        assert!(d.to_str().unwrap().contains(CHROME_VERSION));
    }

    #[test]
    fn cache_dir_is_deterministic() {
        assert_eq!(chrome_cache_dir(), chrome_cache_dir());
    }

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("my-chrome");
        touch(&exe);
        let other = dir.path().join("env-chrome");
        touch(&other);

        let found = locate_with(Some(&exe), Some(&other), None, &[], None).unwrap();
        assert_eq!(found, Some(exe));
    }

    #[test]
    fn env_path_used_when_no_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("env-chrome");
        touch(&exe);

        let found = locate_with(None, Some(&exe), None, &[], None).unwrap();
        assert_eq!(found, Some(exe));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = locate_with(Some(Path::new("/definitely/not/here")), None, None, &[], None)
            .unwrap_err();
        assert!(matches!(err, ChromeAutoError::ExplicitPathMissing { .. }));
    }

    #[test]
    fn cached_build_beats_system_install() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("cache/chrome-headless-shell");
        let system = dir.path().join("usr/bin/chromium");
        touch(&cached);
        touch(&system);

        let found = locate_with(None, None, Some(cached.clone()), &[system], None).unwrap();
        assert_eq!(found, Some(cached));
    }

    #[test]
    fn first_existing_system_candidate_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("opt/missing");
        let present = dir.path().join("usr/bin/google-chrome");
        touch(&present);

        let found = locate_with(None, None, None, &[missing, present.clone()], None).unwrap();
        assert_eq!(found, Some(present));
    }

    #[test]
    fn path_lookup_finds_chromium() {
        let dir = tempfile::tempdir().unwrap();
        let suffix = if cfg!(windows) { ".exe" } else { "" };
        let exe = dir.path().join(format!("chromium{suffix}"));
        touch(&exe);

        let path_var = std::env::join_paths([dir.path()]).unwrap();
        let found = locate_with(None, None, None, &[], Some(&path_var)).unwrap();
        assert_eq!(found, Some(exe));
    }

    #[test]
    fn empty_chain_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path_var = std::env::join_paths([dir.path()]).unwrap();
        let found = locate_with(None, None, None, &[], Some(&path_var)).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn extract_archive_unpacks_nested_files() {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();
            writer
                .start_file("chrome-headless-shell-linux64/chrome-headless-shell", options)
                .unwrap();
            writer.write_all(b"binary").unwrap();
            writer.finish().unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        extract_archive(&buf, dir.path()).unwrap();
        let exe = dir
            .path()
            .join("chrome-headless-shell-linux64/chrome-headless-shell");
        assert_eq!(std::fs::read(&exe).unwrap(), b"binary");
    }

    #[test]
    fn extract_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_archive(b"not a zip", dir.path()).unwrap_err();
        assert!(matches!(err, ChromeAutoError::Extract(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn platform_info_for_linux() {
        if std::env::consts::ARCH == "x86_64" {
            let info = detect_platform().unwrap();
            assert_eq!(info.archive_name(), "chrome-headless-shell-linux64.zip");
            assert!(info.exe_relative().ends_with("chrome-headless-shell"));
        }
    }
}
