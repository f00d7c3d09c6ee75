//! Atomic PDF output.
//!
//! The PDF is written to a temp file inside the target directory and renamed
//! over the final path only once every byte is flushed. A failed write drops
//! the temp file, so the target path either holds a complete PDF or nothing.

use crate::error::Article2PdfError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write `bytes` to `path`, creating parent directories.
///
/// Returns the size of the file on disk.
pub async fn write_pdf_atomic(path: &Path, bytes: Vec<u8>) -> Result<u64, Article2PdfError> {
    if bytes.is_empty() {
        return Err(Article2PdfError::EmptyPdf);
    }

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_blocking(target, &bytes))
        .await
        .map_err(|e| Article2PdfError::Internal(format!("Write task panicked: {}", e)))?
}

fn write_blocking(path: PathBuf, bytes: &[u8]) -> Result<u64, Article2PdfError> {
    let fail = |source: std::io::Error| Article2PdfError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(fail)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".article2pdf-")
        .suffix(".pdf.tmp")
        .tempfile_in(&dir)
        .map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(&path).map_err(|e| fail(e.error))?;

    let written = std::fs::metadata(&path).map_err(fail)?.len();
    debug!("Wrote {} bytes to {}", written, path.display());
    Ok(written)
}
