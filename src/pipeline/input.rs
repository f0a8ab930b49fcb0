//! CV document handles.
//!
//! pdfium and the text extractor both need a file-system path. A CV the
//! caller already stored on disk is used in place and never modified; a CV
//! held in memory is spilled into a `TempDir` owned by the handle, so the
//! file disappears when the [`CvDocument`] is dropped on any exit path.

use crate::error::AnalyzerError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// A CV PDF identified by its location on disk.
#[derive(Debug)]
pub enum CvDocument {
    /// Caller-owned file, read-only.
    Local(PathBuf),
    /// In-memory CV written to a temp directory that lives as long as the handle.
    Spilled { path: PathBuf, _temp_dir: TempDir },
}

impl CvDocument {
    /// Wrap a stored CV without touching the file system.
    ///
    /// Missing or malformed files are not rejected here; the analysis
    /// pipeline degrades to its fixed "unreadable CV" result instead.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        CvDocument::Local(path.into())
    }

    /// Wrap a stored CV after checking it exists and starts with `%PDF`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AnalyzerError> {
        let path = path.into();
        if !path.exists() {
            return Err(AnalyzerError::DocumentNotFound { path });
        }

        let mut file = std::fs::File::open(&path).map_err(|source| AnalyzerError::Io {
            path: path.clone(),
            source,
        })?;
        let mut magic = [0u8; 4];
        if file.read_exact(&mut magic).is_err() || !is_pdf_magic(&magic) {
            return Err(AnalyzerError::NotAPdf { path, magic });
        }

        debug!("Opened CV: {}", path.display());
        Ok(CvDocument::Local(path))
    }

    /// Spill CV bytes to a managed temp file.
    ///
    /// `filename` is the stored upload name; only its final component is used.
    pub fn from_bytes(bytes: &[u8], filename: &str) -> Result<Self, AnalyzerError> {
        let temp_dir = TempDir::new().map_err(|source| AnalyzerError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cv.pdf".into());
        let path = temp_dir.path().join(name);

        std::fs::write(&path, bytes).map_err(|source| AnalyzerError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("Spilled {} CV bytes to {}", bytes.len(), path.display());
        Ok(CvDocument::Spilled {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Path to the PDF regardless of how the document was created.
    pub fn path(&self) -> &Path {
        match self {
            CvDocument::Local(p) => p,
            CvDocument::Spilled { path, .. } => path,
        }
    }
}

/// `%PDF` header check.
pub fn is_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}
