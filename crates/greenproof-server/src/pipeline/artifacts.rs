//! Write-once artifact files, namespaced by audit id.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Extension of downloadable reports.
pub const REPORT_EXTENSION: &str = "pdf";

/// One file persisted for an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFile {
    Baseline,
    Current,
    Heatmap,
    Ela,
    Satellite,
    /// Rendered report with the renderer's extension.
    Report(&'static str),
}

impl ArtifactFile {
    pub fn file_name(self, audit_id: &str) -> String {
        match self {
            ArtifactFile::Baseline => format!("{audit_id}_baseline.jpg"),
            ArtifactFile::Current => format!("{audit_id}_current.jpg"),
            ArtifactFile::Heatmap => format!("{audit_id}_heatmap.jpg"),
            ArtifactFile::Ela => format!("{audit_id}_ela.jpg"),
            ArtifactFile::Satellite => format!("{audit_id}_satellite.png"),
            ArtifactFile::Report(ext) => format!("{audit_id}_report.{ext}"),
        }
    }
}

/// Directory of audit artifacts. Files are never overwritten or deleted.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, audit_id: &str, file: ArtifactFile) -> PathBuf {
        self.dir.join(file.file_name(audit_id))
    }

    /// Write `bytes` to a temp file beside the target, then move it into
    /// place. Fails with `AlreadyExists` rather than replace a file.
    pub fn persist(&self, audit_id: &str, file: ArtifactFile, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(audit_id, file);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(&path).map_err(|e| e.error)?;

        tracing::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Resolve a downloadable report by bare file name.
    ///
    /// Names with separators, parent references, or another extension are
    /// treated as absent.
    pub fn locate_report(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename.contains("..")
            || filename.starts_with('.')
        {
            return None;
        }

        let is_report = Path::new(filename)
            .extension()
            .is_some_and(|ext| ext == REPORT_EXTENSION);
        if !is_report {
            return None;
        }

        let path = self.dir.join(filename);
        path.is_file().then_some(path)
    }
}
