use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use tracing::info;
use trendfeed_core::{Bucket, OutputDocument};

use crate::StoreError;
use crate::timestamp::{fixed_offset, format_timestamp};

/// Writes [`OutputDocument`]s to one destination path.
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    path: PathBuf,
    offset: FixedOffset,
}

impl DocumentWriter {
    pub fn new(path: impl Into<PathBuf>, utc_offset_hours: i32) -> Result<Self, StoreError> {
        Ok(Self {
            path: path.into(),
            offset: fixed_offset(utc_offset_hours)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stamp the buckets with the current time and write them.
    pub fn write(&self, buckets: Vec<Bucket>) -> Result<OutputDocument, StoreError> {
        self.write_at(buckets, Utc::now())
    }

    pub fn write_at(
        &self,
        buckets: Vec<Bucket>,
        now: DateTime<Utc>,
    ) -> Result<OutputDocument, StoreError> {
        let document = OutputDocument {
            last_updated: format_timestamp(now, self.offset),
            buckets,
        };
        write_document(&self.path, &document)?;
        Ok(document)
    }
}

/// Write `document` as pretty JSON to `path`.
///
/// The JSON goes to a temporary file next to `path` which is then renamed
/// over it: readers see either the old document or the complete new one.
pub fn write_document(path: &Path, document: &OutputDocument) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

    let tmp = tempfile::Builder::new()
        .prefix(".trendfeed-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| StoreError::io(parent, e))?;

    {
        let mut out = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut out, document)?;
        out.write_all(b"\n").map_err(|e| StoreError::io(tmp.path(), e))?;
        out.flush().map_err(|e| StoreError::io(tmp.path(), e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| StoreError::io(tmp.path(), e))?;
    }

    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;

    info!(
        path = %path.display(),
        buckets = document.buckets.len(),
        records = document.record_count(),
        "document written"
    );
    Ok(())
}
