use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::checksum;
use crate::error::PhotoCopyError;
use crate::ports::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateProvenance {
    Exif,
    FilesystemMtime,
    FilenameDerived,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FileDateTime {
    pub value: DateTime<Local>,
    pub provenance: DateProvenance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationData {
    pub district: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl LocationData {
    pub fn is_empty(&self) -> bool {
        self.district.is_none()
            && self.city.is_none()
            && self.county.is_none()
            && self.state.is_none()
            && self.country.is_none()
    }
}

/// A source file as seen by the pipeline. Immutable except for the
/// memoized checksum slot, which is filled in at most once, never during
/// the scan pass.
#[derive(Debug)]
pub struct FileRecord {
    pub source_path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub date: FileDateTime,
    pub location: Option<LocationData>,
    /// Parent path of `source_path` relative to the source root,
    /// slash-separated, empty when the file sits at the root.
    pub relative_directory: String,
    /// Other files sharing this record's stem and directory, populated
    /// during scan when `RelatedFileMode::SameStem` is active. They are
    /// never scanned as independent records of their own.
    pub related_files: Vec<PathBuf>,
    checksum: OnceLock<String>,
}

impl FileRecord {
    pub fn new(
        source_path: PathBuf,
        size: u64,
        date: FileDateTime,
        location: Option<LocationData>,
        relative_directory: String,
    ) -> Self {
        let file_name = source_path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            source_path,
            file_name,
            size,
            date,
            location,
            relative_directory,
            related_files: Vec::new(),
            checksum: OnceLock::new(),
        }
    }

    pub fn with_related_files(mut self, related_files: Vec<PathBuf>) -> Self {
        self.related_files = related_files;
        self
    }

    pub fn name_without_extension(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|v| v.to_str())
            .unwrap_or(&self.file_name)
    }

    pub fn extension(&self) -> &str {
        Path::new(&self.file_name)
            .extension()
            .and_then(|v| v.to_str())
            .unwrap_or("")
    }

    /// Computes the checksum on first call and memoizes it. Safe to call
    /// concurrently: a redundant recompute on a race is wasted work, not
    /// incorrect.
    pub fn checksum(&self, fs: &dyn FileSystem) -> Result<&str, PhotoCopyError> {
        if let Some(existing) = self.checksum.get() {
            return Ok(existing.as_str());
        }
        let digest = checksum::compute_checksum(fs, &self.source_path)?;
        let _ = self.checksum.set(digest);
        Ok(self
            .checksum
            .get()
            .expect("checksum was just set")
            .as_str())
    }
}
