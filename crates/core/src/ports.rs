use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::error::PhotoCopyError;

#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified: SystemTime,
}

/// Every filesystem operation the pipeline performs, behind a trait so
/// tests can swap in an in-memory double instead of touching disk.
pub trait FileSystem: Send + Sync {
    fn walk(&self, root: &Path, recursive: bool) -> Vec<PathBuf>;
    fn metadata(&self, path: &Path) -> Result<FileMetadata, PhotoCopyError>;
    fn exists(&self, path: &Path) -> bool;
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read>, PhotoCopyError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), PhotoCopyError>;
    fn copy(&self, from: &Path, to: &Path) -> Result<(), PhotoCopyError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), PhotoCopyError>;
    fn remove_file(&self, path: &Path) -> Result<(), PhotoCopyError>;
}

/// ENOSPC, checked via the raw OS error code since `ErrorKind::StorageFull`
/// isn't stable across the compiler versions this crate targets.
fn is_disk_full(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(28)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn walk(&self, root: &Path, recursive: bool) -> Vec<PathBuf> {
        if recursive {
            WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.path().to_path_buf())
                .collect()
        } else {
            let Ok(entries) = fs::read_dir(root) else {
                return Vec::new();
            };
            let mut files: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            files.sort();
            files
        }
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata, PhotoCopyError> {
        let meta = fs::metadata(path).map_err(|err| PhotoCopyError::access(path, err))?;
        let modified = meta
            .modified()
            .map_err(|err| PhotoCopyError::access(path, err))?;
        Ok(FileMetadata {
            size: meta.len(),
            modified,
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read>, PhotoCopyError> {
        let file = File::open(path).map_err(|err| PhotoCopyError::access(path, err))?;
        Ok(Box::new(file))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), PhotoCopyError> {
        // Failing to create the destination tree means the root is missing,
        // unwritable, or the disk is full — none of that is recoverable by
        // skipping the current file.
        fs::create_dir_all(path).map_err(|err| PhotoCopyError::filesystem_fatal(path, err))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), PhotoCopyError> {
        fs::copy(from, to).map_err(|err| {
            if is_disk_full(&err) {
                PhotoCopyError::filesystem_fatal(to, err)
            } else {
                PhotoCopyError::access(to, err)
            }
        })?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), PhotoCopyError> {
        if fs::rename(from, to).is_ok() {
            return Ok(());
        }
        // Cross-device moves can't use a plain rename; fall back to
        // copy-then-remove.
        fs::copy(from, to).map_err(|err| {
            if is_disk_full(&err) {
                PhotoCopyError::filesystem_fatal(to, err)
            } else {
                PhotoCopyError::access(to, err)
            }
        })?;
        fs::remove_file(from).map_err(|err| PhotoCopyError::access(from, err))?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), PhotoCopyError> {
        fs::remove_file(path).map_err(|err| PhotoCopyError::access(path, err))
    }
}

/// Decoupled so an in-memory double can drive metadata resolution in
/// tests without real image files on disk.
pub trait MetadataProvider: Send + Sync {
    fn resolve(
        &self,
        path: &Path,
        fallback_modified: SystemTime,
        geocoder: &dyn GeocodingService,
        country_as_code: bool,
    ) -> Result<(crate::record::FileDateTime, Option<crate::record::LocationData>), PhotoCopyError>;
}

/// Resolves the best-known timestamp and location for a file, preferring
/// embedded EXIF/XMP metadata and falling back to filesystem mtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadataProvider;

impl MetadataProvider for ExifMetadataProvider {
    fn resolve(
        &self,
        path: &Path,
        fallback_modified: SystemTime,
        geocoder: &dyn GeocodingService,
        country_as_code: bool,
    ) -> Result<(crate::record::FileDateTime, Option<crate::record::LocationData>), PhotoCopyError> {
        use chrono::{DateTime, Local};

        use crate::record::{DateProvenance, FileDateTime};

        let extension = path
            .extension()
            .and_then(|v| v.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let exif_meta = if extension == "xmp" {
            crate::xmp_reader::read_xmp_metadata(path).ok()
        } else {
            crate::exif_reader::read_exif_metadata(path).ok()
        };

        let date = match exif_meta.as_ref().and_then(|meta| meta.date) {
            Some(value) => FileDateTime {
                value,
                provenance: DateProvenance::Exif,
            },
            None => {
                let local: DateTime<Local> = fallback_modified.into();
                FileDateTime {
                    value: local,
                    provenance: DateProvenance::FilesystemMtime,
                }
            }
        };

        let location = match exif_meta.and_then(|meta| meta.gps) {
            Some((lat, lon)) => geocoder
                .reverse_geocode(lat, lon, country_as_code)
                .ok()
                .flatten(),
            None => None,
        };

        Ok((date, location))
    }
}

/// Turns GPS coordinates into administrative place names. The default
/// implementation never looks anything up — reverse geocoding requires an
/// external data source or network call that isn't part of this crate's
/// own concerns. `country_as_code` tells an implementation whether
/// `LocationData.country` should come back as an ISO-2 code or a full
/// country name; the lookup that decides between the two lives wherever
/// the place names themselves come from.
pub trait GeocodingService: Send + Sync {
    fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        country_as_code: bool,
    ) -> Result<Option<crate::record::LocationData>, PhotoCopyError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullGeocodingService;

impl GeocodingService for NullGeocodingService {
    fn reverse_geocode(
        &self,
        _latitude: f64,
        _longitude: f64,
        _country_as_code: bool,
    ) -> Result<Option<crate::record::LocationData>, PhotoCopyError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn os_filesystem_walk_recursive_finds_nested_files() {
        let temp = tempdir().expect("tempdir");
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).expect("nested dirs");
        fs::write(nested.join("f.txt"), b"x").expect("write");

        let fs_port = OsFileSystem;
        let found = fs_port.walk(temp.path(), true);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn os_filesystem_walk_non_recursive_ignores_nested_files() {
        let temp = tempdir().expect("tempdir");
        let nested = temp.path().join("a");
        fs::create_dir_all(&nested).expect("nested dirs");
        fs::write(nested.join("f.txt"), b"x").expect("write");
        fs::write(temp.path().join("top.txt"), b"y").expect("write");

        let fs_port = OsFileSystem;
        let found = fs_port.walk(temp.path(), false);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn null_geocoding_service_always_returns_none() {
        let geocoder = NullGeocodingService;
        assert!(geocoder.reverse_geocode(50.0, 14.0, false).unwrap().is_none());
    }

    #[test]
    fn create_dir_all_failure_is_classified_as_fatal() {
        let temp = tempdir().expect("tempdir");
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"x").expect("write blocker file");
        // `blocker` is a file, so asking to create a directory under it
        // can never succeed.
        let unreachable = blocker.join("child");

        let fs_port = OsFileSystem;
        let err = fs_port.create_dir_all(&unreachable).unwrap_err();
        assert!(err.is_fatal());
    }
}
