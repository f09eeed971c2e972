use std::path::Path;

use crate::collision::{Disposition, Plan};
use crate::error::PhotoCopyError;
use crate::options::Operation;
use crate::ports::FileSystem;

/// Carries out a single `Plan` against the filesystem, or simulates it
/// when `dry_run` is set. Dry runs still stat the source file before
/// returning, so a permission problem there surfaces during `plan` instead
/// of only showing up on a real `run`; only the actual copy/move/remove is
/// skipped.
pub struct Dispatcher<'a> {
    fs: &'a dyn FileSystem,
    dry_run: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(fs: &'a dyn FileSystem, dry_run: bool) -> Self {
        Self { fs, dry_run }
    }

    pub fn dispatch(&self, plan: &Plan) -> Result<(), PhotoCopyError> {
        if matches!(plan.disposition, Disposition::SkipIdentical) {
            return Ok(());
        }

        if self.dry_run {
            self.fs.metadata(&plan.source_path)?;
            return Ok(());
        }

        if let Some(parent) = plan.destination_path.parent() {
            self.fs.create_dir_all(parent)?;
        }

        match plan.operation {
            Operation::Copy => self.fs.copy(&plan.source_path, &plan.destination_path),
            Operation::Move => self.fs.rename(&plan.source_path, &plan.destination_path),
        }
    }

    /// Carries a related file (`RelatedFileMode::SameStem`) beside its
    /// primary's destination, keeping the sidecar's own extension but the
    /// primary's resolved stem (including any collision suffix).
    pub fn dispatch_related(&self, source: &Path, primary_destination: &Path, operation: Operation) -> Result<(), PhotoCopyError> {
        if self.dry_run {
            return Ok(());
        }

        let extension = source.extension().and_then(|v| v.to_str());
        let destination = match extension {
            Some(ext) => primary_destination.with_extension(ext),
            None => primary_destination.to_path_buf(),
        };

        if let Some(parent) = destination.parent() {
            self.fs.create_dir_all(parent)?;
        }

        match operation {
            Operation::Copy => self.fs.copy(source, &destination),
            Operation::Move => self.fs.rename(source, &destination),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::OsFileSystem;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn plan(source: PathBuf, destination: PathBuf, operation: Operation, disposition: Disposition) -> Plan {
        Plan {
            source_path: source,
            destination_path: destination,
            operation,
            disposition,
        }
    }

    #[test]
    fn dry_run_never_touches_disk() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("a.jpg");
        fs::write(&source, b"x").expect("write");
        let destination = temp.path().join("out/a.jpg");

        let fs_port = OsFileSystem;
        let dispatcher = Dispatcher::new(&fs_port, true);
        let plan = plan(source, destination.clone(), Operation::Copy, Disposition::New);
        dispatcher.dispatch(&plan).expect("dispatch");

        assert!(!destination.exists());
    }

    #[test]
    fn copy_creates_parent_dirs_and_writes_file() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("a.jpg");
        fs::write(&source, b"content").expect("write");
        let destination = temp.path().join("nested/out/a.jpg");

        let fs_port = OsFileSystem;
        let dispatcher = Dispatcher::new(&fs_port, false);
        let plan = plan(source, destination.clone(), Operation::Copy, Disposition::New);
        dispatcher.dispatch(&plan).expect("dispatch");

        assert_eq!(fs::read(&destination).expect("read"), b"content");
    }

    #[test]
    fn skip_identical_never_dispatches_even_outside_dry_run() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("a.jpg");
        fs::write(&source, b"content").expect("write");
        let destination = temp.path().join("a.jpg");

        let fs_port = OsFileSystem;
        let dispatcher = Dispatcher::new(&fs_port, false);
        let plan = plan(source, destination, Operation::Copy, Disposition::SkipIdentical);
        dispatcher.dispatch(&plan).expect("dispatch");
    }
}
