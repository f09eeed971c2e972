use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::checksum;
use crate::error::PhotoCopyError;
use crate::options::{DuplicatePolicy, Operation};
use crate::ports::FileSystem;
use crate::record::FileRecord;
use crate::resolver::NUMBER_PLACEHOLDER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    New,
    SkipIdentical,
    Overwrite,
    Renamed(u64),
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub operation: Operation,
    pub disposition: Disposition,
}

/// Turns a rendered (possibly placeholder-carrying) relative path into a
/// final destination, deduplicating against both the files already on
/// disk and the destinations already claimed earlier in this apply pass.
///
/// The reservation set is what makes collision resolution safe within a
/// single run: `fs.exists()` alone can't see a destination another file
/// just claimed but that hasn't necessarily been written yet in a
/// dry run.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    reserved: HashSet<PathBuf>,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &mut self,
        fs: &dyn FileSystem,
        record: &FileRecord,
        rendered: &str,
        destination_root: &Path,
        operation: Operation,
        policy: DuplicatePolicy,
    ) -> Result<Plan, PhotoCopyError> {
        let has_placeholder = rendered.contains(NUMBER_PLACEHOLDER);
        let mut counter = 0u64;

        loop {
            let candidate = destination_root.join(build_candidate_relative(rendered, counter, has_placeholder));

            if self.reserved.contains(&candidate) {
                counter += 1;
                continue;
            }

            if !fs.exists(&candidate) {
                self.reserved.insert(candidate.clone());
                let disposition = if counter == 0 {
                    Disposition::New
                } else {
                    Disposition::Renamed(counter)
                };
                return Ok(Plan {
                    source_path: record.source_path.clone(),
                    destination_path: candidate,
                    operation,
                    disposition,
                });
            }

            match policy {
                DuplicatePolicy::SkipIdentical => {
                    let source_checksum = record.checksum(fs)?.to_string();
                    let existing_checksum = checksum::compute_checksum(fs, &candidate)?;
                    if source_checksum == existing_checksum {
                        self.reserved.insert(candidate.clone());
                        return Ok(Plan {
                            source_path: record.source_path.clone(),
                            destination_path: candidate,
                            operation,
                            disposition: Disposition::SkipIdentical,
                        });
                    }
                    counter += 1;
                }
                DuplicatePolicy::Overwrite => {
                    self.reserved.insert(candidate.clone());
                    return Ok(Plan {
                        source_path: record.source_path.clone(),
                        destination_path: candidate,
                        operation,
                        disposition: Disposition::Overwrite,
                    });
                }
                DuplicatePolicy::KeepBoth => {
                    counter += 1;
                }
                DuplicatePolicy::Fail => {
                    return Err(PhotoCopyError::Collision {
                        source: record.source_path.clone(),
                        destination: candidate,
                    });
                }
            }
        }
    }
}

fn build_candidate_relative(rendered: &str, counter: u64, has_placeholder: bool) -> PathBuf {
    if has_placeholder {
        let suffix = if counter == 0 { String::new() } else { counter.to_string() };
        return PathBuf::from(rendered.replace(NUMBER_PLACEHOLDER, &suffix));
    }

    if counter == 0 {
        return PathBuf::from(rendered);
    }

    let path = Path::new(rendered);
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let stem = path.file_stem().and_then(|v| v.to_str()).unwrap_or(rendered);
    let extension = path.extension().and_then(|v| v.to_str());

    let new_name = match extension {
        Some(ext) => format!("{stem}_{counter}.{ext}"),
        None => format!("{stem}_{counter}"),
    };

    match parent {
        Some(parent) => parent.join(new_name),
        None => PathBuf::from(new_name),
    }
}
