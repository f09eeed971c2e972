use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Whether accepted files are copied or moved into the destination tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Copy,
    Move,
}

/// What the Collision Resolver does when the rendered destination already
/// exists and its content differs from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    SkipIdentical,
    Overwrite,
    KeepBoth,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    ErrorsOnly,
    Normal,
    Verbose,
}

/// How sidecar files (same stem, different extension, same directory) are
/// grouped with the primary file they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelatedFileMode {
    /// Sidecars are treated as independent files.
    None,
    /// Sidecars sharing a primary file's stem travel alongside its plan.
    SameStem,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub template: String,
    pub operation: Operation,
    pub dry_run: bool,
    pub recursive: bool,
    pub min_date: Option<DateTime<Local>>,
    pub max_date: Option<DateTime<Local>>,
    pub duplicate_policy: DuplicatePolicy,
    pub unknown_location_fallback: String,
    pub country_as_code: bool,
    pub log_level: LogLevel,
    pub related_file_mode: RelatedFileMode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            template: crate::DEFAULT_TEMPLATE.to_string(),
            operation: Operation::Copy,
            dry_run: true,
            recursive: true,
            min_date: None,
            max_date: None,
            duplicate_policy: DuplicatePolicy::SkipIdentical,
            unknown_location_fallback: String::new(),
            country_as_code: false,
            log_level: LogLevel::Normal,
            related_file_mode: RelatedFileMode::None,
        }
    }
}
