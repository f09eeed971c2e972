use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::collision::{CollisionResolver, Disposition};
use crate::dispatch::Dispatcher;
use crate::error::PhotoCopyError;
use crate::matcher;
use crate::options::{Options, RelatedFileMode};
use crate::ports::{FileSystem, GeocodingService, MetadataProvider};
use crate::record::FileRecord;
use crate::resolver;
use crate::stats::{Statistics, StatisticsCollector};
use crate::template::{parse_template, TemplateTree};
use crate::validator::{self, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Init,
    Scanning,
    Scanned,
    Applying,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub scanned: usize,
    pub accepted: usize,
    pub rejected_by_validator: usize,
    pub access_errors: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ApplySummary {
    pub new: usize,
    pub skipped_identical: usize,
    pub overwritten: usize,
    pub renamed: usize,
    pub collision_errors: usize,
}

/// Shared cancellation signal. Cloning yields a handle to the same
/// underlying flag, so a caller can hold one end (e.g. on a Ctrl-C
/// handler) while the pipeline polls the other during scan/apply.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives the two-pass scan/apply cycle described by the crate's core
/// types: a parallel scan pass that builds `FileRecord`s and freezes
/// `Statistics`, followed by a sequential apply pass that renders
/// destinations and dispatches them through the Collision Resolver.
pub struct Pipeline<'a> {
    options: Options,
    template: TemplateTree,
    fs: &'a dyn FileSystem,
    metadata_provider: &'a dyn MetadataProvider,
    geocoder: &'a dyn GeocodingService,
    validators: Vec<Validator>,
    status: PipelineStatus,
    records: Vec<FileRecord>,
    statistics: Option<Statistics>,
    cancellation: CancellationFlag,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        options: Options,
        fs: &'a dyn FileSystem,
        metadata_provider: &'a dyn MetadataProvider,
        geocoder: &'a dyn GeocodingService,
    ) -> Result<Self, PhotoCopyError> {
        let template = parse_template(&options.template)?;
        let validators = validator::build_validators(&options);
        Ok(Self {
            options,
            template,
            fs,
            metadata_provider,
            geocoder,
            validators,
            status: PipelineStatus::Init,
            records: Vec::new(),
            statistics: None,
            cancellation: CancellationFlag::new(),
        })
    }

    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn scan(&mut self) -> Result<ScanSummary, PhotoCopyError> {
        self.status = PipelineStatus::Scanning;
        let mut summary = ScanSummary::default();

        let paths = self.fs.walk(&self.options.source, self.options.recursive);
        summary.scanned = paths.len();

        let (primary_paths, related_by_primary) = group_by_related_file_mode(
            &paths,
            self.options.related_file_mode,
            &self.options.source,
            self.options.recursive,
        );

        let cancellation = self.cancellation.clone();
        let fs = self.fs;
        let metadata_provider = self.metadata_provider;
        let geocoder = self.geocoder;
        let source_root = self.options.source.clone();
        let country_as_code = self.options.country_as_code;

        let results: Vec<Option<FileRecord>> = primary_paths
            .par_iter()
            .map(|path| {
                if cancellation.is_cancelled() {
                    return None;
                }
                match build_record(fs, metadata_provider, geocoder, &source_root, path, country_as_code) {
                    Ok(record) => {
                        let related = related_by_primary.get(path).cloned().unwrap_or_default();
                        Some(record.with_related_files(related))
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "skipping file during scan");
                        None
                    }
                }
            })
            .collect();

        if self.cancellation.is_cancelled() {
            self.status = PipelineStatus::Cancelled;
            return Ok(summary);
        }

        let collector = StatisticsCollector::new();
        let referenced = self.template.referenced_variables();

        for maybe_record in results {
            let Some(record) = maybe_record else {
                summary.access_errors += 1;
                continue;
            };
            if !validator::validate(&record, &self.validators) {
                summary.rejected_by_validator += 1;
                continue;
            }
            for variable in &referenced {
                if let Some(value) = resolver::raw_value(*variable, &record) {
                    collector.observe(*variable, &value);
                }
            }
            summary.accepted += 1;
            self.records.push(record);
        }

        self.statistics = Some(collector.freeze());
        self.status = PipelineStatus::Scanned;
        info!(
            accepted = summary.accepted,
            scanned = summary.scanned,
            rejected = summary.rejected_by_validator,
            "scan pass complete"
        );
        Ok(summary)
    }

    pub fn apply(&mut self) -> Result<ApplySummary, PhotoCopyError> {
        self.status = PipelineStatus::Applying;
        let mut summary = ApplySummary::default();
        let stats = self.statistics.clone().unwrap_or_default();
        let mut collision_resolver = CollisionResolver::new();
        let dispatcher = Dispatcher::new(self.fs, self.options.dry_run);

        for record in &self.records {
            if self.cancellation.is_cancelled() {
                self.status = PipelineStatus::Cancelled;
                return Ok(summary);
            }

            let rendered = resolver::render(&self.template, record, &stats, &self.options);
            let plan = match collision_resolver.resolve(
                self.fs,
                record,
                &rendered,
                &self.options.destination,
                self.options.operation,
                self.options.duplicate_policy,
            ) {
                Ok(plan) => plan,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(source = %record.source_path.display(), error = %err, "collision error, skipping file");
                    summary.collision_errors += 1;
                    continue;
                }
            };

            match dispatcher.dispatch(&plan) {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(source = %record.source_path.display(), error = %err, "dispatch error, skipping file");
                    summary.collision_errors += 1;
                    continue;
                }
            }

            if !matches!(plan.disposition, Disposition::SkipIdentical) {
                for related_source in &record.related_files {
                    if let Err(err) =
                        dispatcher.dispatch_related(related_source, &plan.destination_path, self.options.operation)
                    {
                        warn!(source = %related_source.display(), error = %err, "failed to carry related file");
                    }
                }
            }

            match plan.disposition {
                Disposition::New => summary.new += 1,
                Disposition::SkipIdentical => summary.skipped_identical += 1,
                Disposition::Overwrite => summary.overwritten += 1,
                Disposition::Renamed(_) => summary.renamed += 1,
            }
        }

        self.status = PipelineStatus::Done;
        info!(
            new = summary.new,
            renamed = summary.renamed,
            overwritten = summary.overwritten,
            skipped = summary.skipped_identical,
            errors = summary.collision_errors,
            "apply pass complete"
        );
        Ok(summary)
    }
}

/// When `RelatedFileMode::SameStem` is active, groups same-stem files so
/// only one per group is scanned as an independent primary; the rest
/// travel as `related_files` on that primary's record. Otherwise every
/// path is its own primary.
fn group_by_related_file_mode(
    paths: &[PathBuf],
    mode: RelatedFileMode,
    source_root: &Path,
    recursive: bool,
) -> (Vec<PathBuf>, HashMap<PathBuf, Vec<PathBuf>>) {
    if mode != RelatedFileMode::SameStem {
        return (paths.to_vec(), HashMap::new());
    }

    let index = matcher::build_sidecar_index(source_root, recursive);
    let mut consumed: HashSet<PathBuf> = HashSet::new();
    let mut primaries = Vec::new();
    let mut related_map = HashMap::new();

    for path in paths {
        if consumed.contains(path) {
            continue;
        }
        let related = index.find_related(path);
        for sibling in &related {
            consumed.insert(sibling.clone());
        }
        primaries.push(path.clone());
        related_map.insert(path.clone(), related);
    }

    (primaries, related_map)
}

fn build_record(
    fs: &dyn FileSystem,
    metadata_provider: &dyn MetadataProvider,
    geocoder: &dyn GeocodingService,
    source_root: &Path,
    path: &Path,
    country_as_code: bool,
) -> Result<FileRecord, PhotoCopyError> {
    let meta = fs.metadata(path)?;
    let (date, location) = metadata_provider.resolve(path, meta.modified, geocoder, country_as_code)?;
    let relative_directory = path
        .parent()
        .and_then(|parent| parent.strip_prefix(source_root).ok())
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();

    Ok(FileRecord::new(
        path.to_path_buf(),
        meta.size,
        date,
        location,
        relative_directory,
    ))
}
