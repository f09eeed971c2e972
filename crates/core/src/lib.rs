mod checksum;
mod collision;
mod config;
mod dispatch;
mod error;
mod exif_reader;
mod matcher;
mod options;
mod pipeline;
mod ports;
mod record;
mod resolver;
mod stats;
mod template;
mod validator;
mod xmp_reader;

pub use collision::CollisionResolver;
pub use config::{app_paths, load_config, save_config, AppConfig, AppPaths};
pub use dispatch::Dispatcher;
pub use error::PhotoCopyError;
pub use options::{DuplicatePolicy, LogLevel, Operation, Options, RelatedFileMode};
pub use pipeline::{ApplySummary, CancellationFlag, Pipeline, PipelineStatus, ScanSummary};
pub use ports::{
    ExifMetadataProvider, FileMetadata, FileSystem, GeocodingService, NullGeocodingService,
    OsFileSystem,
};
pub use record::{DateProvenance, FileDateTime, FileRecord, LocationData};
pub use stats::{Statistics, StatisticsCollector};
pub use template::{
    parse_template, validate_template, TemplateSyntaxError, TemplateTree, Variable,
};

pub const DEFAULT_TEMPLATE: &str = "{year}/{month}/{name}";
