use chrono::Datelike;

use crate::options::Options;
use crate::record::FileRecord;
use crate::stats::Statistics;
use crate::template::{Alternative, Part, TemplateTree, Variable, VariableExpression};

/// Stands in for `{number}` until the Collision Resolver knows whether a
/// counter is actually needed. Private-use codepoint: never produced by
/// EXIF/XMP text or filesystem names, so it can't collide with real
/// rendered content.
pub const NUMBER_PLACEHOLDER: char = '\u{E000}';

/// The raw (pre-condition) text a variable would contribute for a given
/// file, or `None` when the file carries no value for it (e.g. no GPS fix
/// for a location variable). Whether `country` renders as a code or a
/// full name is decided upstream, when the `GeocodingService` resolves
/// `LocationData` in the first place.
pub(crate) fn raw_value(variable: Variable, record: &FileRecord) -> Option<String> {
    match variable {
        Variable::Year => Some(format!("{:04}", record.date.value.year())),
        Variable::Month => Some(format!("{:02}", record.date.value.month())),
        Variable::Day => Some(format!("{:02}", record.date.value.day())),
        Variable::DayOfYear => Some(format!("{:03}", record.date.value.ordinal())),
        Variable::Name => Some(record.file_name.clone()),
        Variable::NameNoExt => Some(record.name_without_extension().to_string()),
        Variable::Ext => Some(record.extension().to_string()),
        Variable::Directory => {
            if record.relative_directory.is_empty() {
                None
            } else {
                Some(record.relative_directory.clone())
            }
        }
        Variable::Number => None,
        Variable::District => record.location.as_ref().and_then(|loc| loc.district.clone()),
        Variable::City => record.location.as_ref().and_then(|loc| loc.city.clone()),
        Variable::County => record.location.as_ref().and_then(|loc| loc.county.clone()),
        Variable::State => record.location.as_ref().and_then(|loc| loc.state.clone()),
        Variable::Country => record.location.as_ref().and_then(|loc| loc.country.clone()),
    }
}

fn expression_has_location_variable(expr: &VariableExpression) -> bool {
    expr.alternatives.iter().any(|alt| {
        matches!(alt, Alternative::Variable { variable, .. } if variable.is_location())
    })
}

/// Resolves one `{a|b|c}` expression to text, or `None` if every
/// alternative was a variable with no value and no condition admitted it.
fn resolve_expression(
    expr: &VariableExpression,
    record: &FileRecord,
    stats: &Statistics,
    options: &Options,
) -> Option<String> {
    for alternative in &expr.alternatives {
        match alternative {
            Alternative::Literal(text) => return Some(text.clone()),
            Alternative::Variable {
                variable: Variable::Number,
                ..
            } => return Some(NUMBER_PLACEHOLDER.to_string()),
            Alternative::Variable { variable, condition } => {
                let Some(value) = raw_value(*variable, record) else {
                    continue;
                };
                match condition {
                    None => return Some(value),
                    Some(condition) => {
                        let count = stats.count(*variable, &value);
                        if condition.allows(count) {
                            return Some(value);
                        }
                    }
                }
            }
        }
    }

    if expression_has_location_variable(expr) && !options.unknown_location_fallback.is_empty() {
        return Some(options.unknown_location_fallback.clone());
    }

    None
}

/// Renders the destination-relative path for `record`, applying the
/// segment-omission rule: a segment vanishes if its resolved text is
/// empty and it referenced at least one variable. The `{number}`
/// placeholder, if present, is left in the output for the Collision
/// Resolver to thread a counter through.
pub fn render(tree: &TemplateTree, record: &FileRecord, stats: &Statistics, options: &Options) -> String {
    let mut rendered_segments = Vec::with_capacity(tree.segments.len());

    for segment in &tree.segments {
        let mut text = String::new();
        for part in &segment.parts {
            match part {
                Part::Literal(literal) => text.push_str(literal),
                Part::Expression(expr) => {
                    if let Some(value) = resolve_expression(expr, record, stats, options) {
                        text.push_str(&value);
                    }
                }
            }
        }

        if text.is_empty() && segment.has_variable() {
            continue;
        }
        rendered_segments.push(text);
    }

    rendered_segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DateProvenance, FileDateTime, LocationData};
    use crate::stats::StatisticsCollector;
    use crate::template::parse_template;
    use chrono::{Local, TimeZone};
    use std::path::PathBuf;

    fn record(name: &str, city: Option<&str>) -> FileRecord {
        let value = Local.with_ymd_and_hms(2026, 2, 8, 10, 0, 0).unwrap();
        let location = city.map(|city| LocationData {
            city: Some(city.to_string()),
            ..Default::default()
        });
        FileRecord::new(
            PathBuf::from(format!("/in/{name}")),
            10,
            FileDateTime {
                value,
                provenance: DateProvenance::Exif,
            },
            location,
            String::new(),
        )
    }

    #[test]
    fn renders_plain_date_and_name_template() {
        let tree = parse_template("{year}/{month}/{name}").unwrap();
        let record = record("IMG_0001.JPG", None);
        let stats = StatisticsCollector::new().freeze();
        let options = Options::default();

        let rendered = render(&tree, &record, &stats, &options);
        assert_eq!(rendered, "2026/02/IMG_0001.JPG");
    }

    #[test]
    fn omits_segment_when_variable_resolves_empty() {
        let tree = parse_template("{city}/{name}").unwrap();
        let record = record("IMG_0002.JPG", None);
        let stats = StatisticsCollector::new().freeze();
        let options = Options::default();

        let rendered = render(&tree, &record, &stats, &options);
        assert_eq!(rendered, "IMG_0002.JPG");
    }

    #[test]
    fn condition_gate_falls_through_to_literal_alternative() {
        let tree = parse_template("{city?min=2,max=999|unknown}/{name}").unwrap();
        let record = record("IMG_0003.JPG", Some("Liberec"));

        let collector = StatisticsCollector::new();
        collector.observe(Variable::City, "Liberec");
        let stats = collector.freeze();
        let options = Options::default();

        let rendered = render(&tree, &record, &stats, &options);
        assert_eq!(rendered, "unknown/IMG_0003.JPG");
    }

    #[test]
    fn condition_gate_admits_value_once_threshold_met() {
        let tree = parse_template("{city?min=2,max=999|unknown}/{name}").unwrap();
        let record = record("IMG_0004.JPG", Some("Liberec"));

        let collector = StatisticsCollector::new();
        collector.observe(Variable::City, "Liberec");
        collector.observe(Variable::City, "Liberec");
        let stats = collector.freeze();
        let options = Options::default();

        let rendered = render(&tree, &record, &stats, &options);
        assert_eq!(rendered, "Liberec/IMG_0004.JPG");
    }

    #[test]
    fn unknown_location_fallback_applies_when_no_location_data() {
        let tree = parse_template("{city}/{name}").unwrap();
        let record = record("IMG_0005.JPG", None);
        let stats = StatisticsCollector::new().freeze();
        let mut options = Options::default();
        options.unknown_location_fallback = "unplaced".to_string();

        let rendered = render(&tree, &record, &stats, &options);
        assert_eq!(rendered, "unplaced/IMG_0005.JPG");
    }

    #[test]
    fn number_placeholder_is_left_in_output_for_collision_resolver() {
        let tree = parse_template("{name}-{number}").unwrap();
        let record = record("IMG_0006.JPG", None);
        let stats = StatisticsCollector::new().freeze();
        let options = Options::default();

        let rendered = render(&tree, &record, &stats, &options);
        assert!(rendered.contains(NUMBER_PLACEHOLDER));
    }
}
