use crate::options::Options;
use crate::record::FileRecord;

/// A single inclusion check run against a scanned file. Boxed so the set
/// built from `Options` can mix different predicates uniformly.
pub type Validator = Box<dyn Fn(&FileRecord) -> bool + Send + Sync>;

/// Builds the conjunctive set of validators implied by `options`. A file
/// is kept for the apply pass only if every validator returns true.
pub fn build_validators(options: &Options) -> Vec<Validator> {
    let mut validators: Vec<Validator> = Vec::new();

    if let Some(min_date) = options.min_date {
        validators.push(Box::new(move |record: &FileRecord| record.date.value >= min_date));
    }

    if let Some(max_date) = options.max_date {
        validators.push(Box::new(move |record: &FileRecord| record.date.value <= max_date));
    }

    validators
}

pub fn validate(record: &FileRecord, validators: &[Validator]) -> bool {
    validators.iter().all(|validator| validator(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DateProvenance, FileDateTime};
    use chrono::{Local, TimeZone};
    use std::path::PathBuf;

    fn record_at(year: i32, month: u32, day: u32) -> FileRecord {
        let value = Local.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap();
        FileRecord::new(
            PathBuf::from("/in/a.jpg"),
            10,
            FileDateTime {
                value,
                provenance: DateProvenance::FilesystemMtime,
            },
            None,
            String::new(),
        )
    }

    #[test]
    fn no_date_bounds_accepts_everything() {
        let options = Options::default();
        let validators = build_validators(&options);
        assert!(validate(&record_at(2020, 1, 1), &validators));
    }

    #[test]
    fn min_date_rejects_earlier_files() {
        let mut options = Options::default();
        options.min_date = Some(Local.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let validators = build_validators(&options);

        assert!(!validate(&record_at(2024, 12, 31), &validators));
        assert!(validate(&record_at(2025, 6, 1), &validators));
    }

    #[test]
    fn max_date_rejects_later_files() {
        let mut options = Options::default();
        options.max_date = Some(Local.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap());
        let validators = build_validators(&options);

        assert!(validate(&record_at(2025, 1, 1), &validators));
        assert!(!validate(&record_at(2026, 1, 1), &validators));
    }

    #[test]
    fn min_and_max_combine_as_conjunction() {
        let mut options = Options::default();
        options.min_date = Some(Local.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        options.max_date = Some(Local.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap());
        let validators = build_validators(&options);

        assert!(!validate(&record_at(2024, 6, 1), &validators));
        assert!(validate(&record_at(2025, 6, 1), &validators));
        assert!(!validate(&record_at(2026, 6, 1), &validators));
    }
}
