use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use exif::{In, Reader, Tag, Value};

/// What can be pulled out of a file's EXIF block: the best-known
/// timestamp and, when present, GPS coordinates for reverse geocoding.
#[derive(Debug, Clone, Default)]
pub struct ExifMetadata {
    pub date: Option<DateTime<Local>>,
    pub gps: Option<(f64, f64)>,
}

pub fn read_exif_metadata(path: &Path) -> Result<ExifMetadata> {
    let file = File::open(path)
        .with_context(|| format!("could not open for EXIF read: {}", path.display()))?;
    let mut buf = BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut buf)
        .with_context(|| format!("could not parse EXIF: {}", path.display()))?;

    let date = find_field_value(&exif, &["DateTimeOriginal", "DateTimeDigitized", "DateTime"])
        .and_then(|raw| parse_date(&raw));
    let gps = read_gps(&exif);

    Ok(ExifMetadata { date, gps })
}

fn find_field_value(exif: &exif::Exif, names: &[&str]) -> Option<String> {
    exif.fields().find_map(|field| {
        let tag_name = format!("{:?}", field.tag);
        if names.iter().any(|name| name.eq_ignore_ascii_case(&tag_name)) {
            Some(field.display_value().with_unit(exif).to_string())
        } else {
            None
        }
    })
}

fn read_gps(exif: &exif::Exif) -> Option<(f64, f64)> {
    let lat = dms_field(exif, Tag::GPSLatitude)?;
    let lat_ref = ref_field(exif, Tag::GPSLatitudeRef).unwrap_or_else(|| "N".to_string());
    let lon = dms_field(exif, Tag::GPSLongitude)?;
    let lon_ref = ref_field(exif, Tag::GPSLongitudeRef).unwrap_or_else(|| "E".to_string());

    let signed_lat = if lat_ref.eq_ignore_ascii_case("S") { -lat } else { lat };
    let signed_lon = if lon_ref.eq_ignore_ascii_case("W") { -lon } else { lon };

    Some((signed_lat, signed_lon))
}

fn dms_field(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(values) if values.len() == 3 => {
            let degrees = values[0].to_f64();
            let minutes = values[1].to_f64();
            let seconds = values[2].to_f64();
            Some(degrees + minutes / 60.0 + seconds / 3600.0)
        }
        _ => None,
    }
}

fn ref_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    Some(field.display_value().to_string())
}

fn parse_date(input: &str) -> Option<DateTime<Local>> {
    let normalized = input.trim();
    let candidates = [
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
    ];

    for fmt in candidates {
        if let Ok(dt) = DateTime::parse_from_str(normalized, fmt) {
            return Some(dt.with_timezone(&Local));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, fmt) {
            if let Some(local) = Local.from_local_datetime(&naive).single() {
                return Some(local);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_exif_colon_format() {
        use chrono::{Datelike, Timelike};
        let parsed = parse_date("2026:02:08 10:20:30").expect("date should parse");
        assert_eq!(parsed.year(), 2026);
        assert_eq!(parsed.month(), 2);
        assert_eq!(parsed.day(), 8);
        assert_eq!(parsed.hour(), 10);
        assert_eq!(parsed.minute(), 20);
        assert_eq!(parsed.second(), 30);
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("not-a-date").is_none());
    }
}
