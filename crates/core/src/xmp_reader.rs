use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::exif_reader::ExifMetadata;

const TARGET_XMP_KEYS: &[&str] = &[
    "datetimeoriginal",
    "createdate",
    "datecreated",
    "gpslatitude",
    "gpslongitude",
];

pub fn read_xmp_metadata(path: &Path) -> Result<ExifMetadata> {
    let xml = fs::read_to_string(path)
        .with_context(|| format!("could not open XMP: {}", path.display()))?;
    let values = collect_tag_values(&xml);

    let date = pick_value(&values, &["datetimeoriginal", "createdate", "datecreated"])
        .as_deref()
        .and_then(parse_date);
    let gps = pick_value(&values, &["gpslatitude"])
        .as_deref()
        .and_then(parse_dms)
        .zip(pick_value(&values, &["gpslongitude"]).as_deref().and_then(parse_dms));

    Ok(ExifMetadata { date, gps })
}

fn pick_value(values: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = values.get(*key) {
            return Some(value.clone());
        }
    }
    None
}

/// Parses XMP's `DDD,MM.mmmm{N|S|E|W}` GPS coordinate form into signed
/// decimal degrees.
fn parse_dms(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let hemisphere = raw.chars().last()?;
    let (body, signed_hemisphere) = if matches!(hemisphere, 'N' | 'S' | 'E' | 'W') {
        (&raw[..raw.len() - hemisphere.len_utf8()], Some(hemisphere))
    } else {
        (raw, None)
    };

    let (degrees_str, minutes_str) = body.split_once(',')?;
    let degrees: f64 = degrees_str.trim().parse().ok()?;
    let minutes: f64 = minutes_str.trim().parse().ok()?;
    let value = degrees + minutes / 60.0;

    match signed_hemisphere {
        Some('S') | Some('W') => Some(-value),
        _ => Some(value),
    }
}

fn collect_tag_values(xml: &str) -> HashMap<String, String> {
    let mut values = HashMap::<String, String>::new();
    let mut cursor = 0usize;

    while let Some(start) = xml[cursor..].find('<') {
        let start = cursor + start;
        let Some(raw_end) = xml[start..].find('>') else {
            break;
        };
        let end = raw_end + start;
        let raw_tag = &xml[start + 1..end];

        if raw_tag.starts_with('/') || raw_tag.starts_with('?') || raw_tag.starts_with('!') {
            cursor = end + 1;
            continue;
        }

        collect_attribute_values(raw_tag, &mut values);

        let tag_name = raw_tag.split_whitespace().next().unwrap_or_default();
        let suffix = normalize_tag_name(tag_name);
        if !TARGET_XMP_KEYS.iter().any(|key| key == &suffix) {
            cursor = end + 1;
            continue;
        }
        if values.contains_key(&suffix) {
            cursor = end + 1;
            continue;
        }

        let close_tag = format!("</{}>", tag_name);
        if let Some(close_pos) = xml[end + 1..].find(&close_tag) {
            let close_pos = end + 1 + close_pos;
            let content = xml[end + 1..close_pos].trim();
            if !content.is_empty() {
                values.insert(suffix, html_unescape_basic(content));
            }
        }

        cursor = end + 1;
    }

    values
}

fn collect_attribute_values(raw_tag: &str, values: &mut HashMap<String, String>) {
    let bytes = raw_tag.as_bytes();
    let mut cursor = 0usize;

    while cursor < bytes.len() && !bytes[cursor].is_ascii_whitespace() {
        cursor += 1;
    }

    while cursor < bytes.len() {
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= bytes.len() || bytes[cursor] == b'/' {
            break;
        }

        let name_start = cursor;
        while cursor < bytes.len()
            && !bytes[cursor].is_ascii_whitespace()
            && bytes[cursor] != b'='
            && bytes[cursor] != b'/'
        {
            cursor += 1;
        }
        if name_start == cursor {
            cursor += 1;
            continue;
        }
        let raw_name = &raw_tag[name_start..cursor];

        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= bytes.len() || bytes[cursor] != b'=' {
            while cursor < bytes.len() && !bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            continue;
        }
        cursor += 1;

        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= bytes.len() {
            break;
        }

        let (value_start, value_end) = if bytes[cursor] == b'"' || bytes[cursor] == b'\'' {
            let quote = bytes[cursor];
            cursor += 1;
            let value_start = cursor;
            while cursor < bytes.len() && bytes[cursor] != quote {
                cursor += 1;
            }
            if cursor >= bytes.len() {
                break;
            }
            let value_end = cursor;
            cursor += 1;
            (value_start, value_end)
        } else {
            let value_start = cursor;
            while cursor < bytes.len() && !bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            (value_start, cursor)
        };

        let suffix = normalize_tag_name(raw_name);
        if !TARGET_XMP_KEYS.iter().any(|key| key == &suffix) || values.contains_key(&suffix) {
            continue;
        }

        let value = raw_tag[value_start..value_end].trim();
        if value.is_empty() {
            continue;
        }
        values.insert(suffix, html_unescape_basic(value));
    }
}

fn normalize_tag_name(tag: &str) -> String {
    tag.rsplit(':')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn html_unescape_basic(input: &str) -> String {
    input
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

fn parse_date(input: &str) -> Option<DateTime<Local>> {
    let candidates = [
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
    ];

    for fmt in candidates {
        if let Ok(dt) = DateTime::parse_from_str(input, fmt) {
            return Some(dt.with_timezone(&Local));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            if let Some(local) = Local.from_local_datetime(&naive).single() {
                return Some(local);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::read_xmp_metadata;
    use chrono::{Datelike, Timelike};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn read_xmp_metadata_supports_rdf_description_attributes() {
        let temp = tempdir().expect("tempdir");
        let xmp_path = temp.path().join("IMG_0001.xmp");
        fs::write(
            &xmp_path,
            r#"<x:xmpmeta><rdf:RDF><rdf:Description exif:DateTimeOriginal="2026:02:08 10:20:30" exif:GPSLatitude="50,5.25N" exif:GPSLongitude="14,25.5E" /></rdf:RDF></x:xmpmeta>"#,
        )
        .expect("write xmp");

        let meta = read_xmp_metadata(&xmp_path).expect("read xmp");
        let date = meta.date.expect("date should exist");
        assert_eq!(date.year(), 2026);
        assert_eq!(date.month(), 2);
        assert_eq!(date.day(), 8);
        assert_eq!(date.hour(), 10);
        assert_eq!(date.minute(), 20);
        assert_eq!(date.second(), 30);

        let (lat, lon) = meta.gps.expect("gps should exist");
        assert!((lat - 50.0875).abs() < 1e-3);
        assert!((lon - 14.425).abs() < 1e-3);
    }

    #[test]
    fn read_xmp_metadata_supports_element_text_values() {
        let temp = tempdir().expect("tempdir");
        let xmp_path = temp.path().join("IMG_0002.xmp");
        fs::write(
            &xmp_path,
            r#"<x:xmpmeta><rdf:RDF><rdf:Description><exif:DateTimeOriginal>2026:02:08 10:20:30</exif:DateTimeOriginal></rdf:Description></rdf:RDF></x:xmpmeta>"#,
        )
        .expect("write xmp");

        let meta = read_xmp_metadata(&xmp_path).expect("read xmp");
        assert!(meta.date.is_some());
        assert!(meta.gps.is_none());
    }
}
