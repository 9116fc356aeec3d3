//! Capture timestamp and geotag extraction from embedded EXIF.
//!
//! Extraction never fails the audit: a missing or malformed geotag degrades
//! to [`GeoLocation::Invalid`] and a missing timestamp to `"Unknown"`.

use std::io::Cursor;

use exif::{Exif, In, Rational, Tag, Value};

use crate::types::{CaptureMetadata, GeoLocation, UNKNOWN_TIMESTAMP};

/// Why a geotag could not be turned into coordinates.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeotagError {
    #[error("no EXIF block: {0}")]
    NoExif(String),

    #[error("missing tag {0}")]
    MissingTag(Tag),

    #[error("malformed tag {tag}: {reason}")]
    Malformed { tag: Tag, reason: String },

    #[error("coordinate out of range: {0}")]
    OutOfRange(f64),
}

/// Compass hemisphere of a GPS reference tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    fn sign(self) -> f64 {
        match self {
            Hemisphere::North | Hemisphere::East => 1.0,
            Hemisphere::South | Hemisphere::West => -1.0,
        }
    }
}

/// Convert degrees/minutes/seconds to signed decimal degrees.
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, hemisphere: Hemisphere) -> f64 {
    let magnitude = degrees + minutes / 60.0 + seconds / 3600.0;
    hemisphere.sign() * magnitude
}

/// Read capture metadata from the current image's raw bytes.
pub fn extract_metadata(bytes: &[u8]) -> CaptureMetadata {
    let exif = match read_exif(bytes) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::debug!("No usable metadata: {e}");
            return CaptureMetadata::default();
        }
    };

    let location = match parse_location(&exif) {
        Ok((lat, lon)) => GeoLocation::Valid { lat, lon },
        Err(e) => {
            tracing::debug!("Geotag unavailable: {e}");
            GeoLocation::Invalid
        }
    };

    CaptureMetadata {
        timestamp: read_timestamp(&exif),
        location,
    }
}

/// Decode the geotag only, reporting why it failed.
pub fn extract_location(bytes: &[u8]) -> Result<(f64, f64), GeotagError> {
    let exif = read_exif(bytes)?;
    parse_location(&exif)
}

fn read_exif(bytes: &[u8]) -> Result<Exif, GeotagError> {
    exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .map_err(|e| GeotagError::NoExif(e.to_string()))
}

/// `DateTime` only; `DateTimeOriginal` is not consulted.
fn read_timestamp(exif: &Exif) -> String {
    exif.get_field(Tag::DateTime, In::PRIMARY)
        .and_then(|field| first_ascii(&field.value))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_TIMESTAMP.to_string())
}

fn parse_location(exif: &Exif) -> Result<(f64, f64), GeotagError> {
    let lat = parse_axis(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 90.0)?;
    let lon = parse_axis(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 180.0)?;
    Ok((lat, lon))
}

fn parse_axis(exif: &Exif, value_tag: Tag, ref_tag: Tag, limit: f64) -> Result<f64, GeotagError> {
    let value = exif
        .get_field(value_tag, In::PRIMARY)
        .ok_or(GeotagError::MissingTag(value_tag))?;
    let reference = exif
        .get_field(ref_tag, In::PRIMARY)
        .ok_or(GeotagError::MissingTag(ref_tag))?;

    let [d, m, s] = dms_components(value_tag, &value.value)?;
    let hemisphere = parse_hemisphere(ref_tag, &reference.value)?;

    let decimal = dms_to_decimal(d, m, s, hemisphere);
    if !decimal.is_finite() || decimal.abs() > limit {
        return Err(GeotagError::OutOfRange(decimal));
    }
    Ok(decimal)
}

fn dms_components(tag: Tag, value: &Value) -> Result<[f64; 3], GeotagError> {
    let malformed = |reason: &str| GeotagError::Malformed {
        tag,
        reason: reason.to_string(),
    };

    let rationals = match value {
        Value::Rational(r) => r,
        _ => return Err(malformed("expected RATIONAL triple")),
    };
    if rationals.len() < 3 {
        return Err(malformed("fewer than three components"));
    }

    let mut out = [0.0; 3];
    for (slot, r) in out.iter_mut().zip(rationals.iter()) {
        *slot = rational_to_f64(r).ok_or_else(|| malformed("zero denominator"))?;
    }
    Ok(out)
}

fn rational_to_f64(r: &Rational) -> Option<f64> {
    if r.denom == 0 {
        None
    } else {
        Some(r.num as f64 / r.denom as f64)
    }
}

fn parse_hemisphere(tag: Tag, value: &Value) -> Result<Hemisphere, GeotagError> {
    let text = first_ascii(value).ok_or_else(|| GeotagError::Malformed {
        tag,
        reason: "expected ASCII reference".to_string(),
    })?;

    let hemisphere = match (tag, text.as_str()) {
        (Tag::GPSLatitudeRef, "N") => Hemisphere::North,
        (Tag::GPSLatitudeRef, "S") => Hemisphere::South,
        (Tag::GPSLongitudeRef, "E") => Hemisphere::East,
        (Tag::GPSLongitudeRef, "W") => Hemisphere::West,
        _ => {
            return Err(GeotagError::Malformed {
                tag,
                reason: format!("unexpected reference {text:?}"),
            })
        }
    };
    Ok(hemisphere)
}

fn first_ascii(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts
            .first()
            .map(|p| String::from_utf8_lossy(p).trim().to_string()),
        _ => None,
    }
}
