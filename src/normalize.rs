//! Per-record validation and normalization.
//!
//! Each raw record either becomes a [`CanonicalRecord`] or is discarded with a
//! [`DiscardReason`]. Discards never fail the batch; they are counted in
//! [`BatchStats`] and logged.

use chrono::{DateTime, Local};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::record::{CanonicalRecord, RawRecord};
use crate::stats::BatchStats;

/// Format of `datahora_captura`.
pub const CAPTURE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why a record was left out of the output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscardReason {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("speed is missing or not positive")]
    NonPositiveSpeed,

    #[error("{field} '{value}' is not a finite number")]
    InvalidCoordinate { field: &'static str, value: String },

    #[error("capture timestamp is missing or not positive")]
    InvalidCaptureTime,

    #[error("capture timestamp {0} ms is out of range")]
    CaptureTimeOutOfRange(i64),
}

/// Result of normalizing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Keep(CanonicalRecord),
    Discard(DiscardReason),
}

/// Validates and converts one raw record.
///
/// Steps run in a fixed order and stop at the first failure: speed filter,
/// coordinates, capture time, then the optional transmission delay.
pub fn normalize(raw: &RawRecord) -> Normalized {
    match try_normalize(raw) {
        Ok(record) => Normalized::Keep(record),
        Err(reason) => Normalized::Discard(reason),
    }
}

fn try_normalize(raw: &RawRecord) -> Result<CanonicalRecord, DiscardReason> {
    let velocidade = parse_digits(raw, "velocidade");
    if velocidade <= 0 {
        return Err(DiscardReason::NonPositiveSpeed);
    }

    let latitude = coordinate(raw, "latitude")?;
    let longitude = coordinate(raw, "longitude")?;

    let capture_ms = parse_digits(raw, "datahora");
    if capture_ms <= 0 {
        return Err(DiscardReason::InvalidCaptureTime);
    }
    let datahora_captura =
        format_capture_time(capture_ms).ok_or(DiscardReason::CaptureTimeOutOfRange(capture_ms))?;

    let server_ms = parse_digits(raw, "datahoraservidor");
    let atraso_transmissao_segundos = transmission_delay(capture_ms, server_ms);

    Ok(CanonicalRecord {
        ordem: raw.text("ordem").map(|s| s.into_owned()),
        linha: raw.text("linha").map(|s| s.into_owned()),
        latitude,
        longitude,
        velocidade,
        datahora_captura,
        atraso_transmissao_segundos,
    })
}

/// Normalizes a whole record list, keeping upstream order.
pub fn normalize_all(values: Vec<Value>) -> (Vec<CanonicalRecord>, BatchStats) {
    let mut stats = BatchStats::new();
    let mut records = Vec::with_capacity(values.len());

    for value in values {
        let Some(raw) = RawRecord::from_value(value) else {
            debug!(reason = %DiscardReason::NotAnObject, "Discarding bus record");
            stats.record_discard(&DiscardReason::NotAnObject);
            continue;
        };

        match normalize(&raw) {
            Normalized::Keep(record) => {
                stats.record_kept(record.atraso_transmissao_segundos.is_some());
                records.push(record);
            }
            Normalized::Discard(reason) => {
                debug!(
                    ordem = raw.ordem().as_deref().unwrap_or("unknown"),
                    reason = %reason,
                    "Discarding bus record"
                );
                stats.record_discard(&reason);
            }
        }
    }

    let malformed = stats.not_an_object + stats.invalid_coordinate + stats.invalid_capture_time;
    if malformed > 0 {
        warn!(
            not_an_object = stats.not_an_object,
            invalid_coordinate = stats.invalid_coordinate,
            invalid_capture_time = stats.invalid_capture_time,
            "Malformed bus records discarded"
        );
    }
    info!(
        total = stats.total,
        kept = stats.kept,
        discarded = stats.discarded(),
        kept_pct = stats.kept_pct(),
        non_positive_speed = stats.non_positive_speed,
        "Batch normalized"
    );

    (records, stats)
}

/// Reads a field holding a non-negative integer as plain digits.
///
/// Missing fields, non-digit text, other JSON types and values beyond `i64`
/// all read as 0.
pub fn parse_digits(raw: &RawRecord, key: &str) -> i64 {
    raw.text(key)
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Parses a coordinate that may use a comma as decimal separator.
pub fn normalize_coord(text: &str) -> Option<f64> {
    text.replace(',', ".")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn coordinate(raw: &RawRecord, field: &'static str) -> Result<f64, DiscardReason> {
    // A missing coordinate has always been served as 0.
    let text = match raw.get(field) {
        None => "0".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(DiscardReason::InvalidCoordinate {
                field,
                value: other.to_string(),
            });
        }
    };

    normalize_coord(&text).ok_or(DiscardReason::InvalidCoordinate { field, value: text })
}

/// Formats epoch milliseconds as local time, truncating to whole seconds.
pub fn format_capture_time(epoch_ms: i64) -> Option<String> {
    let utc = DateTime::from_timestamp(epoch_ms.div_euclid(1000), 0)?;
    Some(
        utc.with_timezone(&Local)
            .format(CAPTURE_TIME_FORMAT)
            .to_string(),
    )
}

/// Seconds between capture and server receipt, or `None` unless both are positive.
pub fn transmission_delay(capture_ms: i64, server_ms: i64) -> Option<f64> {
    if capture_ms > 0 && server_ms > 0 {
        Some((server_ms - capture_ms) as f64 / 1000.0)
    } else {
        None
    }
}
