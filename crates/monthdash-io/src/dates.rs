//! Publication-date resolution from heterogeneous spreadsheet cells.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::table::Cell;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y", "%Y.%m.%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Plausible Excel serial range: 1954-10-03 .. 2119-01-05.
const SERIAL_RANGE: std::ops::Range<f64> = 20_000.0..80_000.0;

/// Resolve a cell to a calendar date.
///
/// Numbers are read as Excel serials when in a plausible range, otherwise as
/// Unix timestamps in seconds or milliseconds. Text is tried against RFC 3339
/// and a fixed list of day-first and ISO formats.
#[must_use]
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateSerial(serial) => from_excel_serial(*serial),
        Cell::Number(n) => from_number(*n),
        Cell::Text(s) => parse_date_str(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// First parseable date among `cells`, in order.
pub fn first_date<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Option<NaiveDate> {
    cells.into_iter().find_map(parse_date)
}

#[allow(clippy::cast_possible_truncation)]
fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

#[allow(clippy::cast_possible_truncation)]
fn from_number(n: f64) -> Option<NaiveDate> {
    if SERIAL_RANGE.contains(&n) {
        return from_excel_serial(n);
    }
    let secs = if n >= 1e12 { n / 1000.0 } else { n };
    if (1e9..1e10).contains(&secs) {
        return DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.date_naive());
    }
    None
}

fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%z") {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // Numeric strings (timestamps exported as text).
    s.parse::<f64>().ok().and_then(from_number)
}
