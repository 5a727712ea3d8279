use chrono::{Duration as ChronoDur, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── OLE automation date utilities ─────────────────────
OLE automation dates count days from 1899-12-30:
  Serial 0  = 1899-12-30
  Serial 2  = 1900-01-01
  Serial 61 = 1900-03-01
For serials >= 61 this agrees with the 1900 spreadsheet date system; the
phantom 1900-02-29 that spreadsheets place at serial 60 falls on 1900-02-28.
The fractional part is the time of day, always measured forward from
midnight even for negative serials.
------------------------------------------------------------------------- */

/// Day zero of the OLE automation calendar.
const OLE_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1899, 12, 30) {
    Some(d) => d,
    None => panic!("invalid OLE epoch"),
};

/// Largest serial representable as an OLE date (9999-12-31 23:59:59).
pub const OLE_MAX_SERIAL: f64 = 2_958_466.0;
/// Smallest serial representable as an OLE date (0100-01-01).
pub const OLE_MIN_SERIAL: f64 = -657_435.0;

/// Serial that an empty date-formatted cell decodes to (1900-01-01).
pub const EMPTY_DATE_SERIAL: f64 = 2.0;

/// Convert an OLE automation serial into a calendar date-time.
///
/// Returns `None` for NaN and for serials outside the OLE range.
pub fn ole_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(OLE_MIN_SERIAL..OLE_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let millis = (serial * 86_400_000.0).round() as i64;
    let mut days = millis / 86_400_000;
    let mut day_millis = millis % 86_400_000;
    if day_millis < 0 {
        // -1.25 is 1899-12-29 06:00: whole days go backwards, the time goes forwards.
        day_millis = -day_millis;
    }
    if day_millis >= 86_400_000 {
        days += 1;
        day_millis -= 86_400_000;
    }
    let date = OLE_EPOCH.checked_add_signed(ChronoDur::try_days(days)?)?;
    let secs = (day_millis / 1000) as u32;
    let nanos = ((day_millis % 1000) * 1_000_000) as u32;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)?;
    Some(date.and_time(time))
}

/// Convert a calendar date-time into an OLE automation serial.
pub fn datetime_to_ole_serial(dt: &NaiveDateTime) -> f64 {
    let days = (dt.date() - OLE_EPOCH).num_days();
    let frac = dt.time().num_seconds_from_midnight() as f64 / 86_400.0
        + dt.time().nanosecond() as f64 / 86_400_000_000_000.0;
    if days < 0 && frac > 0.0 {
        days as f64 - frac
    } else {
        days as f64 + frac
    }
}

/// Cell type a value is stored with, i.e. the `t` attribute of a cell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Number,
    String,
    Boolean,
    SharedString,
    InlineString,
    Error,
    Date,
}

impl CellType {
    /// The data-type tag written into the package.
    pub fn tag(self) -> &'static str {
        match self {
            CellType::Number => "n",
            CellType::String => "str",
            CellType::Boolean => "b",
            CellType::SharedString => "s",
            CellType::InlineString => "inlineStr",
            CellType::Error => "e",
            CellType::Date => "d",
        }
    }

    /// Parse a data-type tag. An absent or `general` tag is not a type.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "n" => Some(CellType::Number),
            "str" => Some(CellType::String),
            "b" => Some(CellType::Boolean),
            "s" => Some(CellType::SharedString),
            "inlineStr" => Some(CellType::InlineString),
            "e" => Some(CellType::Error),
            "d" => Some(CellType::Date),
            _ => None,
        }
    }
}

impl Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A typed run-time cell value.
///
/// This is what a stored cell resolves to on read, and what a record field
/// hands over on write.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
    Decimal(Decimal),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// True for `Empty` and for text made of whitespace only.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way it is stored in a cell.
    ///
    /// Numbers always use `.` as decimal point; date-times are rendered as
    /// ISO-8601 text since dates are not specially typed on write.
    pub fn to_cell_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Decimal(d) => d.to_string(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        }
    }

    /// Consume the value, rendering anything that is not already text.
    pub fn into_text(self) -> String {
        match self {
            CellValue::Text(s) => s,
            other => other.to_cell_text(),
        }
    }

    /// Build a date-time value from an OLE serial.
    pub fn from_ole_serial(serial: f64) -> Option<Self> {
        ole_serial_to_datetime(serial).map(CellValue::DateTime)
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Decimal(d) => write!(f, "{d}"),
            CellValue::Boolean(b) => write!(f, "{b}"),
            CellValue::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<Decimal> for CellValue {
    fn from(value: Decimal) -> Self {
        CellValue::Decimal(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}
