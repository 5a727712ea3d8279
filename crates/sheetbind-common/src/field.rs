//! Field conversion contract.
//!
//! Every type that can sit in a record field implements [`CellField`]: it
//! knows its [`FieldKind`], how to render itself as a [`CellValue`] and how
//! to parse itself back out of one. The derive macros build a record's
//! static [`FieldDef`] table from these impls.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::{CellType, CellValue, ConversionError, NumberLocale, ole_serial_to_datetime};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Char,
    Date,
    DateTime,
    Enum,
    /// A textual key/value map that expands into several columns.
    Mapping,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Decimal)
    }

    /// Cell type emitted on write: numbers are `Number`, everything else,
    /// dates included, is written as `String`.
    pub fn cell_type(self) -> CellType {
        if self.is_numeric() {
            CellType::Number
        } else {
            CellType::String
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Text => "text",
            Self::Char => "char",
            Self::Date => "date",
            Self::DateTime => "date-time",
            Self::Enum => "enum",
            Self::Mapping => "mapping",
        })
    }
}

/// Static description of one declared record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub display: Option<&'static str>,
    pub kind: FieldKind,
    pub optional: bool,
    pub expand: bool,
    /// The field supplies the record's sheet name and is not a column.
    pub sheet_name: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            display: None,
            kind,
            optional: false,
            expand: false,
            sheet_name: false,
        }
    }

    pub const fn display(mut self, alias: &'static str) -> Self {
        self.display = Some(alias);
        self
    }

    pub const fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub const fn expand(mut self) -> Self {
        self.expand = true;
        self.kind = FieldKind::Mapping;
        self
    }

    pub const fn sheet_name(mut self) -> Self {
        self.sheet_name = true;
        self
    }
}

/// The current value of one record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(CellValue),
    /// Entries of an expanded mapping, as (header, value) pairs.
    Columns(Vec<(String, String)>),
}

pub trait CellField: Sized {
    const KIND: FieldKind;
    const OPTIONAL: bool = false;

    fn to_cell(&self) -> CellValue;

    fn from_cell(value: CellValue, locale: &NumberLocale) -> Result<Self, ConversionError>;
}

/// A key/value field that expands into one column per entry.
pub trait ExpandColumns {
    /// Entries in the order they are written.
    fn to_columns(&self) -> Vec<(String, String)>;

    fn insert_column(&mut self, key: String, value: String);
}

impl ExpandColumns for BTreeMap<String, String> {
    fn to_columns(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn insert_column(&mut self, key: String, value: String) {
        self.insert(key, value);
    }
}

/// Keeps insertion order; a repeated key replaces the earlier value in place.
impl ExpandColumns for Vec<(String, String)> {
    fn to_columns(&self) -> Vec<(String, String)> {
        self.clone()
    }

    fn insert_column(&mut self, key: String, value: String) {
        match self.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.push((key, value)),
        }
    }
}

// ───────────────────────────── integers ─────────────────────────────

fn float_to_integer(n: f64, ty: &'static str) -> Result<i128, ConversionError> {
    if !n.is_finite() {
        return Err(ConversionError::out_of_range(ty, n));
    }
    let rounded = n.round_ties_even();
    if rounded.abs() >= 1.7e38 {
        return Err(ConversionError::out_of_range(ty, n));
    }
    Ok(rounded as i128)
}

fn cell_to_integer(
    value: CellValue,
    locale: &NumberLocale,
    ty: &'static str,
) -> Result<i128, ConversionError> {
    match value {
        CellValue::Int(i) => Ok(i as i128),
        CellValue::Number(n) => float_to_integer(n, ty),
        CellValue::Decimal(d) => d
            .round()
            .to_i128()
            .ok_or_else(|| ConversionError::out_of_range(ty, d)),
        CellValue::Boolean(b) => Ok(b as i128),
        CellValue::Text(s) => {
            let t = s.trim();
            if t.is_empty() {
                return Err(ConversionError::Empty {
                    expected: FieldKind::Integer,
                });
            }
            if let Ok(i) = t.parse::<i128>() {
                return Ok(i);
            }
            match locale.parse_f64(t) {
                Some(n) => float_to_integer(n, ty),
                None => Err(ConversionError::invalid(FieldKind::Integer, s)),
            }
        }
        CellValue::Empty => Err(ConversionError::Empty {
            expected: FieldKind::Integer,
        }),
        CellValue::DateTime(dt) => Err(ConversionError::invalid(
            FieldKind::Integer,
            dt.to_string(),
        )),
    }
}

macro_rules! integer_field {
    ($($ty:ty),* $(,)?) => {$(
        impl CellField for $ty {
            const KIND: FieldKind = FieldKind::Integer;

            fn to_cell(&self) -> CellValue {
                i64::try_from(*self)
                    .map(CellValue::Int)
                    .unwrap_or_else(|_| CellValue::Text(self.to_string()))
            }

            fn from_cell(value: CellValue, locale: &NumberLocale) -> Result<Self, ConversionError> {
                let wide = cell_to_integer(value, locale, stringify!($ty))?;
                <$ty>::try_from(wide)
                    .map_err(|_| ConversionError::out_of_range(stringify!($ty), wide))
            }
        }
    )*};
}

integer_field!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

// ───────────────────────────── floats ─────────────────────────────

fn cell_to_f64(value: CellValue, locale: &NumberLocale) -> Result<f64, ConversionError> {
    match value {
        CellValue::Number(n) => Ok(n),
        CellValue::Int(i) => Ok(i as f64),
        CellValue::Decimal(d) => d
            .to_f64()
            .ok_or_else(|| ConversionError::out_of_range("f64", d)),
        CellValue::Boolean(b) => Ok(if b { 1.0 } else { 0.0 }),
        CellValue::Text(s) => {
            if s.trim().is_empty() {
                return Err(ConversionError::Empty {
                    expected: FieldKind::Float,
                });
            }
            locale
                .parse_f64(&s)
                .ok_or_else(|| ConversionError::invalid(FieldKind::Float, s))
        }
        CellValue::Empty => Err(ConversionError::Empty {
            expected: FieldKind::Float,
        }),
        CellValue::DateTime(dt) => Err(ConversionError::invalid(FieldKind::Float, dt.to_string())),
    }
}

impl CellField for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_cell(&self) -> CellValue {
        CellValue::Number(*self)
    }

    fn from_cell(value: CellValue, locale: &NumberLocale) -> Result<Self, ConversionError> {
        cell_to_f64(value, locale)
    }
}

impl CellField for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_cell(&self) -> CellValue {
        // Widen through the shortest decimal form so 0.1f32 is written as 0.1.
        CellValue::Number(self.to_string().parse::<f64>().unwrap_or(*self as f64))
    }

    fn from_cell(value: CellValue, locale: &NumberLocale) -> Result<Self, ConversionError> {
        let n = cell_to_f64(value, locale)?;
        if n.is_finite() && n.abs() > f32::MAX as f64 {
            return Err(ConversionError::out_of_range("f32", n));
        }
        Ok(n as f32)
    }
}

impl CellField for Decimal {
    const KIND: FieldKind = FieldKind::Decimal;

    fn to_cell(&self) -> CellValue {
        CellValue::Decimal(*self)
    }

    fn from_cell(value: CellValue, locale: &NumberLocale) -> Result<Self, ConversionError> {
        match value {
            CellValue::Decimal(d) => Ok(d),
            CellValue::Int(i) => Ok(Decimal::from(i)),
            CellValue::Number(n) => {
                Decimal::try_from(n).map_err(|_| ConversionError::out_of_range("Decimal", n))
            }
            CellValue::Boolean(b) => Ok(Decimal::from(b as u8)),
            CellValue::Text(s) => {
                if s.trim().is_empty() {
                    return Err(ConversionError::Empty {
                        expected: FieldKind::Decimal,
                    });
                }
                locale
                    .parse_decimal(&s)
                    .ok_or_else(|| ConversionError::invalid(FieldKind::Decimal, s))
            }
            CellValue::Empty => Err(ConversionError::Empty {
                expected: FieldKind::Decimal,
            }),
            CellValue::DateTime(dt) => Err(ConversionError::invalid(
                FieldKind::Decimal,
                dt.to_string(),
            )),
        }
    }
}

// ───────────────────────────── text-like ─────────────────────────────

impl CellField for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn to_cell(&self) -> CellValue {
        CellValue::Boolean(*self)
    }

    fn from_cell(value: CellValue, _locale: &NumberLocale) -> Result<Self, ConversionError> {
        match value {
            CellValue::Boolean(b) => Ok(b),
            CellValue::Int(i) => Ok(i != 0),
            CellValue::Number(n) => Ok(n != 0.0),
            CellValue::Text(s) => {
                let t = s.trim();
                if t.eq_ignore_ascii_case("true") || t == "1" {
                    Ok(true)
                } else if t.eq_ignore_ascii_case("false") || t == "0" {
                    Ok(false)
                } else if t.is_empty() {
                    Err(ConversionError::Empty {
                        expected: FieldKind::Boolean,
                    })
                } else {
                    Err(ConversionError::invalid(FieldKind::Boolean, s))
                }
            }
            CellValue::Empty => Err(ConversionError::Empty {
                expected: FieldKind::Boolean,
            }),
            other => Err(ConversionError::invalid(
                FieldKind::Boolean,
                other.to_cell_text(),
            )),
        }
    }
}

impl CellField for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_cell(&self) -> CellValue {
        CellValue::Text(self.clone())
    }

    fn from_cell(value: CellValue, _locale: &NumberLocale) -> Result<Self, ConversionError> {
        Ok(value.into_text())
    }
}

impl CellField for char {
    const KIND: FieldKind = FieldKind::Char;

    fn to_cell(&self) -> CellValue {
        CellValue::Text(self.to_string())
    }

    fn from_cell(value: CellValue, _locale: &NumberLocale) -> Result<Self, ConversionError> {
        let text = value.into_text();
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            (None, _) => Err(ConversionError::Empty {
                expected: FieldKind::Char,
            }),
            _ => Err(ConversionError::invalid(FieldKind::Char, text)),
        }
    }
}

// ───────────────────────────── dates ─────────────────────────────

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_datetime_text(text: &str, locale: &NumberLocale) -> Option<NaiveDateTime> {
    let t = text.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    locale.parse_f64(t).and_then(ole_serial_to_datetime)
}

fn cell_to_datetime(
    value: CellValue,
    locale: &NumberLocale,
    kind: FieldKind,
) -> Result<NaiveDateTime, ConversionError> {
    match value {
        CellValue::DateTime(dt) => Ok(dt),
        CellValue::Number(n) => {
            ole_serial_to_datetime(n).ok_or_else(|| ConversionError::out_of_range("date", n))
        }
        CellValue::Int(i) => ole_serial_to_datetime(i as f64)
            .ok_or_else(|| ConversionError::out_of_range("date", i)),
        CellValue::Text(s) => {
            if s.trim().is_empty() {
                return Err(ConversionError::Empty { expected: kind });
            }
            parse_datetime_text(&s, locale).ok_or_else(|| ConversionError::invalid(kind, s))
        }
        CellValue::Empty => Err(ConversionError::Empty { expected: kind }),
        other => Err(ConversionError::invalid(kind, other.to_cell_text())),
    }
}

impl CellField for NaiveDateTime {
    const KIND: FieldKind = FieldKind::DateTime;

    fn to_cell(&self) -> CellValue {
        CellValue::DateTime(*self)
    }

    fn from_cell(value: CellValue, locale: &NumberLocale) -> Result<Self, ConversionError> {
        cell_to_datetime(value, locale, FieldKind::DateTime)
    }
}

impl CellField for NaiveDate {
    const KIND: FieldKind = FieldKind::Date;

    fn to_cell(&self) -> CellValue {
        CellValue::Text(self.format("%Y-%m-%d").to_string())
    }

    fn from_cell(value: CellValue, locale: &NumberLocale) -> Result<Self, ConversionError> {
        cell_to_datetime(value, locale, FieldKind::Date).map(|dt| dt.date())
    }
}

// ───────────────────────────── optionals ─────────────────────────────

impl<T: CellField> CellField for Option<T> {
    const KIND: FieldKind = T::KIND;
    const OPTIONAL: bool = true;

    fn to_cell(&self) -> CellValue {
        match self {
            Some(v) => v.to_cell(),
            None => CellValue::Empty,
        }
    }

    fn from_cell(value: CellValue, locale: &NumberLocale) -> Result<Self, ConversionError> {
        let keeps_whitespace = matches!(T::KIND, FieldKind::Text | FieldKind::Char);
        if value.is_empty() || (value.is_blank() && !keeps_whitespace) {
            return Ok(None);
        }
        T::from_cell(value, locale).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv() -> NumberLocale {
        NumberLocale::invariant()
    }

    #[test]
    fn integers_from_text_and_numbers() {
        assert_eq!(i32::from_cell("42".into(), &inv()), Ok(42));
        assert_eq!(i32::from_cell(" 42.0 ".into(), &inv()), Ok(42));
        assert_eq!(i64::from_cell(CellValue::Number(2.5), &inv()), Ok(2));
        assert_eq!(i64::from_cell(CellValue::Number(3.5), &inv()), Ok(4));
        assert_eq!(
            u8::from_cell("300".into(), &inv()),
            Err(ConversionError::out_of_range("u8", 300))
        );
        assert!(matches!(
            i32::from_cell("forty".into(), &inv()),
            Err(ConversionError::Invalid { .. })
        ));
        assert_eq!(u64::MAX.to_cell(), CellValue::Text(u64::MAX.to_string()));
        assert_eq!(7u16.to_cell(), CellValue::Int(7));
    }

    #[test]
    fn floats_follow_locale() {
        let comma = NumberLocale::with_decimal_separator(',');
        assert_eq!(f64::from_cell("2,5".into(), &comma), Ok(2.5));
        assert_eq!(f64::from_cell("2.5".into(), &inv()), Ok(2.5));
        assert_eq!(0.1f32.to_cell(), CellValue::Number(0.1));
        assert_eq!(f32::from_cell(CellValue::Number(0.5), &inv()), Ok(0.5));
    }

    #[test]
    fn decimals() {
        assert_eq!(
            Decimal::from_cell("19.99".into(), &inv()),
            Ok(Decimal::new(1999, 2))
        );
        assert_eq!(
            Decimal::from_cell(CellValue::Int(3), &inv()),
            Ok(Decimal::from(3))
        );
    }

    #[test]
    fn booleans() {
        assert_eq!(bool::from_cell("TRUE".into(), &inv()), Ok(true));
        assert_eq!(bool::from_cell("0".into(), &inv()), Ok(false));
        assert_eq!(bool::from_cell(CellValue::Boolean(true), &inv()), Ok(true));
        assert!(bool::from_cell("maybe".into(), &inv()).is_err());
    }

    #[test]
    fn text_and_char() {
        assert_eq!(
            String::from_cell(CellValue::Number(1.5), &inv()),
            Ok("1.5".to_string())
        );
        assert_eq!(char::from_cell("x".into(), &inv()), Ok('x'));
        assert!(char::from_cell("xy".into(), &inv()).is_err());
    }

    #[test]
    fn dates_from_text_and_serials() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(NaiveDate::from_cell("2024-01-01".into(), &inv()), Ok(d));
        assert_eq!(NaiveDate::from_cell("45292".into(), &inv()), Ok(d));
        assert_eq!(
            NaiveDateTime::from_cell("2024-01-01 06:30:00".into(), &inv()),
            Ok(d.and_hms_opt(6, 30, 0).unwrap())
        );
        assert_eq!(
            NaiveDateTime::from_cell(CellValue::DateTime(d.and_hms_opt(0, 0, 0).unwrap()), &inv()),
            Ok(d.and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(d.to_cell(), CellValue::Text("2024-01-01".into()));
    }

    #[test]
    fn optionals_treat_blank_as_none() {
        assert_eq!(Option::<i32>::from_cell(CellValue::Empty, &inv()), Ok(None));
        assert_eq!(Option::<i32>::from_cell("  ".into(), &inv()), Ok(None));
        assert_eq!(Option::<i32>::from_cell("5".into(), &inv()), Ok(Some(5)));
        assert_eq!(
            Option::<String>::from_cell("  ".into(), &inv()),
            Ok(Some("  ".to_string()))
        );
        assert_eq!(Option::<char>::from_cell(" ".into(), &inv()), Ok(Some(' ')));
        assert_eq!(Option::<String>::from_cell(CellValue::Empty, &inv()), Ok(None));
        assert!(<Option<i32> as CellField>::OPTIONAL);
        assert_eq!(<Option<f64> as CellField>::KIND, FieldKind::Float);
        assert_eq!(None::<i32>.to_cell(), CellValue::Empty);
    }

    #[test]
    fn write_cell_types() {
        assert_eq!(FieldKind::Integer.cell_type(), CellType::Number);
        assert_eq!(FieldKind::Decimal.cell_type(), CellType::Number);
        assert_eq!(FieldKind::Date.cell_type(), CellType::String);
        assert_eq!(FieldKind::Boolean.cell_type(), CellType::String);
    }

    #[test]
    fn vec_columns_keep_order() {
        let mut cols: Vec<(String, String)> = Vec::new();
        cols.insert_column("b".into(), "1".into());
        cols.insert_column("a".into(), "2".into());
        cols.insert_column("b".into(), "3".into());
        assert_eq!(
            cols.to_columns(),
            vec![("b".to_string(), "3".to_string()), ("a".to_string(), "2".to_string())]
        );
    }
}
