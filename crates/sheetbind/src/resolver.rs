//! Turns stored cell text into a [`CellValue`].
//!
//! The cell's data-type tag decides first; untagged cells are interpreted
//! through the numeric format code of their style.

use sheetbind_common::{CellValue, EMPTY_DATE_SERIAL, NumberLocale};
use sheetbind_io::{CellLookup, RawCell};

use crate::SheetError;

/// How a built-in or custom number format code is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormatClass {
    /// General, text and phone formats: the stored text as is.
    Verbatim,
    /// Integer and accounting formats: text after separator normalization.
    Normalized,
    /// Percentage, fraction and scientific formats.
    Float,
    /// Date and time formats holding an OLE serial.
    Date,
    /// Fixed-point currency.
    Currency,
}

pub fn classify_number_format(code: u32) -> Option<NumberFormatClass> {
    use NumberFormatClass::*;
    match code {
        0 | 49 | 168 => Some(Verbatim),
        1 | 44 => Some(Normalized),
        9..=12 => Some(Float),
        14..=22 | 164..=166 | 169 => Some(Date),
        167 => Some(Currency),
        _ => None,
    }
}

pub struct ValueResolver<'a, L: CellLookup + ?Sized> {
    lookup: &'a L,
    locale: NumberLocale,
}

impl<'a, L: CellLookup + ?Sized> ValueResolver<'a, L> {
    pub fn new(lookup: &'a L, locale: NumberLocale) -> Self {
        Self { lookup, locale }
    }

    pub fn locale(&self) -> &NumberLocale {
        &self.locale
    }

    /// Resolve one cell of row `row`.
    pub fn resolve(&self, cell: &RawCell, row: u32) -> Result<CellValue, SheetError> {
        let text = cell.text.as_deref();

        if let Some(tag) = cell.data_type.as_deref() {
            return match tag {
                "s" => self.shared_string(cell, row),
                "b" => Ok(CellValue::Boolean(text.unwrap_or("0").trim() != "0")),
                "n" => Ok(text.map_or(CellValue::Empty, |t| {
                    CellValue::Text(self.locale.normalize(t))
                })),
                _ => Ok(text.map_or(CellValue::Empty, |t| CellValue::Text(t.to_string()))),
            };
        }

        let Some(style) = cell.style else {
            return Ok(text.map_or(CellValue::Empty, |t| {
                CellValue::Text(self.locale.normalize(t))
            }));
        };
        let Some(text) = text else {
            return Ok(CellValue::Empty);
        };

        let code = self
            .lookup
            .number_format(style)
            .map_err(SheetError::from_lookup)?;
        let Some(class) = classify_number_format(code) else {
            return Err(SheetError::UnsupportedNumericFormat {
                code,
                cell: address(cell, row),
            });
        };

        match class {
            NumberFormatClass::Verbatim => Ok(CellValue::Text(text.to_string())),
            NumberFormatClass::Normalized => Ok(CellValue::Text(self.locale.normalize(text))),
            NumberFormatClass::Float => self
                .locale
                .parse_f64(&self.locale.normalize(text))
                .map(CellValue::Number)
                .ok_or_else(|| SheetError::NumberDecode {
                    cell: address(cell, row),
                    text: text.to_string(),
                }),
            NumberFormatClass::Date => {
                let serial = if text.trim().is_empty() {
                    Some(EMPTY_DATE_SERIAL)
                } else {
                    self.locale.parse_f64(&self.locale.normalize(text))
                };
                serial
                    .and_then(CellValue::from_ole_serial)
                    .ok_or_else(|| SheetError::DateDecode {
                        cell: address(cell, row),
                        text: text.to_string(),
                    })
            }
            NumberFormatClass::Currency => self
                .locale
                .parse_decimal(&self.locale.normalize(text))
                .map(CellValue::Decimal)
                .ok_or_else(|| SheetError::NumberDecode {
                    cell: address(cell, row),
                    text: text.to_string(),
                }),
        }
    }

    fn shared_string(&self, cell: &RawCell, row: u32) -> Result<CellValue, SheetError> {
        let raw = cell.text.as_deref().unwrap_or("").trim();
        let index = raw.parse::<usize>().map_err(|_| SheetError::NumberDecode {
            cell: address(cell, row),
            text: raw.to_string(),
        })?;
        self.lookup
            .shared_string(index)
            .map(CellValue::Text)
            .map_err(SheetError::from_lookup)
    }
}

/// Address used in error reports.
pub(crate) fn address(cell: &RawCell, row: u32) -> String {
    match &cell.reference {
        Some(r) => r.clone(),
        None => format!("{}{}", cell.column, row),
    }
}
