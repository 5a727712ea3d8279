//! Field conversion errors.
//!
//! A `ConversionError` says why one cell value could not become one field
//! value. It carries no location: the row mapper wraps it with the sheet,
//! row and column it happened at.

use std::{error::Error, fmt};

use crate::FieldKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// A blank cell for a field that has no "absent" representation.
    Empty { expected: FieldKind },
    /// The cell text cannot be parsed as the field type.
    Invalid { expected: FieldKind, value: String },
    /// The value parsed but does not fit the concrete field type.
    OutOfRange { expected: &'static str, value: String },
    /// The text names no variant of the enumeration.
    UnknownVariant { ty: &'static str, value: String },
    /// A field index the record does not declare.
    UnknownField(usize),
}

impl ConversionError {
    pub fn invalid(expected: FieldKind, value: impl Into<String>) -> Self {
        Self::Invalid {
            expected,
            value: value.into(),
        }
    }

    pub fn out_of_range(expected: &'static str, value: impl ToString) -> Self {
        Self::OutOfRange {
            expected,
            value: value.to_string(),
        }
    }

    pub fn unknown_variant(ty: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            ty,
            value: value.into(),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { expected } => write!(f, "empty cell for required {expected} field"),
            Self::Invalid { expected, value } => {
                write!(f, "cannot convert '{value}' to {expected}")
            }
            Self::OutOfRange { expected, value } => {
                write!(f, "value '{value}' out of range for {expected}")
            }
            Self::UnknownVariant { ty, value } => {
                write!(f, "'{value}' is not a variant of {ty}")
            }
            Self::UnknownField(index) => write!(f, "no field at index {index}"),
        }
    }
}

impl Error for ConversionError {}
