//! Typed records in and out of spreadsheet sheets.
//!
//! A record type derives [`SheetRow`] to describe its columns; writing groups
//! records by sheet name, creating sheets (with a header row) on first use and
//! appending below the last row afterwards. Reading treats a sheet's first
//! row as the header and maps every later row back onto a fresh record,
//! matching headers to fields by name or display alias, ignoring case.
//!
//! ```no_run
//! use sheetbind::{Converter, SheetRow};
//!
//! #[derive(Debug, Default, SheetRow)]
//! #[sheet(name = "People")]
//! struct Person {
//!     name: String,
//!     #[sheet(display = "Eye Colour")]
//!     eye_colour: String,
//!     age: Option<u32>,
//! }
//!
//! let people = vec![Person { name: "Ann".into(), eye_colour: "Green".into(), age: Some(31) }];
//! let converter = Converter::new();
//! converter.write(&people, "people.xlsx")?;
//! let back: Vec<Person> = converter.read("people.xlsx")?;
//! # Ok::<(), sheetbind::SheetError>(())
//! ```

extern crate self as sheetbind;

pub mod converter;
pub mod error;
pub mod mapper;
pub mod options;
pub mod reader;
pub mod record;
pub mod resolver;
pub mod schema;
pub mod writer;

pub use converter::Converter;
pub use error::SheetError;
pub use mapper::{EncodedCell, HeaderMap, decode_row, encode_row};
pub use options::{AppendHeaderCheck, ConverterOptions, UnmatchedColumns};
pub use record::{SheetRecord, SheetRow};
pub use resolver::{NumberFormatClass, ValueResolver, classify_number_format};
pub use schema::{FieldDescriptor, Schema, describe, describe_row};

pub use sheetbind_common::{
    CellField, CellType, CellValue, ConversionError, ExpandColumns, FieldDef, FieldKind,
    FieldValue, NumberLocale, cell_address, column_to_letters, letters_to_column,
};
pub use sheetbind_io::{DocumentStore, IoError, SaveDestination, XlsxAdapter};
pub use sheetbind_macros::{SheetEnum, SheetRow};
