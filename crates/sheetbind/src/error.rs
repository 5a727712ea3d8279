use sheetbind_common::ConversionError;
use sheetbind_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("unsupported number format {code} on cell {cell}")]
    UnsupportedNumericFormat { code: u32, cell: String },

    #[error("workbook has no shared string table")]
    MissingSharedStringTable,

    #[error("cell {cell} is date formatted but holds '{text}'")]
    DateDecode { cell: String, text: String },

    #[error("cell {cell} is number formatted but holds '{text}'")]
    NumberDecode { cell: String, text: String },

    #[error("sheet '{sheet}' row {row}, cell {cell}: field '{field}': {source}")]
    FieldConversion {
        sheet: String,
        row: u32,
        cell: String,
        field: &'static str,
        #[source]
        source: ConversionError,
    },

    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("sheet '{sheet}' header {found:?} does not match {expected:?}")]
    HeaderMismatch {
        sheet: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("sheet '{sheet}' column {column} ('{header}') has no matching field")]
    UnmatchedColumn {
        sheet: String,
        column: String,
        header: String,
    },

    #[error(transparent)]
    DocumentAccess(#[from] IoError),
}

impl SheetError {
    /// Lifts a lookup failure, keeping a missing string table distinct.
    pub(crate) fn from_lookup(err: IoError) -> Self {
        match err {
            IoError::MissingSharedStringTable => SheetError::MissingSharedStringTable,
            other => SheetError::DocumentAccess(other),
        }
    }
}
