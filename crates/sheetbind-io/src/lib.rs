pub mod backends;
pub mod error;
pub mod package;
pub mod traits;

pub use backends::XlsxAdapter;
pub use error::IoError;
pub use traits::{
    CellLookup, CellWrite, DocumentStore, RawCell, RowData, SaveDestination, SheetEntry,
    SheetHandle,
};

// Re-export for convenience
pub use sheetbind_common::CellType;
