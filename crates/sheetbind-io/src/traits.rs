use std::io::Write;
use std::path::Path;

use sheetbind_common::CellType;

use crate::IoError;

pub type SheetHandle = usize;

/// One stored cell as found in a worksheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawCell {
    /// The cell's own address, when the producer wrote one.
    pub reference: Option<String>,
    /// Column label, taken from the reference or derived from the cell's position.
    pub column: String,
    /// Raw data-type tag (`t` attribute).
    pub data_type: Option<String>,
    /// Style index (`s` attribute).
    pub style: Option<u32>,
    /// Stored text; for formula cells this is the cached result.
    pub text: Option<String>,
    pub formula: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowData {
    pub index: u32,
    pub cells: Vec<RawCell>,
}

/// One cell to be written into a new row.
#[derive(Clone, Debug, PartialEq)]
pub struct CellWrite {
    pub reference: String,
    pub value: String,
    pub cell_type: CellType,
}

impl CellWrite {
    pub fn new(reference: impl Into<String>, value: impl Into<String>, cell_type: CellType) -> Self {
        Self {
            reference: reference.into(),
            value: value.into(),
            cell_type,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub sheet_id: u32,
    pub handle: SheetHandle,
}

/// Where a document goes when it is saved.
pub enum SaveDestination<'a> {
    /// Back to the file it was opened from.
    InPlace,
    Path(&'a Path),
    Writer(&'a mut dyn Write),
    /// Serialize and hand back the package bytes.
    Bytes,
}

/// Document-wide tables a raw cell may point into.
pub trait CellLookup {
    fn shared_string(&self, index: usize) -> Result<String, IoError>;

    /// Numeric format code of the cell format at `style`.
    fn number_format(&self, style: u32) -> Result<u32, IoError>;
}

pub trait DocumentStore: CellLookup {
    fn sheets(&self) -> Vec<SheetEntry>;

    /// Exact, case-sensitive lookup.
    fn find_sheet(&self, name: &str) -> Option<SheetHandle> {
        self.sheets()
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| s.handle)
    }

    /// Returns the sheet handle and whether the sheet was created by this call.
    fn get_or_create_sheet(&mut self, name: &str) -> Result<(SheetHandle, bool), IoError>;

    /// Index of the last stored row, 0 for an empty sheet.
    fn last_row_index(&self, sheet: SheetHandle) -> Result<u32, IoError>;

    fn append_row(
        &mut self,
        sheet: SheetHandle,
        row: u32,
        cells: &[CellWrite],
    ) -> Result<(), IoError>;

    /// All stored rows of a sheet, in document order.
    fn rows(&self, sheet: SheetHandle) -> Result<Vec<RowData>, IoError>;
}
