use std::any::TypeId;
use std::borrow::Cow;

use sheetbind_common::{CellValue, ConversionError, FieldDef, FieldValue, NumberLocale};

/// Field-level access to a record, normally generated by `#[derive(SheetRow)]`.
///
/// Indexes address the entries of [`SheetRow::fields`] in declaration order.
/// Everything except `fields` is object safe, so mixed collections can be
/// written through `&dyn SheetRecord`.
pub trait SheetRow {
    fn fields() -> &'static [FieldDef]
    where
        Self: Sized;

    /// Same table as [`SheetRow::fields`], reachable through a trait object.
    fn field_defs(&self) -> &'static [FieldDef];

    /// Identity used to cache the derived schema.
    fn type_key(&self) -> TypeId;

    fn read_field(&self, index: usize) -> FieldValue;

    fn write_field(
        &mut self,
        index: usize,
        value: CellValue,
        locale: &NumberLocale,
    ) -> Result<(), ConversionError>;

    /// Adds one entry to the expand field at `index`.
    fn insert_column(
        &mut self,
        index: usize,
        key: String,
        value: String,
    ) -> Result<(), ConversionError>;
}

/// A row that knows which sheet it belongs to.
pub trait SheetRecord: SheetRow {
    fn sheet_name(&self) -> Cow<'_, str>;
}
