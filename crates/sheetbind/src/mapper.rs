//! Record ⇄ row translation.

use rustc_hash::FxHashMap;
use sheetbind_common::{CellType, CellValue, FieldKind, FieldValue, cell_address};
use sheetbind_io::{CellLookup, CellWrite, RowData};

use crate::options::UnmatchedColumns;
use crate::resolver::{ValueResolver, address};
use crate::schema::{Schema, describe};
use crate::{SheetError, SheetRow};

/// One cell of an encoded record, paired with the header it sits under.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCell {
    pub header: String,
    pub value: CellValue,
    pub cell_type: CellType,
}

/// Encode `record` in schema order. An expand field contributes one cell per
/// entry, in the map's own order, headed by the entry key.
pub fn encode_row<R: SheetRow + ?Sized>(record: &R, schema: &Schema) -> Vec<EncodedCell> {
    let mut cells = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        match record.read_field(field.index) {
            FieldValue::Scalar(value) => {
                let cell_type = match (&value, field.kind.cell_type()) {
                    (CellValue::Number(n), CellType::Number) if !n.is_finite() => CellType::String,
                    (_, ty) => ty,
                };
                cells.push(EncodedCell {
                    header: field.logical_name().to_string(),
                    value,
                    cell_type,
                });
            }
            FieldValue::Columns(entries) => {
                cells.extend(entries.into_iter().map(|(key, value)| EncodedCell {
                    header: key,
                    value: CellValue::Text(value),
                    cell_type: CellType::String,
                }));
            }
        }
    }
    cells
}

/// The header row for `cells`: same positions, logical names as text.
pub fn header_writes(cells: &[EncodedCell], row: u32) -> Vec<CellWrite> {
    cells
        .iter()
        .enumerate()
        .map(|(i, c)| CellWrite::new(cell_address(row, i as u32 + 1), c.header.as_str(), CellType::String))
        .collect()
}

/// The data row for `cells`, numbered from column A.
pub fn value_writes(cells: &[EncodedCell], row: u32) -> Vec<CellWrite> {
    cells
        .iter()
        .enumerate()
        .map(|(i, c)| {
            CellWrite::new(
                cell_address(row, i as u32 + 1),
                c.value.to_cell_text(),
                c.cell_type,
            )
        })
        .collect()
}

/// Column label → header text, taken from a sheet's first row.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    columns: FxHashMap<String, String>,
    order: Vec<String>,
}

impl HeaderMap {
    pub fn from_row<L: CellLookup + ?Sized>(
        row: &RowData,
        resolver: &ValueResolver<'_, L>,
    ) -> Result<Self, SheetError> {
        let mut map = HeaderMap::default();
        for cell in &row.cells {
            let value = resolver.resolve(cell, row.index)?;
            if value.is_empty() {
                continue;
            }
            if map
                .columns
                .insert(cell.column.clone(), value.into_text())
                .is_none()
            {
                map.order.push(cell.column.clone());
            }
        }
        Ok(map)
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// Header texts in column order.
    pub fn headers(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|c| self.get(c))
            .collect()
    }

    /// (column, header) pairs that no scalar field of `schema` claims.
    pub fn unmatched<'a>(&'a self, schema: &Schema) -> Vec<(&'a str, &'a str)> {
        self.order
            .iter()
            .filter_map(|c| self.get(c).map(|h| (c.as_str(), h)))
            .filter(|(_, h)| schema.lookup(h).is_none())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Build a fresh `T` from one data row.
///
/// The first failing field fails the whole row. Blank cells leave their
/// field at its default, except that text fields keep whitespace.
pub fn decode_row<T, L>(
    sheet: &str,
    headers: &HeaderMap,
    row: &RowData,
    resolver: &ValueResolver<'_, L>,
    unmatched: UnmatchedColumns,
) -> Result<T, SheetError>
where
    T: SheetRow + Default + 'static,
    L: CellLookup + ?Sized,
{
    let schema = describe::<T>();
    let mut record = T::default();

    for cell in &row.cells {
        let Some(header) = headers.get(&cell.column) else {
            continue;
        };
        let value = resolver.resolve(cell, row.index)?;

        if let Some(field) = schema.lookup(header) {
            let keeps_whitespace = matches!(field.kind, FieldKind::Text | FieldKind::Char);
            if value.is_empty() || (value.is_blank() && !keeps_whitespace) {
                continue;
            }
            record
                .write_field(field.index, value, resolver.locale())
                .map_err(|source| SheetError::FieldConversion {
                    sheet: sheet.to_string(),
                    row: row.index,
                    cell: address(cell, row.index),
                    field: field.name,
                    source,
                })?;
        } else if let Some(field) = schema.expand_field() {
            if value.is_empty() {
                continue;
            }
            record
                .insert_column(field.index, header.to_string(), value.into_text())
                .map_err(|source| SheetError::FieldConversion {
                    sheet: sheet.to_string(),
                    row: row.index,
                    cell: address(cell, row.index),
                    field: field.name,
                    source,
                })?;
        } else if unmatched == UnmatchedColumns::Reject {
            return Err(SheetError::UnmatchedColumn {
                sheet: sheet.to_string(),
                column: cell.column.clone(),
                header: header.to_string(),
            });
        }
    }
    Ok(record)
}
