//! Grouping records by sheet and appending them as rows.

use rustc_hash::FxHashMap;
use sheetbind_io::{DocumentStore, SheetHandle};

use crate::mapper::{EncodedCell, HeaderMap, encode_row, header_writes, value_writes};
use crate::options::{AppendHeaderCheck, ConverterOptions};
use crate::resolver::ValueResolver;
use crate::schema::describe_row;
use crate::{SheetError, SheetRecord, SheetRow};

/// Records bound for one sheet, in input order.
pub(crate) struct SheetGroup<'r, R: ?Sized> {
    pub name: String,
    pub records: Vec<&'r R>,
}

/// Split `records` by sheet name, groups ordered by first appearance.
/// With `sheet` set every record lands in that one group.
pub(crate) fn group_by_sheet<'r, I, R>(records: I, sheet: Option<&str>) -> Vec<SheetGroup<'r, R>>
where
    I: IntoIterator<Item = &'r R>,
    R: SheetRecord + ?Sized + 'r,
{
    let mut groups: Vec<SheetGroup<'r, R>> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    for record in records {
        let name = match sheet {
            Some(name) => name.to_string(),
            None => record.sheet_name().into_owned(),
        };
        match index.get(&name) {
            Some(&pos) => groups[pos].records.push(record),
            None => {
                index.insert(name.clone(), groups.len());
                groups.push(SheetGroup {
                    name,
                    records: vec![record],
                });
            }
        }
    }
    groups
}

/// Write every group in order. Rows already appended stay in the document
/// when a later row or group fails.
pub(crate) fn write_groups<D, R>(
    doc: &mut D,
    groups: &[SheetGroup<'_, R>],
    options: &ConverterOptions,
) -> Result<(), SheetError>
where
    D: DocumentStore + ?Sized,
    R: SheetRow + ?Sized,
{
    for group in groups {
        write_sheet(doc, &group.name, &group.records, options)?;
    }
    Ok(())
}

/// Append `records` to `sheet`, creating it with a header row when needed.
pub fn write_sheet<D, R>(
    doc: &mut D,
    sheet: &str,
    records: &[&R],
    options: &ConverterOptions,
) -> Result<(), SheetError>
where
    D: DocumentStore + ?Sized,
    R: SheetRow + ?Sized,
{
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("write_sheet", sheet, records = records.len()).entered();

    if records.is_empty() {
        return Ok(());
    }

    let (handle, created) = doc.get_or_create_sheet(sheet)?;
    let last = if created {
        0
    } else {
        doc.last_row_index(handle)?
    };

    let rows: Vec<Vec<EncodedCell>> = records
        .iter()
        .map(|r| encode_row(*r, &describe_row(*r)))
        .collect();

    if options.append_header == AppendHeaderCheck::Validate {
        let expected: Vec<String> = if last == 0 {
            rows[0].iter().map(|c| c.header.clone()).collect()
        } else {
            stored_header(doc, handle, options)?
        };
        for cells in &rows {
            check_header(sheet, &expected, cells)?;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(sheet, columns = expected.len(), "header check passed");
    }

    let mut next = last + 1;
    if last == 0 {
        #[cfg(feature = "tracing")]
        tracing::debug!(sheet, created, columns = rows[0].len(), "writing header row");
        doc.append_row(handle, next, &header_writes(&rows[0], next))?;
        next += 1;
    } else {
        #[cfg(feature = "tracing")]
        tracing::debug!(sheet, after = last, "appending below existing rows");
    }

    for cells in &rows {
        doc.append_row(handle, next, &value_writes(cells, next))?;
        next += 1;
    }
    Ok(())
}

fn stored_header<D: DocumentStore + ?Sized>(
    doc: &D,
    handle: SheetHandle,
    options: &ConverterOptions,
) -> Result<Vec<String>, SheetError> {
    let rows = doc.rows(handle)?;
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let resolver = ValueResolver::new(doc, options.locale);
    let map = HeaderMap::from_row(first, &resolver)?;
    Ok(map.headers().into_iter().map(str::to_string).collect())
}

fn check_header(sheet: &str, expected: &[String], cells: &[EncodedCell]) -> Result<(), SheetError> {
    let matches = expected.len() == cells.len()
        && expected
            .iter()
            .zip(cells)
            .all(|(e, c)| e.to_lowercase() == c.header.to_lowercase());
    if matches {
        Ok(())
    } else {
        Err(SheetError::HeaderMismatch {
            sheet: sheet.to_string(),
            expected: expected.to_vec(),
            found: cells.iter().map(|c| c.header.clone()).collect(),
        })
    }
}
