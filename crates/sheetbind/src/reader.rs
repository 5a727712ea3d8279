use sheetbind_io::DocumentStore;

use crate::mapper::{HeaderMap, decode_row};
use crate::options::ConverterOptions;
use crate::resolver::ValueResolver;
use crate::{SheetError, SheetRow};

/// Decode every row below the header of `sheet`.
///
/// `Ok(None)` when the document has no sheet of that exact name; an empty
/// sheet yields `Some(vec![])`.
pub fn read_sheet<T, D>(
    doc: &D,
    sheet: &str,
    options: &ConverterOptions,
) -> Result<Option<Vec<T>>, SheetError>
where
    T: SheetRow + Default + 'static,
    D: DocumentStore + ?Sized,
{
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("read_sheet", sheet).entered();

    let Some(handle) = doc.find_sheet(sheet) else {
        #[cfg(feature = "tracing")]
        tracing::debug!(sheet, "sheet not present");
        return Ok(None);
    };

    let rows = doc.rows(handle)?;
    let mut rows = rows.iter();
    let Some(header_row) = rows.next() else {
        return Ok(Some(Vec::new()));
    };

    let resolver = ValueResolver::new(doc, options.locale);
    let headers = HeaderMap::from_row(header_row, &resolver)?;

    #[cfg(feature = "tracing")]
    {
        let schema = crate::schema::describe::<T>();
        let unmatched = headers.unmatched(&schema);
        if !unmatched.is_empty() {
            tracing::debug!(
                sheet,
                columns = ?unmatched,
                collected = schema.expand_field().is_some(),
                "headers without a matching field"
            );
        }
    }

    rows.map(|row| decode_row(sheet, &headers, row, &resolver, options.unmatched_columns))
        .collect::<Result<Vec<T>, _>>()
        .map(Some)
}
