//! File-level entry points.
//!
//! Each call opens (or creates) its own document, works on it, and saves or
//! drops it before returning. A failed write still saves the rows appended
//! before the failure and then reports the first error.

use std::path::Path;

use sheetbind_io::{DocumentStore, SaveDestination, XlsxAdapter};

use crate::options::ConverterOptions;
use crate::writer::{group_by_sheet, write_groups};
use crate::{SheetError, SheetRecord, SheetRow, reader};

#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConverterOptions,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConverterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /* ───────────────────────────── writing ───────────────────────────── */

    /// Write `records` into a new workbook at `path`, one sheet per distinct
    /// sheet name. An existing file is replaced.
    ///
    /// With no records there is no sheet to save, and the call fails with
    /// [`IoError::NoSheets`](sheetbind_io::IoError::NoSheets) without touching `path`.
    pub fn write<'r, I, R>(&self, records: I, path: impl AsRef<Path>) -> Result<(), SheetError>
    where
        I: IntoIterator<Item = &'r R>,
        R: SheetRecord + ?Sized + 'r,
    {
        let mut doc = XlsxAdapter::new().with_path(path.as_ref());
        let written = self.write_records(records, &mut doc);
        finish(written, doc.save())
    }

    /// Like [`Converter::write`] but every record goes to `sheet`.
    pub fn write_sheet<'r, I, R>(
        &self,
        records: I,
        path: impl AsRef<Path>,
        sheet: &str,
    ) -> Result<(), SheetError>
    where
        I: IntoIterator<Item = &'r R>,
        R: SheetRow + ?Sized + 'r,
    {
        let mut doc = XlsxAdapter::new().with_path(path.as_ref());
        let written = self.write_records_to_sheet(records, &mut doc, sheet);
        finish(written, doc.save())
    }

    /// Write `records` into a new workbook and return the package bytes.
    pub fn write_to_bytes<'r, I, R>(&self, records: I) -> Result<Vec<u8>, SheetError>
    where
        I: IntoIterator<Item = &'r R>,
        R: SheetRecord + ?Sized + 'r,
    {
        let mut doc = XlsxAdapter::new();
        self.write_records(records, &mut doc)?;
        Ok(doc.to_bytes()?)
    }

    /// Group `records` by their own sheet names and write them into `doc`.
    pub fn write_records<'r, I, R, D>(&self, records: I, doc: &mut D) -> Result<(), SheetError>
    where
        I: IntoIterator<Item = &'r R>,
        R: SheetRecord + ?Sized + 'r,
        D: DocumentStore + ?Sized,
    {
        let groups = group_by_sheet(records, None);
        write_groups(doc, &groups, &self.options)
    }

    /// Write every record into `sheet` of `doc`, whatever its own sheet name.
    pub fn write_records_to_sheet<'r, I, R, D>(
        &self,
        records: I,
        doc: &mut D,
        sheet: &str,
    ) -> Result<(), SheetError>
    where
        I: IntoIterator<Item = &'r R>,
        R: SheetRow + ?Sized + 'r,
        D: DocumentStore + ?Sized,
    {
        let records: Vec<&R> = records.into_iter().collect();
        crate::writer::write_sheet(doc, sheet, &records, &self.options)
    }

    /// Add one record to the workbook at `path`, creating the file when it
    /// does not exist or is empty.
    pub fn append<R>(&self, record: &R, path: impl AsRef<Path>) -> Result<(), SheetError>
    where
        R: SheetRecord + ?Sized,
    {
        let path = path.as_ref();
        let mut doc = match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => XlsxAdapter::open_path(path)?,
            _ => XlsxAdapter::new().with_path(path),
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(path = %path.display(), sheet = %record.sheet_name(), "append");
        let written = self.write_records(std::iter::once(record), &mut doc);
        finish(written, doc.save())
    }

    /// In-memory [`Converter::append`]: `bytes` is replaced by the updated
    /// package. Empty `bytes` starts a new workbook.
    pub fn append_to_bytes<R>(&self, record: &R, bytes: &mut Vec<u8>) -> Result<(), SheetError>
    where
        R: SheetRecord + ?Sized,
    {
        let mut doc = if bytes.is_empty() {
            XlsxAdapter::new()
        } else {
            XlsxAdapter::open_reader(std::io::Cursor::new(bytes.as_slice()))?
        };
        let written = self.write_records(std::iter::once(record), &mut doc);
        let saved = doc
            .save_to(SaveDestination::Bytes)
            .map(|out| *bytes = out.unwrap_or_default());
        finish(written, saved)
    }

    /* ───────────────────────────── reading ───────────────────────────── */

    /// Read every record from the sheet named by `T::default().sheet_name()`.
    /// A missing sheet reads as no records.
    pub fn read<T>(&self, path: impl AsRef<Path>) -> Result<Vec<T>, SheetError>
    where
        T: SheetRecord + Default + 'static,
    {
        let sheet = T::default().sheet_name().into_owned();
        self.read_sheet(path, &sheet)
    }

    pub fn read_from_bytes<T>(&self, bytes: Vec<u8>) -> Result<Vec<T>, SheetError>
    where
        T: SheetRecord + Default + 'static,
    {
        let sheet = T::default().sheet_name().into_owned();
        let doc = XlsxAdapter::open_bytes(bytes)?;
        self.read_records(&doc, &sheet)
    }

    /// Read `sheet` as records of `T`; a missing sheet reads as no records.
    pub fn read_sheet<T>(&self, path: impl AsRef<Path>, sheet: &str) -> Result<Vec<T>, SheetError>
    where
        T: SheetRow + Default + 'static,
    {
        let doc = XlsxAdapter::open_path(path)?;
        self.read_records(&doc, sheet)
    }

    /// Like [`Converter::read_sheet`] but a missing sheet is an error.
    pub fn read_existing_sheet<T>(
        &self,
        path: impl AsRef<Path>,
        sheet: &str,
    ) -> Result<Vec<T>, SheetError>
    where
        T: SheetRow + Default + 'static,
    {
        let doc = XlsxAdapter::open_path(path)?;
        reader::read_sheet(&doc, sheet, &self.options)?
            .ok_or_else(|| SheetError::SheetNotFound(sheet.to_string()))
    }

    pub fn read_records<T, D>(&self, doc: &D, sheet: &str) -> Result<Vec<T>, SheetError>
    where
        T: SheetRow + Default + 'static,
        D: DocumentStore + ?Sized,
    {
        Ok(reader::read_sheet(doc, sheet, &self.options)?.unwrap_or_default())
    }
}

/// First error wins; a save failure only surfaces when the write succeeded.
fn finish<E>(written: Result<(), SheetError>, saved: Result<(), E>) -> Result<(), SheetError>
where
    SheetError: From<E>,
{
    written?;
    saved.map_err(SheetError::from)
}
