use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("package part not found: {0}")]
    MissingPart(String),

    #[error("no {target} relationship in {part}")]
    MissingRelationship { part: String, target: String },

    #[error("workbook has no shared string table")]
    MissingSharedStringTable,

    #[error("shared string index {index} out of range ({len} entries)")]
    SharedStringIndex { index: usize, len: usize },

    #[error("style index {index} out of range ({len} cell formats)")]
    StyleIndex { index: u32, len: usize },

    #[error("part {0} is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("row {row} cannot follow row {last} in sheet '{sheet}'")]
    RowOutOfOrder { sheet: String, row: u32, last: u32 },

    #[error("invalid sheet name '{0}'")]
    InvalidSheetName(String),

    #[error("unknown sheet handle {0}")]
    UnknownSheet(usize),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("workbook has no sheets")]
    NoSheets,
}

impl IoError {
    pub(crate) fn xml(part: &str, message: impl std::fmt::Display) -> Self {
        IoError::Xml {
            part: part.to_string(),
            message: message.to_string(),
        }
    }
}
