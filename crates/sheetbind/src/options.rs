use sheetbind_common::NumberLocale;

/// What to do when records are appended below an existing header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AppendHeaderCheck {
    /// Append by position without looking at the stored header.
    #[default]
    Positional,
    /// Compare the stored header with the records' logical names first and
    /// fail with `HeaderMismatch` before anything is appended.
    Validate,
}

/// Handling of read cells whose header matches no field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnmatchedColumns {
    #[default]
    Ignore,
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConverterOptions {
    /// Decimal separator applied when numeric text is read.
    pub locale: NumberLocale,
    pub append_header: AppendHeaderCheck,
    /// Only consulted when the target type has no expand field.
    pub unmatched_columns: UnmatchedColumns,
}

impl ConverterOptions {
    pub fn with_locale(mut self, locale: NumberLocale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_append_header(mut self, check: AppendHeaderCheck) -> Self {
        self.append_header = check;
        self
    }

    pub fn with_unmatched_columns(mut self, policy: UnmatchedColumns) -> Self {
        self.unmatched_columns = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_positional_append() {
        let opts = ConverterOptions::default();
        assert_eq!(opts.append_header, AppendHeaderCheck::Positional);
        assert_eq!(opts.unmatched_columns, UnmatchedColumns::Ignore);
        assert_eq!(opts.locale, NumberLocale::invariant());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_deserialize_with_defaults() {
        let opts: ConverterOptions =
            serde_json::from_str(r#"{"append_header":"Validate"}"#).unwrap();
        assert_eq!(opts.append_header, AppendHeaderCheck::Validate);
        assert_eq!(opts.unmatched_columns, UnmatchedColumns::Ignore);
    }
}
