use rust_decimal::Decimal;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number formatting convention used when numeric cell text is read.
///
/// Cells store numbers with `.` as decimal point, but values that were
/// entered as text may use the reader's own separator. On read, both `.`
/// and `,` are rewritten to the configured separator before parsing.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberLocale {
    pub decimal_separator: char,
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self::invariant()
    }
}

impl NumberLocale {
    /// The culture-independent convention: `.` separates decimals.
    pub const fn invariant() -> Self {
        Self {
            decimal_separator: '.',
        }
    }

    pub const fn with_decimal_separator(decimal_separator: char) -> Self {
        Self { decimal_separator }
    }

    /// Rewrite every `.` and `,` in `text` to the locale's separator.
    ///
    /// Thousands grouping is not recognised: `1,234.5` becomes two
    /// separators and will not parse.
    pub fn normalize(&self, text: &str) -> String {
        text.chars()
            .map(|c| {
                if c == '.' || c == ',' {
                    self.decimal_separator
                } else {
                    c
                }
            })
            .collect()
    }

    /// Turn locale-formatted text back into the `.`-separated form Rust parses.
    fn canonical(&self, text: &str) -> String {
        let trimmed = text.trim();
        if self.decimal_separator == '.' {
            trimmed.to_string()
        } else {
            trimmed.replace(self.decimal_separator, ".")
        }
    }

    pub fn parse_f64(&self, text: &str) -> Option<f64> {
        self.canonical(text).parse::<f64>().ok()
    }

    pub fn parse_decimal(&self, text: &str) -> Option<Decimal> {
        let canonical = self.canonical(text);
        Decimal::from_str(&canonical)
            .or_else(|_| Decimal::from_scientific(&canonical))
            .ok()
    }
}
