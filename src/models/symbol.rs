use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

use crate::error::AppError;

lazy_static! {
    // Tickers like "AAPL", "BRK.B", "TSCO.LON", "RDS-A"
    static ref SYMBOL_REGEX: Regex = Regex::new(r"^[A-Z0-9][A-Z0-9.\-]{0,19}$").unwrap();
}

/// Normalized equity ticker (trimmed, uppercase)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(AppError::input("No stock symbol provided"));
        }
        if !SYMBOL_REGEX.is_match(&normalized) {
            return Err(AppError::input(format!(
                "Invalid stock symbol '{}'",
                raw.trim()
            )));
        }
        Ok(Self(normalized))
    }

    /// Parse an optional request parameter; absent and blank are the same error
    pub fn from_param(raw: Option<&str>) -> Result<Self, AppError> {
        Self::parse(raw.unwrap_or_default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
