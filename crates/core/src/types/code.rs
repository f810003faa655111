//! Operator input from the scan workflow.
//!
//! A [`ScannedCode`] is whatever the operator scanned or typed: a strict
//! barcode (10-14 decimal digits) or an arbitrary search term such as a style
//! ID or shoe name. [`Barcode`] can only be obtained through
//! [`ScannedCode::as_barcode`], so code that requires a barcode cannot be
//! handed free text.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest accepted barcode (ISBN-10 style).
pub const MIN_BARCODE_DIGITS: usize = 10;

/// Longest accepted barcode (GTIN-14).
pub const MAX_BARCODE_DIGITS: usize = 14;

/// Errors from parsing operator input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    /// Input was empty after trimming whitespace.
    #[error("scanned code is empty")]
    Empty,
}

/// A trimmed, non-empty scanned or typed code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScannedCode(String);

impl ScannedCode {
    /// Parse raw operator input.
    ///
    /// # Errors
    ///
    /// Returns `CodeError::Empty` if the input is blank.
    pub fn parse(input: &str) -> Result<Self, CodeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CodeError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The code as entered (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the code as a [`Barcode`] if it has barcode shape.
    #[must_use]
    pub fn as_barcode(&self) -> Option<Barcode> {
        is_barcode_shape(&self.0).then(|| Barcode(self.0.clone()))
    }

    /// Whether the code has barcode shape.
    #[must_use]
    pub fn is_barcode(&self) -> bool {
        is_barcode_shape(&self.0)
    }
}

impl fmt::Display for ScannedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ScannedCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ScannedCode> for String {
    fn from(code: ScannedCode) -> Self {
        code.0
    }
}

/// A code known to be 10-14 ASCII decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Barcode(String);

impl Barcode {
    /// The digits of the barcode.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_barcode_shape(s: &str) -> bool {
    (MIN_BARCODE_DIGITS..=MAX_BARCODE_DIGITS).contains(&s.len())
        && s.bytes().all(|b| b.is_ascii_digit())
}
