//! Validated text-level values.
//!
//! The flat record keeps every field as text. Once a record has been validated these types
//! carry the parsed form, so code downstream of validation does not re-parse strings.

use std::fmt;
use std::num::NonZeroU32;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input is not a 10-digit National Provider Identifier
    #[error("NPI must be 10 digits, got '{0}'")]
    InvalidNpi(String),

    /// The input is not a positive whole number
    #[error("quantity must be a whole number greater than 0, got '{0}'")]
    InvalidQuantity(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// National Provider Identifier: exactly ten ASCII digits.
///
/// Unlike [`NonEmptyText`] the input is not trimmed; surrounding whitespace makes the value
/// invalid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Npi(String);

impl Npi {
    /// Number of digits in an NPI.
    pub const LEN: usize = 10;

    /// Parses an NPI.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for blank input and [`TextError::InvalidNpi`] when the
    /// input is not exactly ten ASCII digits.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        if input.trim().is_empty() {
            return Err(TextError::Empty);
        }
        if input.len() != Self::LEN || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TextError::InvalidNpi(input.to_owned()));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Npi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dispensed quantity: a whole number greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// Quantity used when a record carries none.
    pub const DEFAULT: Quantity = Quantity(NonZeroU32::MIN);

    /// Parses a quantity from user-entered text. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for blank input and [`TextError::InvalidQuantity`] when the
    /// text is not a whole number greater than zero.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        trimmed
            .parse::<NonZeroU32>()
            .map(Self)
            .map_err(|_| TextError::InvalidQuantity(input.to_owned()))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
