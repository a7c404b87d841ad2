//! Shared prescription types.
//!
//! This crate holds the text-level shapes that every other crate passes around:
//! - [`FlatPrescriptionRecord`]: the single-level, user-editable record
//! - [`CanonicalExampleRecord`]: the nested reference shape used by the worked-example library
//! - small validated value types ([`NonEmptyText`], [`Npi`], [`Quantity`])
//!
//! Nothing here performs I/O or business validation; see `rx-core` for the rule catalog.

pub mod example;
pub mod record;
pub mod text;

pub use example::{
    CanonicalExampleRecord, ExampleInsurance, ExampleMedication, ExamplePatient,
    ExamplePrescriber,
};
pub use record::{FlatPrescriptionRecord, RecordField, RecordSection};
pub use text::{NonEmptyText, Npi, Quantity, TextError};

/// Date format used for `dateWritten` and dates of birth (ISO 8601 calendar date).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised when a boundary record does not have the expected structure.
///
/// These indicate a caller-side contract violation (a key missing entirely, an unknown key,
/// a non-string value), not bad user data. User data problems are reported by validation.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record is missing field '{0}'")]
    MissingField(&'static str),

    #[error("record has unknown field '{0}'")]
    UnknownField(String),

    #[error("malformed record at {path}: {message}")]
    MalformedInput { path: String, message: String },
}

/// Type alias for Results that can fail with a [`RecordError`].
pub type RecordResult<T> = Result<T, RecordError>;
