//! NCPDP SCRIPT wire/boundary support for prescription intake.
//!
//! This crate provides the **wire format** side of intake:
//! - escaping of free text for the XML message
//! - rendering a flat prescription record into the canonical `Message` document
//! - parsing a `Message` document back into a structured prescription
//!
//! This crate focuses on:
//! - deterministic element ordering and conditional section inclusion
//! - serialisation/deserialisation
//! - translation between the flat record and the wire tree
//!
//! Validation of user data is not done here. Rendering is tolerant: empty required values
//! produce empty elements and empty identifiers fall back to placeholders, so callers that
//! want gating must validate first (see `rx-core`).

pub mod escape;
pub mod message_id;
pub mod parse;
pub mod render;
pub mod sections;

use chrono::{DateTime, Utc};
use rx_types::FlatPrescriptionRecord;
use std::fmt;
use std::str::FromStr;

// Re-export facade helpers
pub use escape::{escape, is_xml_char};
pub use message_id::MessageId;
pub use parse::{
    check_well_formed, dedup_key, Address, InsuranceInfo, MedicationInfo, ParsedPrescription,
    PatientInfo, PrescriberInfo,
};
pub use sections::{AddressFields, InsuranceFields};

/// Patient identifier emitted when the record leaves `patientId` empty.
pub const DEFAULT_PATIENT_ID: &str = "PAT001";

/// Prescriber identifier emitted when the record leaves `prescriberId` empty.
pub const DEFAULT_PRESCRIBER_ID: &str = "PRES001";

/// Quantity emitted when the record's quantity is empty or not a whole number.
pub const DEFAULT_QUANTITY: u32 = 1;

/// Errors returned by the `ncpdp` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum NcpdpError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("message is not well-formed: {0}")]
    NotWellFormed(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("unsupported payload format: {0}")]
    UnsupportedFormat(String),

    #[error("<{element}> value contains U+{code:04X}, which XML cannot carry")]
    ForbiddenCharacter { element: String, code: u32 },

    #[error("invalid message id: {0}")]
    InvalidMessageId(String),

    #[error("I/O error while writing message: {0}")]
    Io(#[from] std::io::Error),

    #[error("message is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Type alias for Results that can fail with an [`NcpdpError`].
pub type NcpdpResult<T> = Result<T, NcpdpError>;

/// Payload format tag carried alongside a message on submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    #[default]
    Xml,
    Json,
}

impl PayloadFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadFormat::Xml => "xml",
            PayloadFormat::Json => "json",
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadFormat {
    type Err = NcpdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(PayloadFormat::Xml),
            "json" => Ok(PayloadFormat::Json),
            other => Err(NcpdpError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Prescription message operations.
///
/// This is a zero-sized type used for namespacing message-related operations.
/// All methods are associated functions.
pub struct PrescriptionMessage;

impl PrescriptionMessage {
    /// Render a flat record as an NCPDP `Message` document.
    ///
    /// The message id and timestamp are both derived from `now`, so identical inputs produce
    /// identical output.
    ///
    /// # Errors
    ///
    /// Returns [`NcpdpError`] only if the underlying XML writer fails, which does not happen
    /// for an in-memory buffer.
    pub fn render(record: &FlatPrescriptionRecord, now: DateTime<Utc>) -> NcpdpResult<String> {
        render::render_message(record, now)
    }

    /// Parse an NCPDP `Message` document.
    ///
    /// # Errors
    ///
    /// Returns [`NcpdpError`] if the text is empty, not well-formed, or does not match the
    /// message structure.
    pub fn parse(xml_text: &str) -> NcpdpResult<ParsedPrescription> {
        parse::parse_message(xml_text)
    }

    /// Parse a submitted payload according to its format tag.
    ///
    /// Only XML is supported; JSON payloads are recognised and rejected.
    pub fn parse_payload(payload: &str, format: PayloadFormat) -> NcpdpResult<ParsedPrescription> {
        match format {
            PayloadFormat::Xml => Self::parse(payload),
            PayloadFormat::Json => Err(NcpdpError::UnsupportedFormat(
                "JSON payloads are not supported, submit XML".into(),
            )),
        }
    }
}
