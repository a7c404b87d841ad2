//! Intake submission.
//!
//! Ties validation and encoding together and hands the result to an [`IntakeSubmitter`].
//! The submitter is the seam to the downstream intake service; this crate does not know or
//! care how it transports the message, and imposes no retry or timeout policy.

use crate::validation::validate_for_submission;
use crate::{IntakeError, IntakeResult};
use chrono::{DateTime, Utc};
use ncpdp::{PayloadFormat, PrescriptionMessage};
use rx_types::{FlatPrescriptionRecord, NonEmptyText, TextError};
use serde::Serialize;

/// A wire message ready to hand to the intake service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntakeRequest {
    pub payload: String,
    pub format: PayloadFormat,
}

/// The intake service's acknowledgement of a submitted prescription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntakeReceipt {
    prescription_id: NonEmptyText,
}

impl IntakeReceipt {
    pub fn new(prescription_id: impl AsRef<str>) -> Result<Self, TextError> {
        Ok(Self {
            prescription_id: NonEmptyText::new(prescription_id)?,
        })
    }

    pub fn prescription_id(&self) -> &str {
        self.prescription_id.as_str()
    }
}

/// Delivers an [`IntakeRequest`] to the downstream intake service.
pub trait IntakeSubmitter {
    fn submit(
        &self,
        request: &IntakeRequest,
    ) -> Result<IntakeReceipt, Box<dyn std::error::Error + Send + Sync>>;
}

/// Render `record` without validating it.
///
/// Empty required values are emitted as empty elements and empty identifiers or quantities
/// fall back to placeholders. Use [`prepare_submission`] for anything that will be sent.
pub fn encode(record: &FlatPrescriptionRecord, now: DateTime<Utc>) -> IntakeResult<String> {
    Ok(PrescriptionMessage::render(record, now)?)
}

/// Validate `record` and render it for submission.
///
/// # Errors
///
/// Returns [`IntakeError::Validation`] with every failing field if the record is invalid.
pub fn prepare_submission(
    record: &FlatPrescriptionRecord,
    now: DateTime<Utc>,
) -> IntakeResult<IntakeRequest> {
    let validated = match validate_for_submission(record.clone()) {
        Ok(validated) => validated,
        Err(errors) => {
            tracing::warn!(
                failures = errors.len(),
                fields = %errors,
                "prescription rejected before submission"
            );
            return Err(IntakeError::Validation(errors));
        }
    };

    let payload = validated.render(now)?;
    Ok(IntakeRequest {
        payload,
        format: PayloadFormat::Xml,
    })
}

/// Validate, render and submit `record`.
pub fn submit(
    record: &FlatPrescriptionRecord,
    now: DateTime<Utc>,
    submitter: &dyn IntakeSubmitter,
) -> IntakeResult<IntakeReceipt> {
    let request = prepare_submission(record, now)?;
    let receipt = submitter
        .submit(&request)
        .map_err(IntakeError::Submission)?;

    tracing::info!(
        prescription_id = receipt.prescription_id(),
        patient_id = %record.patient_id,
        "prescription submitted"
    );
    Ok(receipt)
}
