//! Record validation.
//!
//! [`validate`] applies the [field rule catalog](crate::catalog) to a flat record and
//! returns every failure as data. It never fails as an operation: an empty
//! [`ValidationErrors`] means the record is valid.
//!
//! [`validate_for_submission`] is the gated path. On success it hands back a
//! [`ValidatedPrescription`] carrying the parsed NPI and quantity, so code downstream of
//! validation does not parse those strings again.

use crate::catalog::FIELD_RULES;
use crate::constants::{NPI_FORMAT, QUANTITY_POSITIVE};
use ncpdp::{NcpdpResult, PrescriptionMessage};
use rx_types::{FlatPrescriptionRecord, Npi, Quantity, RecordField, RecordSection};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field-scoped validation failures, ordered by form position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<RecordField, String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The message reported for `field`, if it failed.
    pub fn get(&self, field: RecordField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = RecordField> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordField, &str)> + '_ {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    /// Failures grouped by form section. Sections without failures are left out.
    pub fn by_section(&self) -> BTreeMap<RecordSection, ValidationErrors> {
        let mut grouped: BTreeMap<RecordSection, ValidationErrors> = BTreeMap::new();
        for (field, message) in self.iter() {
            grouped
                .entry(field.section())
                .or_default()
                .insert(field, message);
        }
        grouped
    }

    fn insert(&mut self, field: RecordField, message: &str) {
        self.0.insert(field, message.to_string());
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Check `record` against every catalog rule.
///
/// Each rule is evaluated independently and a field reports at most one message.
pub fn validate(record: &FlatPrescriptionRecord) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    for rule in &FIELD_RULES {
        if let Some(message) = rule.check(record.get(rule.field)) {
            errors.insert(rule.field, message);
        }
    }

    tracing::debug!(failures = errors.len(), "validated prescription record");
    errors
}

/// A record that passed validation, with its numeric fields parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedPrescription {
    record: FlatPrescriptionRecord,
    npi: Npi,
    quantity: Quantity,
}

impl ValidatedPrescription {
    pub fn record(&self) -> &FlatPrescriptionRecord {
        &self.record
    }

    pub fn npi(&self) -> &Npi {
        &self.npi
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn into_record(self) -> FlatPrescriptionRecord {
        self.record
    }

    /// Render the wire message for this prescription issued at `now`.
    pub fn render(&self, now: chrono::DateTime<chrono::Utc>) -> NcpdpResult<String> {
        PrescriptionMessage::render(&self.record, now)
    }
}

/// Validate `record` and, if it passes, wrap it with its parsed NPI and quantity.
///
/// # Errors
///
/// Returns the full set of [`ValidationErrors`] if any rule fails.
pub fn validate_for_submission(
    record: FlatPrescriptionRecord,
) -> Result<ValidatedPrescription, ValidationErrors> {
    let errors = validate(&record);
    if !errors.is_empty() {
        return Err(errors);
    }

    // Both formats are enforced by the catalog, so these only fail if the catalog changes.
    let npi = Npi::parse(&record.prescriber_npi).map_err(|_| {
        let mut errors = ValidationErrors::default();
        errors.insert(RecordField::PrescriberNpi, NPI_FORMAT);
        errors
    })?;
    let quantity = Quantity::parse(&record.medication_quantity).map_err(|_| {
        let mut errors = ValidationErrors::default();
        errors.insert(RecordField::MedicationQuantity, QUANTITY_POSITIVE);
        errors
    })?;

    Ok(ValidatedPrescription {
        record,
        npi,
        quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{FIRST_NAME_REQUIRED, NPI_REQUIRED};
    use proptest::prelude::*;

    fn complete_record() -> FlatPrescriptionRecord {
        let mut record = FlatPrescriptionRecord::default();
        for field in RecordField::ALL {
            *record.get_mut(field) = "x".into();
        }
        record.prescriber_npi = "1234567890".into();
        record.medication_quantity = "2".into();
        record
    }

    #[test]
    fn complete_record_has_no_errors() {
        let errors = validate(&complete_record());
        assert!(errors.is_empty(), "{errors}");
    }

    #[test]
    fn blank_record_reports_exactly_the_catalog_fields() {
        let errors = validate(&FlatPrescriptionRecord::default());
        let fields: Vec<_> = errors.fields().collect();
        assert_eq!(
            fields,
            vec![
                RecordField::PatientFirstName,
                RecordField::PatientLastName,
                RecordField::PatientDateOfBirth,
                RecordField::PrescriberNpi,
                RecordField::PrescriberFirstName,
                RecordField::PrescriberLastName,
                RecordField::MedicationNdc,
                RecordField::MedicationName,
                RecordField::MedicationQuantity,
            ]
        );
        assert_eq!(errors.get(RecordField::PrescriberNpi), Some(NPI_REQUIRED));
        assert_eq!(
            errors.get(RecordField::PrescriberFirstName),
            Some(FIRST_NAME_REQUIRED)
        );
    }

    #[test]
    fn whitespace_only_values_count_as_blank() {
        let mut record = complete_record();
        record.patient_last_name = "   ".into();
        let errors = validate(&record);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get(RecordField::PatientLastName),
            Some("Last name is required")
        );
    }

    #[test]
    fn short_npi_reports_format_error() {
        let mut record = complete_record();
        record.prescriber_npi = "12345".into();
        let errors = validate(&record);
        assert_eq!(
            errors.get(RecordField::PrescriberNpi),
            Some("NPI must be 10 digits")
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut record = complete_record();
        record.medication_quantity = "0".into();
        assert_eq!(
            validate(&record).get(RecordField::MedicationQuantity),
            Some("Quantity must be greater than 0")
        );
    }

    #[test]
    fn optional_fields_may_be_blank() {
        let mut record = complete_record();
        for field in [
            RecordField::PatientId,
            RecordField::PatientPhone,
            RecordField::PrescriberDea,
            RecordField::MedicationRefills,
            RecordField::InsurancePlanName,
            RecordField::DateWritten,
        ] {
            record.get_mut(field).clear();
        }
        assert!(validate(&record).is_empty());
    }

    #[test]
    fn errors_serialise_as_field_keyed_object() {
        let mut record = complete_record();
        record.prescriber_npi = "12345".into();
        let json = serde_json::to_value(validate(&record)).expect("serialise errors");
        assert_eq!(
            json,
            serde_json::json!({ "prescriberNPI": "NPI must be 10 digits" })
        );
    }

    #[test]
    fn display_lists_each_failure() {
        let mut record = complete_record();
        record.medication_ndc.clear();
        record.medication_name.clear();
        assert_eq!(
            validate(&record).to_string(),
            "medicationNDC: NDC is required; medicationName: Medication name is required"
        );
    }

    #[test]
    fn errors_group_by_form_section() {
        let mut record = complete_record();
        record.patient_first_name.clear();
        record.prescriber_npi = "12345".into();
        record.prescriber_last_name.clear();
        let grouped = validate(&record).by_section();

        let sections: Vec<_> = grouped.keys().copied().collect();
        assert_eq!(
            sections,
            vec![RecordSection::Patient, RecordSection::Prescriber]
        );
        assert_eq!(grouped[&RecordSection::Prescriber].len(), 2);
        assert_eq!(
            serde_json::to_value(&grouped).expect("serialise grouped errors"),
            serde_json::json!({
                "patient": { "patientFirstName": "First name is required" },
                "prescriber": {
                    "prescriberNPI": "NPI must be 10 digits",
                    "prescriberLastName": "Last name is required",
                },
            })
        );
        assert!(ValidationErrors::default().by_section().is_empty());
    }

    #[test]
    fn validate_for_submission_parses_typed_values() {
        let mut record = complete_record();
        record.medication_quantity = " 4 ".into();
        let validated = validate_for_submission(record).expect("valid record");
        assert_eq!(validated.npi().as_str(), "1234567890");
        assert_eq!(validated.quantity().get(), 4);
        assert_eq!(validated.record().medication_quantity, " 4 ");
    }

    #[test]
    fn validate_for_submission_returns_all_errors() {
        let errors = validate_for_submission(FlatPrescriptionRecord::default())
            .expect_err("blank record is invalid");
        assert_eq!(errors.len(), 9);
    }

    /// Text with at least one non-whitespace character.
    const NON_BLANK: &str = "[A-Za-z0-9 .'-]{0,6}[A-Za-z0-9][A-Za-z0-9 .'-]{0,6}";

    fn record_from(values: Vec<String>, npi: String, quantity: String) -> FlatPrescriptionRecord {
        let mut record = FlatPrescriptionRecord::default();
        for (field, value) in RecordField::ALL.into_iter().zip(values) {
            *record.get_mut(field) = value;
        }
        record.prescriber_npi = npi;
        record.medication_quantity = quantity;
        record
    }

    fn is_ten_digits(value: &str) -> bool {
        value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit())
    }

    proptest! {
        /// Non-blank fields, a 10-digit NPI and a positive quantity always validate.
        #[test]
        fn well_formed_records_always_validate(
            values in proptest::collection::vec(NON_BLANK, RecordField::ALL.len()),
            npi in "[0-9]{10}",
            quantity in 1u32..,
        ) {
            let record = record_from(values, npi, quantity.to_string());
            let errors = validate(&record);
            prop_assert!(errors.is_empty(), "{}", errors);
        }

        /// Any non-blank NPI that is not exactly 10 digits reports only the format message.
        #[test]
        fn malformed_npi_reports_only_format_error(
            values in proptest::collection::vec(NON_BLANK, RecordField::ALL.len()),
            npi in "[A-Za-z0-9 -]{0,14}",
        ) {
            prop_assume!(!npi.trim().is_empty() && !is_ten_digits(&npi));
            let errors = validate(&record_from(values, npi, "2".into()));
            prop_assert_eq!(errors.len(), 1);
            prop_assert_eq!(errors.get(RecordField::PrescriberNpi), Some(NPI_FORMAT));
        }
    }
}
