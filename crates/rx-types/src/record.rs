//! Flat, user-editable prescription record.
//!
//! The record is deliberately text-only: it mirrors what a data-entry surface holds while a
//! user is typing, including half-entered numbers. Parsing into typed values happens during
//! validation (`rx-core`), and wire encoding happens in the `ncpdp` crate.
//!
//! Two boundary constructors are provided for records arriving from outside Rust:
//! - [`FlatPrescriptionRecord::from_json`] for a JSON object keyed by wire names
//! - [`FlatPrescriptionRecord::from_fields`] for a plain string map
//!
//! Both fail fast with a [`RecordError`] when a key is missing or unknown. A missing key is a
//! caller bug, never something to paper over with an empty string.

use crate::{RecordError, RecordResult, DATE_FORMAT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every field of a [`FlatPrescriptionRecord`], in form order.
///
/// The ordering is used wherever fields are listed (validation output in particular), so it
/// follows the order the sections appear on the intake form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordField {
    PatientId,
    PatientFirstName,
    PatientLastName,
    PatientDateOfBirth,
    PatientStreet,
    PatientCity,
    PatientState,
    PatientZipCode,
    PatientPhone,
    PrescriberId,
    PrescriberNpi,
    PrescriberDea,
    PrescriberFirstName,
    PrescriberLastName,
    PrescriberStreet,
    PrescriberCity,
    PrescriberState,
    PrescriberZipCode,
    PrescriberPhone,
    MedicationNdc,
    MedicationName,
    MedicationQuantity,
    MedicationRefills,
    MedicationDosage,
    MedicationDirections,
    DateWritten,
    InsuranceBin,
    InsurancePcn,
    InsuranceGroupId,
    InsuranceMemberId,
    InsurancePlanName,
}

impl RecordField {
    /// All fields in form order.
    pub const ALL: [RecordField; 31] = [
        RecordField::PatientId,
        RecordField::PatientFirstName,
        RecordField::PatientLastName,
        RecordField::PatientDateOfBirth,
        RecordField::PatientStreet,
        RecordField::PatientCity,
        RecordField::PatientState,
        RecordField::PatientZipCode,
        RecordField::PatientPhone,
        RecordField::PrescriberId,
        RecordField::PrescriberNpi,
        RecordField::PrescriberDea,
        RecordField::PrescriberFirstName,
        RecordField::PrescriberLastName,
        RecordField::PrescriberStreet,
        RecordField::PrescriberCity,
        RecordField::PrescriberState,
        RecordField::PrescriberZipCode,
        RecordField::PrescriberPhone,
        RecordField::MedicationNdc,
        RecordField::MedicationName,
        RecordField::MedicationQuantity,
        RecordField::MedicationRefills,
        RecordField::MedicationDosage,
        RecordField::MedicationDirections,
        RecordField::DateWritten,
        RecordField::InsuranceBin,
        RecordField::InsurancePcn,
        RecordField::InsuranceGroupId,
        RecordField::InsuranceMemberId,
        RecordField::InsurancePlanName,
    ];

    /// The key used for this field in JSON records and validation output.
    pub fn name(self) -> &'static str {
        match self {
            RecordField::PatientId => "patientId",
            RecordField::PatientFirstName => "patientFirstName",
            RecordField::PatientLastName => "patientLastName",
            RecordField::PatientDateOfBirth => "patientDateOfBirth",
            RecordField::PatientStreet => "patientStreet",
            RecordField::PatientCity => "patientCity",
            RecordField::PatientState => "patientState",
            RecordField::PatientZipCode => "patientZipCode",
            RecordField::PatientPhone => "patientPhone",
            RecordField::PrescriberId => "prescriberId",
            RecordField::PrescriberNpi => "prescriberNPI",
            RecordField::PrescriberDea => "prescriberDEA",
            RecordField::PrescriberFirstName => "prescriberFirstName",
            RecordField::PrescriberLastName => "prescriberLastName",
            RecordField::PrescriberStreet => "prescriberStreet",
            RecordField::PrescriberCity => "prescriberCity",
            RecordField::PrescriberState => "prescriberState",
            RecordField::PrescriberZipCode => "prescriberZipCode",
            RecordField::PrescriberPhone => "prescriberPhone",
            RecordField::MedicationNdc => "medicationNDC",
            RecordField::MedicationName => "medicationName",
            RecordField::MedicationQuantity => "medicationQuantity",
            RecordField::MedicationRefills => "medicationRefills",
            RecordField::MedicationDosage => "medicationDosage",
            RecordField::MedicationDirections => "medicationDirections",
            RecordField::DateWritten => "dateWritten",
            RecordField::InsuranceBin => "insuranceBIN",
            RecordField::InsurancePcn => "insurancePCN",
            RecordField::InsuranceGroupId => "insuranceGroupID",
            RecordField::InsuranceMemberId => "insuranceMemberID",
            RecordField::InsurancePlanName => "insurancePlanName",
        }
    }

    /// Look up a field by its key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn section(self) -> RecordSection {
        use RecordField::*;
        match self {
            PatientId | PatientFirstName | PatientLastName | PatientDateOfBirth
            | PatientStreet | PatientCity | PatientState | PatientZipCode | PatientPhone => {
                RecordSection::Patient
            }
            PrescriberId | PrescriberNpi | PrescriberDea | PrescriberFirstName
            | PrescriberLastName | PrescriberStreet | PrescriberCity | PrescriberState
            | PrescriberZipCode | PrescriberPhone => RecordSection::Prescriber,
            MedicationNdc | MedicationName | MedicationQuantity | MedicationRefills
            | MedicationDosage | MedicationDirections | DateWritten => RecordSection::Medication,
            InsuranceBin | InsurancePcn | InsuranceGroupId | InsuranceMemberId
            | InsurancePlanName => RecordSection::Insurance,
        }
    }
}

/// The four groups of the intake form. `dateWritten` belongs to the medication group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSection {
    Patient,
    Prescriber,
    Medication,
    Insurance,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for RecordField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

/// Single-level prescription record as held by a data-entry surface.
///
/// All values are text, and an empty string means "not entered". The JSON shape uses the
/// intake form keys (`patientFirstName`, `prescriberNPI`, ...). Deserialisation is strict:
/// every key must be present and no other keys are accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlatPrescriptionRecord {
    #[serde(rename = "patientId")]
    pub patient_id: String,
    #[serde(rename = "patientFirstName")]
    pub patient_first_name: String,
    #[serde(rename = "patientLastName")]
    pub patient_last_name: String,
    #[serde(rename = "patientDateOfBirth")]
    pub patient_date_of_birth: String,
    #[serde(rename = "patientStreet")]
    pub patient_street: String,
    #[serde(rename = "patientCity")]
    pub patient_city: String,
    #[serde(rename = "patientState")]
    pub patient_state: String,
    #[serde(rename = "patientZipCode")]
    pub patient_zip_code: String,
    #[serde(rename = "patientPhone")]
    pub patient_phone: String,

    #[serde(rename = "prescriberId")]
    pub prescriber_id: String,
    #[serde(rename = "prescriberNPI")]
    pub prescriber_npi: String,
    #[serde(rename = "prescriberDEA")]
    pub prescriber_dea: String,
    #[serde(rename = "prescriberFirstName")]
    pub prescriber_first_name: String,
    #[serde(rename = "prescriberLastName")]
    pub prescriber_last_name: String,
    #[serde(rename = "prescriberStreet")]
    pub prescriber_street: String,
    #[serde(rename = "prescriberCity")]
    pub prescriber_city: String,
    #[serde(rename = "prescriberState")]
    pub prescriber_state: String,
    #[serde(rename = "prescriberZipCode")]
    pub prescriber_zip_code: String,
    #[serde(rename = "prescriberPhone")]
    pub prescriber_phone: String,

    #[serde(rename = "medicationNDC")]
    pub medication_ndc: String,
    #[serde(rename = "medicationName")]
    pub medication_name: String,
    #[serde(rename = "medicationQuantity")]
    pub medication_quantity: String,
    #[serde(rename = "medicationRefills")]
    pub medication_refills: String,
    #[serde(rename = "medicationDosage")]
    pub medication_dosage: String,
    #[serde(rename = "medicationDirections")]
    pub medication_directions: String,
    #[serde(rename = "dateWritten")]
    pub date_written: String,

    #[serde(rename = "insuranceBIN")]
    pub insurance_bin: String,
    #[serde(rename = "insurancePCN")]
    pub insurance_pcn: String,
    #[serde(rename = "insuranceGroupID")]
    pub insurance_group_id: String,
    #[serde(rename = "insuranceMemberID")]
    pub insurance_member_id: String,
    #[serde(rename = "insurancePlanName")]
    pub insurance_plan_name: String,
}

impl FlatPrescriptionRecord {
    /// A fresh record: every field empty except `dateWritten`, which is set to `today`.
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            date_written: today.format(DATE_FORMAT).to_string(),
            ..Self::default()
        }
    }

    /// Parse a record from a JSON object.
    ///
    /// This uses `serde_path_to_error` so the error names the offending key.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MalformedInput`] if the JSON is not an object of exactly the
    /// record's keys with string values.
    pub fn from_json(json_text: &str) -> RecordResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let record = match serde_path_to_error::deserialize::<_, Self>(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>".to_string()
                } else {
                    path
                };
                return Err(RecordError::MalformedInput {
                    path,
                    message: source.to_string(),
                });
            }
        };

        deserializer
            .end()
            .map_err(|e| RecordError::MalformedInput {
                path: "<root>".into(),
                message: e.to_string(),
            })?;

        Ok(record)
    }

    /// Build a record from a string map keyed by field names.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingField`] for the first field (in form order) absent from
    /// `fields`, or [`RecordError::UnknownField`] if `fields` has a key that is not a record
    /// field.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> RecordResult<Self> {
        if let Some(unknown) = fields.keys().find(|k| RecordField::from_name(k).is_none()) {
            return Err(RecordError::UnknownField(unknown.clone()));
        }

        let mut record = Self::default();
        for field in RecordField::ALL {
            let value = fields
                .get(field.name())
                .ok_or(RecordError::MissingField(field.name()))?;
            *record.get_mut(field) = value.clone();
        }
        Ok(record)
    }

    /// The record as a string map keyed by field names.
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        RecordField::ALL
            .iter()
            .map(|f| (f.name().to_string(), self.get(*f).to_string()))
            .collect()
    }

    /// Read a field by name.
    pub fn get(&self, field: RecordField) -> &str {
        match field {
            RecordField::PatientId => &self.patient_id,
            RecordField::PatientFirstName => &self.patient_first_name,
            RecordField::PatientLastName => &self.patient_last_name,
            RecordField::PatientDateOfBirth => &self.patient_date_of_birth,
            RecordField::PatientStreet => &self.patient_street,
            RecordField::PatientCity => &self.patient_city,
            RecordField::PatientState => &self.patient_state,
            RecordField::PatientZipCode => &self.patient_zip_code,
            RecordField::PatientPhone => &self.patient_phone,
            RecordField::PrescriberId => &self.prescriber_id,
            RecordField::PrescriberNpi => &self.prescriber_npi,
            RecordField::PrescriberDea => &self.prescriber_dea,
            RecordField::PrescriberFirstName => &self.prescriber_first_name,
            RecordField::PrescriberLastName => &self.prescriber_last_name,
            RecordField::PrescriberStreet => &self.prescriber_street,
            RecordField::PrescriberCity => &self.prescriber_city,
            RecordField::PrescriberState => &self.prescriber_state,
            RecordField::PrescriberZipCode => &self.prescriber_zip_code,
            RecordField::PrescriberPhone => &self.prescriber_phone,
            RecordField::MedicationNdc => &self.medication_ndc,
            RecordField::MedicationName => &self.medication_name,
            RecordField::MedicationQuantity => &self.medication_quantity,
            RecordField::MedicationRefills => &self.medication_refills,
            RecordField::MedicationDosage => &self.medication_dosage,
            RecordField::MedicationDirections => &self.medication_directions,
            RecordField::DateWritten => &self.date_written,
            RecordField::InsuranceBin => &self.insurance_bin,
            RecordField::InsurancePcn => &self.insurance_pcn,
            RecordField::InsuranceGroupId => &self.insurance_group_id,
            RecordField::InsuranceMemberId => &self.insurance_member_id,
            RecordField::InsurancePlanName => &self.insurance_plan_name,
        }
    }

    /// Mutable access to a field, for callers editing the record field-by-field.
    pub fn get_mut(&mut self, field: RecordField) -> &mut String {
        match field {
            RecordField::PatientId => &mut self.patient_id,
            RecordField::PatientFirstName => &mut self.patient_first_name,
            RecordField::PatientLastName => &mut self.patient_last_name,
            RecordField::PatientDateOfBirth => &mut self.patient_date_of_birth,
            RecordField::PatientStreet => &mut self.patient_street,
            RecordField::PatientCity => &mut self.patient_city,
            RecordField::PatientState => &mut self.patient_state,
            RecordField::PatientZipCode => &mut self.patient_zip_code,
            RecordField::PatientPhone => &mut self.patient_phone,
            RecordField::PrescriberId => &mut self.prescriber_id,
            RecordField::PrescriberNpi => &mut self.prescriber_npi,
            RecordField::PrescriberDea => &mut self.prescriber_dea,
            RecordField::PrescriberFirstName => &mut self.prescriber_first_name,
            RecordField::PrescriberLastName => &mut self.prescriber_last_name,
            RecordField::PrescriberStreet => &mut self.prescriber_street,
            RecordField::PrescriberCity => &mut self.prescriber_city,
            RecordField::PrescriberState => &mut self.prescriber_state,
            RecordField::PrescriberZipCode => &mut self.prescriber_zip_code,
            RecordField::PrescriberPhone => &mut self.prescriber_phone,
            RecordField::MedicationNdc => &mut self.medication_ndc,
            RecordField::MedicationName => &mut self.medication_name,
            RecordField::MedicationQuantity => &mut self.medication_quantity,
            RecordField::MedicationRefills => &mut self.medication_refills,
            RecordField::MedicationDosage => &mut self.medication_dosage,
            RecordField::MedicationDirections => &mut self.medication_directions,
            RecordField::DateWritten => &mut self.date_written,
            RecordField::InsuranceBin => &mut self.insurance_bin,
            RecordField::InsurancePcn => &mut self.insurance_pcn,
            RecordField::InsuranceGroupId => &mut self.insurance_group_id,
            RecordField::InsuranceMemberId => &mut self.insurance_member_id,
            RecordField::InsurancePlanName => &mut self.insurance_plan_name,
        }
    }
}
