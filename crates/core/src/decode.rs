//! Flattening a canonical example into the editable record shape.

use chrono::NaiveDate;
use rx_types::{CanonicalExampleRecord, ExampleInsurance, FlatPrescriptionRecord, DATE_FORMAT};

/// Copy every nested value of `example` to its flat key.
///
/// Absent optional values become empty strings and numbers become decimal text.
/// `dateWritten` falls back to `today` when the example has none. No validation is done.
pub fn to_flat_record(
    example: &CanonicalExampleRecord,
    today: NaiveDate,
) -> FlatPrescriptionRecord {
    let patient = &example.patient;
    let prescriber = &example.prescriber;
    let medication = &example.medication;
    let insurance = example.insurance.clone().unwrap_or_default();
    let ExampleInsurance {
        bin,
        pcn,
        group_id,
        member_id,
        plan_name,
    } = insurance;

    FlatPrescriptionRecord {
        patient_id: patient.id.clone(),
        patient_first_name: patient.first_name.clone(),
        patient_last_name: patient.last_name.clone(),
        patient_date_of_birth: patient.date_of_birth.clone(),
        patient_street: text(&patient.street),
        patient_city: text(&patient.city),
        patient_state: text(&patient.state),
        patient_zip_code: text(&patient.zip_code),
        patient_phone: text(&patient.phone),

        prescriber_id: prescriber.id.clone(),
        prescriber_npi: prescriber.npi.clone(),
        prescriber_dea: text(&prescriber.dea),
        prescriber_first_name: prescriber.first_name.clone(),
        prescriber_last_name: prescriber.last_name.clone(),
        prescriber_street: text(&prescriber.street),
        prescriber_city: text(&prescriber.city),
        prescriber_state: text(&prescriber.state),
        prescriber_zip_code: text(&prescriber.zip_code),
        prescriber_phone: text(&prescriber.phone),

        medication_ndc: medication.ndc.clone(),
        medication_name: medication.name.clone(),
        medication_quantity: medication.quantity.to_string(),
        medication_refills: medication
            .refills
            .map(|refills| refills.to_string())
            .unwrap_or_default(),
        medication_dosage: text(&medication.dosage),
        medication_directions: text(&medication.directions),
        date_written: example
            .date_written
            .clone()
            .unwrap_or_else(|| today.format(DATE_FORMAT).to_string()),

        insurance_bin: bin.unwrap_or_default(),
        insurance_pcn: pcn.unwrap_or_default(),
        insurance_group_id: group_id.unwrap_or_default(),
        insurance_member_id: member_id.unwrap_or_default(),
        insurance_plan_name: plan_name.unwrap_or_default(),
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
