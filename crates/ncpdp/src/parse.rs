//! Parsing an NCPDP `Message` document on the intake side.
//!
//! Responsibilities:
//! - Reject empty or malformed documents, including ones carrying characters XML forbids,
//!   before any structural decoding
//! - Define a wire model matching the message tree, for deserialisation
//! - Translate the wire model into public domain-level types
//! - Derive a deduplication key from the core prescription fields
//!
//! Notes:
//! - Unknown elements are ignored, so newer senders can add header fields
//! - `Address` and `Insurance` are `Some` exactly when their elements are present
//! - `Refills` is kept as text: the record treats it as free text, so whatever the encoder
//!   emits must parse back

use crate::escape::first_forbidden_char;
use crate::{NcpdpError, NcpdpResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use rx_types::FlatPrescriptionRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Prefix for deduplication keys.
pub const DEDUP_KEY_PREFIX: &str = "rx:dedup:";

// ============================================================================
// Public domain-level types
// ============================================================================

/// A prescription decoded from a wire message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParsedPrescription {
    pub message_id: String,
    pub relates_to: Option<String>,
    pub timestamp: String,
    pub date_written: String,
    pub patient: PatientInfo,
    pub prescriber: PrescriberInfo,
    pub medication: MedicationInfo,
    pub insurance: Option<InsuranceInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatientInfo {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub address: Option<Address>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PrescriberInfo {
    pub id: String,
    pub npi: String,
    pub dea: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<Address>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MedicationInfo {
    pub ndc: String,
    pub name: String,
    pub quantity: u32,
    pub refills: Option<String>,
    pub dosage: Option<String>,
    pub directions: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InsuranceInfo {
    pub bin: Option<String>,
    pub pcn: Option<String>,
    pub group_id: Option<String>,
    pub member_id: Option<String>,
    pub plan_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl ParsedPrescription {
    /// Deduplication key over patient id, drug NDC and date written.
    ///
    /// Format: `rx:dedup:<sha256 hex of "patientId:ndc:dateWritten">`.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.patient.id, &self.medication.ndc, &self.date_written)
    }

    /// Flatten back into the editable record shape.
    ///
    /// Absent optional values become empty strings.
    pub fn to_flat_record(&self) -> FlatPrescriptionRecord {
        let patient_address = self.patient.address.clone().unwrap_or_default();
        let prescriber_address = self.prescriber.address.clone().unwrap_or_default();
        let insurance = self.insurance.clone().unwrap_or_default();

        FlatPrescriptionRecord {
            patient_id: self.patient.id.clone(),
            patient_first_name: self.patient.first_name.clone(),
            patient_last_name: self.patient.last_name.clone(),
            patient_date_of_birth: self.patient.date_of_birth.clone(),
            patient_street: patient_address.street.unwrap_or_default(),
            patient_city: patient_address.city.unwrap_or_default(),
            patient_state: patient_address.state.unwrap_or_default(),
            patient_zip_code: patient_address.zip_code.unwrap_or_default(),
            patient_phone: self.patient.phone.clone().unwrap_or_default(),
            prescriber_id: self.prescriber.id.clone(),
            prescriber_npi: self.prescriber.npi.clone(),
            prescriber_dea: self.prescriber.dea.clone().unwrap_or_default(),
            prescriber_first_name: self.prescriber.first_name.clone(),
            prescriber_last_name: self.prescriber.last_name.clone(),
            prescriber_street: prescriber_address.street.unwrap_or_default(),
            prescriber_city: prescriber_address.city.unwrap_or_default(),
            prescriber_state: prescriber_address.state.unwrap_or_default(),
            prescriber_zip_code: prescriber_address.zip_code.unwrap_or_default(),
            prescriber_phone: self.prescriber.phone.clone().unwrap_or_default(),
            medication_ndc: self.medication.ndc.clone(),
            medication_name: self.medication.name.clone(),
            medication_quantity: self.medication.quantity.to_string(),
            medication_refills: self.medication.refills.clone().unwrap_or_default(),
            medication_dosage: self.medication.dosage.clone().unwrap_or_default(),
            medication_directions: self.medication.directions.clone().unwrap_or_default(),
            date_written: self.date_written.clone(),
            insurance_bin: insurance.bin.unwrap_or_default(),
            insurance_pcn: insurance.pcn.unwrap_or_default(),
            insurance_group_id: insurance.group_id.unwrap_or_default(),
            insurance_member_id: insurance.member_id.unwrap_or_default(),
            insurance_plan_name: insurance.plan_name.unwrap_or_default(),
        }
    }
}

/// Deduplication key for a prescription identified by patient, drug and date written.
pub fn dedup_key(patient_id: &str, drug_ndc: &str, date_written: &str) -> String {
    let composite = format!("{patient_id}:{drug_ndc}:{date_written}");
    let digest = Sha256::digest(composite.as_bytes());
    format!("{DEDUP_KEY_PREFIX}{}", hex::encode(digest))
}

// ============================================================================
// Parsing
// ============================================================================

/// Check that `xml_text` is a non-empty, well-formed XML document.
///
/// # Errors
///
/// Returns [`NcpdpError::EmptyMessage`] for blank input and [`NcpdpError::NotWellFormed`]
/// when the text holds a character XML 1.0 forbids or tokenising the document fails
/// (mismatched tags, bad entities, truncation).
pub fn check_well_formed(xml_text: &str) -> NcpdpResult<()> {
    if xml_text.trim().is_empty() {
        return Err(NcpdpError::EmptyMessage);
    }
    if let Some((offset, c)) = first_forbidden_char(xml_text) {
        return Err(NcpdpError::NotWellFormed(format!(
            "at byte {offset}: character U+{:04X} is not allowed in XML",
            c as u32
        )));
    }

    let mut reader = Reader::from_str(xml_text);
    let mut depth = 0usize;
    let mut saw_root = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                if depth == 0 && saw_root {
                    return Err(NcpdpError::NotWellFormed(
                        "document has more than one root element".into(),
                    ));
                }
                depth += 1;
                saw_root = true;
            }
            Ok(Event::Empty(_)) => {
                if depth == 0 && saw_root {
                    return Err(NcpdpError::NotWellFormed(
                        "document has more than one root element".into(),
                    ));
                }
                saw_root = true;
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(NcpdpError::NotWellFormed(format!(
                    "at byte {}: {e}",
                    reader.error_position()
                )))
            }
        }
    }

    if !saw_root {
        return Err(NcpdpError::NotWellFormed("document has no root element".into()));
    }
    if depth != 0 {
        return Err(NcpdpError::NotWellFormed("unclosed element at end of document".into()));
    }
    Ok(())
}

/// Parse a message document into a [`ParsedPrescription`].
pub(crate) fn parse_message(xml_text: &str) -> NcpdpResult<ParsedPrescription> {
    check_well_formed(xml_text)?;

    let mut deserializer = quick_xml::de::Deserializer::from_str(xml_text);
    let wire = match serde_path_to_error::deserialize::<_, MessageWire>(&mut deserializer) {
        Ok(parsed) => parsed,
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            return Err(NcpdpError::Translation(format!(
                "Message schema mismatch at {path}: {source}"
            )));
        }
    };

    let parsed = wire_to_domain(wire);
    tracing::debug!(
        message_id = %parsed.message_id,
        patient_id = %parsed.patient.id,
        "parsed prescription message"
    );
    Ok(parsed)
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct MessageWire {
    #[serde(rename = "Header")]
    header: HeaderWire,
    #[serde(rename = "Body")]
    body: BodyWire,
}

#[derive(Debug, Deserialize)]
struct HeaderWire {
    #[serde(rename = "MessageID")]
    message_id: String,
    #[serde(rename = "RelatesTo", default)]
    relates_to: Option<String>,
    #[serde(rename = "Timestamp")]
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct BodyWire {
    #[serde(rename = "Prescription")]
    prescription: PrescriptionWire,
}

#[derive(Debug, Deserialize)]
struct PrescriptionWire {
    #[serde(rename = "@DateWritten", default)]
    date_written: String,
    #[serde(rename = "Patient")]
    patient: PatientWire,
    #[serde(rename = "Prescriber")]
    prescriber: PrescriberWire,
    #[serde(rename = "Medication")]
    medication: MedicationWire,
    #[serde(rename = "Insurance", default)]
    insurance: Option<InsuranceWire>,
}

#[derive(Debug, Deserialize)]
struct PatientWire {
    #[serde(rename = "@ID", default)]
    id: String,
    #[serde(rename = "FirstName", default)]
    first_name: String,
    #[serde(rename = "LastName", default)]
    last_name: String,
    #[serde(rename = "DateOfBirth", default)]
    date_of_birth: String,
    #[serde(rename = "Address", default)]
    address: Option<AddressWire>,
    #[serde(rename = "Phone", default)]
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrescriberWire {
    #[serde(rename = "@ID", default)]
    id: String,
    #[serde(rename = "NPI", default)]
    npi: String,
    #[serde(rename = "DEA", default)]
    dea: Option<String>,
    #[serde(rename = "FirstName", default)]
    first_name: String,
    #[serde(rename = "LastName", default)]
    last_name: String,
    #[serde(rename = "Address", default)]
    address: Option<AddressWire>,
    #[serde(rename = "Phone", default)]
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MedicationWire {
    #[serde(rename = "NDC")]
    ndc: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Quantity")]
    quantity: u32,
    #[serde(rename = "Refills", default)]
    refills: Option<String>,
    #[serde(rename = "Dosage", default)]
    dosage: Option<String>,
    #[serde(rename = "Directions", default)]
    directions: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct InsuranceWire {
    #[serde(rename = "BIN", default)]
    bin: Option<String>,
    #[serde(rename = "PCN", default)]
    pcn: Option<String>,
    #[serde(rename = "GroupID", default)]
    group_id: Option<String>,
    #[serde(rename = "MemberID", default)]
    member_id: Option<String>,
    #[serde(rename = "PlanName", default)]
    plan_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AddressWire {
    #[serde(rename = "Street", default)]
    street: Option<String>,
    #[serde(rename = "City", default)]
    city: Option<String>,
    #[serde(rename = "State", default)]
    state: Option<String>,
    #[serde(rename = "ZipCode", default)]
    zip_code: Option<String>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn address_to_domain(wire: AddressWire) -> Address {
    Address {
        street: wire.street,
        city: wire.city,
        state: wire.state,
        zip_code: wire.zip_code,
    }
}

fn wire_to_domain(wire: MessageWire) -> ParsedPrescription {
    let prescription = wire.body.prescription;
    let patient = prescription.patient;
    let prescriber = prescription.prescriber;
    let medication = prescription.medication;

    ParsedPrescription {
        message_id: wire.header.message_id,
        relates_to: wire.header.relates_to,
        timestamp: wire.header.timestamp,
        date_written: prescription.date_written,
        patient: PatientInfo {
            id: patient.id,
            first_name: patient.first_name,
            last_name: patient.last_name,
            date_of_birth: patient.date_of_birth,
            address: patient.address.map(address_to_domain),
            phone: patient.phone,
        },
        prescriber: PrescriberInfo {
            id: prescriber.id,
            npi: prescriber.npi,
            dea: prescriber.dea,
            first_name: prescriber.first_name,
            last_name: prescriber.last_name,
            address: prescriber.address.map(address_to_domain),
            phone: prescriber.phone,
        },
        medication: MedicationInfo {
            ndc: medication.ndc,
            name: medication.name,
            quantity: medication.quantity,
            refills: medication.refills,
            dosage: medication.dosage,
            directions: medication.directions,
        },
        insurance: prescription.insurance.map(|i| InsuranceInfo {
            bin: i.bin,
            pcn: i.pcn,
            group_id: i.group_id,
            member_id: i.member_id,
            plan_name: i.plan_name,
        }),
    }
}
