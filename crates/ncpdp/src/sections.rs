//! Conditional section views over a flat record.
//!
//! The wire message includes an `Address` block for a party, and the `Insurance` block, only
//! when at least one of their fields is non-empty. Whitespace counts as content here. Each block is modelled as a borrowed view
//! with a single inclusion predicate, evaluated once per render.

use rx_types::FlatPrescriptionRecord;

/// Returns `value` unless it is the empty string.
///
/// Empty optional values are treated as absent throughout rendering. A whitespace-only
/// value is present and emitted as-is.
pub fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Street, city, state and zip code of one party.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressFields<'a> {
    pub street: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub zip_code: &'a str,
}

impl<'a> AddressFields<'a> {
    pub fn patient(record: &'a FlatPrescriptionRecord) -> Self {
        Self {
            street: &record.patient_street,
            city: &record.patient_city,
            state: &record.patient_state,
            zip_code: &record.patient_zip_code,
        }
    }

    pub fn prescriber(record: &'a FlatPrescriptionRecord) -> Self {
        Self {
            street: &record.prescriber_street,
            city: &record.prescriber_city,
            state: &record.prescriber_state,
            zip_code: &record.prescriber_zip_code,
        }
    }

    /// Whether the `Address` block is emitted.
    pub fn is_present(&self) -> bool {
        [self.street, self.city, self.state, self.zip_code]
            .into_iter()
            .any(|v| !v.is_empty())
    }
}

/// The five insurance routing fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsuranceFields<'a> {
    pub bin: &'a str,
    pub pcn: &'a str,
    pub group_id: &'a str,
    pub member_id: &'a str,
    pub plan_name: &'a str,
}

impl<'a> InsuranceFields<'a> {
    pub fn from_record(record: &'a FlatPrescriptionRecord) -> Self {
        Self {
            bin: &record.insurance_bin,
            pcn: &record.insurance_pcn,
            group_id: &record.insurance_group_id,
            member_id: &record.insurance_member_id,
            plan_name: &record.insurance_plan_name,
        }
    }

    /// Whether the `Insurance` block is emitted.
    pub fn is_present(&self) -> bool {
        [
            self.bin,
            self.pcn,
            self.group_id,
            self.member_id,
            self.plan_name,
        ]
        .into_iter()
        .any(|v| !v.is_empty())
    }
}
