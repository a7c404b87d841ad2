//! Field rule catalog.
//!
//! A static table from record field to the constraints that field must satisfy. The
//! validator walks this table; nothing else in the crate hard-codes which fields are
//! required. Fields absent from the table are optional and unconstrained.
//!
//! Constraints on one field are ordered. `Required` comes first; the remaining constraints
//! only see non-blank values, so a field reports at most one message.

use crate::constants::{
    DATE_OF_BIRTH_REQUIRED, FIRST_NAME_REQUIRED, LAST_NAME_REQUIRED, MEDICATION_NAME_REQUIRED,
    NDC_REQUIRED, NPI_FORMAT, NPI_PATTERN, NPI_REQUIRED, QUANTITY_POSITIVE,
};
use regex::Regex;
use rx_types::{Quantity, RecordField};
use std::sync::LazyLock;

static NPI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NPI_PATTERN).expect("NPI pattern is a valid regex"));

/// A single check applied to a field's text.
#[derive(Clone, Copy, Debug)]
pub enum Constraint {
    /// The value must contain a non-whitespace character.
    Required { message: &'static str },
    /// The raw value must match the expression.
    Pattern {
        regex: &'static LazyLock<Regex>,
        message: &'static str,
    },
    /// The trimmed value must be a whole number greater than zero.
    PositiveInteger { message: &'static str },
}

impl Constraint {
    pub fn message(&self) -> &'static str {
        match self {
            Constraint::Required { message }
            | Constraint::Pattern { message, .. }
            | Constraint::PositiveInteger { message } => *message,
        }
    }

    /// Whether a non-blank `value` satisfies this constraint.
    fn accepts(&self, value: &str) -> bool {
        match self {
            Constraint::Required { .. } => !value.trim().is_empty(),
            Constraint::Pattern { regex, .. } => regex.is_match(value),
            Constraint::PositiveInteger { .. } => Quantity::parse(value).is_ok(),
        }
    }
}

/// The constraints for one field, in evaluation order.
#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub field: RecordField,
    pub constraints: &'static [Constraint],
}

impl FieldRule {
    /// The message of the first constraint `value` fails, if any.
    pub fn check(&self, value: &str) -> Option<&'static str> {
        let blank = value.trim().is_empty();
        for constraint in self.constraints {
            match constraint {
                Constraint::Required { message } if blank => return Some(*message),
                Constraint::Required { .. } => {}
                _ if blank => return None,
                other if !other.accepts(value) => return Some(other.message()),
                _ => {}
            }
        }
        None
    }
}

const fn required(message: &'static str) -> Constraint {
    Constraint::Required { message }
}

/// Every constrained field, in form order.
pub static FIELD_RULES: [FieldRule; 9] = [
    FieldRule {
        field: RecordField::PatientFirstName,
        constraints: &[required(FIRST_NAME_REQUIRED)],
    },
    FieldRule {
        field: RecordField::PatientLastName,
        constraints: &[required(LAST_NAME_REQUIRED)],
    },
    FieldRule {
        field: RecordField::PatientDateOfBirth,
        constraints: &[required(DATE_OF_BIRTH_REQUIRED)],
    },
    FieldRule {
        field: RecordField::PrescriberNpi,
        constraints: &[
            required(NPI_REQUIRED),
            Constraint::Pattern {
                regex: &NPI_REGEX,
                message: NPI_FORMAT,
            },
        ],
    },
    FieldRule {
        field: RecordField::PrescriberFirstName,
        constraints: &[required(FIRST_NAME_REQUIRED)],
    },
    FieldRule {
        field: RecordField::PrescriberLastName,
        constraints: &[required(LAST_NAME_REQUIRED)],
    },
    FieldRule {
        field: RecordField::MedicationNdc,
        constraints: &[required(NDC_REQUIRED)],
    },
    FieldRule {
        field: RecordField::MedicationName,
        constraints: &[required(MEDICATION_NAME_REQUIRED)],
    },
    FieldRule {
        field: RecordField::MedicationQuantity,
        constraints: &[
            required(QUANTITY_POSITIVE),
            Constraint::PositiveInteger {
                message: QUANTITY_POSITIVE,
            },
        ],
    },
];

/// The rule for `field`, or `None` if the field is unconstrained.
pub fn rule_for(field: RecordField) -> Option<&'static FieldRule> {
    FIELD_RULES.iter().find(|rule| rule.field == field)
}
