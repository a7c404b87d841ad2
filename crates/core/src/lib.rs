//! # rx Core
//!
//! Business logic for prescription intake.
//!
//! This crate contains pure data operations:
//! - the field rule catalog and record validator
//! - flattening worked examples into editable records, and the example library itself
//! - preparing validated records for submission to a downstream intake service
//!
//! **No transport concerns**: wire encoding lives in `ncpdp`, and delivering a message is
//! delegated to an [`IntakeSubmitter`] supplied by the caller.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod decode;
pub mod error;
pub mod intake;
pub mod library;
pub mod validation;

pub use catalog::{Constraint, FieldRule, FIELD_RULES};
pub use config::CoreConfig;
pub use decode::to_flat_record;
pub use error::{IntakeError, IntakeResult};
pub use intake::{
    encode, prepare_submission, submit, IntakeReceipt, IntakeRequest, IntakeSubmitter,
};
pub use library::ExampleLibrary;
pub use validation::{validate, validate_for_submission, ValidatedPrescription, ValidationErrors};
