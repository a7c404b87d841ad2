//! Constants used throughout the rx core crate.
//!
//! Validation messages are part of the public contract: callers display them next to the
//! offending field, so they are kept verbatim here.

/// Environment variable naming a YAML file that replaces the built-in example library.
pub const EXAMPLES_FILE_ENV: &str = "RX_EXAMPLES_FILE";

/// Environment variable holding a tracing filter directive for the `rx` binary.
pub const LOG_FILTER_ENV: &str = "RX_LOG";

/// Filter directive applied when [`LOG_FILTER_ENV`] is unset.
pub const DEFAULT_LOG_DIRECTIVE: &str = "rx=info";

/// A National Provider Identifier is exactly ten ASCII digits.
pub const NPI_PATTERN: &str = "^[0-9]{10}$";

pub const FIRST_NAME_REQUIRED: &str = "First name is required";
pub const LAST_NAME_REQUIRED: &str = "Last name is required";
pub const DATE_OF_BIRTH_REQUIRED: &str = "Date of birth is required";
pub const NPI_REQUIRED: &str = "NPI is required";
pub const NPI_FORMAT: &str = "NPI must be 10 digits";
pub const NDC_REQUIRED: &str = "NDC is required";
pub const MEDICATION_NAME_REQUIRED: &str = "Medication name is required";
pub const QUANTITY_POSITIVE: &str = "Quantity must be greater than 0";
