use crate::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("record failed validation: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Record(#[from] rx_types::RecordError),

    #[error("wire message error: {0}")]
    Ncpdp(#[from] ncpdp::NcpdpError),

    #[error("invalid example library: {0}")]
    ExampleLibrary(String),

    #[error("example index {index} out of range (library has {len} examples)")]
    ExampleIndex { index: usize, len: usize },

    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),

    #[error("submission failed: {0}")]
    Submission(Box<dyn std::error::Error + Send + Sync>),
}

pub type IntakeResult<T> = std::result::Result<T, IntakeError>;
