//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core operations,
//! so nothing in the crate reads process-wide environment variables while working.

use crate::{IntakeError, IntakeResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug, Default)]
pub struct CoreConfig {
    example_library: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `example_library`, when given, replaces the built-in worked examples and must be an
    /// existing file.
    pub fn new(example_library: Option<PathBuf>) -> IntakeResult<Self> {
        Ok(Self {
            example_library: resolve_example_library(example_library)?,
        })
    }

    pub fn example_library(&self) -> Option<&Path> {
        self.example_library.as_deref()
    }
}

/// Resolve the example library override without reading environment variables.
///
/// `None` and blank paths mean "use the built-in library". Any other value must name an
/// existing regular file.
pub fn resolve_example_library(override_path: Option<PathBuf>) -> IntakeResult<Option<PathBuf>> {
    let Some(path) = override_path.filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
    else {
        return Ok(None);
    };

    if !path.is_file() {
        return Err(IntakeError::InvalidInput(format!(
            "example library override is not a file: {}",
            path.display()
        )));
    }
    Ok(Some(path))
}
