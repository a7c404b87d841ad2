//! Worked-example library.
//!
//! A small set of complete reference prescriptions used to pre-populate the intake record.
//! The built-in set is compiled into the crate from `library/worked_examples.yaml`; a YAML
//! file of the same shape can replace it (see [`crate::CoreConfig`]).
//!
//! A library always holds at least one example.

use crate::config::CoreConfig;
use crate::{IntakeError, IntakeResult};
use rand::Rng;
use rx_types::CanonicalExampleRecord;
use serde::Deserialize;
use std::path::Path;

const BUILTIN_EXAMPLES: &str = include_str!("../library/worked_examples.yaml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LibraryFile {
    examples: Vec<CanonicalExampleRecord>,
}

#[derive(Clone, Debug)]
pub struct ExampleLibrary {
    examples: Vec<CanonicalExampleRecord>,
}

impl ExampleLibrary {
    /// The examples shipped with the crate.
    pub fn builtin() -> IntakeResult<Self> {
        Self::from_yaml(BUILTIN_EXAMPLES)
    }

    /// Parse a library from YAML text with a top-level `examples` list.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::ExampleLibrary`] if the text does not match the example shape or
    /// the list is empty.
    pub fn from_yaml(yaml_text: &str) -> IntakeResult<Self> {
        let file: LibraryFile = serde_yaml::from_str(yaml_text)
            .map_err(|e| IntakeError::ExampleLibrary(e.to_string()))?;

        if file.examples.is_empty() {
            return Err(IntakeError::ExampleLibrary(
                "library must contain at least one example".into(),
            ));
        }

        Ok(Self {
            examples: file.examples,
        })
    }

    /// Load a library from a YAML file.
    pub fn load(path: &Path) -> IntakeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(IntakeError::FileRead)?;
        let library = Self::from_yaml(&text)?;
        tracing::debug!(
            path = %path.display(),
            examples = library.len(),
            "loaded example library"
        );
        Ok(library)
    }

    /// The configured override if there is one, otherwise the built-in set.
    pub fn from_config(config: &CoreConfig) -> IntakeResult<Self> {
        match config.example_library() {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// A constructed library is never empty.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn get(&self, index: usize) -> IntakeResult<&CanonicalExampleRecord> {
        self.examples.get(index).ok_or(IntakeError::ExampleIndex {
            index,
            len: self.examples.len(),
        })
    }

    /// Pick one example uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &CanonicalExampleRecord {
        &self.examples[rng.gen_range(0..self.examples.len())]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalExampleRecord> + '_ {
        self.examples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    const ONE_EXAMPLE: &str = r#"
examples:
  - patient:
      id: PAT900
      firstName: Ann
      lastName: Lee
      dateOfBirth: "1990-01-01"
    prescriber:
      id: PRES900
      npi: "1112223334"
      firstName: Bo
      lastName: Ng
    medication:
      ndc: "00000-0000-00"
      name: Test
      quantity: 3
"#;

    #[test]
    fn builtin_library_has_five_examples() {
        let library = ExampleLibrary::builtin().expect("builtin library parses");
        assert_eq!(library.len(), 5);
        assert!(!library.is_empty());

        let ids: Vec<_> = library.iter().map(|e| e.patient.id.as_str()).collect();
        assert_eq!(ids, ["PAT001", "PAT002", "PAT003", "PAT004", "PAT005"]);
    }

    #[test]
    fn builtin_first_example_matches_reference_values() {
        let library = ExampleLibrary::builtin().expect("builtin library parses");
        let first = library.get(0).expect("first example");
        assert_eq!(first.prescriber.npi, "1234567890");
        assert_eq!(first.medication.ndc, "00002-7510-02");
        assert_eq!(first.medication.quantity, 2);
        assert_eq!(first.medication.refills, Some(3));
        assert_eq!(first.date_written.as_deref(), Some("2024-01-15"));
        let insurance = first.insurance.as_ref().expect("insurance");
        assert_eq!(insurance.bin.as_deref(), Some("004682"));
        assert_eq!(insurance.group_id, None);
    }

    #[test]
    fn get_out_of_range_is_an_error() {
        let library = ExampleLibrary::builtin().expect("builtin library parses");
        assert!(matches!(
            library.get(5),
            Err(IntakeError::ExampleIndex { index: 5, len: 5 })
        ));
    }

    #[test]
    fn choose_is_reproducible_with_a_seeded_rng() {
        let library = ExampleLibrary::builtin().expect("builtin library parses");
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            library.choose(&mut rng).patient.id.clone()
        };
        assert_eq!(pick(7), pick(7));
        for seed in 0..20 {
            assert!(library.iter().any(|e| e.patient.id == pick(seed)));
        }
    }

    #[test]
    fn empty_library_is_rejected() {
        let err = ExampleLibrary::from_yaml("examples: []\n").expect_err("empty library");
        assert!(matches!(err, IntakeError::ExampleLibrary(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = ONE_EXAMPLE.replace("name: Test", "name: Test\n      strength: high");
        assert!(ExampleLibrary::from_yaml(&text).is_err());
    }

    #[test]
    fn load_reads_a_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(ONE_EXAMPLE.as_bytes()).expect("write yaml");

        let library = ExampleLibrary::load(file.path()).expect("load library");
        assert_eq!(library.len(), 1);
        let example = library.get(0).expect("example");
        assert_eq!(example.patient.id, "PAT900");
        assert_eq!(example.insurance, None);
    }

    #[test]
    fn load_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = ExampleLibrary::load(&dir.path().join("absent.yaml")).expect_err("missing file");
        assert!(matches!(err, IntakeError::FileRead(_)));
    }
}
