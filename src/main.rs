use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ncpdp::PrescriptionMessage;
use rx_core::constants::{DEFAULT_LOG_DIRECTIVE, EXAMPLES_FILE_ENV, LOG_FILTER_ENV};
use rx_core::{CoreConfig, ExampleLibrary, IntakeError};
use rx_types::FlatPrescriptionRecord;

#[derive(Parser)]
#[command(name = "rx")]
#[command(about = "Prescription intake: validate, encode and inspect NCPDP messages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an empty record with today's date written
    Blank {
        /// Date written (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Validate a JSON record and print any field errors, grouped by form section
    Validate {
        /// Path to a JSON record
        file: PathBuf,
    },
    /// Encode a JSON record as an NCPDP XML message
    Encode {
        /// Path to a JSON record
        file: PathBuf,
        /// Encode even if the record fails validation
        #[arg(long)]
        skip_validation: bool,
    },
    /// Print a worked example as a JSON record
    Example {
        /// Example position in the library (random when omitted)
        #[arg(long)]
        index: Option<usize>,
    },
    /// Parse an NCPDP XML message and print it as JSON
    Parse {
        /// Path to an XML message
        file: PathBuf,
    },
}

/// Entry point for the `rx` command-line tool.
///
/// # Environment Variables
/// - `RX_LOG`: tracing filter directive (default: "rx=info")
/// - `RX_EXAMPLES_FILE`: YAML file replacing the built-in worked examples
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = match EnvFilter::try_from_env(LOG_FILTER_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::default().add_directive(DEFAULT_LOG_DIRECTIVE.parse()?),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let now = Utc::now();

    match cli.command {
        Commands::Blank { date } => {
            let record = FlatPrescriptionRecord::blank(date.unwrap_or_else(|| now.date_naive()));
            print_json(&record)?;
        }
        Commands::Validate { file } => {
            let record = read_record(&file)?;
            let errors = rx_core::validate(&record);
            if errors.is_empty() {
                println!("{} is valid", file.display());
            } else {
                print_json(&errors.by_section())?;
                anyhow::bail!("{} has {} invalid field(s)", file.display(), errors.len());
            }
        }
        Commands::Encode {
            file,
            skip_validation,
        } => {
            let record = read_record(&file)?;
            let payload = if skip_validation {
                rx_core::encode(&record, now)?
            } else {
                match rx_core::prepare_submission(&record, now) {
                    Ok(request) => request.payload,
                    Err(IntakeError::Validation(errors)) => {
                        print_json(&errors)?;
                        anyhow::bail!("refusing to encode an invalid record");
                    }
                    Err(e) => return Err(e.into()),
                }
            };
            println!("{payload}");
        }
        Commands::Example { index } => {
            let config = CoreConfig::new(std::env::var_os(EXAMPLES_FILE_ENV).map(PathBuf::from))?;
            let library = ExampleLibrary::from_config(&config)?;
            let example = match index {
                Some(index) => library.get(index)?,
                None => library.choose(&mut rand::thread_rng()),
            };
            tracing::info!(patient_id = %example.patient.id, "selected worked example");
            print_json(&rx_core::to_flat_record(example, now.date_naive()))?;
        }
        Commands::Parse { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let parsed = PrescriptionMessage::parse(&text)?;
            print_json(&serde_json::json!({
                "dedupKey": parsed.dedup_key(),
                "prescription": parsed,
            }))?;
        }
    }

    Ok(())
}

fn read_record(path: &Path) -> anyhow::Result<FlatPrescriptionRecord> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let record = FlatPrescriptionRecord::from_json(&text)
        .with_context(|| format!("parsing record {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        date_written = %record.date_written,
        "loaded record"
    );
    Ok(record)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
