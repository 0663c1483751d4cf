use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use heartrisk_classifiers::config::{load_config, PipelineConfig};
use heartrisk_classifiers::features::PatientRecord;

/// Resolve the pipeline configuration for a subcommand.
///
/// Starts from the JSON file given with `--config` (or the built-in defaults)
/// and applies the `--data`, `--model` and `--metadata` overrides.
pub fn config_from_arguments(matches: &ArgMatches) -> Result<PipelineConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            log::info!("Using config: {:?}", path);
            load_config(path)
                .with_context(|| format!("Failed to load config file: {:?}", path))?
        }
        None => {
            log::debug!("No config provided; using defaults.");
            PipelineConfig::default()
        }
    };

    if let Some(data) = matches.get_one::<PathBuf>("data") {
        validate_tsv_or_csv_file(data)?;
        config.data_path = data.clone();
    }
    if let Some(model) = matches.get_one::<PathBuf>("model") {
        config.model_path = model.clone();
    }
    if let Some(metadata) = matches.get_one::<PathBuf>("metadata") {
        config.metadata_path = metadata.clone();
    }

    Ok(config)
}

/// Build a patient record from the `predict` subcommand flags.
pub fn patient_from_arguments(matches: &ArgMatches) -> Result<PatientRecord> {
    let float = |name: &str| -> Result<f64> {
        matches
            .get_one::<f64>(name)
            .copied()
            .with_context(|| format!("Missing required argument --{}", name.replace('_', "-")))
    };
    let code = |name: &str| -> Result<f64> {
        matches
            .get_one::<i64>(name)
            .map(|v| *v as f64)
            .with_context(|| format!("Missing required argument --{}", name.replace('_', "-")))
    };

    Ok(PatientRecord {
        age: float("age")?,
        sex: code("sex")?,
        chest_pain: code("chest_pain")?,
        blood_pressure: float("blood_pressure")?,
        cholesterol: float("cholesterol")?,
        max_hr: float("max_hr")?,
        st_depression: float("st_depression")?,
    })
}

/// Dataset files must be `.csv` or `.tsv` and exist on disk.
pub fn validate_tsv_or_csv_file(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path.display()),
    }

    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }

    Ok(())
}
