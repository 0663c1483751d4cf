use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use heartrisk_classifiers::artifact::ArtifactStore;
use heartrisk_classifiers::evaluate::evaluate_model;
use heartrisk_classifiers::predict::make_prediction;
use heartrisk_classifiers::training::train;
use heartrisk_cli::input::{config_from_arguments, patient_from_arguments};
use heartrisk_cli::server::{self, AppState};

fn feature_arg(id: &'static str, long: &'static str, help: &'static str, integer: bool) -> Arg {
    let arg = Arg::new(id)
        .long(long)
        .help(help)
        .required(true)
        .allow_negative_numbers(true);
    if integer {
        arg.value_parser(clap::value_parser!(i64))
    } else {
        arg.value_parser(clap::value_parser!(f64))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("HEARTRISK_LOG", "error,heartrisk=info"))
        .init();

    let matches = Command::new("heartrisk")
        .version(clap::crate_version!())
        .about("Heart disease risk model: train, evaluate, predict and serve")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Path to a JSON pipeline configuration. Missing fields take default values.")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .global(true)
                .help("Path to the dataset (*.csv or *.tsv). Overrides the configuration file.")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .global(true)
                .help("Path of the model artifact. Overrides the configuration file.")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("metadata")
                .long("metadata")
                .global(true)
                .help("Path of the training metadata JSON. Overrides the configuration file.")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .subcommand(
            Command::new("train")
                .about("Train the model with a cross-validated grid search and save it"),
        )
        .subcommand(
            Command::new("evaluate")
                .about("Score the saved model on the full dataset and show its metadata"),
        )
        .subcommand(
            Command::new("predict")
                .about("Run a single prediction with the trained model")
                .arg(feature_arg("age", "age", "Age in years", false))
                .arg(feature_arg("sex", "sex", "Sex code (0 = male, 1 = female)", true))
                .arg(feature_arg("chest_pain", "chest-pain", "Chest pain type code", true))
                .arg(feature_arg(
                    "blood_pressure",
                    "blood-pressure",
                    "Resting blood pressure (mm Hg)",
                    false,
                ))
                .arg(feature_arg("cholesterol", "cholesterol", "Serum cholesterol (mg/dl)", false))
                .arg(feature_arg("max_hr", "max-hr", "Maximum heart rate achieved", false))
                .arg(feature_arg(
                    "st_depression",
                    "st-depression",
                    "ST depression induced by exercise",
                    false,
                )),
        )
        .subcommand(
            Command::new("serve")
                .about("Serve the prediction API and web form over HTTP")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .help("Address to bind")
                        .default_value("127.0.0.1")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .help("Port to listen on")
                        .default_value("8000")
                        .value_parser(clap::value_parser!(u16)),
                ),
        )
        .get_matches();

    let outcome = match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("evaluate", sub_m)) => handle_evaluate(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        Some(("serve", sub_m)) => handle_serve(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    };

    if let Err(e) = outcome {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config = config_from_arguments(matches)?;
    log::info!("Training on {}", config.data_path.display());
    let outcome = train(&config).context("Training failed")?;
    log::info!(
        "Model written to {} (test ROC-AUC {:.4})",
        outcome.model_path.display(),
        outcome.test_roc_auc
    );
    Ok(())
}

fn handle_evaluate(matches: &ArgMatches) -> Result<()> {
    let config = config_from_arguments(matches)?;
    evaluate_model(&config).context("Evaluation failed")?;
    Ok(())
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let config = config_from_arguments(matches)?;
    let patient = patient_from_arguments(matches)?;
    let store = ArtifactStore::from_config(&config);

    let (label, proba) = make_prediction(&store, &patient.to_array()).context("Prediction failed")?;
    println!("Predicted label: {}", label);
    println!("Positive class probability: {:.4}", proba);
    Ok(())
}

fn handle_serve(matches: &ArgMatches) -> Result<()> {
    let config = config_from_arguments(matches)?;
    let host = matches
        .get_one::<String>("host")
        .context("Missing --host")?;
    let port = *matches.get_one::<u16>("port").context("Missing --port")?;
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let state = Arc::new(AppState::new(ArtifactStore::from_config(&config)));
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?
        .block_on(server::serve(addr, state))
}
