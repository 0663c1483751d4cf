//! heartrisk-classifiers: heart-disease risk modelling.
//!
//! This crate loads the tabular patient dataset, trains a standardized
//! logistic-regression pipeline with a cross-validated search over the
//! regularization strength, persists the fitted model with its training
//! metadata, and serves single-record predictions with a risk band.
//!
//! Everything the command-line front-end and the HTTP server need lives
//! here so both share one definition of the feature order, the decision
//! threshold and the on-disk artifact layout.
pub mod artifact;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod metrics;
pub mod model_selection;
pub mod models;
pub mod predict;
pub mod preprocessing;
pub mod training;

pub use error::{HeartError, Result};
