//! heartrisk-cli: command-line and HTTP front-ends for `heartrisk_classifiers`.
pub mod input;
pub mod server;
