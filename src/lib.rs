pub mod catalog;
pub mod config;
pub mod derive;
pub mod error;
pub mod log_parser;
pub mod measurement;
pub mod orchestrator;
pub mod report;
pub mod runner;
pub mod tree;

pub use error::{Error, Result};
