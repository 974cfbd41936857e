//! Command Line Interface (CLI) layer for SRPAIR.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) that turns flags, an optional JSON
//! config and Sentinel Hub credentials into one batch run of
//! `srpair::prepare_dataset`.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
