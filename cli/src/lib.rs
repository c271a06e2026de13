//! Semsearch command-line front end
//!
//! Runs the full pipeline once: load a model, embed a corpus, index it,
//! embed the query and print the nearest entries.

pub mod error;
pub mod pipeline;

pub use error::{CliError, CliResult};
pub use pipeline::{list_models, read_corpus, render, run, Args, Report};
