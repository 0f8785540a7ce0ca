//! CLI module for the `themes` command-line interface.
//!
//! Commands read documents from a file, run the clustering pipeline
//! in-process and print the result as text or JSON.

mod commands;
mod input;
mod output;

pub use commands::*;
