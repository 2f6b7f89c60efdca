//! okr-cli: command-line transport and formatting for okr.

pub mod cli;
pub mod output;
