//! Plain-text and JSON output for the command-line front end.

pub mod generator;

pub use generator::*;
