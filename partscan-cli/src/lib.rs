//! Library half of the `partscan` binary: argument handling, image loading
//! and the parallel batch runner.

/// Parallel processing of many images.
pub mod batch;
/// Error types for the binary.
pub mod errors;
/// Reading image files.
pub mod images;
/// Flags shared by all subcommands.
pub mod settings;

pub use errors::CliError;
