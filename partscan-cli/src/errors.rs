use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the `partscan` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// The identification pipeline failed.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] partscan_pipeline::error::PipelineError),

    /// Client or credential setup failed.
    #[error("Gemini error: {0}")]
    Gemini(#[from] partscan_gemini::GeminiError),

    /// An image file could not be read.
    #[error("Cannot read image {path}: {source}")]
    Image {
        /// The offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// An image file was empty.
    #[error("Image {0} is empty")]
    EmptyImage(PathBuf),

    /// Invalid command-line arguments.
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// A batch worker panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// JSON output could not be produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
