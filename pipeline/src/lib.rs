//! Part-number identification from photos.
//!
//! A multimodal inference service reads a candidate off the image, a second
//! pass validates it, and a targeted re-scan confirms it before it is
//! reformatted into the brand's canonical spacing. Every service call goes
//! through a [`dispatch::Dispatcher`] that paces requests, backs off on quota
//! errors and rotates credentials.
//!
//! # Example
//!
//! ```no_run
//! use partscan_gemini::{ClientConfig, CredentialPool, GeminiClient, ImagePayload};
//! use partscan_pipeline::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new(ClientConfig::default())?;
//! let credentials = CredentialPool::new(["key-a", "key-b"])?;
//! let catalog = BrandCatalog::load(None, None)?;
//!
//! let mut orchestrator = Orchestrator::for_brand(
//!     client,
//!     credentials,
//!     &catalog,
//!     "audi",
//!     PipelineConfig::default(),
//! );
//! let image = ImagePayload::from_bytes(std::fs::read("label.jpg")?);
//! let report = orchestrator.identify(&image).await?;
//! println!("{}", report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod brand;
pub mod candidate;
pub mod canonicalizer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod prompts;
pub mod protocol;
pub mod service;
pub mod session;
pub mod stages;

#[cfg(test)]
mod testing;

/// Common types for driving the pipeline.
pub mod prelude {
    pub use crate::brand::{BrandCatalog, BrandFormatSpec, BrandProfile, BrandPromptSpec};
    pub use crate::candidate::{Candidate, CandidateState, RejectedSet};
    pub use crate::canonicalizer::Canonicalizer;
    pub use crate::config::{PipelineConfig, RetryPolicy};
    pub use crate::error::{AttemptRecord, PipelineError, ServiceError};
    pub use crate::metrics::PipelineMetrics;
    pub use crate::orchestrator::{
        Identification, IdentificationReport, Orchestrator, Outcome, TerminalState,
    };
    pub use crate::service::InferenceService;
}
