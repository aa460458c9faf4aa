//! Failures inside one founder's unit of work
//!
//! None of these leave the orchestrator as errors; they are turned into
//! [`radar_core::PipelineError`] records or `StageOutput::Failed` values.

use radar_core::RadarError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineFailure {
    #[error("{0}")]
    Core(#[from] RadarError),

    #[error("Research produced no usable content for {founder}")]
    EmptyDossier { founder: String },

    #[error("Founder unit panicked: {message}")]
    Panicked { message: String },

    #[error("Prompt template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PipelineResult<T> = Result<T, PipelineFailure>;
