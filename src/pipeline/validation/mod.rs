pub mod types;
pub mod prompt;
pub mod keywords;
pub mod grounding;
pub mod offline;
pub mod parser;
pub mod orchestrator;
pub mod report;

pub use types::*;
pub use prompt::*;
pub use offline::*;
pub use parser::*;
pub use orchestrator::*;
pub use report::*;

use thiserror::Error;

use crate::pipeline::llm::LlmError;

/// Failures of the API validation path. None of these reach the caller of
/// `GroundingValidator::validate`: each one routes to the offline path.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("No JSON object found in validator reply")]
    NoJsonObject,

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Validator reply missing required field '{0}'")]
    MissingField(&'static str),
}
