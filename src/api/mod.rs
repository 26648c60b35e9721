//! HTTP surface for the grounding validator.
//!
//! Routes are nested under `/api/`. The summarization backend (or the SPA)
//! posts a candidate answer with its grounding material and gets back a
//! `ValidationResult`.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer, ApiSession};
pub use types::ApiContext;
