//! Shared state for the API layer.

use std::sync::Arc;

use crate::pipeline::validation::GroundingValidator;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub validator: Arc<GroundingValidator>,
}

impl ApiContext {
    pub fn new(validator: Arc<GroundingValidator>) -> Self {
        Self { validator }
    }
}
