//! `POST /api/validate`: ground a candidate answer against its report.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::validation::{
    ConversationTurn, ValidationMode, ValidationRequest, ValidationResult,
};

/// Wire shape of a validation request.
#[derive(Deserialize)]
pub struct ValidateRequestBody {
    pub llm_response: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    pub medical_report: String,
    #[serde(default)]
    pub rag_context: Option<String>,
    #[serde(default)]
    pub use_api: bool,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl From<ValidateRequestBody> for ValidationRequest {
    fn from(body: ValidateRequestBody) -> Self {
        ValidationRequest {
            llm_response: body.llm_response,
            conversation_history: body.conversation_history,
            medical_report: body.medical_report,
            rag_context: body.rag_context,
            mode: if body.use_api {
                ValidationMode::Api
            } else {
                ValidationMode::Offline
            },
            api_key: body.api_key,
        }
    }
}

/// Runs the (blocking) validator on the blocking pool.
pub async fn validate(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ValidateRequestBody>, JsonRejection>,
) -> Result<Json<ValidationResult>, ApiError> {
    let Json(body) = payload?;
    let request = ValidationRequest::from(body);
    let validator = Arc::clone(&ctx.validator);

    let result = tokio::task::spawn_blocking(move || validator.validate(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("Validation task failed: {e}")))?;

    Ok(Json(result))
}
