use axum::{body::Bytes, extract::State, Json};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::api::{state::AppState, types::PredictResponse};
use crate::error::{Result, ServeError, ValidationError};

/// POST /predict
///
/// The body is parsed as JSON whatever the declared content type.
pub async fn predict(State(state): State<AppState>, body: Bytes) -> Result<Json<PredictResponse>> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let features = extract_features(&body)?;
    let frame = state.layout.assemble(&features)?;

    let model = Arc::clone(&state.model);
    let prediction = tokio::task::spawn_blocking(move || model.predict(&frame))
        .await
        .map_err(|e| ServeError::Internal(format!("inference task failed: {e}")))??;

    debug!(
        %request_id,
        elapsed_us = started.elapsed().as_micros() as u64,
        outputs = prediction.len(),
        "prediction served"
    );

    Ok(Json(PredictResponse { prediction }))
}

/// Pull the `features` value out of a raw request body.
pub fn extract_features(body: &[u8]) -> Result<Value> {
    let mut payload: Value =
        serde_json::from_slice(body).map_err(|e| ServeError::MalformedBody(e.to_string()))?;
    let fields = payload
        .as_object_mut()
        .ok_or_else(|| ValidationError::WrongType {
            field: "body".to_string(),
            expected: "a JSON object",
        })?;
    fields
        .remove("features")
        .ok_or_else(|| ValidationError::MissingField("features".to_string()).into())
}
