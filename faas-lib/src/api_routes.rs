//! Handlers for the invoker's three HTTP routes: submit an activation,
//! liveness, and pool gauges. Errors are reported as a `{error, code}`
//! JSON body.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use faas_common::ActivationMessage;
use serde::Serialize;
use tracing::{error, instrument};

use crate::api_server::ApiState;

#[derive(Serialize)]
pub(crate) struct ApiError {
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code.as_str() {
            "action_not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(self)).into_response()
    }
}

impl From<faas_orchestrator::Error> for ApiError {
    fn from(err: faas_orchestrator::Error) -> Self {
        let code = match err {
            faas_orchestrator::Error::ActionNotFound(_) => "action_not_found",
            faas_orchestrator::Error::RegistryPoisoned => "internal",
        };
        Self {
            error: err.to_string(),
            code: code.to_string(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct SubmitResponse {
    activation_id: uuid::Uuid,
    accepted: bool,
}

#[instrument(skip(state, activation), fields(action = %activation.action.qualified_name()))]
pub(crate) async fn submit_activation_handler(
    State(state): State<ApiState>,
    Json(activation): Json<ActivationMessage>,
) -> Result<impl IntoResponse, ApiError> {
    let activation_id = activation.activation_id;
    state.orchestrator.submit_activation(activation).map_err(|err| {
        error!(%err, "activation rejected");
        ApiError::from(err)
    })?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            activation_id,
            accepted: true,
        }),
    ))
}

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

pub(crate) async fn metrics_pool_handler(State(state): State<ApiState>) -> impl IntoResponse {
    match state.pool.snapshot().await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
