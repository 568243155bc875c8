//! API error responses
//!
//! Every failure is rendered as `{ "error", "code", "redirect" }`. `redirect` names
//! the endpoint that shows the authoritative state when reloading it resolves the
//! error.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use duel_core::battle::BattleStatus;
use duel_core::BattleError;

use crate::service::ServiceError;

pub const GET_BATTLE_STATE: &str = "/wizard.BattleService/GetBattleState";
pub const GET_BATTLE_RESULT: &str = "/wizard.BattleService/GetBattleResult";

#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// Missing or malformed `x-player-id`
    Unauthenticated(&'static str),
    BadRequest(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub redirect: Option<&'static str>,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<BattleError> for ApiError {
    fn from(err: BattleError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn status_of(err: &BattleError) -> StatusCode {
    match err {
        BattleError::NotFound { .. } => StatusCode::NOT_FOUND,
        BattleError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
        BattleError::InvalidTarget { .. } => StatusCode::BAD_REQUEST,
        BattleError::InvalidState { .. }
        | BattleError::NotYourTurn { .. }
        | BattleError::SpellNotOwned { .. }
        | BattleError::ChallengeExists { .. }
        | BattleError::StaleStateConflict { .. } => StatusCode::CONFLICT,
    }
}

/// Where the caller should look to see the battle as it really is
pub fn redirect_for(err: &BattleError) -> Option<&'static str> {
    match err {
        BattleError::InvalidState { actual, .. } => match actual {
            BattleStatus::Finished => Some(GET_BATTLE_RESULT),
            BattleStatus::Active => Some(GET_BATTLE_STATE),
            BattleStatus::Pending => None,
        },
        BattleError::NotYourTurn { .. } | BattleError::StaleStateConflict { .. } => {
            Some(GET_BATTLE_STATE)
        }
        _ => None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Service(ServiceError::Battle(err)) => (
                status_of(&err),
                ErrorBody {
                    error: err.to_string(),
                    code: err.code(),
                    redirect: redirect_for(&err),
                },
            ),
            ApiError::Service(ServiceError::Storage(err)) => {
                error!(error = %err, "Storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "storage unavailable".to_string(),
                        code: "STORAGE_ERROR",
                        redirect: None,
                    },
                )
            }
            ApiError::Unauthenticated(reason) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: reason.to_string(),
                    code: "UNAUTHENTICATED",
                    redirect: None,
                },
            ),
            ApiError::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: reason,
                    code: "BAD_REQUEST",
                    redirect: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}
