//! ChallengeService: challenge lifecycle endpoints
//!
//! Endpoints:
//! - POST /wizard.ChallengeService/CreateChallenge
//! - POST /wizard.ChallengeService/RespondToChallenge
//! - POST /wizard.ChallengeService/CancelChallenge

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use duel_core::battle::BattleSnapshot;
use duel_core::model::{BattleId, PlayerId};

use super::error::ApiError;
use super::identity::PlayerIdentity;
use super::{track, ApiState};
use crate::service::{ChallengeResolution, ChallengeResponse};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/wizard.ChallengeService/CreateChallenge", post(create_challenge))
        .route("/wizard.ChallengeService/RespondToChallenge", post(respond_to_challenge))
        .route("/wizard.ChallengeService/CancelChallenge", post(cancel_challenge))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct CreateChallengeRequest {
    pub opponent_id: PlayerId,
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub battle_id: BattleId,
    pub action: ChallengeResponse,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub battle_id: BattleId,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub battle_id: BattleId,
    pub cancelled: bool,
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_challenge(
    State(state): State<ApiState>,
    PlayerIdentity(player): PlayerIdentity,
    payload: Result<Json<CreateChallengeRequest>, JsonRejection>,
) -> Result<Json<BattleSnapshot>, ApiError> {
    let Json(req) = payload?;
    let battle = track(
        &state,
        state.challenges.create_challenge(player, req.opponent_id).await,
    )?;
    state.metrics.record_challenge();
    Ok(Json(BattleSnapshot::from(&battle)))
}

async fn respond_to_challenge(
    State(state): State<ApiState>,
    PlayerIdentity(player): PlayerIdentity,
    payload: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<ChallengeResolution>, ApiError> {
    let Json(req) = payload?;
    let resolution = track(
        &state,
        state.challenges.respond(req.battle_id, player, req.action).await,
    )?;
    Ok(Json(resolution))
}

async fn cancel_challenge(
    State(state): State<ApiState>,
    PlayerIdentity(player): PlayerIdentity,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<CancelResponse>, ApiError> {
    let Json(req) = payload?;
    track(&state, state.challenges.cancel(req.battle_id, player).await)?;
    Ok(Json(CancelResponse {
        battle_id: req.battle_id,
        cancelled: true,
    }))
}
