//! BattleService: moves, live state and results
//!
//! Endpoints:
//! - POST /wizard.BattleService/ApplyMove
//! - POST /wizard.BattleService/GetBattleState
//! - POST /wizard.BattleService/GetBattleResult

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::Deserialize;

use duel_core::model::{BattleId, SpellId};

use super::error::ApiError;
use super::identity::PlayerIdentity;
use super::{track, ApiState};
use crate::service::{BattleResultView, BattleView, MoveReport};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/wizard.BattleService/ApplyMove", post(apply_move))
        .route("/wizard.BattleService/GetBattleState", post(get_battle_state))
        .route("/wizard.BattleService/GetBattleResult", post(get_battle_result))
}

#[derive(Deserialize)]
pub struct ApplyMoveRequest {
    pub battle_id: BattleId,
    pub spell_id: SpellId,
}

#[derive(Deserialize)]
pub struct BattleRequest {
    pub battle_id: BattleId,
}

async fn apply_move(
    State(state): State<ApiState>,
    PlayerIdentity(player): PlayerIdentity,
    payload: Result<Json<ApplyMoveRequest>, JsonRejection>,
) -> Result<Json<MoveReport>, ApiError> {
    let Json(req) = payload?;
    let report = track(
        &state,
        state.engine.apply_move(req.battle_id, player, req.spell_id).await,
    )?;
    state
        .metrics
        .record_move(report.settlement.is_some(), report.achievements.len());
    Ok(Json(report))
}

async fn get_battle_state(
    State(state): State<ApiState>,
    PlayerIdentity(player): PlayerIdentity,
    payload: Result<Json<BattleRequest>, JsonRejection>,
) -> Result<Json<BattleView>, ApiError> {
    let Json(req) = payload?;
    let view = track(&state, state.engine.get_state(req.battle_id, player).await)?;
    Ok(Json(view))
}

async fn get_battle_result(
    State(state): State<ApiState>,
    PlayerIdentity(player): PlayerIdentity,
    payload: Result<Json<BattleRequest>, JsonRejection>,
) -> Result<Json<BattleResultView>, ApiError> {
    let Json(req) = payload?;
    let result = track(&state, state.engine.get_result(req.battle_id, player).await)?;
    Ok(Json(result))
}
