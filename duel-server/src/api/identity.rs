//! Caller identity from the session layer

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use duel_core::model::PlayerId;

use super::error::ApiError;

/// Header set by the session layer in front of this server
pub const PLAYER_ID_HEADER: &str = "x-player-id";

/// The authenticated player making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerIdentity(pub PlayerId);

impl<S> FromRequestParts<S> for PlayerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(PLAYER_ID_HEADER)
            .ok_or(ApiError::Unauthenticated("missing x-player-id header"))?;

        raw.to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(|id| PlayerIdentity(PlayerId(id)))
            .ok_or(ApiError::Unauthenticated("malformed x-player-id header"))
    }
}
