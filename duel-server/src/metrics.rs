//! Server Metrics: request and battle counters with Prometheus + JSON export
//!
//! Uses lock-free atomics for all counters. No external metrics crate needed.
//!
//! ## Endpoints
//! - `GET /metrics`: Prometheus text format
//! - `GET /metrics/json`: JSON format

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::api::ApiState;

/// Shared metrics state (all lock-free atomics)
#[derive(Debug)]
pub struct ServerMetrics {
    /// Total HTTP requests served
    pub total_requests: AtomicU64,
    /// Total request errors (4xx + 5xx)
    pub total_errors: AtomicU64,
    /// Cumulative request duration in microseconds (for computing average)
    pub total_duration_us: AtomicU64,
    pub challenges_created: AtomicU64,
    pub moves_applied: AtomicU64,
    pub battles_finished: AtomicU64,
    /// Conditional writes that lost a race
    pub stale_conflicts: AtomicU64,
    pub achievements_awarded: AtomicU64,
    /// Server start time (for uptime calculation)
    pub start_time: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            total_duration_us: AtomicU64::new(0),
            challenges_created: AtomicU64::new(0),
            moves_applied: AtomicU64::new(0),
            battles_finished: AtomicU64::new(0),
            stale_conflicts: AtomicU64::new(0),
            achievements_awarded: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl ServerMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, duration_us: u64, is_error: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_duration_us.fetch_add(duration_us, Ordering::Relaxed);
        if is_error {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_challenge(&self) {
        self.challenges_created.fetch_add(1, Ordering::Relaxed);
    }

    /// One applied move; `finished` and `achievements` describe its side effects
    pub fn record_move(&self, finished: bool, achievements: usize) {
        self.moves_applied.fetch_add(1, Ordering::Relaxed);
        if finished {
            self.battles_finished.fetch_add(1, Ordering::Relaxed);
        }
        self.achievements_awarded
            .fetch_add(achievements as u64, Ordering::Relaxed);
    }

    pub fn record_stale_conflict(&self) {
        self.stale_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn requests_per_second(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed) as f64;
        let uptime = self.uptime_secs();
        if uptime > 0.0 { total / uptime } else { 0.0 }
    }

    pub fn avg_duration_ms(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        let dur_us = self.total_duration_us.load(Ordering::Relaxed);
        if total > 0 {
            (dur_us as f64 / total as f64) / 1000.0
        } else {
            0.0
        }
    }
}

// ============================================================================
// Axum Middleware: Automatic request tracking
// ============================================================================

/// Middleware that records request count and duration for every HTTP request.
pub async fn metrics_middleware(
    State(state): State<ApiState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let resp = next.run(req).await;
    let duration_us = start.elapsed().as_micros() as u64;
    let is_error = resp.status().is_client_error() || resp.status().is_server_error();

    state.metrics.record_request(duration_us, is_error);
    resp
}

// ============================================================================
// GET /metrics: Prometheus text exposition format
// ============================================================================

pub async fn prometheus_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let m = &state.metrics;
    let total_requests = m.total_requests.load(Ordering::Relaxed);
    let total_errors = m.total_errors.load(Ordering::Relaxed);
    let challenges = m.challenges_created.load(Ordering::Relaxed);
    let moves = m.moves_applied.load(Ordering::Relaxed);
    let finished = m.battles_finished.load(Ordering::Relaxed);
    let stale = m.stale_conflicts.load(Ordering::Relaxed);
    let achievements = m.achievements_awarded.load(Ordering::Relaxed);
    let uptime = m.uptime_secs();
    let rps = m.requests_per_second();
    let avg_req_duration_s = m.avg_duration_ms() / 1000.0;

    let body = format!(
        "# HELP duel_requests_total Total HTTP requests served\n\
         # TYPE duel_requests_total counter\n\
         duel_requests_total {total_requests}\n\
         \n\
         # HELP duel_request_errors_total Total HTTP request errors (4xx/5xx)\n\
         # TYPE duel_request_errors_total counter\n\
         duel_request_errors_total {total_errors}\n\
         \n\
         # HELP duel_request_duration_seconds Average request duration\n\
         # TYPE duel_request_duration_seconds gauge\n\
         duel_request_duration_seconds {avg_req_duration_s:.6}\n\
         \n\
         # HELP duel_requests_per_second Current request throughput\n\
         # TYPE duel_requests_per_second gauge\n\
         duel_requests_per_second {rps:.2}\n\
         \n\
         # HELP duel_challenges_created_total Challenges created\n\
         # TYPE duel_challenges_created_total counter\n\
         duel_challenges_created_total {challenges}\n\
         \n\
         # HELP duel_moves_applied_total Moves applied\n\
         # TYPE duel_moves_applied_total counter\n\
         duel_moves_applied_total {moves}\n\
         \n\
         # HELP duel_battles_finished_total Battles that reached FINISHED\n\
         # TYPE duel_battles_finished_total counter\n\
         duel_battles_finished_total {finished}\n\
         \n\
         # HELP duel_stale_conflicts_total Conditional writes that matched no rows\n\
         # TYPE duel_stale_conflicts_total counter\n\
         duel_stale_conflicts_total {stale}\n\
         \n\
         # HELP duel_achievements_awarded_total Achievements awarded\n\
         # TYPE duel_achievements_awarded_total counter\n\
         duel_achievements_awarded_total {achievements}\n\
         \n\
         # HELP duel_uptime_seconds Server uptime\n\
         # TYPE duel_uptime_seconds gauge\n\
         duel_uptime_seconds {uptime:.2}\n",
    );

    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

// ============================================================================
// GET /metrics/json
// ============================================================================

#[derive(Serialize)]
pub struct JsonMetrics {
    pub uptime_secs: f64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub rps: f64,
    pub avg_request_duration_ms: f64,
    pub challenges_created: u64,
    pub moves_applied: u64,
    pub battles_finished: u64,
    pub stale_conflicts: u64,
    pub achievements_awarded: u64,
}

pub async fn json_metrics_handler(State(state): State<ApiState>) -> Json<JsonMetrics> {
    let m = &state.metrics;

    Json(JsonMetrics {
        uptime_secs: m.uptime_secs(),
        total_requests: m.total_requests.load(Ordering::Relaxed),
        total_errors: m.total_errors.load(Ordering::Relaxed),
        rps: m.requests_per_second(),
        avg_request_duration_ms: m.avg_duration_ms(),
        challenges_created: m.challenges_created.load(Ordering::Relaxed),
        moves_applied: m.moves_applied.load(Ordering::Relaxed),
        battles_finished: m.battles_finished.load(Ordering::Relaxed),
        stale_conflicts: m.stale_conflicts.load(Ordering::Relaxed),
        achievements_awarded: m.achievements_awarded.load(Ordering::Relaxed),
    })
}

// ============================================================================
// Tests
// ============================================================================
