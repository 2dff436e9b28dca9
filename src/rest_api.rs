//! HTTP surface consumed by the browser console.
//!
//! Sync and status are plain reads of the log store and never fail because
//! of the device; the console keeps polling through disconnects. Only the
//! reboot trigger can be rejected.

use axum::{
    extract::{Query, State as AxumState},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    error::AppResult,
    log_store::LogRecord,
    reboot::RebootController,
    sync::{StatusResponse, SyncResponse, SyncService},
};

#[derive(Clone)]
pub struct RestContext {
    pub sync: SyncService,
    pub reboot: RebootController,
}

// ---------- DTOs ----------
#[derive(Debug, Default, Deserialize)]
pub struct SyncParams {
    /// Kept as text so a malformed cursor can be answered in-band.
    pub last_id: Option<String>,
}

/// Body of a sync reply: the normal payload, or the in-band error shape.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SyncReply {
    Ok(SyncResponse),
    InvalidCursor {
        connected: bool,
        last_id: u64,
        logs: Vec<LogRecord>,
        error: String,
    },
}

/// Parse a client cursor. Missing or blank means 0, negative values clamp to 0.
pub fn parse_cursor(raw: Option<&str>) -> Result<u64, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(0);
    };
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }
    match raw.parse::<i64>() {
        Ok(value) => Ok(value.max(0) as u64),
        Err(_) => Err(format!("invalid last_id: '{raw}'")),
    }
}

// ---------- Router Builder ----------
pub fn build_router(ctx: RestContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sync", get(sync_logs))
        .route("/sync", get(sync_logs))
        .route("/status", get(status))
        .route("/reboot", post(reboot))
        .with_state(ctx)
}

// ---------- Handlers ----------
async fn health() -> &'static str {
    "ok"
}

async fn sync_logs(
    AxumState(ctx): AxumState<RestContext>,
    Query(params): Query<SyncParams>,
) -> Json<SyncReply> {
    match parse_cursor(params.last_id.as_deref()) {
        Ok(cursor) => Json(SyncReply::Ok(ctx.sync.sync(cursor))),
        Err(error) => {
            debug!(%error, "rejecting sync request");
            Json(SyncReply::InvalidCursor {
                connected: false,
                last_id: 0,
                logs: Vec::new(),
                error,
            })
        }
    }
}

async fn status(AxumState(ctx): AxumState<RestContext>) -> Json<StatusResponse> {
    Json(ctx.sync.status())
}

async fn reboot(AxumState(ctx): AxumState<RestContext>) -> AppResult<Json<Value>> {
    ctx.reboot.trigger()?;
    Ok(Json(json!({"success": true, "message": "Reboot signal sent"})))
}
