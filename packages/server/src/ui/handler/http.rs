//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    infrastructure::dto::{
        conversion::presence_entry_dto,
        http::{HealthDto, PresenceEntryDto},
    },
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
    })
}

/// Snapshot of committed presence for all tracked users
pub async fn get_presence(State(state): State<Arc<AppState>>) -> Json<Vec<PresenceEntryDto>> {
    let snapshot = state.presence_tracker.snapshot().await;
    let entries = snapshot
        .iter()
        .map(|(user_id, presence)| presence_entry_dto(user_id, presence))
        .collect();
    Json(entries)
}
