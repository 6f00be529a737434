use crate::SignalingService;
use crate::session::SessionSummary;
use axum::Json;
use axum::extract::State;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub sessions: usize,
    pub handles: usize,
    /// Unix milliseconds.
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct ConnectionsReport {
    pub connections: Vec<SessionSummary>,
}

pub async fn health(State(service): State<SignalingService>) -> Json<HealthReport> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    Json(HealthReport {
        status: "ok",
        sessions: service.session_count(),
        handles: service.handle_count(),
        timestamp,
    })
}

pub async fn connections(State(service): State<SignalingService>) -> Json<ConnectionsReport> {
    Json(ConnectionsReport {
        connections: service.snapshot(),
    })
}
