//! Administrative routes
//!
//! A thin surface over the connection registry: health, who is online,
//! send a raw frame to a user, and close a user's connection.

use super::{ApiResult, GatewayState};
use axum::{extract::State, Json};
use relay_core::PrincipalId;
use serde::{Deserialize, Serialize};

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineUsers {
    pub online_users: Vec<PrincipalId>,
}

/// List online principals
pub async fn online_users(State(state): State<GatewayState>) -> Json<OnlineUsers> {
    Json(OnlineUsers {
        online_users: state.router().online_users(),
    })
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub user_id: String,
    /// Sent to the user verbatim as one text frame
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Send a raw frame to an online user
pub async fn send_message(
    State(state): State<GatewayState>,
    Json(request): Json<SendRequest>,
) -> ApiResult<Json<StatusResponse>> {
    state
        .router()
        .send_to_user(&request.user_id, request.message)
        .await?;
    Ok(Json(StatusResponse::new("sent")))
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub user_id: String,
}

/// Close an online user's connection
pub async fn close_connection(
    State(state): State<GatewayState>,
    Json(request): Json<CloseRequest>,
) -> ApiResult<Json<StatusResponse>> {
    state.router().close_user(&request.user_id)?;
    Ok(Json(StatusResponse::new("closed")))
}
