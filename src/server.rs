// ABOUTME: Internal HTTP API exposing the config store over axum.
// ABOUTME: CRUD for channels, members, daily meetings, and predefined replies.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use crate::storage::Storage;
use crate::types::{ChannelRecord, DailyMeeting, Member, PredefinedReply};

pub fn router(storage: Arc<Storage>) -> Router {
    Router::new()
        .route("/channels", post(create_channel))
        .route("/members", post(create_member))
        .route("/members/{channel_id}", get(list_members))
        .route("/members/{channel_id}/{member_id}", delete(delete_member))
        .route("/dailymeetings", post(put_meeting).get(list_meetings))
        .route("/replies", post(create_reply))
        .route("/replies/{channel_id}", get(list_replies))
        .route("/replies/{channel_id}/{question}", delete(delete_replies))
        .with_state(storage)
}

pub async fn serve(storage: Arc<Storage>, addr: SocketAddr) -> Result<()> {
    let app = router(storage);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind API server to {}", addr))?;
    tracing::info!(addr = %addr, "API server listening");
    axum::serve(listener, app)
        .await
        .context("API server terminated")?;
    Ok(())
}

fn internal_error(e: anyhow::Error) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!(error = %e, "Storage operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "storage failure"})),
    )
}

async fn create_channel(
    State(storage): State<Arc<Storage>>,
    Json(channel): Json<ChannelRecord>,
) -> impl IntoResponse {
    match storage.create_channel(&channel) {
        Ok(()) => (StatusCode::CREATED, Json(json!(channel))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn create_member(
    State(storage): State<Arc<Storage>>,
    Json(member): Json<Member>,
) -> impl IntoResponse {
    match storage.insert_member(&member) {
        Ok(()) => (StatusCode::CREATED, Json(json!(member))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn list_members(
    State(storage): State<Arc<Storage>>,
    Path(channel_id): Path<String>,
) -> impl IntoResponse {
    match storage.members_by_channel(&channel_id) {
        Ok(members) => (StatusCode::OK, Json(json!(members))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn delete_member(
    State(storage): State<Arc<Storage>>,
    Path((channel_id, member_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match storage.delete_member(&channel_id, &member_id) {
        Ok(true) => (StatusCode::OK, Json(json!({"deleted": true}))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "member not found"})),
        )
            .into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn put_meeting(
    State(storage): State<Arc<Storage>>,
    Json(meeting): Json<DailyMeeting>,
) -> impl IntoResponse {
    match storage.upsert_meeting(&meeting) {
        Ok(()) => (StatusCode::CREATED, Json(json!(meeting))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn list_meetings(State(storage): State<Arc<Storage>>) -> impl IntoResponse {
    match storage.list_meetings() {
        Ok(meetings) => (StatusCode::OK, Json(json!(meetings))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn create_reply(
    State(storage): State<Arc<Storage>>,
    Json(reply): Json<PredefinedReply>,
) -> impl IntoResponse {
    match storage.insert_reply(&reply) {
        Ok(()) => (StatusCode::CREATED, Json(json!(reply))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn list_replies(
    State(storage): State<Arc<Storage>>,
    Path(channel_id): Path<String>,
) -> impl IntoResponse {
    match storage.replies_by_channel(&channel_id) {
        Ok(replies) => (StatusCode::OK, Json(json!(replies))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn delete_replies(
    State(storage): State<Arc<Storage>>,
    Path((channel_id, question)): Path<(String, u8)>,
) -> impl IntoResponse {
    match storage.delete_replies(&channel_id, question) {
        Ok(deleted) => (StatusCode::OK, Json(json!({"deleted": deleted}))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}
