//! Operator-only admin endpoints.
//!
//! The remote execution channel for registered edge servers, plus
//! transcoder log retrieval. All handlers require an admin account.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use relaytv_core::models::{ServerId, StreamId};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    middleware::{actor_context, AdminUser},
    AppError, AppResult, AppState,
};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerAction {
    Store,
    Retrieve,
    TestConnection,
    ExecuteCommand,
}

#[derive(Debug, Deserialize)]
pub struct ServerActionRequest {
    pub action: ServerAction,
    /// Credential document for `store`.
    pub credentials: Option<Value>,
    /// Diagnostic command for `execute_command`.
    pub command: Option<String>,
}

/// POST /api/admin/servers/{server_id}
pub async fn server_action(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(server_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ServerActionRequest>,
) -> AppResult<Json<Value>> {
    let server_id = ServerId::from_string(server_id);
    let actor = actor_context(&admin.profile, &headers);

    let payload = match req.action {
        ServerAction::Store => {
            let credentials = req
                .credentials
                .ok_or_else(|| AppError::bad_request("Missing credentials"))?;
            state
                .remote_exec
                .store(&actor, &server_id, &credentials)
                .await?;
            json!({ "success": true, "message": "Credentials stored" })
        }
        ServerAction::Retrieve => {
            let credentials = state.remote_exec.retrieve(&actor, &server_id).await?;
            json!({ "success": true, "credentials": credentials })
        }
        ServerAction::TestConnection => {
            let reachable = state
                .remote_exec
                .test_connection(&actor, &server_id)
                .await?;
            json!({ "success": true, "reachable": reachable })
        }
        ServerAction::ExecuteCommand => {
            let command = req
                .command
                .ok_or_else(|| AppError::bad_request("Missing command"))?;
            let output = state
                .remote_exec
                .execute_command(&actor, &server_id, &command)
                .await?;
            json!({ "success": true, "output": output })
        }
    };

    Ok(Json(payload))
}

/// GET /api/admin/streams/{stream_id}/logs
///
/// Always answers 200; an untracked or silent transcoder yields the
/// sentinel text rather than an error.
pub async fn stream_logs(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
) -> AppResult<Json<Value>> {
    let stream_id = StreamId::from_string(stream_id);
    let logs = state.supervisor.get_logs(&stream_id).await;

    Ok(Json(json!({ "stream_id": stream_id.to_string(), "logs": logs })))
}
