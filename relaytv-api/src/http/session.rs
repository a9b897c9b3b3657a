//! Session control: start, stop, and status for subscriber streams.

use axum::{extract::State, http::HeaderMap, Json};
use relaytv_core::{
    models::{ChannelId, SessionId},
    service::StreamStatus,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    middleware::{bearer_credentials, client_info_from_headers},
    AppResult, AppState,
};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamAction {
    Start,
    Stop,
    Status,
}

#[derive(Debug, Deserialize)]
pub struct StreamControlRequest {
    pub action: StreamAction,
    pub channel_id: String,
    pub quality: Option<String>,
    /// For `stop`: close this pass-through session instead of a stream.
    pub session_id: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub device_info: Option<String>,
}

/// Session control endpoint. One authenticated request per action; `status`
/// always answers 200.
pub async fn control(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<StreamControlRequest>,
) -> AppResult<Json<Value>> {
    let credentials = bearer_credentials(&headers)?;
    let channel_id = ChannelId::from_string(req.channel_id.clone());

    match req.action {
        StreamAction::Start => {
            let mut client = client_info_from_headers(&headers);
            if req.client_ip.is_some() {
                client.client_ip = req.client_ip;
            }
            if req.user_agent.is_some() {
                client.user_agent = req.user_agent;
            }
            client.device_info = req.device_info;

            let result = state
                .lifecycle
                .start(&credentials, &channel_id, req.quality.as_deref(), &client)
                .await?;

            Ok(Json(json!({
                "success": true,
                "message": "Stream started",
                "stream_id": result.stream_id.map(|id| id.to_string()),
                "stream_url": result.stream_url,
                "session_id": result.session_id.to_string(),
            })))
        }
        StreamAction::Stop => {
            // Pass-through playback has no stream row; the client hands back
            // the session id it was issued on start.
            if let Some(session_id) = req.session_id {
                let session_id = SessionId::from_string(session_id);
                let closed = state
                    .lifecycle
                    .close_session(&credentials, &session_id)
                    .await?;

                return Ok(Json(json!({
                    "success": closed,
                    "message": if closed { "Session closed" } else { "No open session" },
                    "session_id": session_id.to_string(),
                })));
            }

            let stream_id = state.lifecycle.stop(&credentials, &channel_id).await?;

            Ok(Json(json!({
                "success": true,
                "message": "Stream stopped",
                "stream_id": stream_id.to_string(),
            })))
        }
        StreamAction::Status => {
            let status = state.lifecycle.status(&credentials, &channel_id).await?;

            let payload = match status {
                StreamStatus::None => json!({
                    "active": false,
                }),
                StreamStatus::Active {
                    stream_id,
                    state,
                    channel_name,
                    stream_url,
                    clients_count,
                    started_at,
                } => json!({
                    "active": true,
                    "stream_id": stream_id.to_string(),
                    "state": state.to_string(),
                    "channel_name": channel_name,
                    "stream_url": stream_url,
                    "clients_count": clients_count,
                    "started_at": started_at,
                }),
            };
            Ok(Json(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_request_carries_session_id() {
        let req: StreamControlRequest = serde_json::from_str(
            r#"{"action": "stop", "channel_id": "ch-1", "session_id": "sess-1"}"#,
        )
        .unwrap();
        assert!(matches!(req.action, StreamAction::Stop));
        assert_eq!(req.session_id.as_deref(), Some("sess-1"));
        assert!(req.quality.is_none());
    }
}
