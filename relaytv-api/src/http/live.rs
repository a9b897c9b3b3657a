//! Live delivery endpoints.
//!
//! Pass-through playback for player software that cannot send headers:
//! credentials ride in the URL path or the query string. HLS requests get
//! the normalized playlist body; `.ts` requests get a redirect to the
//! resolved raw target.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use relaytv_core::{
    models::ChannelId,
    service::{upstream::resolve_numeric_id, Credentials},
};
use serde::Deserialize;

use super::{middleware::client_info_from_headers, AppError, AppResult, AppState};

/// What the URL extension asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Hls,
    RawTransportStream,
}

/// Split a `{channelRef}.{ext}` path segment into the channel reference and
/// the requested delivery. A missing extension means HLS.
pub fn parse_channel_ref(segment: &str) -> (&str, Delivery) {
    if let Some(stripped) = segment.strip_suffix(".m3u8") {
        (stripped, Delivery::Hls)
    } else if let Some(stripped) = segment.strip_suffix(".ts") {
        (stripped, Delivery::RawTransportStream)
    } else {
        (segment, Delivery::Hls)
    }
}

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    pub username: String,
    pub password: String,
}

/// GET /live/{username}/{password}/{channel}
pub async fn serve_with_path_credentials(
    State(state): State<AppState>,
    Path((username, password, channel)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let credentials = Credentials::Password { username, password };
    serve(&state, &credentials, &channel, &headers).await
}

/// GET /live/{channel}?username=&password=
pub async fn serve_with_query_credentials(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<LiveQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let credentials = Credentials::Password {
        username: query.username,
        password: query.password,
    };
    serve(&state, &credentials, &channel, &headers).await
}

async fn serve(
    state: &AppState,
    credentials: &Credentials,
    channel_segment: &str,
    headers: &HeaderMap,
) -> AppResult<Response> {
    let (channel_ref, delivery) = parse_channel_ref(channel_segment);
    let channel_id = resolve_channel_ref(state, channel_ref).await?;
    let client = client_info_from_headers(headers);

    match delivery {
        Delivery::Hls => {
            let playlist = state
                .lifecycle
                .deliver_passthrough(credentials, &channel_id, &client)
                .await?;

            Ok((
                [
                    (header::CONTENT_TYPE, playlist.content_type),
                    (header::CACHE_CONTROL, playlist.cache_control),
                ],
                playlist.content,
            )
                .into_response())
        }
        Delivery::RawTransportStream => {
            let target = state
                .lifecycle
                .resolve_raw_target(credentials, &channel_id, &client)
                .await?;

            Ok(Redirect::temporary(&target).into_response())
        }
    }
}

/// A channel reference is either a channel id or the numeric id handed to
/// Xtream-compatible players, which must be resolved back against the
/// active channel list.
async fn resolve_channel_ref(state: &AppState, channel_ref: &str) -> Result<ChannelId, AppError> {
    if let Ok(numeric_id) = channel_ref.parse::<u32>() {
        let channels = state.channels.list_active().await?;
        let channel = resolve_numeric_id(&channels, numeric_id)
            .ok_or_else(|| AppError::not_found(format!("Channel {channel_ref} not found")))?;
        return Ok(channel.id.clone());
    }

    Ok(ChannelId::from_string(channel_ref.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hls_ref() {
        let (channel, delivery) = parse_channel_ref("abc-def.m3u8");
        assert_eq!(channel, "abc-def");
        assert_eq!(delivery, Delivery::Hls);
    }

    #[test]
    fn test_parse_ts_ref() {
        let (channel, delivery) = parse_channel_ref("12345.ts");
        assert_eq!(channel, "12345");
        assert_eq!(delivery, Delivery::RawTransportStream);
    }

    #[test]
    fn test_missing_extension_defaults_to_hls() {
        let (channel, delivery) = parse_channel_ref("abc-def");
        assert_eq!(channel, "abc-def");
        assert_eq!(delivery, Delivery::Hls);
    }
}
