//! Bulk playlist export (`get.php`).
//!
//! Enumerates every active channel as an EXTM3U entry with tvg metadata,
//! one delivery URL per requested format, credentials embedded in the path
//! so stock IPTV players can fetch without headers.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use relaytv_core::{
    models::Channel,
    service::{
        upstream::{derive_numeric_id, PLAYLIST_CONTENT_TYPE},
        Credentials,
    },
};
use serde::Deserialize;
use std::str::FromStr;

use super::{AppError, AppResult, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistFormat {
    Hls,
    Mpegts,
    Both,
}

impl FromStr for PlaylistFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hls" | "m3u8" => Ok(Self::Hls),
            "mpegts" | "ts" => Ok(Self::Mpegts),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown playlist format: {other}")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlaylistQuery {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub format: Option<String>,
    /// Xtream-style alias for `format`.
    #[serde(default)]
    pub output: Option<String>,
}

/// Build the full multi-channel playlist text.
pub fn build_playlist(
    channels: &[Channel],
    base_url: &str,
    username: &str,
    password: &str,
    format: PlaylistFormat,
) -> String {
    let mut out = String::from("#EXTM3U\n");

    for channel in channels {
        let tvg_id = derive_numeric_id(channel.id.as_str())
            .map_or_else(|| channel.id.to_string(), |n| n.to_string());
        let logo = channel.logo_url.as_deref().unwrap_or("");

        let mut push_entry = |extension: &str| {
            out.push_str(&format!(
                "#EXTINF:-1 tvg-id=\"{tvg_id}\" tvg-name=\"{name}\" tvg-logo=\"{logo}\" group-title=\"{category}\",{name}\n",
                name = channel.name,
                category = channel.category,
            ));
            out.push_str(&format!(
                "{base_url}/live/{username}/{password}/{id}.{extension}\n",
                id = channel.id,
            ));
        };

        match format {
            PlaylistFormat::Hls => push_entry("m3u8"),
            PlaylistFormat::Mpegts => push_entry("ts"),
            PlaylistFormat::Both => {
                push_entry("m3u8");
                push_entry("ts");
            }
        }
    }

    out
}

/// GET /get.php
pub async fn get_playlist(
    State(state): State<AppState>,
    Query(query): Query<PlaylistQuery>,
) -> AppResult<Response> {
    let format = query
        .format
        .as_deref()
        .or(query.output.as_deref())
        .unwrap_or("hls")
        .parse::<PlaylistFormat>()
        .map_err(AppError::bad_request)?;

    let credentials = Credentials::Password {
        username: query.username.clone(),
        password: query.password.clone(),
    };
    state.gate.check_subscriber(&credentials).await?;

    let channels = state.channels.list_active().await?;
    let body = build_playlist(
        &channels,
        &state.public_base_url,
        &query.username,
        &query.password,
        format,
    );

    Ok(([(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use relaytv_core::models::ChannelId;

    fn channel(id: &str, name: &str, category: &str) -> Channel {
        Channel {
            id: ChannelId::from_string(id.to_string()),
            name: name.to_string(),
            category: category.to_string(),
            logo_url: Some(format!("http://cdn.example/{name}.png")),
            active: true,
            sources: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn channels() -> Vec<Channel> {
        vec![
            channel("a1b2c3d4-0000-4000-8000-000000000001", "News One", "News"),
            channel("deadbeef-0000-4000-8000-000000000002", "Sports One", "Sports"),
        ]
    }

    #[test]
    fn test_hls_playlist_one_url_per_channel() {
        let text = build_playlist(&channels(), "http://edge.example", "alice", "pw", PlaylistFormat::Hls);
        assert_eq!(text.matches("#EXTINF:-1").count(), 2);
        assert_eq!(text.matches(".m3u8").count(), 2);
        assert!(!text.contains(".ts"));
        assert!(text.starts_with("#EXTM3U\n"));
    }

    #[test]
    fn test_both_emits_two_entries_per_channel() {
        let text = build_playlist(&channels(), "http://edge.example", "alice", "pw", PlaylistFormat::Both);
        assert_eq!(text.matches("#EXTINF:-1").count(), 4);
        assert_eq!(text.matches(".m3u8").count(), 2);
        assert_eq!(text.matches(".ts").count(), 2);
    }

    #[test]
    fn test_entry_carries_tvg_metadata_and_credentials() {
        let text = build_playlist(&channels(), "http://edge.example", "alice", "pw", PlaylistFormat::Hls);
        assert!(text.contains("group-title=\"News\""));
        assert!(text.contains("tvg-name=\"News One\""));
        assert!(text.contains("tvg-logo=\"http://cdn.example/News One.png\""));
        // Numeric tvg-id derived from the channel identifier.
        assert!(text.contains(&format!("tvg-id=\"{}\"", 0xa1b2_c3d4u32)));
        assert!(text.contains(
            "http://edge.example/live/alice/pw/a1b2c3d4-0000-4000-8000-000000000001.m3u8"
        ));
    }

    #[test]
    fn test_format_aliases() {
        assert_eq!("m3u8".parse::<PlaylistFormat>().unwrap(), PlaylistFormat::Hls);
        assert_eq!("ts".parse::<PlaylistFormat>().unwrap(), PlaylistFormat::Mpegts);
        assert!("flv".parse::<PlaylistFormat>().is_err());
    }
}
