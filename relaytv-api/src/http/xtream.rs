//! Xtream-Codes-compatible catalog API (`player_api.php`).
//!
//! Third-party player software authenticates with query-parameter
//! credentials and selects an action. Response shapes mirror what existing
//! Xtream clients parse, including the 32-bit numeric channel ids derived
//! from channel identifiers. VOD actions answer with empty but
//! shape-correct payloads; this catalog carries live channels only.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use relaytv_core::{
    models::{Channel, Package, Profile, Subscription},
    service::{upstream::derive_numeric_id, Credentials},
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct XtreamQuery {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub stream_id: Option<String>,
}

/// GET /player_api.php
pub async fn player_api(
    State(state): State<AppState>,
    Query(query): Query<XtreamQuery>,
) -> AppResult<Json<Value>> {
    let credentials = Credentials::Password {
        username: query.username.clone(),
        password: query.password.clone(),
    };
    let (profile, subscription, package) = state.gate.check_subscriber(&credentials).await?;

    let payload = match query.action.as_deref() {
        None | Some("") => {
            let active_cons = state.streams.count_live_for_user(&profile.id).await?;
            build_auth_response(
                &profile,
                &subscription,
                &package,
                &query.password,
                active_cons,
                &state.public_base_url,
            )
        }
        Some("get_live_categories") => {
            let categories = state.channels.list_active_categories().await?;
            Value::Array(build_categories(&categories))
        }
        Some("get_live_streams") => {
            let channels = state.channels.list_active().await?;
            let categories = state.channels.list_active_categories().await?;
            let mut streams = build_live_streams(&channels, &categories);
            if let Some(wanted) = &query.category_id {
                streams.retain(|s| {
                    s.get("category_id").and_then(Value::as_str) == Some(wanted.as_str())
                });
            }
            Value::Array(streams)
        }
        Some("get_short_epg" | "get_simple_data_table") => json!({ "epg_listings": [] }),
        // VOD is out of catalog scope; answer shape-correct and empty.
        Some(action) if action.starts_with("get_vod") || action.starts_with("get_series") => {
            json!([])
        }
        Some(other) => {
            tracing::debug!(action = other, "unknown player_api action");
            json!([])
        }
    };

    Ok(Json(payload))
}

/// Default (no-action) authentication/server-info response.
fn build_auth_response(
    profile: &Profile,
    subscription: &Subscription,
    package: &Package,
    password: &str,
    active_cons: i64,
    public_base_url: &str,
) -> Value {
    let now = Utc::now();
    let (host, port, protocol) = split_base_url(public_base_url);

    json!({
        "user_info": {
            "username": profile.username,
            "password": password,
            "message": "",
            "auth": 1,
            "status": "Active",
            "exp_date": subscription.end_date.timestamp().to_string(),
            "is_trial": "0",
            "active_cons": active_cons.to_string(),
            "created_at": profile.created_at.timestamp().to_string(),
            "max_connections": package.concurrent_limit.to_string(),
            "allowed_output_formats": ["m3u8", "ts"],
        },
        "server_info": {
            "url": host,
            "port": port,
            "https_port": "443",
            "server_protocol": protocol,
            "timezone": "UTC",
            "timestamp_now": now.timestamp(),
            "time_now": now.format("%Y-%m-%d %H:%M:%S").to_string(),
        },
    })
}

/// Category list entries. Category ids are positional over the sorted
/// category list, matching the ids used by `get_live_streams`.
fn build_categories(categories: &[String]) -> Vec<Value> {
    categories
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            json!({
                "category_id": (idx + 1).to_string(),
                "category_name": name,
                "parent_id": 0,
            })
        })
        .collect()
}

/// Live stream entries with the derived 32-bit numeric ids.
fn build_live_streams(channels: &[Channel], categories: &[String]) -> Vec<Value> {
    channels
        .iter()
        .enumerate()
        .map(|(idx, channel)| {
            let category_id = categories
                .iter()
                .position(|c| c == &channel.category)
                .map_or_else(|| "0".to_string(), |pos| (pos + 1).to_string());

            json!({
                "num": idx + 1,
                "name": channel.name,
                "stream_type": "live",
                "stream_id": derive_numeric_id(channel.id.as_str()).unwrap_or_default(),
                "stream_icon": channel.logo_url.as_deref().unwrap_or(""),
                "epg_channel_id": channel.name,
                "added": channel.created_at.timestamp().to_string(),
                "category_id": category_id,
                "custom_sid": "",
                "tv_archive": 0,
                "direct_source": "",
                "tv_archive_duration": 0,
            })
        })
        .collect()
}

/// Split a base URL into the host, port, and protocol strings Xtream
/// clients reassemble delivery URLs from.
fn split_base_url(base_url: &str) -> (String, String, String) {
    match url::Url::parse(base_url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("localhost").to_string();
            let port = parsed
                .port_or_known_default()
                .map_or_else(|| "80".to_string(), |p| p.to_string());
            (host, port, parsed.scheme().to_string())
        }
        Err(_) => (base_url.to_string(), "80".to_string(), "http".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use relaytv_core::models::{
        ChannelId, PackageId, ProfileRole, ProfileStatus, SubscriptionId, SubscriptionStatus,
        UserId,
    };

    fn channel(id: &str, name: &str, category: &str) -> Channel {
        Channel {
            id: ChannelId::from_string(id.to_string()),
            name: name.to_string(),
            category: category.to_string(),
            logo_url: None,
            active: true,
            sources: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_categories_are_positional() {
        let categories = vec!["News".to_string(), "Sports".to_string()];
        let built = build_categories(&categories);
        assert_eq!(built[0]["category_id"], "1");
        assert_eq!(built[0]["category_name"], "News");
        assert_eq!(built[1]["category_id"], "2");
    }

    #[test]
    fn test_live_streams_reference_category_ids() {
        let categories = vec!["News".to_string(), "Sports".to_string()];
        let channels = vec![
            channel("a1b2c3d4-0000-4000-8000-000000000001", "Sports One", "Sports"),
        ];
        let built = build_live_streams(&channels, &categories);
        assert_eq!(built[0]["category_id"], "2");
        assert_eq!(built[0]["stream_type"], "live");
        assert_eq!(built[0]["stream_id"], 0xa1b2_c3d4u32);
    }

    #[test]
    fn test_auth_response_shape() {
        let now = Utc::now();
        let profile = Profile {
            id: UserId::new(),
            username: "alice".to_string(),
            password_hash: String::new(),
            status: ProfileStatus::Active,
            role: ProfileRole::User,
            created_at: now,
            updated_at: now,
        };
        let subscription = Subscription {
            id: SubscriptionId::new(),
            user_id: profile.id.clone(),
            package_id: PackageId::new(),
            status: SubscriptionStatus::Active,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
        };
        let package = Package {
            id: subscription.package_id.clone(),
            name: "Premium".to_string(),
            concurrent_limit: 2,
            duration_days: 30,
            max_bitrate_kbps: None,
            features: json!({}),
            created_at: now,
        };

        let response = build_auth_response(
            &profile,
            &subscription,
            &package,
            "pw",
            1,
            "http://edge.example:8080",
        );
        assert_eq!(response["user_info"]["auth"], 1);
        assert_eq!(response["user_info"]["max_connections"], "2");
        assert_eq!(response["user_info"]["active_cons"], "1");
        assert_eq!(response["server_info"]["url"], "edge.example");
        assert_eq!(response["server_info"]["port"], "8080");
        assert_eq!(response["server_info"]["server_protocol"], "http");
    }

    #[test]
    fn test_split_base_url_default_port() {
        let (host, port, protocol) = split_base_url("https://edge.example");
        assert_eq!(host, "edge.example");
        assert_eq!(port, "443");
        assert_eq!(protocol, "https");
    }
}
