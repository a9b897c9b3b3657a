use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ChannelId;

/// One upstream origin for a channel. A channel carries an ordered list of
/// sources; the first one is the primary and the rest are operator-managed
/// fallbacks (failover itself is a catalog concern, not handled here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSource {
    pub url: String,
    /// Declared container/protocol as configured by the operator
    /// (informational; delivery classifies the URL itself).
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

/// Live channel. Owned by catalog management; read-only to the streaming
/// core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub category: String,
    pub logo_url: Option<String>,
    pub active: bool,
    /// Ordered upstream sources, stored as JSONB.
    pub sources: Vec<ChannelSource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    /// The primary upstream source, if any is configured.
    #[must_use]
    pub fn primary_source(&self) -> Option<&ChannelSource> {
        self.sources.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_source_is_first() {
        let channel = Channel {
            id: ChannelId::new(),
            name: "News 24".to_string(),
            category: "News".to_string(),
            logo_url: None,
            active: true,
            sources: vec![
                ChannelSource {
                    url: "http://up.example/primary.m3u8".to_string(),
                    format: Some("hls".to_string()),
                    quality: Some("1080p".to_string()),
                },
                ChannelSource {
                    url: "http://up.example/backup.ts".to_string(),
                    format: None,
                    quality: None,
                },
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            channel.primary_source().map(|s| s.url.as_str()),
            Some("http://up.example/primary.m3u8")
        );
    }

    #[test]
    fn test_source_json_round_trip() {
        let src = ChannelSource {
            url: "http://up.example/a.ts".to_string(),
            format: None,
            quality: Some("720p".to_string()),
        };
        let json = serde_json::to_string(&src).unwrap();
        let back: ChannelSource = serde_json::from_str(&json).unwrap();
        assert_eq!(src, back);
    }
}
