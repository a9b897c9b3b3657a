//! Upstream source normalization.
//!
//! Translates a channel's configured upstream URL into a playable HLS-style
//! deliverable without touching the transcoder, used both for pure relay
//! and as the basis for synthetic playlists. Also owns the numeric channel
//! id derivation used by Xtream-compatible players.

use std::time::Duration;

use crate::{
    models::{Channel, ChannelSource},
    Error, Result,
};

/// Content type every normalized deliverable is served with.
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Cache policy for normalized deliverables.
pub const PLAYLIST_CACHE_CONTROL: &str = "no-store";

/// Upstream source format, classified once per request by syntactic URL
/// inspection. Precedence matters: a raw transport stream wins over
/// everything, a legacy `.m3u` playlist is distinct from `.m3u8`, and
/// anything unrecognized is treated as an opaque direct URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFormat {
    RawTransportStream,
    LegacyPlaylist,
    HlsPlaylist,
    Opaque,
}

impl UpstreamFormat {
    /// Classify a source URL. Suffix checks ignore query and fragment; the
    /// mpegts marker is matched anywhere in the URL.
    #[must_use]
    pub fn classify(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);

        if path.ends_with(".ts") || url.contains("mpegts") {
            Self::RawTransportStream
        } else if path.ends_with(".m3u8") {
            Self::HlsPlaylist
        } else if path.ends_with(".m3u") {
            Self::LegacyPlaylist
        } else {
            Self::Opaque
        }
    }
}

/// A normalized, ready-to-serve playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPlaylist {
    pub content: String,
    pub content_type: &'static str,
    pub cache_control: &'static str,
}

impl NormalizedPlaylist {
    fn new(content: String) -> Self {
        Self {
            content,
            content_type: PLAYLIST_CONTENT_TYPE,
            cache_control: PLAYLIST_CACHE_CONTROL,
        }
    }
}

/// Wrap a single target URL in a static single-segment playlist.
///
/// This is not a rolling live window: one EVENT-typed entry and an end
/// marker, regardless of playback duration. Players re-request the segment
/// URL itself, which for raw TS sources is a continuous stream.
#[must_use]
pub fn single_segment_playlist(target: &str) -> String {
    format!(
        "#EXTM3U\n\
         #EXT-X-VERSION:3\n\
         #EXT-X-TARGETDURATION:10\n\
         #EXT-X-MEDIA-SEQUENCE:0\n\
         #EXT-X-PLAYLIST-TYPE:EVENT\n\
         #EXTINF:10.0,\n\
         {target}\n\
         #EXT-X-ENDLIST\n"
    )
}

/// Base path of a URL: everything up to (and excluding) the last `/`.
#[must_use]
pub fn base_path(url: &str) -> &str {
    url.rfind('/').map_or(url, |idx| &url[..idx])
}

/// Rewrite an HLS playlist so relative segment references stay resolvable
/// after proxying: any non-comment, non-blank line that is not already an
/// absolute URL gets the source's base path prefixed. Tag lines and
/// absolute references pass through verbatim.
#[must_use]
pub fn rewrite_hls_playlist(content: &str, source_url: &str) -> String {
    let base = base_path(source_url);
    let mut out = String::with_capacity(content.len());

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with("http://")
            || trimmed.starts_with("https://")
        {
            out.push_str(line);
        } else {
            out.push_str(base);
            out.push('/');
            out.push_str(trimmed);
        }
        out.push('\n');
    }

    out
}

/// First non-blank, non-comment line of a legacy `.m3u` playlist.
#[must_use]
pub fn first_playlist_target(content: &str) -> Option<&str> {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Normalizes upstream channel sources into playable manifests.
pub struct UpstreamNormalizer {
    http: reqwest::Client,
}

impl UpstreamNormalizer {
    pub fn new(fetch_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }

    /// Produce a deliverable playlist for a channel's upstream source.
    ///
    /// Network failures on the fetch-requiring branches surface as
    /// `UpstreamUnavailable` carrying the offending URL.
    pub async fn normalize(&self, source: &ChannelSource) -> Result<NormalizedPlaylist> {
        let url = source.url.as_str();

        match UpstreamFormat::classify(url) {
            UpstreamFormat::RawTransportStream | UpstreamFormat::Opaque => {
                Ok(NormalizedPlaylist::new(single_segment_playlist(url)))
            }
            UpstreamFormat::LegacyPlaylist => {
                let body = self.fetch(url).await?;
                let target = first_playlist_target(&body).ok_or_else(|| {
                    Error::upstream(url, "legacy playlist contains no stream target")
                })?;
                Ok(NormalizedPlaylist::new(single_segment_playlist(target)))
            }
            UpstreamFormat::HlsPlaylist => {
                let body = self.fetch(url).await?;
                Ok(NormalizedPlaylist::new(rewrite_hls_playlist(&body, url)))
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::upstream(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::upstream(
                url,
                format!("upstream returned {}", response.status()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| Error::upstream(url, e.to_string()))
    }
}

impl std::fmt::Debug for UpstreamNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamNormalizer").finish()
    }
}

/// Derive the 32-bit numeric channel id Xtream-compatible players expect:
/// strip separators, take the first 8 hex digits of the channel identifier,
/// parse base-16.
///
/// A 32-bit truncation of a longer identifier can collide; resolution logs
/// collisions rather than hiding them (accepted limitation, see DESIGN.md).
#[must_use]
pub fn derive_numeric_id(channel_id: &str) -> Option<u32> {
    let hex: String = channel_id
        .chars()
        .filter(char::is_ascii_hexdigit)
        .take(8)
        .collect();

    if hex.is_empty() {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok()
}

/// Resolve an inbound numeric id back to a channel by recomputing the same
/// transform over the active channel list.
#[must_use]
pub fn resolve_numeric_id<'a>(channels: &'a [Channel], numeric_id: u32) -> Option<&'a Channel> {
    let mut matches = channels
        .iter()
        .filter(|c| derive_numeric_id(c.id.as_str()) == Some(numeric_id));

    let first = matches.next();
    if matches.next().is_some() {
        tracing::warn!(
            numeric_id,
            "numeric channel id collision: multiple channels derive the same id"
        );
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelId;
    use chrono::Utc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(url: &str) -> ChannelSource {
        ChannelSource {
            url: url.to_string(),
            format: None,
            quality: None,
        }
    }

    fn channel_with_id(id: &str) -> Channel {
        Channel {
            id: ChannelId::from_string(id.to_string()),
            name: "test".to_string(),
            category: "News".to_string(),
            logo_url: None,
            active: true,
            sources: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn normalizer() -> UpstreamNormalizer {
        UpstreamNormalizer::new(Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_classification_precedence() {
        use UpstreamFormat::*;
        assert_eq!(UpstreamFormat::classify("http://a/b.ts"), RawTransportStream);
        assert_eq!(
            UpstreamFormat::classify("http://a/mpegts/123"),
            RawTransportStream
        );
        assert_eq!(UpstreamFormat::classify("http://a/b.m3u8"), HlsPlaylist);
        assert_eq!(UpstreamFormat::classify("http://a/b.m3u"), LegacyPlaylist);
        assert_eq!(UpstreamFormat::classify("http://a/stream/42"), Opaque);
    }

    #[test]
    fn test_classification_ignores_query() {
        assert_eq!(
            UpstreamFormat::classify("http://a/b.m3u8?token=x.ts"),
            UpstreamFormat::HlsPlaylist
        );
    }

    #[test]
    fn test_single_segment_shape() {
        let playlist = single_segment_playlist("http://up.example/feed.ts");
        let lines: Vec<&str> = playlist.lines().collect();
        assert_eq!(
            lines,
            vec![
                "#EXTM3U",
                "#EXT-X-VERSION:3",
                "#EXT-X-TARGETDURATION:10",
                "#EXT-X-MEDIA-SEQUENCE:0",
                "#EXT-X-PLAYLIST-TYPE:EVENT",
                "#EXTINF:10.0,",
                "http://up.example/feed.ts",
                "#EXT-X-ENDLIST",
            ]
        );
        // Exactly one media entry regardless of playback duration.
        assert_eq!(playlist.matches("#EXTINF").count(), 1);
    }

    #[tokio::test]
    async fn test_raw_ts_source_needs_no_fetch() {
        let result = normalizer()
            .normalize(&source("http://up.example/feed.ts"))
            .await
            .unwrap();
        assert!(result.content.contains("http://up.example/feed.ts"));
        assert!(result.content.ends_with("#EXT-X-ENDLIST\n"));
        assert_eq!(result.content_type, PLAYLIST_CONTENT_TYPE);
        assert_eq!(result.cache_control, "no-store");
    }

    #[test]
    fn test_rewrite_relative_segment() {
        let input = "#EXTM3U\n#EXTINF:4.0,\nseg1.ts\n";
        let output = rewrite_hls_playlist(input, "http://up.example/ch/index.m3u8");
        assert!(output.contains("http://up.example/ch/seg1.ts"));
    }

    #[test]
    fn test_rewrite_leaves_absolute_segment_unchanged() {
        let input = "#EXTM3U\n#EXTINF:4.0,\nhttps://cdn.example/seg1.ts\n";
        let output = rewrite_hls_playlist(input, "http://up.example/ch/index.m3u8");
        assert!(output.contains("https://cdn.example/seg1.ts"));
        assert!(!output.contains("http://up.example/ch/https"));
    }

    #[test]
    fn test_rewrite_leaves_tags_unchanged() {
        let input = "#EXTM3U\n#EXT-X-TARGETDURATION:4\n#EXTINF:4.0,\nseg1.ts\n";
        let output = rewrite_hls_playlist(input, "http://up.example/ch/index.m3u8");
        assert!(output.starts_with("#EXTM3U\n#EXT-X-TARGETDURATION:4\n"));
    }

    #[test]
    fn test_first_playlist_target_skips_comments() {
        let content = "#EXTM3U\n\n#EXTINF:-1,Some Channel\nhttp://up.example/real\n";
        assert_eq!(
            first_playlist_target(content),
            Some("http://up.example/real")
        );
        assert_eq!(first_playlist_target("#EXTM3U\n# nothing here\n"), None);
    }

    #[tokio::test]
    async fn test_hls_fetch_and_rewrite() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ch/index.m3u8"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("#EXTM3U\n#EXTINF:4.0,\nseg1.ts\n"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/ch/index.m3u8", server.uri());
        let result = normalizer().normalize(&source(&url)).await.unwrap();
        assert!(result
            .content
            .contains(&format!("{}/ch/seg1.ts", server.uri())));
    }

    #[tokio::test]
    async fn test_legacy_playlist_resolution() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.m3u"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "#EXTM3U\n#EXTINF:-1,Channel One\nhttp://up.example/one\nhttp://up.example/two\n",
            ))
            .mount(&server)
            .await;

        let url = format!("{}/list.m3u", server.uri());
        let result = normalizer().normalize(&source(&url)).await.unwrap();
        // First non-comment entry wins.
        assert!(result.content.contains("http://up.example/one"));
        assert!(!result.content.contains("http://up.example/two"));
    }

    #[tokio::test]
    async fn test_legacy_playlist_without_target_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty.m3u"))
            .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n"))
            .mount(&server)
            .await;

        let url = format!("{}/empty.m3u", server.uri());
        let err = normalizer().normalize(&source(&url)).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_fetch_failure_carries_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down.m3u8"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let url = format!("{}/down.m3u8", server.uri());
        let err = normalizer().normalize(&source(&url)).await.unwrap_err();
        match err {
            Error::UpstreamUnavailable { url: bad, .. } => assert_eq!(bad, url),
            other => panic!("expected UpstreamUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_numeric_id_is_stable() {
        let id = "a1b2c3d4-0000-4000-8000-000000000000";
        assert_eq!(derive_numeric_id(id), derive_numeric_id(id));
        assert_eq!(derive_numeric_id(id), Some(0xa1b2_c3d4));
    }

    #[test]
    fn test_numeric_id_strips_separators() {
        // Separators are stripped before taking hex digits.
        assert_eq!(
            derive_numeric_id("ab-cd-ef-01-ff"),
            Some(0xabcd_ef01)
        );
    }

    #[test]
    fn test_numeric_id_without_hex_digits() {
        assert_eq!(derive_numeric_id("zzzz"), None);
    }

    #[test]
    fn test_resolve_recovers_channel() {
        let channels = vec![
            channel_with_id("a1b2c3d4-0000-4000-8000-000000000000"),
            channel_with_id("deadbeef-0000-4000-8000-000000000000"),
        ];
        let numeric = derive_numeric_id(channels[1].id.as_str()).unwrap();
        let resolved = resolve_numeric_id(&channels, numeric).unwrap();
        assert_eq!(resolved.id, channels[1].id);
    }

    #[test]
    fn test_resolve_unknown_id() {
        let channels = vec![channel_with_id("a1b2c3d4-0000-4000-8000-000000000000")];
        assert!(resolve_numeric_id(&channels, 0x1234_5678).is_none());
    }
}
