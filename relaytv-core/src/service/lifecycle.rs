//! Stream lifecycle orchestration.
//!
//! Every inbound playback request flows through here: entitlement first,
//! admission second, and only then any stream-state mutation, delegating to
//! the upstream normalizer (relay) or the transcode supervisor (active
//! transcode) and finally the session recorder.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    models::{ChannelId, Profile, SessionId, StreamId, StreamState, TranscodeProfile},
    repository::{ChannelRepository, StreamRepository},
    service::{
        admission::AdmissionController,
        audit::{AuditAction, AuditEvent, AuditService, AuditTargetType},
        entitlement::{Credentials, EntitlementGate},
        session_recorder::{ClientInfo, SessionRecorder},
        transcode::TranscodeSupervisor,
        upstream::{NormalizedPlaylist, UpstreamNormalizer},
    },
    Error, Result,
};

/// Outcome of an admitted start.
#[derive(Debug, Clone)]
pub struct StartResult {
    /// Present only in transcode mode; relay playback needs no Stream row.
    pub stream_id: Option<StreamId>,
    pub stream_url: String,
    pub session_id: SessionId,
}

/// Result of a status read. Never an error: "nothing running" is a normal
/// answer.
#[derive(Debug, Clone)]
pub enum StreamStatus {
    None,
    Active {
        stream_id: StreamId,
        state: StreamState,
        channel_name: String,
        stream_url: Option<String>,
        clients_count: i32,
        started_at: DateTime<Utc>,
    },
}

pub struct StreamLifecycleManager {
    gate: Arc<EntitlementGate>,
    admission: AdmissionController,
    normalizer: Arc<UpstreamNormalizer>,
    supervisor: Arc<TranscodeSupervisor>,
    recorder: SessionRecorder,
    streams: StreamRepository,
    channels: ChannelRepository,
    audit: Arc<AuditService>,
    profiles: HashMap<String, TranscodeProfile>,
    public_base_url: String,
}

impl StreamLifecycleManager {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        gate: Arc<EntitlementGate>,
        admission: AdmissionController,
        normalizer: Arc<UpstreamNormalizer>,
        supervisor: Arc<TranscodeSupervisor>,
        recorder: SessionRecorder,
        streams: StreamRepository,
        channels: ChannelRepository,
        audit: Arc<AuditService>,
        profiles: HashMap<String, TranscodeProfile>,
        public_base_url: String,
    ) -> Self {
        Self {
            gate,
            admission,
            normalizer,
            supervisor,
            recorder,
            streams,
            channels,
            audit,
            profiles,
            public_base_url,
        }
    }

    /// Append a stream lifecycle event to the audit trail. Audit failures
    /// are logged, never surfaced to the caller.
    async fn audit_stream(
        &self,
        profile: &Profile,
        action: AuditAction,
        stream_id: &StreamId,
        channel_id: &ChannelId,
        client: Option<&ClientInfo>,
    ) {
        let event = AuditEvent {
            actor_id: profile.id.to_string(),
            actor_username: profile.username.clone(),
            action,
            target_type: AuditTargetType::Stream,
            target_id: Some(stream_id.to_string()),
            success: true,
            details: serde_json::json!({ "channel_id": channel_id.to_string() }),
            ip_address: client.and_then(|c| c.client_ip.clone()),
            user_agent: client.and_then(|c| c.user_agent.clone()),
        };
        if let Err(e) = self.audit.log(event).await {
            tracing::warn!(stream_id = %stream_id, "Failed to write audit event: {e}");
        }
    }

    /// Start playback of a channel.
    ///
    /// `quality` selects an operator-configured transcode profile; absent,
    /// playback is pass-through relay and no Stream row is created.
    pub async fn start(
        &self,
        credentials: &Credentials,
        channel_id: &ChannelId,
        quality: Option<&str>,
        client: &ClientInfo,
    ) -> Result<StartResult> {
        let entitlement = self.gate.check(credentials, channel_id).await?;
        self.admission
            .admit(&entitlement.profile.id, entitlement.package.concurrent_limit)
            .await?;

        match quality {
            Some(quality) => {
                let profile = self.profiles.get(quality).ok_or_else(|| {
                    Error::InvalidInput(format!("Unknown quality profile: {quality}"))
                })?;
                let source = entitlement.channel.primary_source().ok_or_else(|| {
                    Error::upstream(channel_id.as_str(), "channel has no upstream source")
                })?;

                let stream = self
                    .supervisor
                    .start(&entitlement.profile.id, channel_id, source, profile)
                    .await?;
                let session = self
                    .recorder
                    .record_stream_start(&entitlement.profile.id, &stream.id, client)
                    .await?;
                self.streams.set_clients_count(&stream.id, 1).await?;

                self.audit_stream(
                    &entitlement.profile,
                    AuditAction::StreamStarted,
                    &stream.id,
                    channel_id,
                    Some(client),
                )
                .await;

                Ok(StartResult {
                    stream_url: stream.stream_url.clone().unwrap_or_default(),
                    stream_id: Some(stream.id),
                    session_id: session.id,
                })
            }
            None => {
                // Relay mode: the deliverable is produced on playlist
                // fetch; start only admits and records the session.
                let session = self
                    .recorder
                    .record_passthrough(&entitlement.profile.id, client)
                    .await?;

                Ok(StartResult {
                    stream_id: None,
                    stream_url: format!(
                        "{}/live/{channel_id}.m3u8",
                        self.public_base_url
                    ),
                    session_id: session.id,
                })
            }
        }
    }

    /// Stop the caller's active stream for a channel. Absence of such a
    /// stream is reported as not-found, never swallowed as success.
    pub async fn stop(&self, credentials: &Credentials, channel_id: &ChannelId) -> Result<StreamId> {
        let profile = self.gate.authenticate(credentials).await?;

        let stream = self
            .streams
            .find_live_for_user_channel(&profile.id, channel_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("No active stream for channel {channel_id}"))
            })?;

        self.supervisor.stop(&stream.id).await?;
        self.audit_stream(&profile, AuditAction::StreamStopped, &stream.id, channel_id, None)
            .await;
        Ok(stream.id)
    }

    /// Pure read of the caller's stream state for a channel.
    pub async fn status(
        &self,
        credentials: &Credentials,
        channel_id: &ChannelId,
    ) -> Result<StreamStatus> {
        let profile = self.gate.authenticate(credentials).await?;

        let Some(stream) = self
            .streams
            .find_live_for_user_channel(&profile.id, channel_id)
            .await?
        else {
            return Ok(StreamStatus::None);
        };

        let channel_name = self
            .channels
            .get_by_id(channel_id)
            .await?
            .map(|c| c.name)
            .unwrap_or_default();

        Ok(StreamStatus::Active {
            stream_id: stream.id,
            state: stream.state,
            channel_name,
            stream_url: stream.stream_url,
            clients_count: stream.clients_count,
            started_at: stream.started_at,
        })
    }

    /// Entitlement-gated pass-through delivery: normalize the channel's
    /// primary upstream into a playable manifest and record the session.
    pub async fn deliver_passthrough(
        &self,
        credentials: &Credentials,
        channel_id: &ChannelId,
        client: &ClientInfo,
    ) -> Result<NormalizedPlaylist> {
        let entitlement = self.gate.check(credentials, channel_id).await?;

        let source = entitlement.channel.primary_source().ok_or_else(|| {
            Error::upstream(channel_id.as_str(), "channel has no upstream source")
        })?;

        let playlist = self.normalizer.normalize(source).await?;
        let session = self
            .recorder
            .record_passthrough(&entitlement.profile.id, client)
            .await?;
        self.recorder
            .add_bytes(
                &session.id,
                i64::try_from(playlist.content.len()).unwrap_or(i64::MAX),
            )
            .await?;

        Ok(playlist)
    }

    /// Close one of the caller's open sessions. The closure path for
    /// pass-through sessions, which have no parent Stream to end them.
    pub async fn close_session(
        &self,
        credentials: &Credentials,
        session_id: &SessionId,
    ) -> Result<bool> {
        let profile = self.gate.authenticate(credentials).await?;
        self.recorder.close(&profile.id, session_id).await
    }

    /// Resolve the raw relay target for a channel, used by the `.ts`
    /// delivery path which redirects rather than proxies.
    pub async fn resolve_raw_target(
        &self,
        credentials: &Credentials,
        channel_id: &ChannelId,
        client: &ClientInfo,
    ) -> Result<String> {
        let entitlement = self.gate.check(credentials, channel_id).await?;

        let source = entitlement.channel.primary_source().ok_or_else(|| {
            Error::upstream(channel_id.as_str(), "channel has no upstream source")
        })?;

        self.recorder
            .record_passthrough(&entitlement.profile.id, client)
            .await?;

        Ok(source.url.clone())
    }

    #[must_use]
    pub const fn gate(&self) -> &Arc<EntitlementGate> {
        &self.gate
    }
}

impl std::fmt::Debug for StreamLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamLifecycleManager")
            .field("profiles", &self.profiles.keys())
            .finish()
    }
}
