//! Session recording for audit and billing.

use chrono::Utc;

use crate::{
    models::{Session, SessionId, StreamId, UserId},
    repository::SessionRepository,
    Result,
};

/// Connection details captured from the inbound request.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub device_info: Option<String>,
}

pub struct SessionRecorder {
    sessions: SessionRepository,
}

impl SessionRecorder {
    #[must_use]
    pub const fn new(sessions: SessionRepository) -> Self {
        Self { sessions }
    }

    /// Record a session attached to an admitted stream start.
    pub async fn record_stream_start(
        &self,
        user_id: &UserId,
        stream_id: &StreamId,
        client: &ClientInfo,
    ) -> Result<Session> {
        self.record(user_id, Some(stream_id.clone()), client).await
    }

    /// Record a pass-through playback session with no Stream row.
    ///
    /// These sessions have no parent Stream to terminate them; they stay
    /// open until the owner closes them via [`Self::close`].
    pub async fn record_passthrough(
        &self,
        user_id: &UserId,
        client: &ClientInfo,
    ) -> Result<Session> {
        self.record(user_id, None, client).await
    }

    async fn record(
        &self,
        user_id: &UserId,
        stream_id: Option<StreamId>,
        client: &ClientInfo,
    ) -> Result<Session> {
        let session = Session {
            id: SessionId::new(),
            user_id: user_id.clone(),
            stream_id,
            client_ip: client.client_ip.clone(),
            user_agent: client.user_agent.clone(),
            device_info: client.device_info.clone(),
            bytes_transferred: 0,
            started_at: Utc::now(),
            ended_at: None,
        };

        let session = self.sessions.create(&session).await?;
        tracing::debug!(
            session_id = %session.id,
            user_id = %user_id,
            stream_id = ?session.stream_id,
            "session recorded"
        );
        Ok(session)
    }

    /// Account bytes served against a session.
    pub async fn add_bytes(&self, session_id: &SessionId, bytes: i64) -> Result<()> {
        self.sessions.add_bytes(session_id, bytes).await
    }

    /// Close one of the owner's open sessions. Returns false when no open
    /// session with that id belongs to the user.
    pub async fn close(&self, user_id: &UserId, session_id: &SessionId) -> Result<bool> {
        self.sessions.close(session_id, user_id, Utc::now()).await
    }
}

impl std::fmt::Debug for SessionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecorder").finish()
    }
}
