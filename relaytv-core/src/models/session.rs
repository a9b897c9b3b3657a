use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{SessionId, StreamId, UserId};

/// A recorded client connection, for audit and billing.
///
/// `stream_id` is null for pass-through playback that never created a
/// Stream row (relay mode); such sessions stay open until an explicit close
/// signal arrives, which is outside this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub stream_id: Option<StreamId>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub device_info: Option<String>,
    pub bytes_transferred: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}
