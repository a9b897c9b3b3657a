use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::{ChannelId, StreamId, UserId};

/// Stream lifecycle state.
///
/// Legal transitions: `Starting -> Running -> Stopping -> Stopped`, with
/// `Error` reachable from `Starting` or `Running` on unrecoverable failure.
/// `Stopped` and `Error` are terminal; a stream is never deleted, only
/// terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl StreamState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }

    /// States that count against the per-package concurrency ceiling.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }

    /// Whether a transition to `next` is legal.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Starting, Self::Running)
                | (Self::Starting, Self::Error)
                | (Self::Starting, Self::Stopped)
                | (Self::Running, Self::Stopping)
                | (Self::Running, Self::Stopped)
                | (Self::Running, Self::Error)
                | (Self::Stopping, Self::Stopped)
        )
    }
}

impl FromStr for StreamState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "starting" => Ok(Self::Starting),
            "running" => Ok(Self::Running),
            "stopping" => Ok(Self::Stopping),
            "stopped" => Ok(Self::Stopped),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown stream state: {s}")),
        }
    }
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stream row. Created on an admitted transcode start; mutated only by
/// the lifecycle manager and the transcode monitor task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    pub id: StreamId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub state: StreamState,
    /// Identifier of the service instance that owns this stream's process.
    pub edge: String,
    pub clients_count: i32,
    pub stream_url: Option<String>,
    /// OS process id of the external transcoder. Set only while the state
    /// is starting/running; the in-memory handle is the real owner.
    pub process_pid: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_states_count_against_limit() {
        assert!(StreamState::Starting.is_live());
        assert!(StreamState::Running.is_live());
        assert!(!StreamState::Stopping.is_live());
        assert!(!StreamState::Stopped.is_live());
        assert!(!StreamState::Error.is_live());
    }

    #[test]
    fn test_terminal_states() {
        assert!(StreamState::Stopped.is_terminal());
        assert!(StreamState::Error.is_terminal());
        assert!(!StreamState::Running.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        use StreamState::*;
        assert!(Starting.can_transition_to(Running));
        assert!(Running.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Stopped));
        assert!(Starting.can_transition_to(Error));
        assert!(Running.can_transition_to(Error));
    }

    #[test]
    fn test_illegal_transitions() {
        use StreamState::*;
        assert!(!Stopped.can_transition_to(Running));
        assert!(!Error.can_transition_to(Starting));
        assert!(!Stopping.can_transition_to(Running));
        assert!(!Stopping.can_transition_to(Error));
    }
}
