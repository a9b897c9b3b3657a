//! Audit logging.
//!
//! Every operator remote-execution attempt (success or failure) and every
//! stream lifecycle mutation worth tracing lands in `audit_logs`, keyed by
//! target, actor, IP, and user agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    StreamStarted,
    StreamStopped,
    CredentialsStored,
    CredentialsRetrieved,
    ConnectionTested,
    CommandExecuted,
    CommandRejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTargetType {
    Stream,
    Channel,
    Server,
}

/// One audit entry, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: String,
    pub actor_id: String,
    pub actor_username: String,
    pub action: AuditAction,
    pub target_type: AuditTargetType,
    pub target_id: Option<String>,
    pub success: bool,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for recording one audit event.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub actor_id: String,
    pub actor_username: String,
    pub action: AuditAction,
    pub target_type: AuditTargetType,
    pub target_id: Option<String>,
    pub success: bool,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record one audit event.
    pub async fn log(&self, event: AuditEvent) -> Result<()> {
        let action_str = serde_json::to_string(&event.action)?;
        let target_str = serde_json::to_string(&event.target_type)?;

        sqlx::query(
            r"
            INSERT INTO audit_logs (id, actor_id, actor_username, action, target_type,
                                    target_id, success, details, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(crate::models::generate_id())
        .bind(&event.actor_id)
        .bind(&event.actor_username)
        .bind(action_str.trim_matches('"'))
        .bind(target_str.trim_matches('"'))
        .bind(&event.target_id)
        .bind(event.success)
        .bind(&event.details)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            actor_id = %event.actor_id,
            action = ?event.action,
            target_id = ?event.target_id,
            success = event.success,
            "audit log recorded"
        );

        Ok(())
    }
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serialization_is_snake_case() {
        let json = serde_json::to_string(&AuditAction::CommandRejected).unwrap();
        assert_eq!(json, "\"command_rejected\"");
        let json = serde_json::to_string(&AuditTargetType::Server).unwrap();
        assert_eq!(json, "\"server\"");
    }
}
