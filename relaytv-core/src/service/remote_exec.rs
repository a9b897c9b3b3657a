//! Operator-only remote execution channel.
//!
//! Stores and retrieves encrypted edge server credentials, probes
//! connectivity, and runs a fixed allow-list of diagnostic commands via the
//! edge agent. Every access attempt is audited, success or failure.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::{
    models::ServerId,
    repository::EdgeServerRepository,
    service::{
        audit::{AuditAction, AuditEvent, AuditService, AuditTargetType},
        credential_encryption::CredentialVault,
    },
    Error, Result,
};

/// The only commands the channel will run. Fixed at compile time; there is
/// deliberately no way to extend this from configuration or the API.
pub const ALLOWED_COMMANDS: &[&str] = &[
    "uptime",
    "df -h",
    "free -m",
    "ss -tunlp",
    "nproc",
    "systemctl status relaytv-edge",
];

#[must_use]
pub fn is_command_allowed(command: &str) -> bool {
    ALLOWED_COMMANDS.contains(&command.trim())
}

/// Who is acting, for the audit trail.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub actor_id: String,
    pub actor_username: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentExecResponse {
    output: String,
}

pub struct RemoteExecutionService {
    servers: EdgeServerRepository,
    vault: Option<CredentialVault>,
    audit: Arc<AuditService>,
    http: reqwest::Client,
}

impl RemoteExecutionService {
    pub fn new(
        servers: EdgeServerRepository,
        vault: Option<CredentialVault>,
        audit: Arc<AuditService>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            servers,
            vault,
            audit,
            http,
        })
    }

    fn vault(&self) -> Result<&CredentialVault> {
        self.vault.as_ref().ok_or_else(|| {
            Error::Configuration(
                "credential master secret not configured; remote execution disabled".to_string(),
            )
        })
    }

    async fn record(
        &self,
        actor: &ActorContext,
        action: AuditAction,
        server_id: &ServerId,
        success: bool,
        details: serde_json::Value,
    ) {
        let event = AuditEvent {
            actor_id: actor.actor_id.clone(),
            actor_username: actor.actor_username.clone(),
            action,
            target_type: AuditTargetType::Server,
            target_id: Some(server_id.to_string()),
            success,
            details,
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
        };
        if let Err(e) = self.audit.log(event).await {
            tracing::error!(server_id = %server_id, error = %e, "failed to record audit event");
        }
    }

    /// Encrypt and store credentials for a registered server.
    pub async fn store(
        &self,
        actor: &ActorContext,
        server_id: &ServerId,
        credentials: &serde_json::Value,
    ) -> Result<()> {
        let result = self.store_inner(server_id, credentials).await;
        self.record(
            actor,
            AuditAction::CredentialsStored,
            server_id,
            result.is_ok(),
            json!({}),
        )
        .await;
        result
    }

    async fn store_inner(
        &self,
        server_id: &ServerId,
        credentials: &serde_json::Value,
    ) -> Result<()> {
        let encrypted = self.vault()?.encrypt(credentials)?;
        let updated = self.servers.update_credentials(server_id, &encrypted).await?;
        if !updated {
            return Err(Error::NotFound(format!("Server {server_id} not found")));
        }
        Ok(())
    }

    /// Decrypt and return stored credentials.
    pub async fn retrieve(
        &self,
        actor: &ActorContext,
        server_id: &ServerId,
    ) -> Result<serde_json::Value> {
        let result = self.retrieve_inner(server_id).await;
        self.record(
            actor,
            AuditAction::CredentialsRetrieved,
            server_id,
            result.is_ok(),
            json!({}),
        )
        .await;
        result
    }

    async fn retrieve_inner(&self, server_id: &ServerId) -> Result<serde_json::Value> {
        let vault = self.vault()?;
        let server = self
            .servers
            .get_by_id(server_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Server {server_id} not found")))?;
        let stored = server
            .credentials
            .ok_or_else(|| Error::NotFound(format!("Server {server_id} has no credentials")))?;
        vault.decrypt(&stored)
    }

    /// Probe TCP reachability of the server's agent port.
    pub async fn test_connection(&self, actor: &ActorContext, server_id: &ServerId) -> Result<bool> {
        let result = self.test_connection_inner(server_id).await;
        self.record(
            actor,
            AuditAction::ConnectionTested,
            server_id,
            matches!(result, Ok(true)),
            json!({}),
        )
        .await;
        result
    }

    async fn test_connection_inner(&self, server_id: &ServerId) -> Result<bool> {
        let server = self
            .servers
            .get_by_id(server_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Server {server_id} not found")))?;

        let addr = format!("{}:{}", server.host, server.agent_port);
        let connect = tokio::net::TcpStream::connect(&addr);
        match tokio::time::timeout(Duration::from_secs(5), connect).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => {
                tracing::info!(server_id = %server_id, addr = %addr, error = %e, "connection test failed");
                Ok(false)
            }
            Err(_) => {
                tracing::info!(server_id = %server_id, addr = %addr, "connection test timed out");
                Ok(false)
            }
        }
    }

    /// Run an allow-listed diagnostic command on the server's edge agent.
    pub async fn execute_command(
        &self,
        actor: &ActorContext,
        server_id: &ServerId,
        command: &str,
    ) -> Result<String> {
        if !is_command_allowed(command) {
            self.record(
                actor,
                AuditAction::CommandRejected,
                server_id,
                false,
                json!({ "command": command }),
            )
            .await;
            return Err(Error::CommandNotAllowed(format!(
                "command is not on the diagnostic allow-list: {command}"
            )));
        }

        let result = self.execute_inner(server_id, command).await;
        self.record(
            actor,
            AuditAction::CommandExecuted,
            server_id,
            result.is_ok(),
            json!({ "command": command }),
        )
        .await;
        result
    }

    async fn execute_inner(&self, server_id: &ServerId, command: &str) -> Result<String> {
        let credentials = self.retrieve_inner(server_id).await?;
        let server = self
            .servers
            .get_by_id(server_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Server {server_id} not found")))?;

        let username = credentials
            .get("username")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let password = credentials
            .get("password")
            .and_then(|v| v.as_str())
            .map(ToString::to_string);

        let response = self
            .http
            .post(format!("{}/v1/exec", server.agent_url()))
            .basic_auth(username, password)
            .json(&json!({ "command": command }))
            .send()
            .await
            .map_err(|e| Error::Internal(format!("edge agent request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "edge agent returned {}",
                response.status()
            )));
        }

        let body: AgentExecResponse = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("invalid edge agent response: {e}")))?;

        Ok(body.output)
    }
}

impl std::fmt::Debug for RemoteExecutionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExecutionService")
            .field("vault_configured", &self.vault.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_membership() {
        assert!(is_command_allowed("uptime"));
        assert!(is_command_allowed("df -h"));
        assert!(is_command_allowed(" uptime "));
    }

    #[test]
    fn test_destructive_commands_rejected() {
        assert!(!is_command_allowed("rm -rf /"));
        assert!(!is_command_allowed("uptime; rm -rf /"));
        assert!(!is_command_allowed("df -h /var"));
        assert!(!is_command_allowed(""));
    }
}
