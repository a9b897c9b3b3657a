use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ServerId;

/// A registered edge server reachable by the operator remote execution
/// channel. Credentials are stored encrypted (AES-256-GCM, `enc:` prefix)
/// and never leave the service unencrypted except through the audited
/// `retrieve` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeServer {
    pub id: ServerId,
    pub name: String,
    pub host: String,
    pub agent_port: u16,
    /// Encrypted credential blob (or legacy plaintext JSON during migration).
    #[serde(skip_serializing)]
    pub credentials: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EdgeServer {
    /// Base URL of the edge agent endpoint.
    #[must_use]
    pub fn agent_url(&self) -> String {
        format!("http://{}:{}", self.host, self.agent_port)
    }
}
