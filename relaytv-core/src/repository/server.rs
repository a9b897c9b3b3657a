use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{EdgeServer, ServerId},
    Result,
};

/// Edge server repository, backing the operator remote execution channel.
#[derive(Clone)]
pub struct EdgeServerRepository {
    pool: PgPool,
}

impl EdgeServerRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, server_id: &ServerId) -> Result<Option<EdgeServer>> {
        let row = sqlx::query(
            r"
            SELECT id, name, host, agent_port, credentials, created_at, updated_at
            FROM edge_servers
            WHERE id = $1
            ",
        )
        .bind(server_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_server(&row)?)),
            None => Ok(None),
        }
    }

    /// Replace the stored (encrypted) credential blob for a server.
    pub async fn update_credentials(
        &self,
        server_id: &ServerId,
        credentials: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE edge_servers
            SET credentials = $2, updated_at = $3
            WHERE id = $1
            ",
        )
        .bind(server_id.as_str())
        .bind(credentials)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_server(row: &PgRow) -> Result<EdgeServer> {
    let agent_port: i32 = row.try_get("agent_port")?;

    Ok(EdgeServer {
        id: ServerId::from_string(row.try_get("id")?),
        name: row.try_get("name")?,
        host: row.try_get("host")?,
        agent_port: u16::try_from(agent_port).unwrap_or(0),
        credentials: row.try_get("credentials")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
