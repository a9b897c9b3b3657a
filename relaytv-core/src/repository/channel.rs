use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{Channel, ChannelId, ChannelSource},
    Error, Result,
};

/// Channel repository. Channels are catalog-owned; this core only reads
/// them.
#[derive(Clone)]
pub struct ChannelRepository {
    pool: PgPool,
}

impl ChannelRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a channel by ID, active or not.
    pub async fn get_by_id(&self, channel_id: &ChannelId) -> Result<Option<Channel>> {
        let row = sqlx::query(
            r"
            SELECT id, name, category, logo_url, active, sources, created_at, updated_at
            FROM channels
            WHERE id = $1
            ",
        )
        .bind(channel_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_channel(&row)?)),
            None => Ok(None),
        }
    }

    /// List all active channels ordered by category then name, the order
    /// playlist export and the catalog API present them in.
    pub async fn list_active(&self) -> Result<Vec<Channel>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, category, logo_url, active, sources, created_at, updated_at
            FROM channels
            WHERE active = TRUE
            ORDER BY category, name
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_channel).collect()
    }

    /// List distinct categories of active channels.
    pub async fn list_active_categories(&self) -> Result<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            r"
            SELECT DISTINCT category
            FROM channels
            WHERE active = TRUE
            ORDER BY category
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}

fn row_to_channel(row: &PgRow) -> Result<Channel> {
    let sources_json: serde_json::Value = row.try_get("sources")?;
    let sources: Vec<ChannelSource> = serde_json::from_value(sources_json)
        .map_err(|e| Error::Internal(format!("Invalid channel sources JSON: {e}")))?;

    Ok(Channel {
        id: ChannelId::from_string(row.try_get("id")?),
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        logo_url: row.try_get("logo_url")?,
        active: row.try_get("active")?,
        sources,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
