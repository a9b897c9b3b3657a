use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{ChannelId, Stream, StreamId, StreamState, UserId},
    Error, Result,
};

/// Stream repository. Stream rows are owned by this core: created on start,
/// mutated by the lifecycle manager and the transcode monitor, never
/// deleted.
#[derive(Clone)]
pub struct StreamRepository {
    pool: PgPool,
}

impl StreamRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, stream: &Stream) -> Result<Stream> {
        let row = sqlx::query(
            r"
            INSERT INTO streams (id, channel_id, user_id, state, edge, clients_count,
                                 stream_url, process_pid, started_at, stopped_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, channel_id, user_id, state, edge, clients_count,
                      stream_url, process_pid, started_at, stopped_at
            ",
        )
        .bind(stream.id.as_str())
        .bind(stream.channel_id.as_str())
        .bind(stream.user_id.as_str())
        .bind(stream.state.as_str())
        .bind(&stream.edge)
        .bind(stream.clients_count)
        .bind(&stream.stream_url)
        .bind(stream.process_pid)
        .bind(stream.started_at)
        .bind(stream.stopped_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_stream(&row)
    }

    pub async fn get_by_id(&self, stream_id: &StreamId) -> Result<Option<Stream>> {
        let row = sqlx::query(
            r"
            SELECT id, channel_id, user_id, state, edge, clients_count,
                   stream_url, process_pid, started_at, stopped_at
            FROM streams
            WHERE id = $1
            ",
        )
        .bind(stream_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_stream(&row)?)),
            None => Ok(None),
        }
    }

    /// Count a user's streams in the starting/running states. This is the
    /// admission check; it is deliberately not transactional with stream
    /// creation (see the lifecycle manager docs for the accepted race).
    pub async fn count_live_for_user(&self, user_id: &UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM streams
            WHERE user_id = $1 AND state IN ('starting', 'running')
            ",
        )
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Find the user's live stream for a channel. By invariant there is at
    /// most one; if the admission race has produced more, the most recent
    /// is returned.
    pub async fn find_live_for_user_channel(
        &self,
        user_id: &UserId,
        channel_id: &ChannelId,
    ) -> Result<Option<Stream>> {
        let row = sqlx::query(
            r"
            SELECT id, channel_id, user_id, state, edge, clients_count,
                   stream_url, process_pid, started_at, stopped_at
            FROM streams
            WHERE user_id = $1 AND channel_id = $2 AND state IN ('starting', 'running')
            ORDER BY started_at DESC
            LIMIT 1
            ",
        )
        .bind(user_id.as_str())
        .bind(channel_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_stream(&row)?)),
            None => Ok(None),
        }
    }

    /// Transition a starting stream to running, attaching the captured
    /// process id and output URL.
    pub async fn mark_running(
        &self,
        stream_id: &StreamId,
        process_pid: i32,
        stream_url: &str,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE streams
            SET state = 'running', process_pid = $2, stream_url = $3
            WHERE id = $1
            ",
        )
        .bind(stream_id.as_str())
        .bind(process_pid)
        .bind(stream_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Terminate a stream: set a terminal state, stamp the end time, and
    /// clear the process id (the handle invariant: pid only while
    /// starting/running).
    pub async fn mark_terminated(
        &self,
        stream_id: &StreamId,
        state: StreamState,
        stopped_at: DateTime<Utc>,
    ) -> Result<()> {
        if !state.is_terminal() {
            return Err(Error::Internal(format!(
                "mark_terminated called with non-terminal state {state}"
            )));
        }

        sqlx::query(
            r"
            UPDATE streams
            SET state = $2, stopped_at = $3, process_pid = NULL
            WHERE id = $1
            ",
        )
        .bind(stream_id.as_str())
        .bind(state.as_str())
        .bind(stopped_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_state(&self, stream_id: &StreamId, state: StreamState) -> Result<()> {
        sqlx::query("UPDATE streams SET state = $2 WHERE id = $1")
            .bind(stream_id.as_str())
            .bind(state.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn set_clients_count(&self, stream_id: &StreamId, clients: i32) -> Result<()> {
        sqlx::query("UPDATE streams SET clients_count = $2 WHERE id = $1")
            .bind(stream_id.as_str())
            .bind(clients)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn row_to_stream(row: &PgRow) -> Result<Stream> {
    let state_str: String = row.try_get("state")?;

    Ok(Stream {
        id: StreamId::from_string(row.try_get("id")?),
        channel_id: ChannelId::from_string(row.try_get("channel_id")?),
        user_id: UserId::from_string(row.try_get("user_id")?),
        state: StreamState::from_str(&state_str).map_err(Error::Internal)?,
        edge: row.try_get("edge")?,
        clients_count: row.try_get("clients_count")?,
        stream_url: row.try_get("stream_url")?,
        process_pid: row.try_get("process_pid")?,
        started_at: row.try_get("started_at")?,
        stopped_at: row.try_get("stopped_at")?,
    })
}
