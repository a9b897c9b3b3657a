use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{
        Package, PackageId, Subscription, SubscriptionId, SubscriptionStatus, UserId,
    },
    Error, Result,
};

/// Subscription + package reads. Both entities are billing-owned; this core
/// only needs the active subscription covering "now" and its package's
/// concurrency ceiling.
#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the subscription entitling `user_id` at instant `now`, joined
    /// with its package. Returns the most recently ending match if several
    /// overlap.
    pub async fn active_for_user(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<(Subscription, Package)>> {
        let row = sqlx::query(
            r"
            SELECT s.id AS sub_id, s.user_id, s.package_id, s.status, s.start_date, s.end_date,
                   p.id AS pkg_id, p.name, p.concurrent_limit, p.duration_days,
                   p.max_bitrate_kbps, p.features, p.created_at
            FROM subscriptions s
            JOIN packages p ON p.id = s.package_id
            WHERE s.user_id = $1
              AND s.status = 'active'
              AND s.end_date > $2
            ORDER BY s.end_date DESC
            LIMIT 1
            ",
        )
        .bind(user_id.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_pair(&row)?)),
            None => Ok(None),
        }
    }
}

fn row_to_pair(row: &PgRow) -> Result<(Subscription, Package)> {
    let status_str: String = row.try_get("status")?;

    let subscription = Subscription {
        id: SubscriptionId::from_string(row.try_get("sub_id")?),
        user_id: UserId::from_string(row.try_get("user_id")?),
        package_id: PackageId::from_string(row.try_get("package_id")?),
        status: SubscriptionStatus::from_str(&status_str).map_err(Error::Internal)?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
    };

    let package = Package {
        id: PackageId::from_string(row.try_get("pkg_id")?),
        name: row.try_get("name")?,
        concurrent_limit: row.try_get("concurrent_limit")?,
        duration_days: row.try_get("duration_days")?,
        max_bitrate_kbps: row.try_get("max_bitrate_kbps")?,
        features: row.try_get("features")?,
        created_at: row.try_get("created_at")?,
    };

    Ok((subscription, package))
}
