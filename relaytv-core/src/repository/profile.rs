use std::str::FromStr;

use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{Profile, ProfileRole, ProfileStatus, UserId},
    Error, Result,
};

/// Profile repository. Subscriber accounts are provisioned by the operator
/// panel; this side only reads them, plus the one admin bootstrap insert.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, profile: &Profile) -> Result<Profile> {
        let row = sqlx::query(
            r"
            INSERT INTO profiles (id, username, password_hash, status, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, username, password_hash, status, role, created_at, updated_at
            ",
        )
        .bind(profile.id.as_str())
        .bind(&profile.username)
        .bind(&profile.password_hash)
        .bind(profile.status.to_string())
        .bind(profile.role.to_string())
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_profile(&row)
    }

    pub async fn get_by_id(&self, user_id: &UserId) -> Result<Option<Profile>> {
        let row = sqlx::query(
            r"
            SELECT id, username, password_hash, status, role, created_at, updated_at
            FROM profiles
            WHERE id = $1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_profile(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let row = sqlx::query(
            r"
            SELECT id, username, password_hash, status, role, created_at, updated_at
            FROM profiles
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_profile(&row)?)),
            None => Ok(None),
        }
    }
}

fn row_to_profile(row: &PgRow) -> Result<Profile> {
    let status_str: String = row.try_get("status")?;
    let role_str: String = row.try_get("role")?;

    Ok(Profile {
        id: UserId::from_string(row.try_get("id")?),
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        status: ProfileStatus::from_str(&status_str).map_err(Error::Internal)?,
        role: ProfileRole::from_str(&role_str).map_err(Error::Internal)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
