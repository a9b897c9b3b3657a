//! Bootstrap admin profile initialization

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    config::BootstrapConfig,
    models::{Profile, ProfileRole, ProfileStatus, UserId},
    repository::ProfileRepository,
    service::auth::hash_password,
    Result,
};

/// Bootstrap an admin profile on first startup
///
/// Creates an admin profile if none exists and bootstrap is enabled. Should
/// be called after database migrations but before serving traffic.
pub async fn bootstrap_admin_profile(pool: &PgPool, config: &BootstrapConfig) -> Result<()> {
    if !config.create_admin_user {
        info!("Admin profile bootstrap disabled in config");
        return Ok(());
    }

    let repository = ProfileRepository::new(pool.clone());

    let admin_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM profiles WHERE role = 'admin' LIMIT 1)",
    )
    .fetch_one(pool)
    .await?;

    if admin_exists {
        info!("Admin profile already exists, skipping bootstrap");
        return Ok(());
    }

    if repository
        .get_by_username(&config.admin_username)
        .await?
        .is_some()
    {
        warn!(
            "Username '{}' already exists but is not an admin. Skipping admin bootstrap.",
            config.admin_username
        );
        return Ok(());
    }

    info!("Creating admin profile '{}'...", config.admin_username);

    let password_hash = hash_password(&config.admin_password).await?;
    let now = Utc::now();

    let profile = Profile {
        id: UserId::new(),
        username: config.admin_username.clone(),
        password_hash,
        status: ProfileStatus::Active,
        role: ProfileRole::Admin,
        created_at: now,
        updated_at: now,
    };

    let created = repository.create(&profile).await?;
    info!(
        "Admin profile created (id: {}, username: {})",
        created.id, created.username
    );

    if config.admin_password == "admin" {
        warn!("Admin password is set to the default value 'admin'");
        warn!("Change it immediately after first login");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_config_defaults() {
        let config = BootstrapConfig::default();
        assert!(config.create_admin_user);
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.admin_password, "admin");
    }
}
