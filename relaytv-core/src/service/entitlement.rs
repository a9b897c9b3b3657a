//! Entitlement gate: the three ordered checks every playback request
//! passes before any stream state is touched.
//!
//! The order is load-bearing: authentication is checked before
//! authorization, and both before channel lookup, so that a bad credential
//! can never learn whether a subscription or channel exists.

use chrono::Utc;

use crate::{
    models::{Channel, ChannelId, Package, Profile, Subscription},
    repository::{ChannelRepository, ProfileRepository, SubscriptionRepository},
    service::auth::{verify_password, TokenService},
    Error, Result,
};

/// How the caller identified itself.
#[derive(Debug, Clone)]
pub enum Credentials {
    Bearer(String),
    Password { username: String, password: String },
}

/// Everything a permitted playback request resolved on its way through the
/// gate.
#[derive(Debug, Clone)]
pub struct Entitlement {
    pub profile: Profile,
    pub subscription: Subscription,
    pub package: Package,
    pub channel: Channel,
}

pub struct EntitlementGate {
    profiles: ProfileRepository,
    subscriptions: SubscriptionRepository,
    channels: ChannelRepository,
    tokens: TokenService,
}

impl EntitlementGate {
    #[must_use]
    pub const fn new(
        profiles: ProfileRepository,
        subscriptions: SubscriptionRepository,
        channels: ChannelRepository,
        tokens: TokenService,
    ) -> Self {
        Self {
            profiles,
            subscriptions,
            channels,
            tokens,
        }
    }

    /// Resolve credentials to an active profile. Fails with an
    /// authentication error for unknown users, bad passwords, bad tokens,
    /// and non-active accounts alike.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Profile> {
        let profile = match credentials {
            Credentials::Bearer(token) => {
                let claims = self.tokens.verify(token)?;
                self.profiles
                    .get_by_id(&claims.user_id())
                    .await?
                    .ok_or_else(|| Error::Authentication("Unknown account".to_string()))?
            }
            Credentials::Password { username, password } => {
                let profile = self
                    .profiles
                    .get_by_username(username)
                    .await?
                    .ok_or_else(|| {
                        Error::Authentication("Invalid username or password".to_string())
                    })?;

                if !verify_password(password, &profile.password_hash).await? {
                    return Err(Error::Authentication(
                        "Invalid username or password".to_string(),
                    ));
                }
                profile
            }
        };

        if !profile.status.is_active() {
            return Err(Error::Authentication(format!(
                "Account is {}",
                profile.status
            )));
        }

        Ok(profile)
    }

    /// Full gate: authenticate, then require an active subscription, then
    /// require an active channel. Short-circuits on the first violation.
    pub async fn check(
        &self,
        credentials: &Credentials,
        channel_id: &ChannelId,
    ) -> Result<Entitlement> {
        let profile = self.authenticate(credentials).await?;

        let (subscription, package) = self
            .subscriptions
            .active_for_user(&profile.id, Utc::now())
            .await?
            .ok_or_else(|| Error::Authorization("No active subscription".to_string()))?;

        let channel = self
            .channels
            .get_by_id(channel_id)
            .await?
            .filter(|c| c.active)
            .ok_or_else(|| Error::NotFound(format!("Channel {channel_id} not found")))?;

        Ok(Entitlement {
            profile,
            subscription,
            package,
            channel,
        })
    }

    /// Authenticate and require an active subscription, without a channel.
    /// Used by bulk playlist export and the catalog API, which enumerate
    /// channels rather than target one.
    pub async fn check_subscriber(
        &self,
        credentials: &Credentials,
    ) -> Result<(Profile, Subscription, Package)> {
        let profile = self.authenticate(credentials).await?;

        let (subscription, package) = self
            .subscriptions
            .active_for_user(&profile.id, Utc::now())
            .await?
            .ok_or_else(|| Error::Authorization("No active subscription".to_string()))?;

        Ok((profile, subscription, package))
    }
}

impl std::fmt::Debug for EntitlementGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementGate").finish()
    }
}
