use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::{PackageId, SubscriptionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown subscription status: {s}")),
        }
    }
}

/// A subscriber's hold on a package. Read-only to the streaming core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub package_id: PackageId,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl Subscription {
    /// A subscription entitles playback iff its status is active AND its
    /// end date has not passed.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date > now
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn subscription(status: SubscriptionStatus, ends_in: Duration) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: SubscriptionId::new(),
            user_id: UserId::new(),
            package_id: PackageId::new(),
            status,
            start_date: now - Duration::days(10),
            end_date: now + ends_in,
        }
    }

    #[test]
    fn test_active_subscription_in_window() {
        let sub = subscription(SubscriptionStatus::Active, Duration::days(20));
        assert!(sub.is_active());
    }

    #[test]
    fn test_active_status_but_expired_date() {
        let sub = subscription(SubscriptionStatus::Active, Duration::days(-1));
        assert!(!sub.is_active());
    }

    #[test]
    fn test_cancelled_subscription_with_future_end() {
        let sub = subscription(SubscriptionStatus::Cancelled, Duration::days(20));
        assert!(!sub.is_active());
    }
}
