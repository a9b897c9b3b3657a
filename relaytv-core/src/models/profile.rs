use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::UserId;

/// Subscriber account status, independent of role.
///
/// Only `Active` accounts may authenticate or start streams. Suspended
/// accounts are temporarily blocked (e.g. for overdue payment) and may be
/// reinstated; banned accounts are permanently locked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Active,
    Suspended,
    Banned,
}

impl ProfileStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Banned => "banned",
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl FromStr for ProfileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "banned" => Ok(Self::Banned),
            _ => Err(format!("Unknown profile status: {s}")),
        }
    }
}

impl std::fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account role. Operators (admins) may use the remote execution channel;
/// subscribers may only consume streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    Admin,
    User,
}

impl ProfileRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl FromStr for ProfileRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(format!("Unknown profile role: {s}")),
        }
    }
}

impl std::fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subscriber profile. Read-only to the streaming core; account management
/// lives outside this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: ProfileStatus,
    pub role: ProfileRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_profiles_are_active() {
        assert!(ProfileStatus::Active.is_active());
        assert!(!ProfileStatus::Suspended.is_active());
        assert!(!ProfileStatus::Banned.is_active());
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["active", "suspended", "banned"] {
            let parsed: ProfileStatus = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert!("deleted".parse::<ProfileStatus>().is_err());
    }

    #[test]
    fn test_role_parse() {
        assert!("admin".parse::<ProfileRole>().unwrap().is_admin());
        assert!(!"user".parse::<ProfileRole>().unwrap().is_admin());
    }
}
