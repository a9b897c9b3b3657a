use nanoid::nanoid;
use serde::{Deserialize, Serialize};

/// Generate a 12-character nanoid for entity IDs
pub fn generate_id() -> String {
    nanoid!(12)
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(generate_id())
            }

            #[must_use]
            pub const fn from_string(id: String) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        // Database mapping: TEXT <-> transparent wrapper around String
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>>
            {
                <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
                let s = <String as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(Self(s))
            }
        }
    };
}

entity_id! {
    /// Subscriber user ID (CHAR(12) nanoid)
    UserId
}

entity_id! {
    /// Stream ID (CHAR(12) nanoid)
    StreamId
}

entity_id! {
    /// Session ID (CHAR(12) nanoid)
    SessionId
}

entity_id! {
    /// Edge server ID (CHAR(12) nanoid)
    ServerId
}

entity_id! {
    /// Package ID (CHAR(12) nanoid)
    PackageId
}

entity_id! {
    /// Subscription ID (CHAR(12) nanoid)
    SubscriptionId
}

/// Channel ID (UUID string).
///
/// Channels use UUIDs rather than nanoids: the Xtream-compatible numeric
/// channel id is derived from the leading hex digits of the identifier,
/// which requires a hex-shaped id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub const fn from_string(id: String) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl sqlx::Type<sqlx::Postgres> for ChannelId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for ChannelId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ChannelId {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let s = <String as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_length() {
        assert_eq!(generate_id().len(), 12);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(StreamId::new(), StreamId::new());
    }

    #[test]
    fn test_channel_id_is_uuid_shaped() {
        let id = ChannelId::new();
        assert_eq!(id.as_str().len(), 36);
        assert_eq!(id.as_str().matches('-').count(), 4);
    }

    #[test]
    fn test_serde_transparent() {
        let id = UserId::from_string("abc123def456".to_string());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc123def456\"");
    }
}
