//! Identity and lifetime fields shared by every entity.

use super::id::EntityKey;
use chrono::{DateTime, Months, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Default retention window applied to new entities.
pub const DEFAULT_RETENTION_MONTHS: u32 = 18;

/// Stored name of the identity field.
pub const ID_FIELD: &str = entistore_client::ID_FIELD;
/// Stored name of the creation timestamp.
pub const CREATED_AT_FIELD: &str = "created_at";
/// Stored name of the expiry timestamp.
pub const EXPIRES_AT_FIELD: &str = "expires_at";

/// A UTC instant with millisecond precision.
///
/// Stored as integer milliseconds since the Unix epoch, which keeps stored
/// values ordered and directly comparable by TTL indexes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        let now = Utc::now();
        Self::from_millis(now.timestamp_millis()).unwrap_or(Self(now))
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    ///
    /// Returns `None` if the value is outside the supported range.
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// The underlying date-time.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// This instant plus a number of calendar months, saturating at the
    /// latest representable date.
    #[must_use]
    pub fn add_months(&self, months: u32) -> Self {
        Self(
            self.0
                .checked_add_months(Months::new(months))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_millis(value.timestamp_millis()).unwrap_or(Self(value))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0.to_rfc3339())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_millis())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        Self::from_millis(millis)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {millis}")))
    }
}

/// The fields every stored entity carries: identity, creation and expiry.
///
/// Embed it in an entity with `#[serde(flatten)]`. Fields are private and
/// fixed at construction: the identity is never reassigned.
///
/// ```
/// use entistore_core::{EntityHeader, Guid};
///
/// let header: EntityHeader<Guid> = EntityHeader::new();
/// assert!(header.expires_at() > header.created_at());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityHeader<I> {
    #[serde(rename = "_id")]
    id: I,
    created_at: Timestamp,
    expires_at: Timestamp,
}

impl<I: EntityKey> EntityHeader<I> {
    /// A header with a generated identity and the default retention.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(I::generate())
    }

    /// A header with the given identity and the default retention.
    #[must_use]
    pub fn with_id(id: I) -> Self {
        Self::build(id, DEFAULT_RETENTION_MONTHS)
    }

    /// A header with a generated identity expiring `months` after creation.
    #[must_use]
    pub fn with_retention(months: u32) -> Self {
        Self::build(I::generate(), months)
    }

    fn build(id: I, months: u32) -> Self {
        let created_at = Timestamp::now();
        Self {
            id,
            created_at,
            expires_at: created_at.add_months(months),
        }
    }

    /// The identity.
    #[must_use]
    pub const fn id(&self) -> &I {
        &self.id
    }

    /// When the entity was constructed.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// When the store may expire the entity.
    #[must_use]
    pub const fn expires_at(&self) -> Timestamp {
        self.expires_at
    }
}

impl<I: EntityKey> Default for EntityHeader<I> {
    fn default() -> Self {
        Self::new()
    }
}
