//! Entity identifiers.
//!
//! Every entity type picks exactly one identity strategy through its
//! `Entity::Id` type. The strategy is fixed for the lifetime of the type.

use entistore_codec::Value;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

/// How identities of an entity type are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdStrategy {
    /// Random 128-bit identifier.
    Guid,
    /// Database-native 12-byte object identifier.
    ObjectId,
    /// Time-ordered 64-bit sequence.
    Sequence,
}

/// Error parsing an identifier from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} identifier {input:?}")]
pub struct ParseIdError {
    kind: &'static str,
    input: String,
}

impl ParseIdError {
    fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_string(),
        }
    }
}

/// An entity identity type.
///
/// Implemented by [`Guid`], [`ObjectId`] and [`SequenceId`].
pub trait EntityKey:
    Clone
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + Serialize
    + for<'de> Deserialize<'de>
    + Send
    + Sync
    + 'static
{
    /// The generation strategy of this identity type.
    const STRATEGY: IdStrategy;

    /// Generates a fresh identity.
    fn generate() -> Self;

    /// The stored form of this identity, as used in `_id` filters.
    fn to_value(&self) -> Value;
}

/// A random (v4) UUID identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid(Uuid);

impl Guid {
    /// Creates a new random identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for Guid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self.0)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Guid {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ParseIdError::new("guid", s))
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl EntityKey for Guid {
    const STRATEGY: IdStrategy = IdStrategy::Guid;

    fn generate() -> Self {
        Self::new()
    }

    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

/// A 12-byte object identifier.
///
/// Layout: 4-byte big-endian creation seconds, 5 bytes of per-process
/// randomness, 3-byte big-endian counter. Ids created later in the same
/// process sort after earlier ones within the counter's range.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

fn process_unique() -> &'static [u8; 5] {
    static PROCESS: OnceLock<[u8; 5]> = OnceLock::new();
    PROCESS.get_or_init(rand::random)
}

fn object_counter() -> &'static AtomicU32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER.get_or_init(|| AtomicU32::new(rand::random::<u32>() & 0x00FF_FFFF))
}

impl ObjectId {
    /// Generates a new object id for the current time.
    #[must_use]
    pub fn new() -> Self {
        let seconds = u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX);
        let counter = object_counter().fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(process_unique());
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Creates an object id from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Creation time embedded in the id, in seconds since the Unix epoch.
    #[must_use]
    pub fn seconds(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Lower-case hex form (24 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for ObjectId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError::new("object", s);
        if s.len() != 24 || !s.is_ascii() {
            return Err(err());
        }
        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| err())?;
        }
        Ok(Self(bytes))
    }
}

impl EntityKey for ObjectId {
    const STRATEGY: IdStrategy = IdStrategy::ObjectId;

    fn generate() -> Self {
        Self::new()
    }

    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

/// Milliseconds from the Unix epoch to 2017-12-01T00:00:00Z, the sequence epoch.
pub const SEQUENCE_EPOCH_MILLIS: i64 = 1_512_086_400_000;

/// A time-ordered 64-bit identity.
///
/// The value is `(milliseconds since the sequence epoch) << 16 | counter`
/// where the 16-bit counter starts at a random value and wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceId(u64);

fn sequence_counter() -> &'static AtomicU16 {
    static COUNTER: OnceLock<AtomicU16> = OnceLock::new();
    COUNTER.get_or_init(|| AtomicU16::new(rand::random()))
}

impl SequenceId {
    /// Generates the next sequence value.
    #[must_use]
    pub fn new() -> Self {
        let counter = sequence_counter()
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1);
        let elapsed = chrono::Utc::now().timestamp_millis() - SEQUENCE_EPOCH_MILLIS;
        let elapsed = u64::try_from(elapsed).unwrap_or(0);
        Self((elapsed << 16) | u64::from(counter))
    }

    /// Wraps a raw sequence value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw sequence value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// The counter part of the sequence.
    #[must_use]
    pub const fn counter(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Milliseconds since the sequence epoch.
    #[must_use]
    pub const fn elapsed_millis(&self) -> u64 {
        self.0 >> 16
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SequenceId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse()
            .map(Self)
            .map_err(|_| ParseIdError::new("sequence", s))
    }
}

impl EntityKey for SequenceId {
    const STRATEGY: IdStrategy = IdStrategy::Sequence;

    fn generate() -> Self {
        Self::new()
    }

    // Stored as a signed integer: current values stay far below 2^63.
    #[allow(clippy::cast_possible_wrap)]
    fn to_value(&self) -> Value {
        Value::Integer(self.0 as i64)
    }
}

// Ids serialize as plain strings / integers so they survive being read back
// through `#[serde(flatten)]`, which buffers values before dispatch.

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

impl Serialize for SequenceId {
    #[allow(clippy::cast_possible_wrap)]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0 as i64)
    }
}

impl<'de> Deserialize<'de> for SequenceId {
    #[allow(clippy::cast_sign_loss)]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        if raw < 0 {
            return Err(de::Error::custom("sequence id cannot be negative"));
        }
        Ok(Self(raw as u64))
    }
}
