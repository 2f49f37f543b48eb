//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while converting between typed values and documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to serialize a typed value.
    #[error("serialization failed: {message}")]
    SerializationFailed {
        /// Description of the serialization error.
        message: String,
    },

    /// Failed to deserialize a typed value.
    #[error("deserialization failed: {message}")]
    DeserializationFailed {
        /// Description of the deserialization error.
        message: String,
    },

    /// Failed to write CBOR bytes.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to read CBOR bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// A value was expected to be a document but was something else.
    #[error("expected a document, found {found}")]
    NotADocument {
        /// Kind of value that was found instead.
        found: &'static str,
    },

    /// A map key was not a text string.
    #[error("document keys must be text")]
    NonTextKey,

    /// Integer does not fit in a signed 64-bit value.
    #[error("integer overflow")]
    IntegerOverflow,

    /// Unsupported CBOR type.
    #[error("unsupported CBOR type: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported type.
        type_name: String,
    },
}

impl CodecError {
    /// Create a serialization failed error.
    pub fn serialization_failed(message: impl Into<String>) -> Self {
        Self::SerializationFailed {
            message: message.into(),
        }
    }

    /// Create a deserialization failed error.
    pub fn deserialization_failed(message: impl Into<String>) -> Self {
        Self::DeserializationFailed {
            message: message.into(),
        }
    }

    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }
}
