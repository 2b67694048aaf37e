//! Every participant must produce identical bytes for identical messages, so the
//! bincode configuration lives here and nowhere else.
//!
//! # Examples
//!
//! ```
//! use arson_mode::network::codec::{decode_message, encode_message};
//! use arson_mode::{RoomId, SyncMessage};
//!
//! let message = SyncMessage::FireSpread { room: RoomId::from("Lobby") };
//! let bytes = encode_message(&message)?;
//! assert_eq!(decode_message(&bytes)?, message);
//! # Ok::<(), arson_mode::CodecError>(())
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

use crate::error::ArsonError;
use crate::SyncMessage;

// Fixed-width integers keep message sizes independent of field values.
fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// What the codec was doing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecOperation {
    /// Encoding a [`SyncMessage`].
    EncodeMessage,
    /// Decoding a [`SyncMessage`].
    DecodeMessage,
    /// Encoding into a caller-provided buffer.
    EncodeIntoBuffer,
    /// A generic encoding operation.
    Encode,
    /// A generic decoding operation.
    Decode,
}

impl fmt::Display for CodecOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncodeMessage => write!(f, "encoding relay message"),
            Self::DecodeMessage => write!(f, "decoding relay message"),
            Self::EncodeIntoBuffer => write!(f, "encoding into buffer"),
            Self::Encode => write!(f, "encoding"),
            Self::Decode => write!(f, "decoding"),
        }
    }
}

/// Errors raised while encoding or decoding.
///
/// Bincode errors only expose a rendered message, so that is what is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// Encoding failed.
    EncodeError {
        /// The underlying bincode message.
        message: String,
        /// The operation that was being performed.
        operation: CodecOperation,
    },
    /// Decoding failed.
    DecodeError {
        /// The underlying bincode message.
        message: String,
        /// The operation that was being performed.
        operation: CodecOperation,
    },
    /// The provided buffer was too small.
    BufferTooSmall {
        /// The actual buffer size provided.
        provided: usize,
    },
    /// Decoding succeeded but left unread bytes behind.
    TrailingBytes {
        /// Bytes consumed by the message.
        consumed: usize,
        /// Total bytes supplied.
        total: usize,
    },
}

impl CodecError {
    /// Creates an encode error.
    pub fn encode(message: impl Into<String>, operation: CodecOperation) -> Self {
        Self::EncodeError {
            message: message.into(),
            operation,
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>, operation: CodecOperation) -> Self {
        Self::DecodeError {
            message: message.into(),
            operation,
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncodeError { message, operation } => {
                write!(f, "encoding failed while {operation}: {message}")
            },
            Self::DecodeError { message, operation } => {
                write!(f, "decoding failed while {operation}: {message}")
            },
            Self::BufferTooSmall { provided } => {
                write!(f, "buffer too small: only {provided} bytes provided")
            },
            Self::TrailingBytes { consumed, total } => {
                write!(f, "message used {consumed} of {total} bytes")
            },
        }
    }
}

impl std::error::Error for CodecError {}

impl From<CodecError> for ArsonError {
    fn from(err: CodecError) -> Self {
        Self::SerializationError {
            context: err.to_string(),
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Encodes a value into a new `Vec<u8>`.
pub fn encode<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, config())
        .map_err(|e| CodecError::encode(e.to_string(), CodecOperation::Encode))
}

/// Encodes a value into an existing byte slice, returning the number of bytes written.
///
/// # Examples
///
/// ```
/// use arson_mode::network::codec::encode_into;
/// use arson_mode::SyncMessage;
///
/// let mut buffer = [0u8; 64];
/// let len = encode_into(&SyncMessage::AllFiresOut, &mut buffer)?;
/// assert_eq!(len, 4);
/// # Ok::<(), arson_mode::CodecError>(())
/// ```
pub fn encode_into<T: Serialize>(value: &T, buffer: &mut [u8]) -> CodecResult<usize> {
    bincode::serde::encode_into_slice(value, buffer, config()).map_err(|e| match e {
        bincode::error::EncodeError::UnexpectedEnd => CodecError::BufferTooSmall {
            provided: buffer.len(),
        },
        other => CodecError::encode(other.to_string(), CodecOperation::EncodeIntoBuffer),
    })
}

/// Decodes a value from a byte slice, returning it with the number of bytes consumed.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<(T, usize)> {
    bincode::serde::decode_from_slice(bytes, config())
        .map_err(|e| CodecError::decode(e.to_string(), CodecOperation::Decode))
}

/// Encodes a relay message.
pub fn encode_message(message: &SyncMessage) -> CodecResult<Vec<u8>> {
    bincode::serde::encode_to_vec(message, config())
        .map_err(|e| CodecError::encode(e.to_string(), CodecOperation::EncodeMessage))
}

/// Decodes a relay message. The slice must hold exactly one message.
pub fn decode_message(bytes: &[u8]) -> CodecResult<SyncMessage> {
    let (message, consumed) = bincode::serde::decode_from_slice(bytes, config())
        .map_err(|e| CodecError::decode(e.to_string(), CodecOperation::DecodeMessage))?;
    if consumed != bytes.len() {
        return Err(CodecError::TrailingBytes {
            consumed,
            total: bytes.len(),
        });
    }
    Ok(message)
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::{PlayerId, RoomId};

    #[test]
    fn relay_message_survives_the_wire() {
        let original = SyncMessage::ArsonTaskCompleted {
            player: PlayerId::from("p7"),
            index: 3,
        };
        let bytes = encode_message(&original).unwrap();
        assert_eq!(decode_message(&bytes).unwrap(), original);
    }

    #[test]
    fn unit_variants_encode_as_fixed_width_tag() {
        assert_eq!(encode(&SyncMessage::ArsonistWin).unwrap().len(), 4);
    }

    #[test]
    fn encoding_is_deterministic() {
        let msg = SyncMessage::FireIgnited {
            room: RoomId::from("Kitchen"),
        };
        assert_eq!(encode(&msg).unwrap(), encode_message(&msg).unwrap());
        assert_eq!(encode(&msg).unwrap(), encode(&msg).unwrap());
    }

    #[test]
    fn encode_into_reports_small_buffer() {
        let msg = SyncMessage::FireIgnited {
            room: RoomId::from("A very long room name"),
        };
        let mut buffer = [0u8; 4];
        assert!(matches!(
            encode_into(&msg, &mut buffer),
            Err(CodecError::BufferTooSmall { provided: 4 })
        ));
    }

    #[test]
    fn truncated_message_fails_to_decode() {
        let bytes = encode_message(&SyncMessage::FireSpread {
            room: RoomId::from("Lobby"),
        })
        .unwrap();
        let err = decode_message(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::DecodeError {
                operation: CodecOperation::DecodeMessage,
                ..
            }
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = encode_message(&SyncMessage::AllFiresOut).unwrap();
        bytes.push(0);
        assert_eq!(
            decode_message(&bytes),
            Err(CodecError::TrailingBytes {
                consumed: 4,
                total: 5
            })
        );
    }

    #[test]
    fn unknown_tag_fails_to_decode() {
        assert!(decode_message(&[0xFF, 0xFF, 0xFF, 0x7F]).is_err());
    }

    #[test]
    fn codec_error_converts_to_serialization_error() {
        let err: ArsonError = CodecError::decode("bad tag", CodecOperation::DecodeMessage).into();
        assert_eq!(
            err,
            ArsonError::SerializationError {
                context: "decoding failed while decoding relay message: bad tag".to_owned()
            }
        );
    }
}
