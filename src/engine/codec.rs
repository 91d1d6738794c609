//! JSON codec for the proof engine protocol.
//!
//! This module centralizes serialization for everything that crosses the
//! engine boundary. Transports call through here instead of reaching for
//! `serde_json` directly, so requests and replies are encoded the same way
//! everywhere and failures carry enough context to diagnose.
//!
//! # Examples
//!
//! ```
//! use proofline::engine::codec::{encode, decode};
//!
//! // Encode any serializable type
//! let data: u32 = 42;
//! let json = encode(&data).expect("encoding should succeed");
//! assert_eq!(json, "42");
//!
//! // Decode from JSON text
//! let decoded: u32 = decode(&json).expect("decoding should succeed");
//! assert_eq!(data, decoded);
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

use crate::engine::command::EngineRequest;
use crate::engine::reply::EngineReply;

/// Represents what was being performed when a codec error occurred.
///
/// This helps with debugging by indicating what we were trying to encode
/// or decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecOperation {
    /// Encoding an engine request.
    EncodeRequest,
    /// Decoding an engine reply.
    DecodeReply,
    /// A generic encoding operation.
    Encode,
    /// A generic decoding operation.
    Decode,
}

impl fmt::Display for CodecOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncodeRequest => write!(f, "encoding engine request"),
            Self::DecodeReply => write!(f, "decoding engine reply"),
            Self::Encode => write!(f, "encoding"),
            Self::Decode => write!(f, "decoding"),
        }
    }
}

/// Errors that can occur during encoding or decoding.
///
/// Error messages are stored as `String`: `serde_json` reports failures as
/// formatted text (`"EOF while parsing a value"`, `"invalid type: ..."`), and
/// codec failures are exceptional conditions off the hot path, so preserving
/// the formatted diagnostic matters more than avoiding the allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// The encoding operation failed.
    EncodeError {
        /// The underlying serde_json error message.
        message: String,
        /// The operation that was being performed.
        operation: CodecOperation,
    },
    /// The decoding operation failed.
    DecodeError {
        /// The underlying serde_json error message.
        message: String,
        /// The operation that was being performed.
        operation: CodecOperation,
    },
}

impl CodecError {
    /// Creates a new encode error with the given message and operation.
    pub fn encode(message: impl Into<String>, operation: CodecOperation) -> Self {
        Self::EncodeError {
            message: message.into(),
            operation,
        }
    }

    /// Creates a new decode error with the given message and operation.
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
        }
    }
}

impl std::error::Error for CodecError {}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Encodes a value as a JSON string.
///
/// # Examples
///
/// ```
/// use proofline::engine::codec::encode;
///
/// let json = encode(&vec![1u32, 2, 3]).expect("encoding should succeed");
/// assert_eq!(json, "[1,2,3]");
/// ```
pub fn encode<T: Serialize>(value: &T) -> CodecResult<String> {
    serde_json::to_string(value)
        .map_err(|e| CodecError::encode(e.to_string(), CodecOperation::Encode))
}

/// Encodes a value as JSON bytes.
///
/// The bytes are the UTF-8 text [`encode`] would produce. Useful for
/// transports that hand frames around as `Vec<u8>`.
pub fn encode_vec<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| CodecError::encode(e.to_string(), CodecOperation::Encode))
}

/// Decodes a value from JSON text.
///
/// # Examples
///
/// ```
/// use proofline::engine::codec::decode;
///
/// let decoded: Vec<u32> = decode("[1,2,3]").expect("decoding should succeed");
/// assert_eq!(decoded, vec![1, 2, 3]);
/// ```
pub fn decode<T: DeserializeOwned>(json: &str) -> CodecResult<T> {
    serde_json::from_str(json)
        .map_err(|e| CodecError::decode(e.to_string(), CodecOperation::Decode))
}

/// Decodes a value from JSON bytes.
pub fn decode_slice<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| CodecError::decode(e.to_string(), CodecOperation::Decode))
}

/// Encodes one engine request, tagging failures as request encoding.
///
/// # Examples
///
/// ```
/// use proofline::engine::codec::encode_request;
/// use proofline::engine::command::{EngineCommand, EngineRequest, RequestToken};
/// use proofline::SessionId;
///
/// let request = EngineRequest::new(
///     RequestToken::new(1),
///     EngineCommand::GameState {
///         game_id: SessionId::new(17),
///     },
/// );
/// let json = encode_request(&request).expect("encoding should succeed");
/// assert!(json.contains("\"token\":1"));
/// ```
pub fn encode_request(request: &EngineRequest) -> CodecResult<String> {
    serde_json::to_string(request)
        .map_err(|e| CodecError::encode(e.to_string(), CodecOperation::EncodeRequest))
}

/// Decodes one engine reply, tagging failures as reply decoding.
///
/// # Examples
///
/// ```
/// use proofline::engine::codec::{decode_reply, encode};
/// use proofline::engine::command::RequestToken;
/// use proofline::engine::reply::EngineReply;
///
/// let reply: EngineReply<u32> = EngineReply::ack(RequestToken::new(4));
/// let json = encode(&reply).expect("encoding should succeed");
/// let decoded: EngineReply<u32> = decode_reply(&json).expect("decoding should succeed");
/// assert_eq!(decoded, reply);
/// ```
pub fn decode_reply<M: DeserializeOwned>(json: &str) -> CodecResult<EngineReply<M>> {
    serde_json::from_str(json)
        .map_err(|e| CodecError::decode(e.to_string(), CodecOperation::DecodeReply))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::command::{EngineCommand, RequestToken};
    use crate::engine::reply::{ReplyBody, StateBody};
    use crate::{GameStatus, SessionId};

    #[test]
    fn test_encode_decode_roundtrip_primitive() {
        let original: u32 = 12345;
        let json = encode(&original).unwrap();
        let decoded: u32 = decode(&json).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_encode_decode_roundtrip_request() {
        let original = EngineRequest::new(
            RequestToken::new(7),
            EngineCommand::ApplyRule {
                game_id: SessionId::new(17),
                expr_id: 2,
                rule_id: 5,
                context: "LR".to_owned(),
            },
        );
        let json = encode_request(&original).unwrap();
        let decoded: EngineRequest = decode(&json).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_encode_decode_roundtrip_reply() {
        let original: EngineReply<u32> = EngineReply::ok(
            RequestToken::new(3),
            ReplyBody::State(StateBody {
                text: "x + 0".to_owned(),
                math: 40,
                status: GameStatus::InProgress,
            }),
        );
        let json = encode(&original).unwrap();
        let decoded: EngineReply<u32> = decode_reply(&json).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_encode_vec_matches_encode() {
        let request = EngineRequest::new(
            RequestToken::new(1),
            EngineCommand::Delete {
                game_id: SessionId::new(8),
            },
        );
        let text = encode(&request).unwrap();
        let bytes = encode_vec(&request).unwrap();
        assert_eq!(bytes, text.as_bytes());

        let decoded: EngineRequest = decode_slice(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_decode_invalid_data() {
        let result: CodecResult<EngineReply<u32>> = decode_reply("{not json at all");
        assert!(matches!(result, Err(CodecError::DecodeError { .. })));
    }

    #[test]
    fn test_decode_wrong_shape() {
        // Valid JSON, wrong structure for a reply.
        let result: CodecResult<EngineReply<u32>> = decode_reply(r#"{"unexpected":true}"#);
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            CodecError::DecodeError {
                operation: CodecOperation::DecodeReply,
                ..
            }
        ));
    }

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::EncodeError {
            message: "test error".to_string(),
            operation: CodecOperation::Encode,
        };
        assert!(err.to_string().contains("encoding failed"));
        assert!(err.to_string().contains("test error"));

        let err = CodecError::DecodeError {
            message: "test error".to_string(),
            operation: CodecOperation::DecodeReply,
        };
        assert!(err.to_string().contains("decoding failed"));
        assert!(err.to_string().contains("engine reply"));
    }

    #[test]
    fn test_codec_operation_display() {
        assert!(format!("{}", CodecOperation::Encode).contains("encoding"));
        assert!(format!("{}", CodecOperation::Decode).contains("decoding"));
        assert!(format!("{}", CodecOperation::EncodeRequest).contains("engine request"));
        assert!(format!("{}", CodecOperation::DecodeReply).contains("engine reply"));
    }

    #[test]
    fn test_codec_error_helper_methods() {
        let encode_err = CodecError::encode("test", CodecOperation::Encode);
        assert!(matches!(encode_err, CodecError::EncodeError { .. }));

        let decode_err = CodecError::decode("test", CodecOperation::Decode);
        assert!(matches!(decode_err, CodecError::DecodeError { .. }));
    }

    #[test]
    fn test_codec_error_equality() {
        let err1 = CodecError::encode("test", CodecOperation::Encode);
        let err2 = CodecError::encode("test", CodecOperation::Encode);
        let err3 = CodecError::encode("different", CodecOperation::Encode);
        let err4 = CodecError::encode("test", CodecOperation::EncodeRequest);

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
        assert_ne!(err1, err4);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let request = EngineRequest::new(
            RequestToken::new(2),
            EngineCommand::Timeline {
                game_id: SessionId::new(17),
                index: crate::StateIndex::new(4),
            },
        );
        let json1 = encode_request(&request).unwrap();
        let json2 = encode_request(&request).unwrap();
        assert_eq!(json1, json2, "Encoding must be stable for token correlation");
    }
}
