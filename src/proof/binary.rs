//! Binary Proof Codec
//!
//! Compact form used for storage and transport:
//!
//! ```text
//! proof document ──► MessagePack (named maps) ──► zlib deflate ──► bytes
//!                                                                   │
//!                                                     hex / base64 text (optional)
//! ```
//!
//! The format is shared with deployed verifiers. Do not change the packing,
//! the compression, or the key names.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::debug;

use crate::core::encoding::looks_like_hex;
use crate::proof::document::Proof;
use crate::proof::schema::{self, SchemaError};

/// Upper bound on an inflated proof.
pub const MAX_INFLATED_SIZE: u64 = 8 * 1024 * 1024;

/// Anything a caller may hand to the codec or the parser.
#[derive(Clone, Debug, PartialEq)]
pub enum ProofInput {
    /// Nothing was provided.
    Missing,
    /// Structured proof.
    Document(Proof),
    /// JSON object form of a proof.
    Object(serde_json::Value),
    /// Raw binary proof.
    Binary(Vec<u8>),
    /// Hex or base64 text of a binary proof.
    Text(String),
    /// A value of a type no proof can be read from.
    Unsupported(&'static str),
}

impl From<Proof> for ProofInput {
    fn from(proof: Proof) -> Self {
        Self::Document(proof)
    }
}

impl From<&Proof> for ProofInput {
    fn from(proof: &Proof) -> Self {
        Self::Document(proof.clone())
    }
}

impl From<Vec<u8>> for ProofInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for ProofInput {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

impl From<String> for ProofInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ProofInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for ProofInput {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Missing,
            Value::Bool(_) => Self::Unsupported("boolean"),
            Value::Number(_) => Self::Unsupported("number"),
            Value::Array(_) => Self::Unsupported("array"),
            Value::String(text) => Self::Text(text),
            object @ Value::Object(_) => Self::Object(object),
        }
    }
}

impl<T: Into<ProofInput>> From<Option<T>> for ProofInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

/// Codec errors.
///
/// Messages are stable and never carry internal decoder detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Document handed to `encode` failed validation.
    #[error("not a well-formed proof: {0}")]
    NotWellFormed(SchemaError),

    /// No input was provided.
    #[error("no proof provided")]
    MissingInput,

    /// Input is of a type no binary proof can be read from.
    #[error("unsupported proof input of type {0}")]
    WrongType(&'static str),

    /// Bytes or text could not be unpacked.
    #[error("could not parse binary proof")]
    Unparseable,

    /// Unpacked document is not a valid proof.
    #[error("binary proof failed schema validation: {0}")]
    Schema(SchemaError),

    /// Packing or compression failed.
    #[error("could not serialize proof")]
    Serialize,
}

/// Encode a proof to raw bytes.
pub fn encode(proof: &Proof) -> Result<Vec<u8>, CodecError> {
    schema::validate(proof).map_err(CodecError::NotWellFormed)?;

    let packed = rmp_serde::to_vec_named(proof).map_err(|e| {
        debug!(error = %e, "msgpack packing failed");
        CodecError::Serialize
    })?;

    deflate(&packed).map_err(|e| {
        debug!(error = %e, "deflate failed");
        CodecError::Serialize
    })
}

/// Encode a proof as lowercase hex.
pub fn encode_hex(proof: &Proof) -> Result<String, CodecError> {
    encode(proof).map(hex::encode)
}

/// Encode a proof as standard base64.
pub fn encode_base64(proof: &Proof) -> Result<String, CodecError> {
    encode(proof).map(|bytes| BASE64.encode(bytes))
}

/// Decode raw bytes, hex text, or base64 text into a validated proof.
///
/// Either returns a schema-valid proof or fails; there is no partial result.
pub fn decode(input: impl Into<ProofInput>) -> Result<Proof, CodecError> {
    match input.into() {
        ProofInput::Missing => Err(CodecError::MissingInput),
        ProofInput::Binary(bytes) => decode_bytes(&bytes),
        ProofInput::Text(text) => decode_bytes(&text_to_bytes(&text)?),
        ProofInput::Document(_) => Err(CodecError::WrongType("document")),
        ProofInput::Object(_) => Err(CodecError::WrongType("object")),
        ProofInput::Unsupported(kind) => Err(CodecError::WrongType(kind)),
    }
}

/// Decode raw binary proof bytes.
pub fn decode_bytes(bytes: &[u8]) -> Result<Proof, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::MissingInput);
    }

    let packed = inflate(bytes).map_err(|e| {
        debug!(error = %e, "inflate failed");
        CodecError::Unparseable
    })?;

    let value: serde_json::Value = rmp_serde::from_slice(&packed).map_err(|e| {
        debug!(error = %e, "msgpack unpacking failed");
        CodecError::Unparseable
    })?;

    schema::validate_value(value).map_err(CodecError::Schema)
}

/// Turn proof text into bytes: even-length hex is hex, anything else must be base64.
fn text_to_bytes(text: &str) -> Result<Vec<u8>, CodecError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CodecError::MissingInput);
    }
    if looks_like_hex(text) {
        return hex::decode(text).map_err(|_| CodecError::Unparseable);
    }
    BASE64.decode(text).map_err(|e| {
        debug!(error = %e, "proof text is neither hex nor base64");
        CodecError::Unparseable
    })
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .take(MAX_INFLATED_SIZE + 1)
        .read_to_end(&mut out)?;
    if out.len() as u64 > MAX_INFLATED_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "inflated proof too large",
        ));
    }
    Ok(out)
}
