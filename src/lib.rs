//! # apwatch - 802.11 Beacon Fingerprinting Daemon
//!
//! apwatch captures raw IEEE 802.11 management frames from a monitoring
//! endpoint, decodes beacon frames down to their information elements, and
//! runs a small user-authored extraction script over the decoded fields to
//! compute a per-beacon fingerprint. Fingerprints are persisted per SSID so
//! that a change in an access point's advertised configuration shows up as a
//! new row.
//!
//! ## Architecture
//!
//! The implementation is organized into several modules:
//! - `number`: arbitrary-length byte values with bit/byte slicing
//! - `element`: beacon information elements (tagged variable-length fields)
//! - `frame`: 802.11 MAC header and beacon body decoding
//! - `script`: the extraction-script compiler and its executable tree
//! - `daemon`: capture loop, configuration, and the fingerprint store

pub mod element;
pub mod frame;
pub mod number;
pub mod script;

// Daemon modules
pub mod daemon;

// Re-export commonly used types
pub use crate::{
    element::{InformationElement, InformationElementList},
    frame::{Frame, FrameBody},
    number::BigNumber,
    script::{Compiler, ExecutableTree, FunctionKind, Node},
};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApWatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid hex encoding: {0:?}")]
    InvalidEncoding(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("use of null value in {0}")]
    NullValue(String),

    #[error("value too wide for a native integer: {0}")]
    Overflow(String),

    #[error("no decoder for frame type {frame_type} subtype {subtype}")]
    UnsupportedFrameType { frame_type: u64, subtype: u64 },

    #[error("buffer too short: {0}")]
    BufferTooShort(String),

    #[error("frame has no raw data to decode")]
    NoRawData,

    #[error("frame must be decoded before field lookup")]
    FrameNotDecoded,

    #[error("unknown function {name:?} at line {line}")]
    UnknownFunction { name: String, line: usize },

    #[error("'}}' without an open function block at line {line}")]
    UnmatchedClose { line: usize },

    #[error("function block opened but never closed")]
    UnterminatedFunction,

    #[error("trailing code at line {line}: {text:?}")]
    TrailingCode { line: usize, text: String },

    #[error("{function} expects 3 arguments, got {got}")]
    TooFewArguments { function: &'static str, got: usize },

    #[error("{function} expects 3 arguments, got {got}")]
    TooManyArguments { function: &'static str, got: usize },

    #[error("{function}: argument {value:?} is not an unsigned integer")]
    InvalidArgument { function: &'static str, value: String },

    #[error("executable tree already has a root expression")]
    DuplicateRoot,

    #[error("script produced no expression")]
    EmptyTree,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, ApWatchError>;

// Constants

/// Maximum length of a raw beacon frame in bytes.
pub const BEACON_FRAME_MAX_LENGTH: usize = 2346;

/// Fixed MAC header length consumed by the decoder (up to sequence control).
pub const FRAME_HEADER_LENGTH: usize = 24;

/// Length of the trailing frame check sequence.
pub const FRAME_CHECK_SUM_LENGTH: usize = 4;

/// Fixed beacon body prefix: timestamp(8) + interval(2) + capabilities(2).
pub const BEACON_BODY_FIXED_LENGTH: usize = 12;

/// Information element tag of the SSID.
pub const IE_TAG_SSID: u8 = 0;
