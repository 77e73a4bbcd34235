//! Error types for model compilation, record binding and stream handling.
//!
//! Errors fall into three groups:
//! - **configuration** errors, raised while a model is compiled and before
//!   any line is read;
//! - **data** errors, raised while binding a single line (they carry the
//!   source line number and, where one applies, the field position);
//! - **stream** errors, raised by the orchestration over the whole input.
//!
//! Every error is fatal for the call that produced it.

use crate::value::FieldKind;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BindError>;

/// Failure raised by a [`FormatConverter`](crate::format::FormatConverter).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("cannot parse {token:?} as {kind}: {reason}")]
    Parse {
        token: String,
        kind: FieldKind,
        reason: String,
    },

    #[error("cannot format a {actual} value as {expected}")]
    KindMismatch {
        expected: FieldKind,
        actual: &'static str,
    },

    #[error("date pattern {pattern:?} cannot be used for writing")]
    Pattern { pattern: String },
}

/// Every failure surfaced by this crate.
#[derive(Debug, Error)]
pub enum BindError {
    // --- configuration -----------------------------------------------------
    #[error("record type `{0}` is not registered")]
    UnknownType(String),

    #[error("record type `{0}` is registered twice")]
    DuplicateType(String),

    #[error("one-to-many field `{field}` of `{record}` declares no element type")]
    MissingElementType { record: String, field: String },

    #[error("duplicate field position {position}: `{first}` and `{second}`")]
    DuplicatePosition {
        position: usize,
        first: String,
        second: String,
    },

    #[error("offset/position of the field `{record}.{field}` must be at least 1")]
    InvalidPosition { record: String, field: String },

    #[error(
        "field `{record}.{field}` at position {position} must declare exactly one of length, delimiter or length_ref"
    )]
    InvalidFieldLength {
        record: String,
        field: String,
        position: usize,
    },

    #[error("field `{record}.{field}` takes its length from position {length_ref}, which {reason}")]
    InvalidLengthRef {
        record: String,
        field: String,
        length_ref: usize,
        reason: &'static str,
    },

    #[error("record types `{first}` and `{second}` both declare a layout")]
    AmbiguousLayout { first: String, second: String },

    #[error("invalid layout for `{record}`: {reason}")]
    InvalidLayout { record: String, reason: &'static str },

    #[error("field `{record}.{field}` has an invalid date pattern {pattern:?}")]
    InvalidPattern {
        record: String,
        field: String,
        pattern: String,
    },

    #[error("unknown transform `{0}`")]
    UnknownTransform(String),

    #[error("invalid model definition: {0}")]
    ModelFile(#[from] toml::de::Error),

    // --- data --------------------------------------------------------------
    #[error("mandatory field `{record}.{field}` at position {position} is empty, line: {line}")]
    MandatoryFieldEmpty {
        record: String,
        field: String,
        position: usize,
        line: usize,
    },

    #[error("parsing error for field `{record}.{field}` at position {position}, line: {line}: {source}")]
    Conversion {
        record: String,
        field: String,
        position: usize,
        line: usize,
        #[source]
        source: FormatError,
    },

    #[error("transform `{transform}` failed for field `{record}.{field}` at position {position}, line: {line}: {message}")]
    Transform {
        record: String,
        field: String,
        position: usize,
        line: usize,
        transform: String,
        message: String,
    },

    #[error(
        "delimiter {delimiter:?} of field `{record}.{field}` at position {position} not found, line: {line}"
    )]
    DelimiterNotFound {
        record: String,
        field: String,
        position: usize,
        delimiter: String,
        line: usize,
    },

    #[error(
        "field `{record}.{field}` takes its length from position {length_ref}, which holds no usable length, line: {line}"
    )]
    InvalidLengthValue {
        record: String,
        field: String,
        length_ref: usize,
        line: usize,
    },

    #[error("size of the record: {actual} is not equal to the value provided in the model: {expected}, line: {line}")]
    RecordLength {
        expected: usize,
        actual: usize,
        line: usize,
    },

    #[error("unexpected / unmapped characters found at the end of the fixed-length record, line: {line}")]
    TrailingCharacters { line: usize },

    #[error("some fields are missing (optional or mandatory), line: {line}")]
    FieldsMissing { line: usize },

    #[error("some mandatory fields are missing, line: {line}")]
    MandatoryFieldsMissing { line: usize },

    #[error("link field `{record}.{field}` points at `{target}`, which is missing from the record graph")]
    LinkTargetMissing {
        record: String,
        field: String,
        target: String,
    },

    #[error("field `{record}.{field}` has no value")]
    MissingValue { record: String, field: String },

    #[error("value of field `{record}.{field}` has {actual} characters and does not fit its length {length}")]
    FieldTooLong {
        record: String,
        field: String,
        length: usize,
        actual: usize,
    },

    #[error("formatting error for field `{record}.{field}` at position {position}: {source}")]
    Format {
        record: String,
        field: String,
        position: usize,
        #[source]
        source: FormatError,
    },

    // --- stream ------------------------------------------------------------
    #[error("no records have been defined in the file")]
    NoRecords,

    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl BindError {
    /// True for errors raised while compiling a model, before any input is read.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownType(_)
                | Self::DuplicateType(_)
                | Self::MissingElementType { .. }
                | Self::DuplicatePosition { .. }
                | Self::InvalidPosition { .. }
                | Self::InvalidFieldLength { .. }
                | Self::InvalidLengthRef { .. }
                | Self::AmbiguousLayout { .. }
                | Self::InvalidLayout { .. }
                | Self::InvalidPattern { .. }
                | Self::UnknownTransform(_)
                | Self::ModelFile(_)
        )
    }

    /// True for errors raised while binding or writing one record.
    pub fn is_data(&self) -> bool {
        !self.is_configuration()
            && !matches!(self, Self::NoRecords | Self::Encoding(_) | Self::Io(_))
    }

    /// Source line the error was raised for, when it belongs to one line.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MandatoryFieldEmpty { line, .. }
            | Self::Conversion { line, .. }
            | Self::Transform { line, .. }
            | Self::DelimiterNotFound { line, .. }
            | Self::InvalidLengthValue { line, .. }
            | Self::RecordLength { line, .. }
            | Self::TrailingCharacters { line }
            | Self::FieldsMissing { line }
            | Self::MandatoryFieldsMissing { line } => Some(*line),
            _ => None,
        }
    }
}
