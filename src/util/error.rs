//! Error types for the OMF toolkit.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::{ClassId, PropCode, TypeCode};

/// Main error type for OMF operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of container
    #[error("Invalid OMF file: expected Bento container magic bytes")]
    InvalidMagic,

    /// Unsupported container version
    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u16),

    /// File is truncated or corrupted
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// The property has no value on this object
    #[error("Property not present on object")]
    PropertyNotPresent,

    /// Property code is not known to the registry or not valid for this revision
    #[error("Bad property code {0}")]
    BadProperty(PropCode),

    /// Type code is not known to the registry or not valid for this revision
    #[error("Bad type code {0}")]
    BadType(TypeCode),

    /// Class id is not known to the registry
    #[error("Bad class id {0}")]
    BadClass(ClassId),

    /// Object class does not match the property or type being accessed
    #[error("Object semantic error: {0}")]
    ObjectSemantic(String),

    /// A symbolic name is already bound to a different code
    #[error("Name {name} already registered with code {existing}")]
    DuplicateName { name: String, existing: u32 },

    /// Too many type variants registered for one property
    #[error("Property {0} already has the maximum number of type variants")]
    TooManyTypeVariants(PropCode),

    /// Superclass chain does not terminate
    #[error("Superclass chain starting at {0} does not terminate")]
    ClassCycle(ClassId),

    /// Read started at or ran past the end of the stored value
    #[error("End of data")]
    EndOfData,

    /// Array index out of range
    #[error("Bad index {index} (length: {len})")]
    BadIndex { index: u32, len: u32 },

    /// 1-based API called with index 0
    #[error("Index must be positive")]
    RequirePositive,

    /// Array element count would not fit the 16-bit header
    #[error("Array property is full ({0} elements)")]
    ArrayFull(u32),

    /// Swap-required type with a size that has no swap primitive
    #[error("Unable to swap {0} bytes")]
    SwapFailed(usize),

    /// Source and destination widths disagree for a revision-sensitive accessor
    #[error("Type width mismatch: expected {expected} bytes, type holds {actual}")]
    TypeWidthMismatch { expected: usize, actual: usize },

    /// Value does not fit the on-disk representation
    #[error("Value {0} out of range for this file revision")]
    ValueOutOfRange(i64),

    /// Stored bytes do not decode as the requested type
    #[error("Invalid value data: {0}")]
    InvalidData(String),

    /// Generic container problem
    #[error("Container problem: {0}")]
    Container(String),

    /// Container refused or failed a write
    #[error("Container write failed: {0}")]
    ContainerWrite(String),

    /// Codec does not implement the requested operation
    #[error("Invalid operation for codec {codec}: {op}")]
    InvalidOpForCodec { codec: String, op: &'static str },

    /// Property writes are blocked while media is being streamed to the file
    #[error("Cannot write properties while media is streaming (media {0})")]
    WriteBlockedByMedia(u32),

    /// A codec with this id is already registered
    #[error("Codec already registered: {0}")]
    DuplicateCodec(String),

    /// No codec registered for an id or descriptor class
    #[error("Codec not found: {0}")]
    CodecNotFound(String),

    /// Codec revision is outside what this build dispatches
    #[error("Codec {codec} has unsupported revision {revision}")]
    CodecRevision { codec: String, revision: u32 },

    /// Codec does not handle files of this revision
    #[error("Codec {codec} does not support {revision} files")]
    FileRevisionUnsupported { codec: String, revision: String },

    /// Media handle operation in the wrong state
    #[error("Media error: {0}")]
    Media(String),

    /// File still has open media handles
    #[error("File has {0} open media handle(s)")]
    MediaStillOpen(usize),

    /// File opened read-only
    #[error("File is read-only")]
    ReadOnly,

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// True for the recoverable "optional field missing" case.
    pub fn is_not_present(&self) -> bool {
        matches!(self, Self::PropertyNotPresent)
    }

    /// True when a codec declined an operation it does not implement.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::InvalidOpForCodec { .. })
    }
}

/// Result type alias for OMF operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Extension for treating "not present" as an absent optional value.
pub trait OptionalExt<T> {
    /// Map `PropertyNotPresent` to `Ok(None)`.
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for Result<T> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(Error::PropertyNotPresent) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
