//! Bento container format constants.

/// Magic bytes at the start of a container file.
pub const BENTO_MAGIC: &[u8; 5] = b"Bento";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the complete flag in the header.
pub const COMPLETE_OFFSET: usize = 5;

/// Offset of the version in the header.
pub const VERSION_OFFSET: usize = 6;

/// Offset of the table-of-contents position in the header.
pub const TOC_POS_OFFSET: usize = 8;

/// Current container format version.
pub const CURRENT_VERSION: u16 = 1;

/// Flag value once the TOC has been written.
pub const COMPLETE_FLAG: u8 = 0xFF;

/// Values up to this size live in the TOC entry itself.
pub const IMMEDIATE_LIMIT: usize = 4;

/// TOC storage tag for an immediate value.
pub const STORAGE_IMMEDIATE: u8 = 0;

/// TOC storage tag for an out-of-line value.
pub const STORAGE_EXTERNAL: u8 = 1;

/// Root id marker for "no root object".
pub const NO_ROOT: u32 = u32::MAX;

/// Reference token meaning "no object".
pub const NULL_TOKEN: u32 = 0;
