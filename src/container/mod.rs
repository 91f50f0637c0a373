//! Bento-style object container.
//!
//! The container is the storage engine underneath OMF: it knows objects,
//! named properties and types, byte-string values and persistent references,
//! but nothing about OMF classes or byte order.
//!
//! ## File Structure
//!
//! ```text
//! +------------------+
//! | Magic: "Bento"   |  5 bytes
//! +------------------+
//! | Complete flag    |  1 byte (0x00 or 0xFF)
//! +------------------+
//! | Version          |  2 bytes (u16 BE)
//! +------------------+
//! | TOC position     |  8 bytes (u64 LE)
//! +------------------+
//! | Value data ...   |
//! +------------------+
//! | TOC              |  dictionary, root, objects, values, references
//! +------------------+
//! ```

mod format;
mod reader;
mod store;
mod writer;

pub use format::*;
pub use reader::{load, IStreams};
pub use store::*;
pub use writer::{save, STAGING_SUFFIX};
