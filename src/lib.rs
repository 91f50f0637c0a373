//! # OMF
//!
//! Rust toolkit for the Open Media Framework interchange format, revisions
//! 1.x and 2.x.
//!
//! OMF files are object graphs kept in a "Bento" style container. Every
//! object has a class; its properties are typed values looked up through a
//! schema registry that maps symbolic codes to the names and types each
//! revision uses on disk. Essence (audio and video samples) is read and
//! written through codecs selected by media descriptor class.
//!
//! ## Modules
//!
//! - [`util`] - Errors, byte-order primitives, 80-bit extended floats
//! - [`container`] - The object/value container and its on-disk format
//! - [`core`] - Class ids, type and property codes, value types, the registry
//! - [`file`] - Sessions, open files and the property accessors
//! - [`codec`] - The codec interface and the built-in codecs
//! - [`media`] - Media handles for streaming essence
//!
//! ## Example
//!
//! ```ignore
//! use omf::prelude::*;
//!
//! let session = Session::begin()?;
//! let mut file = session.open_file("edit.omf")?;
//! let head = file.head();
//! for mob in file.read_obj_refs(head, PropCode::HEAD_MOBS)? {
//!     println!("{}", file.read_string(mob, PropCode::MOBJ_NAME)?);
//! }
//! ```

pub mod util;
pub mod container;
pub mod core;
pub mod file;
pub mod codec;
pub mod media;

// Re-export commonly used types
pub use util::{ByteOrder, Error, Result};
pub use file::{OmfFile, Session};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{ByteOrder, Error, Result};
    pub use crate::container::ObjectId;
    pub use crate::core::{
        ClassId, EditHint, FadeType, FrameLayout, PropCode, Rational, Revision, TimeStamp, TypeCode, Uid,
        ValidRevisions, VersionType,
    };
    pub use crate::file::{FileOptions, OmfFile, Session, SessionConfig, SwapPolicy};
    pub use crate::codec::{AudioInfo, Codec, DataKind, InfoSelector, MediaInfo, VideoInfo};
    pub use crate::media::{MediaHandle, MediaParams};
}
