//! Sessions, open files and property access.
//!
//! A [`Session`] owns the schema registry and codec table. Files are opened
//! against a session and read or written through [`OmfFile`]:
//!
//! ```ignore
//! use omf::prelude::*;
//!
//! let session = Session::begin()?;
//! let mut file = session.create_file("out.omf", Revision::V2)?;
//! let mob = file.new_object(ClassId::CMOB)?;
//! file.write_string(mob, PropCode::MOBJ_NAME, "Reel 1")?;
//! file.close()?;
//! ```

mod access;
mod array;
mod handle;
mod objects;
mod session;
mod typed;

pub use access::SwapPolicy;
pub use array::{ARRAY_HEADER_SIZE, MAX_ARRAY_ELEMENTS};
pub use handle::{MediaId, MediaMode, OmfFile};
pub use objects::PropertyInfo;
pub use session::{FileOptions, ProductIdentification, Session, SessionConfig};
pub use typed::{fixed_width, MobIndexEntry, MIN_STRING_SIZE, OBJ_REF_SIZE, POSITION32_SIZE};
