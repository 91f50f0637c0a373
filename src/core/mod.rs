//! Core layer: identifiers, value types and the schema registry.
//!
//! This module provides:
//! - [`ClassId`], [`TypeCode`], [`PropCode`] - symbolic schema identifiers
//! - [`Revision`] / [`ValidRevisions`] - 1.x and 2.x file generations
//! - [`Registry`] - session-wide class, type and property tables
//! - [`FileCache`] - per-file code/handle maps
//! - Plain value types such as [`Rational`] and [`Uid`]

mod cache;
mod ids;
mod registry;
mod schema;
mod values;

pub use cache::{CachedProp, CachedType, FileCache};
pub use ids::{ClassId, PropCode, RevMap, Revision, TypeCode, ValidRevisions};
pub use registry::{
    ClassDef, ClassKind, PropDef, PropRow, Registry, SchemaEvent, SwapNeed, TypeDef,
    DYNAMIC_CODE_BASE, MAX_TYPE_VARIANTS, PROP_NAME_PREFIX, TYPE_NAME_PREFIX,
};
pub use values::{
    EditHint, FadeType, FrameLayout, ProductReleaseType, ProductVersion, Rational, TimeStamp, Uid,
    VersionType,
};
