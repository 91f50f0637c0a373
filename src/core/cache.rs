//! Per-file schema cache.
//!
//! Maps registry codes to the container handles of one file, and back.
//! Built for the file's revision when the file is opened or created and
//! extended as the session registers new types and properties.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::trace;

use super::ids::{ClassId, PropCode, Revision, TypeCode};
use super::registry::{Registry, SchemaEvent, SwapNeed, MAX_TYPE_VARIANTS};
use crate::container::{Container, PropHandle, TypeHandle};
use crate::util::{Error, Result};

/// A property resolved for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedProp {
    pub handle: PropHandle,
    pub class: ClassId,
    pub optional: bool,
    pub types: SmallVec<[TypeCode; MAX_TYPE_VARIANTS]>,
}

/// A type resolved for one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachedType {
    pub handle: TypeHandle,
    pub swap: SwapNeed,
}

/// Forward and reverse code/handle maps for one open file.
#[derive(Debug)]
pub struct FileCache {
    revision: Revision,
    props: HashMap<PropCode, CachedProp>,
    types: HashMap<TypeCode, CachedType>,
    prop_codes: HashMap<PropHandle, PropCode>,
    type_codes: HashMap<TypeHandle, TypeCode>,
}

impl FileCache {
    /// Resolve every type and property the registry defines for `revision`.
    pub fn build(registry: &Registry, revision: Revision, container: &mut Container) -> Self {
        let mut cache = Self {
            revision,
            props: HashMap::new(),
            types: HashMap::new(),
            prop_codes: HashMap::new(),
            type_codes: HashMap::new(),
        };
        let type_codes: Vec<TypeCode> = registry.types_for(revision).map(|t| t.code).collect();
        for code in type_codes {
            cache.add_type(registry, code, container);
        }
        let prop_codes: Vec<PropCode> = registry.props_for(revision).map(|p| p.code).collect();
        for code in prop_codes {
            cache.add_prop(registry, code, container);
        }
        cache
    }

    /// Revision the cache was built for.
    #[inline]
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Apply a registration pushed by the session.
    pub fn apply(&mut self, registry: &Registry, event: SchemaEvent, container: &mut Container) {
        match event {
            SchemaEvent::Type(code) => self.add_type(registry, code, container),
            SchemaEvent::Property(code) => self.add_prop(registry, code, container),
        }
    }

    fn add_type(&mut self, registry: &Registry, code: TypeCode, container: &mut Container) {
        let Some(def) = registry.type_def(code) else { return };
        let Some(name) = def.name(self.revision) else { return };
        let handle = container.register_type(name);
        self.types.insert(code, CachedType { handle, swap: def.swap });
        self.type_codes.insert(handle, code);
        trace!(code = code.0, name, "cached type");
    }

    fn add_prop(&mut self, registry: &Registry, code: PropCode, container: &mut Container) {
        let Some(def) = registry.prop_def(code) else { return };
        let Some(row) = def.rows.get(self.revision) else { return };
        let handle = container.register_property(&row.name);
        self.props.insert(
            code,
            CachedProp {
                handle,
                class: def.class,
                optional: def.optional,
                types: row.types.clone(),
            },
        );
        self.prop_codes.insert(handle, code);
        trace!(code = code.0, name = %row.name, "cached property");
    }

    /// Resolved property, or [`Error::BadProperty`].
    pub fn prop(&self, code: PropCode) -> Result<&CachedProp> {
        self.props.get(&code).ok_or(Error::BadProperty(code))
    }

    /// Resolved type, or [`Error::BadType`].
    pub fn ty(&self, code: TypeCode) -> Result<&CachedType> {
        self.types.get(&code).ok_or(Error::BadType(code))
    }

    /// Symbolic code for a container property handle.
    pub fn prop_code(&self, handle: PropHandle) -> Option<PropCode> {
        self.prop_codes.get(&handle).copied()
    }

    /// Symbolic code for a container type handle.
    pub fn type_code(&self, handle: TypeHandle) -> Option<TypeCode> {
        self.type_codes.get(&handle).copied()
    }
}
