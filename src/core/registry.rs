//! Class, type and property registry.
//!
//! One registry per session. Every entry is keyed by its symbolic code and
//! carries a per-revision row, so a property can be stored as one type in
//! 1.x files and another in 2.x files under the same code.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::debug;

use super::ids::{ClassId, PropCode, RevMap, Revision, TypeCode, ValidRevisions};
use crate::util::{Error, Result};

/// Most type variants one property may carry per revision.
pub const MAX_TYPE_VARIANTS: usize = 4;

/// Namespace prefix for on-disk type names.
pub const TYPE_NAME_PREFIX: &str = "omfi:";

/// Namespace prefix for on-disk property names.
pub const PROP_NAME_PREFIX: &str = "OMFI:";

/// First code handed out by dynamic registration.
pub const DYNAMIC_CODE_BASE: u32 = 1000;

/// Whether values of a type are ever byte-swapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwapNeed {
    /// Byte strings, single bytes, tags.
    Never,
    /// Multi-byte scalars and compounds of them.
    Required,
}

/// Class kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Abstract,
    Concrete,
}

/// A class as registered for one revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassDef {
    pub id: ClassId,
    pub kind: ClassKind,
    pub superclass: Option<ClassId>,
}

/// A registered type.
#[derive(Clone, Debug)]
pub struct TypeDef {
    pub code: TypeCode,
    pub swap: SwapNeed,
    /// Prefixed on-disk name per revision.
    pub names: RevMap<String>,
}

impl TypeDef {
    /// On-disk name for `rev`.
    pub fn name(&self, rev: Revision) -> Option<&str> {
        self.names.get(rev).map(String::as_str)
    }
}

/// A property's schema row for one revision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropRow {
    /// Prefixed on-disk name.
    pub name: String,
    /// Allowed types, in registration order.
    pub types: SmallVec<[TypeCode; MAX_TYPE_VARIANTS]>,
}

/// A registered property.
#[derive(Clone, Debug)]
pub struct PropDef {
    pub code: PropCode,
    /// Class the property is scoped to.
    pub class: ClassId,
    pub optional: bool,
    pub rows: RevMap<PropRow>,
}

/// Schema change pushed to open files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaEvent {
    Type(TypeCode),
    Property(PropCode),
}

/// Session-scoped schema tables.
#[derive(Debug)]
pub struct Registry {
    classes: [HashMap<ClassId, ClassDef>; 2],
    types: HashMap<TypeCode, TypeDef>,
    props: HashMap<PropCode, PropDef>,
    type_names: [HashMap<String, TypeCode>; 2],
    prop_names: [HashMap<String, PropCode>; 2],
    next_type: u32,
    next_prop: u32,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            classes: [HashMap::new(), HashMap::new()],
            types: HashMap::new(),
            props: HashMap::new(),
            type_names: [HashMap::new(), HashMap::new()],
            prop_names: [HashMap::new(), HashMap::new()],
            next_type: DYNAMIC_CODE_BASE,
            next_prop: DYNAMIC_CODE_BASE,
        }
    }

    /// Create a registry holding the built-in 1.x and 2.x schema.
    pub fn with_builtin_schema() -> Result<Self> {
        let mut reg = Self::new();
        super::schema::install(&mut reg)?;
        Ok(reg)
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    /// Register a class for the given revisions.
    ///
    /// Re-registering an identical definition is a no-op; a different
    /// definition for an existing id is rejected.
    pub fn register_class(
        &mut self,
        kind: ClassKind,
        valid: ValidRevisions,
        id: ClassId,
        superclass: Option<ClassId>,
    ) -> Result<()> {
        let def = ClassDef { id, kind, superclass };
        for rev in valid.revisions() {
            let table = &mut self.classes[rev.index()];
            match table.get(&id) {
                Some(existing) if *existing == def => {}
                Some(_) => {
                    return Err(Error::ObjectSemantic(format!(
                        "class {id} already registered for {rev} with a different definition"
                    )))
                }
                None => {
                    table.insert(id, def);
                }
            }
        }
        Ok(())
    }

    /// Class definition for a revision.
    pub fn class(&self, rev: Revision, id: ClassId) -> Option<&ClassDef> {
        self.classes[rev.index()].get(&id)
    }

    /// Number of classes known for a revision.
    pub fn num_classes(&self, rev: Revision) -> usize {
        self.classes[rev.index()].len()
    }

    /// Single-level superclass lookup. `None` when the class is unknown or a root.
    pub fn class_find_superclass(&self, rev: Revision, id: ClassId) -> Option<ClassId> {
        self.class(rev, id).and_then(|c| c.superclass)
    }

    /// True if `class` is `ancestor` or derives from it.
    ///
    /// The walk is bounded by the number of registered classes, so a cyclic
    /// dictionary fails with [`Error::ClassCycle`] instead of looping.
    pub fn is_subclass(&self, rev: Revision, class: ClassId, ancestor: ClassId) -> Result<bool> {
        let mut current = class;
        for _ in 0..=self.num_classes(rev) {
            if current == ancestor {
                return Ok(true);
            }
            match self.class_find_superclass(rev, current) {
                Some(sup) => current = sup,
                None => return Ok(false),
            }
        }
        Err(Error::ClassCycle(class))
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Register a type under a fixed code.
    pub fn register_type(
        &mut self,
        code: TypeCode,
        valid: ValidRevisions,
        name: &str,
        swap: SwapNeed,
    ) -> Result<()> {
        let full = format!("{TYPE_NAME_PREFIX}{name}");
        for rev in valid.revisions() {
            if let Some(&existing) = self.type_names[rev.index()].get(&full) {
                if existing != code {
                    return Err(Error::DuplicateName { name: full, existing: existing.0 });
                }
            }
        }

        let def = self.types.entry(code).or_insert_with(|| TypeDef {
            code,
            swap,
            names: RevMap::new(),
        });
        for rev in valid.revisions() {
            if let Some(old) = def.names.insert(rev, full.clone()) {
                if old != full {
                    self.type_names[rev.index()].remove(&old);
                }
            }
            self.type_names[rev.index()].insert(full.clone(), code);
        }
        debug!(code = code.0, name = %full, ?valid, "registered type");
        Ok(())
    }

    /// Register a type under the next free code, or reuse the code already
    /// bound to the same on-disk name.
    pub fn register_dynamic_type(
        &mut self,
        valid: ValidRevisions,
        name: &str,
        swap: SwapNeed,
    ) -> Result<TypeCode> {
        let full = format!("{TYPE_NAME_PREFIX}{name}");
        let code = match self.type_code_by_name_any(&full) {
            Some(code) => code,
            None => {
                let code = TypeCode(self.next_type);
                self.next_type += 1;
                code
            }
        };
        self.register_type(code, valid, name, swap)?;
        Ok(code)
    }

    /// Type definition.
    pub fn type_def(&self, code: TypeCode) -> Option<&TypeDef> {
        self.types.get(&code)
    }

    /// Type code bound to an on-disk name in a revision.
    pub fn type_code_by_name(&self, rev: Revision, name: &str) -> Option<TypeCode> {
        self.type_names[rev.index()].get(name).copied()
    }

    fn type_code_by_name_any(&self, name: &str) -> Option<TypeCode> {
        Revision::ALL
            .into_iter()
            .find_map(|r| self.type_code_by_name(r, name))
    }

    /// All types valid for a revision.
    pub fn types_for(&self, rev: Revision) -> impl Iterator<Item = &TypeDef> {
        self.types.values().filter(move |t| t.names.get(rev).is_some())
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Register a property under a fixed code.
    ///
    /// Registering an existing code again with a new type appends a type
    /// variant to that revision's row instead of replacing it.
    pub fn register_property(
        &mut self,
        code: PropCode,
        valid: ValidRevisions,
        name: &str,
        class: ClassId,
        ty: TypeCode,
        optional: bool,
    ) -> Result<()> {
        let full = format!("{PROP_NAME_PREFIX}{name}");
        for rev in valid.revisions() {
            if self.type_def(ty).and_then(|t| t.name(rev)).is_none() {
                return Err(Error::BadType(ty));
            }
            if let Some(&existing) = self.prop_names[rev.index()].get(&full) {
                if existing != code {
                    return Err(Error::DuplicateName { name: full, existing: existing.0 });
                }
            }
            if let Some(row) = self.props.get(&code).and_then(|p| p.rows.get(rev)) {
                if row.name != full {
                    return Err(Error::DuplicateName { name: row.name.clone(), existing: code.0 });
                }
                if !row.types.contains(&ty) && row.types.len() >= MAX_TYPE_VARIANTS {
                    return Err(Error::TooManyTypeVariants(code));
                }
            }
        }

        let def = self.props.entry(code).or_insert_with(|| PropDef {
            code,
            class,
            optional,
            rows: RevMap::new(),
        });
        for rev in valid.revisions() {
            match def.rows.get_mut(rev) {
                Some(row) => {
                    if !row.types.contains(&ty) {
                        row.types.push(ty);
                    }
                }
                None => {
                    let mut types = SmallVec::new();
                    types.push(ty);
                    def.rows.insert(rev, PropRow { name: full.clone(), types });
                }
            }
            self.prop_names[rev.index()].insert(full.clone(), code);
        }
        debug!(code = code.0, name = %full, class = %class, ?valid, "registered property");
        Ok(())
    }

    /// Register a property under the next free code, or reuse the code
    /// already bound to the same on-disk name in another revision.
    pub fn register_dynamic_property(
        &mut self,
        valid: ValidRevisions,
        name: &str,
        class: ClassId,
        ty: TypeCode,
        optional: bool,
    ) -> Result<PropCode> {
        let full = format!("{PROP_NAME_PREFIX}{name}");
        let code = match self.prop_code_by_name_any(&full) {
            Some(code) => code,
            None => {
                let code = PropCode(self.next_prop);
                self.next_prop += 1;
                code
            }
        };
        self.register_property(code, valid, name, class, ty, optional)?;
        Ok(code)
    }

    /// Property definition.
    pub fn prop_def(&self, code: PropCode) -> Option<&PropDef> {
        self.props.get(&code)
    }

    /// Property code bound to an on-disk name in a revision.
    pub fn prop_code_by_name(&self, rev: Revision, name: &str) -> Option<PropCode> {
        self.prop_names[rev.index()].get(name).copied()
    }

    fn prop_code_by_name_any(&self, name: &str) -> Option<PropCode> {
        Revision::ALL
            .into_iter()
            .find_map(|r| self.prop_code_by_name(r, name))
    }

    /// All properties with a row for a revision.
    pub fn props_for(&self, rev: Revision) -> impl Iterator<Item = &PropDef> {
        self.props.values().filter(move |p| p.rows.get(rev).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T_RATIONAL: TypeCode = TypeCode(1);
    const T_EER: TypeCode = TypeCode(2);

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.register_type(T_RATIONAL, ValidRevisions::Both, "Rational", SwapNeed::Required).unwrap();
        reg.register_type(T_EER, ValidRevisions::V1Only, "ExactEditRate", SwapNeed::Required).unwrap();
        reg.register_class(ClassKind::Abstract, ValidRevisions::Both, ClassId::OOBJ, None).unwrap();
        reg.register_class(ClassKind::Abstract, ValidRevisions::Both, ClassId::CPNT, Some(ClassId::OOBJ)).unwrap();
        reg.register_class(ClassKind::Abstract, ValidRevisions::V2Only, ClassId::SEGM, Some(ClassId::CPNT)).unwrap();
        reg.register_class(ClassKind::Concrete, ValidRevisions::V1Only, ClassId::SCLP, Some(ClassId::CPNT)).unwrap();
        reg.register_class(ClassKind::Concrete, ValidRevisions::V2Only, ClassId::SCLP, Some(ClassId::SEGM)).unwrap();
        reg
    }

    #[test]
    fn test_dual_revision_property() {
        let mut reg = registry();
        let p = PropCode(7);
        reg.register_property(p, ValidRevisions::V1Only, "CPNT:EditRate", ClassId::CPNT, T_EER, false).unwrap();
        reg.register_property(p, ValidRevisions::V2Only, "CPNT:EditRate", ClassId::CPNT, T_RATIONAL, false).unwrap();

        let def = reg.prop_def(p).unwrap();
        assert_eq!(def.rows.get(Revision::V1).unwrap().types.as_slice(), &[T_EER]);
        assert_eq!(def.rows.get(Revision::V2).unwrap().types.as_slice(), &[T_RATIONAL]);
        assert_eq!(reg.prop_code_by_name(Revision::V1, "OMFI:CPNT:EditRate"), Some(p));
    }

    #[test]
    fn test_type_variants_append_and_bound() {
        let mut reg = registry();
        let p = PropCode(8);
        for i in 0..MAX_TYPE_VARIANTS as u32 {
            let t = TypeCode(100 + i);
            reg.register_type(t, ValidRevisions::Both, &format!("T{i}"), SwapNeed::Never).unwrap();
            reg.register_property(p, ValidRevisions::Both, "X:Many", ClassId::OOBJ, t, true).unwrap();
        }
        assert_eq!(reg.prop_def(p).unwrap().rows.get(Revision::V2).unwrap().types.len(), MAX_TYPE_VARIANTS);

        // Same type again is not a new variant.
        reg.register_property(p, ValidRevisions::Both, "X:Many", ClassId::OOBJ, TypeCode(100), true).unwrap();

        let extra = TypeCode(200);
        reg.register_type(extra, ValidRevisions::Both, "Extra", SwapNeed::Never).unwrap();
        assert!(matches!(
            reg.register_property(p, ValidRevisions::Both, "X:Many", ClassId::OOBJ, extra, true),
            Err(Error::TooManyTypeVariants(_))
        ));
    }

    #[test]
    fn test_dynamic_property_reuses_code_by_name() {
        let mut reg = registry();
        let a = reg
            .register_dynamic_property(ValidRevisions::V1Only, "CODEC:Private", ClassId::OOBJ, T_EER, true)
            .unwrap();
        let b = reg
            .register_dynamic_property(ValidRevisions::V2Only, "CODEC:Private", ClassId::OOBJ, T_RATIONAL, true)
            .unwrap();
        assert_eq!(a, b);
        assert!(a.0 >= DYNAMIC_CODE_BASE);

        let c = reg
            .register_dynamic_property(ValidRevisions::Both, "CODEC:Other", ClassId::OOBJ, T_RATIONAL, true)
            .unwrap();
        assert_eq!(c.0, a.0 + 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut reg = registry();
        reg.register_property(PropCode(1), ValidRevisions::Both, "A:B", ClassId::OOBJ, T_RATIONAL, false).unwrap();
        assert!(matches!(
            reg.register_property(PropCode(2), ValidRevisions::Both, "A:B", ClassId::OOBJ, T_RATIONAL, false),
            Err(Error::DuplicateName { .. })
        ));
        assert!(matches!(
            reg.register_type(TypeCode(9), ValidRevisions::Both, "Rational", SwapNeed::Never),
            Err(Error::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_property_type_must_exist_for_revision() {
        let mut reg = registry();
        assert!(matches!(
            reg.register_property(PropCode(3), ValidRevisions::V2Only, "A:C", ClassId::OOBJ, T_EER, false),
            Err(Error::BadType(_))
        ));
    }

    #[test]
    fn test_superclass_walk_per_revision() {
        let reg = registry();
        assert_eq!(reg.class_find_superclass(Revision::V2, ClassId::SCLP), Some(ClassId::SEGM));
        assert_eq!(reg.class_find_superclass(Revision::V1, ClassId::SCLP), Some(ClassId::CPNT));
        assert!(reg.is_subclass(Revision::V2, ClassId::SCLP, ClassId::OOBJ).unwrap());
        assert!(reg.is_subclass(Revision::V2, ClassId::SCLP, ClassId::SEGM).unwrap());
        assert!(!reg.is_subclass(Revision::V1, ClassId::SCLP, ClassId::SEGM).unwrap());
    }

    #[test]
    fn test_class_cycle_detected() {
        let mut reg = Registry::new();
        let a = ClassId(*b"AAAA");
        let b = ClassId(*b"BBBB");
        reg.register_class(ClassKind::Abstract, ValidRevisions::Both, a, Some(b)).unwrap();
        reg.register_class(ClassKind::Abstract, ValidRevisions::Both, b, Some(a)).unwrap();
        assert!(matches!(
            reg.is_subclass(Revision::V2, a, ClassId::OOBJ),
            Err(Error::ClassCycle(_))
        ));
    }

    #[test]
    fn test_class_redefinition() {
        let mut reg = registry();
        reg.register_class(ClassKind::Abstract, ValidRevisions::Both, ClassId::CPNT, Some(ClassId::OOBJ)).unwrap();
        assert!(reg
            .register_class(ClassKind::Concrete, ValidRevisions::Both, ClassId::CPNT, None)
            .is_err());
    }

    #[test]
    fn test_builtin_schema_installs() {
        let reg = Registry::with_builtin_schema().unwrap();
        assert!(reg.num_classes(Revision::V1) > 5);
        assert!(reg.num_classes(Revision::V2) > 5);
    }
}
