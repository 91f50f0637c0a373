//! In-memory Bento object store.
//!
//! Objects hold values keyed by (property handle, type handle). Property and
//! type handles come from the container's own name dictionary. Values of at
//! most [`IMMEDIATE_LIMIT`] bytes are immediate; growing one past the limit
//! promotes it to out-of-line storage.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::trace;

use super::format::{IMMEDIATE_LIMIT, NULL_TOKEN};
use crate::util::Error;

/// Container-native object handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Container-native type handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle(pub u32);

/// Container-native property handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropHandle(pub u32);

/// Persistent reference stored inside a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefToken(pub u32);

/// Handle to one value of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueHandle {
    pub object: ObjectId,
    pub prop: PropHandle,
    pub ty: TypeHandle,
}

/// Summary of one stored value, for iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueInfo {
    pub prop: PropHandle,
    pub ty: TypeHandle,
    pub size: u64,
}

/// Container-level failures.
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("no such object {0}")]
    NoSuchObject(u32),

    #[error("no such value")]
    NoSuchValue,

    #[error("no object for reference token {0}")]
    BadReference(u32),

    #[error("offset {offset} beyond value size {size}")]
    OutOfRange { offset: u64, size: u64 },

    #[error("container opened read-only")]
    ReadOnly,

    #[error("write failed: {0}")]
    WriteFailed(String),
}

impl From<ContainerError> for Error {
    fn from(e: ContainerError) -> Self {
        match e {
            ContainerError::ReadOnly | ContainerError::WriteFailed(_) => {
                Error::ContainerWrite(e.to_string())
            }
            other => Error::Container(other.to_string()),
        }
    }
}

type CResult<T> = std::result::Result<T, ContainerError>;

/// Store counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// Immediate values that grew into out-of-line storage.
    pub promotions: u64,
}

#[derive(Clone, Debug)]
pub(crate) struct ValueRecord {
    pub(crate) prop: PropHandle,
    pub(crate) ty: TypeHandle,
    pub(crate) data: Vec<u8>,
    pub(crate) refs: Vec<(RefToken, ObjectId)>,
    pub(crate) immediate: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ObjectRecord {
    pub(crate) values: Vec<ValueRecord>,
}

/// The object store.
#[derive(Debug)]
pub struct Container {
    pub(crate) type_names: Vec<String>,
    type_index: HashMap<String, TypeHandle>,
    pub(crate) prop_names: Vec<String>,
    prop_index: HashMap<String, PropHandle>,
    pub(crate) objects: BTreeMap<ObjectId, ObjectRecord>,
    pub(crate) next_object: u32,
    pub(crate) root: Option<ObjectId>,
    writable: bool,
    stats: ContainerStats,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Create an empty, writable container.
    pub fn new() -> Self {
        Self {
            type_names: Vec::new(),
            type_index: HashMap::new(),
            prop_names: Vec::new(),
            prop_index: HashMap::new(),
            objects: BTreeMap::new(),
            next_object: 1,
            root: None,
            writable: true,
            stats: ContainerStats::default(),
        }
    }

    /// Rebuild name indices after loading.
    pub(crate) fn from_parts(
        type_names: Vec<String>,
        prop_names: Vec<String>,
        objects: BTreeMap<ObjectId, ObjectRecord>,
        next_object: u32,
        root: Option<ObjectId>,
    ) -> Self {
        let type_index = type_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), TypeHandle(i as u32)))
            .collect();
        let prop_index = prop_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), PropHandle(i as u32)))
            .collect();
        Self {
            type_names,
            type_index,
            prop_names,
            prop_index,
            objects,
            next_object,
            root,
            writable: true,
            stats: ContainerStats::default(),
        }
    }

    /// True if writes are accepted.
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub(crate) fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    /// Store counters.
    #[inline]
    pub fn stats(&self) -> ContainerStats {
        self.stats
    }

    // ------------------------------------------------------------------
    // Dictionary
    // ------------------------------------------------------------------

    /// Handle for a type name, creating the dictionary entry on first use.
    pub fn register_type(&mut self, name: &str) -> TypeHandle {
        if let Some(&h) = self.type_index.get(name) {
            return h;
        }
        let h = TypeHandle(self.type_names.len() as u32);
        self.type_names.push(name.to_string());
        self.type_index.insert(name.to_string(), h);
        h
    }

    /// Handle for a property name, creating the dictionary entry on first use.
    pub fn register_property(&mut self, name: &str) -> PropHandle {
        if let Some(&h) = self.prop_index.get(name) {
            return h;
        }
        let h = PropHandle(self.prop_names.len() as u32);
        self.prop_names.push(name.to_string());
        self.prop_index.insert(name.to_string(), h);
        h
    }

    /// Look up a property name without creating it.
    pub fn lookup_property(&self, name: &str) -> Option<PropHandle> {
        self.prop_index.get(name).copied()
    }

    /// Look up a type name without creating it.
    pub fn lookup_type(&self, name: &str) -> Option<TypeHandle> {
        self.type_index.get(name).copied()
    }

    /// Name of a type handle.
    pub fn type_name(&self, h: TypeHandle) -> Option<&str> {
        self.type_names.get(h.0 as usize).map(String::as_str)
    }

    /// Name of a property handle.
    pub fn property_name(&self, h: PropHandle) -> Option<&str> {
        self.prop_names.get(h.0 as usize).map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    fn check_writable(&self) -> CResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(ContainerError::ReadOnly)
        }
    }

    /// Create an empty object.
    pub fn new_object(&mut self) -> CResult<ObjectId> {
        self.check_writable()?;
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        self.objects.insert(id, ObjectRecord::default());
        Ok(id)
    }

    /// Delete an object and all its values.
    pub fn delete_object(&mut self, obj: ObjectId) -> CResult<()> {
        self.check_writable()?;
        self.objects
            .remove(&obj)
            .map(|_| ())
            .ok_or(ContainerError::NoSuchObject(obj.0))
    }

    /// True if the object exists.
    #[inline]
    pub fn contains_object(&self, obj: ObjectId) -> bool {
        self.objects.contains_key(&obj)
    }

    /// Iterate objects in creation order.
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    /// Number of objects.
    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    /// The designated root object.
    #[inline]
    pub fn root(&self) -> Option<ObjectId> {
        self.root
    }

    /// Designate the root object.
    pub fn set_root(&mut self, obj: ObjectId) -> CResult<()> {
        self.check_writable()?;
        if !self.contains_object(obj) {
            return Err(ContainerError::NoSuchObject(obj.0));
        }
        self.root = Some(obj);
        Ok(())
    }

    fn object(&self, obj: ObjectId) -> CResult<&ObjectRecord> {
        self.objects.get(&obj).ok_or(ContainerError::NoSuchObject(obj.0))
    }

    fn object_mut(&mut self, obj: ObjectId) -> CResult<&mut ObjectRecord> {
        self.objects.get_mut(&obj).ok_or(ContainerError::NoSuchObject(obj.0))
    }

    fn value(&self, v: ValueHandle) -> CResult<&ValueRecord> {
        self.object(v.object)?
            .values
            .iter()
            .find(|r| r.prop == v.prop && r.ty == v.ty)
            .ok_or(ContainerError::NoSuchValue)
    }

    fn value_mut(&mut self, v: ValueHandle) -> CResult<&mut ValueRecord> {
        self.object_mut(v.object)?
            .values
            .iter_mut()
            .find(|r| r.prop == v.prop && r.ty == v.ty)
            .ok_or(ContainerError::NoSuchValue)
    }

    /// Values stored on an object.
    pub fn values_of(&self, obj: ObjectId) -> CResult<Vec<ValueInfo>> {
        Ok(self
            .object(obj)?
            .values
            .iter()
            .map(|r| ValueInfo { prop: r.prop, ty: r.ty, size: r.data.len() as u64 })
            .collect())
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// Number of values for (prop, type) on the object: 0 (absent) or 1.
    pub fn count_values(&self, obj: ObjectId, prop: PropHandle, ty: TypeHandle) -> CResult<usize> {
        Ok(self
            .object(obj)?
            .values
            .iter()
            .filter(|r| r.prop == prop && r.ty == ty)
            .count())
    }

    /// Handle to an existing value.
    pub fn use_value(&self, obj: ObjectId, prop: PropHandle, ty: TypeHandle) -> CResult<ValueHandle> {
        let v = ValueHandle { object: obj, prop, ty };
        self.value(v)?;
        Ok(v)
    }

    /// Create an empty value, or return the existing one.
    pub fn new_value(&mut self, obj: ObjectId, prop: PropHandle, ty: TypeHandle) -> CResult<ValueHandle> {
        self.check_writable()?;
        let rec = self.object_mut(obj)?;
        if !rec.values.iter().any(|r| r.prop == prop && r.ty == ty) {
            rec.values.push(ValueRecord {
                prop,
                ty,
                data: Vec::new(),
                refs: Vec::new(),
                immediate: true,
            });
        }
        Ok(ValueHandle { object: obj, prop, ty })
    }

    /// Total size of a value in bytes.
    pub fn value_size(&self, v: ValueHandle) -> CResult<u64> {
        Ok(self.value(v)?.data.len() as u64)
    }

    /// True if the value is held immediate.
    pub fn is_immediate(&self, v: ValueHandle) -> CResult<bool> {
        Ok(self.value(v)?.immediate)
    }

    /// Copy bytes starting at `offset` into `buf`; returns the count copied.
    pub fn read_value_data(&self, v: ValueHandle, buf: &mut [u8], offset: u64) -> CResult<usize> {
        let data = &self.value(v)?.data;
        let start = offset as usize;
        if start >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    /// Overwrite or extend a value. `offset` may equal the current size.
    pub fn write_value_data(&mut self, v: ValueHandle, bytes: &[u8], offset: u64) -> CResult<()> {
        self.check_writable()?;
        let rec = self.value_mut(v)?;
        let size = rec.data.len() as u64;
        if offset > size {
            return Err(ContainerError::OutOfRange { offset, size });
        }
        let start = offset as usize;
        let end = start + bytes.len();
        if end > rec.data.len() {
            rec.data.resize(end, 0);
        }
        rec.data[start..end].copy_from_slice(bytes);

        if rec.immediate && rec.data.len() > IMMEDIATE_LIMIT {
            rec.immediate = false;
            if size > 0 {
                self.stats.promotions += 1;
                trace!(object = v.object.0, prop = v.prop.0, "promoted immediate value");
            }
        }
        Ok(())
    }

    /// Remove `len` bytes at `offset`, closing the gap.
    pub fn delete_value_data(&mut self, v: ValueHandle, offset: u64, len: u64) -> CResult<()> {
        self.check_writable()?;
        let rec = self.value_mut(v)?;
        let size = rec.data.len() as u64;
        if offset + len > size {
            return Err(ContainerError::OutOfRange { offset: offset + len, size });
        }
        rec.data.drain(offset as usize..(offset + len) as usize);
        Ok(())
    }

    /// Remove a value entirely.
    pub fn delete_value(&mut self, v: ValueHandle) -> CResult<()> {
        self.check_writable()?;
        let rec = self.object_mut(v.object)?;
        let before = rec.values.len();
        rec.values.retain(|r| !(r.prop == v.prop && r.ty == v.ty));
        if rec.values.len() == before {
            return Err(ContainerError::NoSuchValue);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // References
    // ------------------------------------------------------------------

    /// Token naming `target` within value `v`. Reuses an existing token.
    pub fn reference_data(&mut self, v: ValueHandle, target: ObjectId) -> CResult<RefToken> {
        if !self.contains_object(target) {
            return Err(ContainerError::NoSuchObject(target.0));
        }
        if let Some((token, _)) = self.value(v)?.refs.iter().find(|(_, o)| *o == target) {
            return Ok(*token);
        }
        self.check_writable()?;
        let rec = self.value_mut(v)?;
        let next = rec.refs.iter().map(|(t, _)| t.0).max().unwrap_or(NULL_TOKEN) + 1;
        let token = RefToken(next);
        rec.refs.push((token, target));
        Ok(token)
    }

    /// Object named by `token` within value `v`.
    pub fn referenced_object(&self, v: ValueHandle, token: RefToken) -> CResult<ObjectId> {
        let target = self
            .value(v)?
            .refs
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, o)| *o)
            .ok_or(ContainerError::BadReference(token.0))?;
        if !self.contains_object(target) {
            return Err(ContainerError::NoSuchObject(target.0));
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Container, ValueHandle) {
        let mut c = Container::new();
        let obj = c.new_object().unwrap();
        let p = c.register_property("OMFI:Test");
        let t = c.register_type("omfi:Int32");
        let v = c.new_value(obj, p, t).unwrap();
        (c, v)
    }

    #[test]
    fn test_dictionary_reuses_handles() {
        let mut c = Container::new();
        let a = c.register_property("OMFI:A");
        let b = c.register_property("OMFI:B");
        assert_ne!(a, b);
        assert_eq!(c.register_property("OMFI:A"), a);
        assert_eq!(c.property_name(b), Some("OMFI:B"));
        assert_eq!(c.lookup_type("omfi:Nothing"), None);
    }

    #[test]
    fn test_read_write_extend() {
        let (mut c, v) = setup();
        c.write_value_data(v, &[1, 2, 3], 0).unwrap();
        c.write_value_data(v, &[4, 5], 3).unwrap();
        assert_eq!(c.value_size(v).unwrap(), 5);

        let mut buf = [0u8; 8];
        assert_eq!(c.read_value_data(v, &mut buf, 1).unwrap(), 4);
        assert_eq!(&buf[..4], &[2, 3, 4, 5]);
        assert_eq!(c.read_value_data(v, &mut buf, 5).unwrap(), 0);

        assert!(matches!(
            c.write_value_data(v, &[9], 7),
            Err(ContainerError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_delete_closes_gap() {
        let (mut c, v) = setup();
        c.write_value_data(v, &[1, 2, 3, 4, 5, 6], 0).unwrap();
        c.delete_value_data(v, 2, 2).unwrap();
        let mut buf = [0u8; 4];
        c.read_value_data(v, &mut buf, 0).unwrap();
        assert_eq!(buf, [1, 2, 5, 6]);
    }

    #[test]
    fn test_promotion_counted() {
        let (mut c, v) = setup();
        c.write_value_data(v, &[0; 4], 0).unwrap();
        assert!(c.is_immediate(v).unwrap());
        c.write_value_data(v, &[0; 2], 4).unwrap();
        assert!(!c.is_immediate(v).unwrap());
        assert_eq!(c.stats().promotions, 1);

        // Created large: never immediate, no promotion.
        let obj = c.new_object().unwrap();
        let p = c.register_property("OMFI:Big");
        let w = c.new_value(obj, p, v.ty).unwrap();
        c.write_value_data(w, &[0; 6], 0).unwrap();
        assert_eq!(c.stats().promotions, 1);
    }

    #[test]
    fn test_references() {
        let (mut c, v) = setup();
        let target = c.new_object().unwrap();
        let t1 = c.reference_data(v, target).unwrap();
        assert_eq!(c.reference_data(v, target).unwrap(), t1);
        assert_ne!(t1.0, NULL_TOKEN);
        assert_eq!(c.referenced_object(v, t1).unwrap(), target);
        assert!(c.referenced_object(v, RefToken(99)).is_err());

        c.delete_object(target).unwrap();
        assert!(c.referenced_object(v, t1).is_err());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let (mut c, v) = setup();
        c.set_writable(false);
        let err: Error = c.write_value_data(v, &[1], 0).unwrap_err().into();
        assert!(matches!(err, Error::ContainerWrite(_)));
        let err: Error = c.use_value(ObjectId(999), v.prop, v.ty).unwrap_err().into();
        assert!(matches!(err, Error::Container(_)));
    }
}
