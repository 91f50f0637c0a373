//! Generic property accessor.
//!
//! Every typed accessor funnels into [`OmfFile::read_prop`] and
//! [`OmfFile::write_prop`]. They resolve symbolic codes through the file
//! cache, check object semantics, and apply byte swapping for objects whose
//! stored order differs from the host.

use crate::container::{ObjectId, PropHandle, TypeHandle, ValueHandle};
use crate::core::{ClassId, PropCode, SwapNeed, TypeCode};
use crate::util::{swap_scalar, ByteOrder, Error, Result};

use super::handle::OmfFile;

/// Whether a read converts multi-byte scalars to host order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapPolicy {
    /// Swap when the object's order is foreign and the type needs it.
    Swap,
    /// Return the stored bytes untouched.
    NoSwap,
}

/// Container handles for one (property, type) pair.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Resolved {
    pub(crate) prop: PropHandle,
    pub(crate) ty: TypeHandle,
    pub(crate) swap: SwapNeed,
}

impl OmfFile {
    pub(crate) fn resolve(&mut self, prop: PropCode, ty: TypeCode) -> Result<Resolved> {
        self.sync_schema();
        let p = self.cache.prop(prop)?.handle;
        let t = self.cache.ty(ty)?;
        Ok(Resolved { prop: p, ty: t.handle, swap: t.swap })
    }

    /// Check that `obj` may carry `prop` with type `ty`.
    pub(crate) fn check_semantics(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode) -> Result<()> {
        if !self.semantic_checks() || prop == PropCode::OBJ_CLASS {
            return Ok(());
        }
        let cached = self.cache.prop(prop)?;
        if !cached.types.contains(&ty) {
            return Err(Error::ObjectSemantic(format!(
                "type {ty} is not a variant of property {prop} in {} files",
                self.revision()
            )));
        }
        let scope = cached.class;
        let class = match self.class_of(obj) {
            Ok(class) => class,
            Err(Error::PropertyNotPresent) => {
                return Err(Error::ObjectSemantic(format!("object {} has no class", obj.0)))
            }
            Err(e) => return Err(e),
        };
        if !self.class_is_a(class, scope)? {
            return Err(Error::ObjectSemantic(format!(
                "property {prop} belongs to class {scope}, object {} is {class}",
                obj.0
            )));
        }
        Ok(())
    }

    /// True if `class` is `ancestor` or derives from it in this file's revision.
    pub(crate) fn class_is_a(&self, class: ClassId, ancestor: ClassId) -> Result<bool> {
        self.session().registry().is_subclass(self.revision(), class, ancestor)
    }

    /// True if values on `obj` are stored in non-host byte order.
    ///
    /// 1.x objects may carry their own byte order; otherwise the file's
    /// order applies.
    pub fn is_foreign_byte_order(&mut self, obj: ObjectId) -> Result<bool> {
        if let Some(order) = self.object_byte_order_override(obj)? {
            return Ok(order.is_foreign());
        }
        Ok(self.byte_order().is_foreign())
    }

    pub(crate) fn object_byte_order_override(&mut self, obj: ObjectId) -> Result<Option<ByteOrder>> {
        self.sync_schema();
        let (Ok(p), Ok(t)) = (self.cache.prop(PropCode::OBJ_BYTE_ORDER), self.cache.ty(TypeCode::INT16)) else {
            return Ok(None);
        };
        let (p, t) = (p.handle, t.handle);
        if self.container.count_values(obj, p, t)? == 0 {
            return Ok(None);
        }
        let v = self.container.use_value(obj, p, t)?;
        let mut magic = [0u8; 2];
        self.container.read_value_data(v, &mut magic, 0)?;
        ByteOrder::from_magic(u16::from_ne_bytes(magic))
            .map(Some)
            .ok_or_else(|| Error::invalid(format!("object {} has unknown byte order {magic:02x?}", obj.0)))
    }

    fn existing_value(&self, obj: ObjectId, r: Resolved) -> Result<Option<ValueHandle>> {
        if self.container.count_values(obj, r.prop, r.ty)? == 0 {
            return Ok(None);
        }
        Ok(Some(self.container.use_value(obj, r.prop, r.ty)?))
    }

    /// Read `buf.len()` bytes of a property value starting at `offset`.
    ///
    /// Reading at or past the end fails with [`Error::EndOfData`]. A read
    /// that runs past the end copies the available bytes into `buf` first
    /// and then fails with [`Error::EndOfData`].
    pub fn read_prop(
        &mut self,
        obj: ObjectId,
        prop: PropCode,
        offset: u64,
        policy: SwapPolicy,
        ty: TypeCode,
        buf: &mut [u8],
    ) -> Result<()> {
        let r = self.resolve(prop, ty)?;
        self.check_semantics(obj, prop, ty)?;
        let v = self.existing_value(obj, r)?.ok_or(Error::PropertyNotPresent)?;

        let swap = policy == SwapPolicy::Swap
            && r.swap == SwapNeed::Required
            && buf.len() > 1
            && self.is_foreign_byte_order(obj)?;

        let size = self.container.value_size(v)?;
        if offset >= size {
            return Err(Error::EndOfData);
        }
        let n = self.container.read_value_data(v, buf, offset)?;
        if n < buf.len() {
            return Err(Error::EndOfData);
        }
        if swap {
            swap_scalar(buf)?;
        }
        Ok(())
    }

    /// Write bytes into a property value at `offset`, creating the value if needed.
    ///
    /// `bytes` is treated as one host-order scalar when the type needs
    /// swapping; the caller's buffer is never modified.
    pub fn write_prop(
        &mut self,
        obj: ObjectId,
        prop: PropCode,
        offset: u64,
        ty: TypeCode,
        bytes: &[u8],
    ) -> Result<()> {
        self.check_may_write()?;
        let r = self.resolve(prop, ty)?;
        self.check_semantics(obj, prop, ty)?;
        self.store(obj, r, offset, bytes)
    }

    /// Write path shared with media streaming; callers have done the guard.
    pub(crate) fn store(&mut self, obj: ObjectId, r: Resolved, offset: u64, bytes: &[u8]) -> Result<()> {
        let swap = r.swap == SwapNeed::Required && bytes.len() > 1 && self.is_foreign_byte_order(obj)?;
        let v = self.container.new_value(obj, r.prop, r.ty)?;
        if swap {
            let mut copy = bytes.to_vec();
            swap_scalar(&mut copy)?;
            self.container.write_value_data(v, &copy, offset)?;
        } else {
            self.container.write_value_data(v, bytes, offset)?;
        }
        Ok(())
    }

    /// True if `obj` has a value for (prop, ty).
    pub fn is_prop_present(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode) -> Result<bool> {
        let r = self.resolve(prop, ty)?;
        Ok(self.existing_value(obj, r)?.is_some())
    }

    /// Stored size of a property value in bytes.
    pub fn prop_length(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode) -> Result<u64> {
        let r = self.resolve(prop, ty)?;
        let v = self.existing_value(obj, r)?.ok_or(Error::PropertyNotPresent)?;
        Ok(self.container.value_size(v)?)
    }

    /// Delete a property value.
    pub fn remove_prop(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode) -> Result<()> {
        self.check_may_write()?;
        let r = self.resolve(prop, ty)?;
        let v = self.existing_value(obj, r)?.ok_or(Error::PropertyNotPresent)?;
        self.container.delete_value(v)?;
        Ok(())
    }

    /// Remove `len` bytes at `offset` from a value, closing the gap.
    pub(crate) fn delete_prop_bytes(
        &mut self,
        obj: ObjectId,
        prop: PropCode,
        ty: TypeCode,
        offset: u64,
        len: u64,
    ) -> Result<()> {
        self.check_may_write()?;
        let r = self.resolve(prop, ty)?;
        let v = self.existing_value(obj, r)?.ok_or(Error::PropertyNotPresent)?;
        self.container.delete_value_data(v, offset, len)?;
        Ok(())
    }

    /// Container value handle for (prop, ty) on `obj`, if present.
    pub(crate) fn value_handle(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode) -> Result<Option<ValueHandle>> {
        let r = self.resolve(prop, ty)?;
        self.existing_value(obj, r)
    }

    /// Container value handle for (prop, ty) on `obj`, created if absent.
    pub(crate) fn value_handle_for_write(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode) -> Result<ValueHandle> {
        self.check_may_write()?;
        let r = self.resolve(prop, ty)?;
        self.check_semantics(obj, prop, ty)?;
        Ok(self.container.new_value(obj, r.prop, r.ty)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Revision;
    use crate::file::{FileOptions, Session};

    fn scratch(order: ByteOrder) -> (Session, OmfFile) {
        let session = Session::begin().unwrap();
        let file = session
            .create_scratch(FileOptions::new(Revision::V2).with_byte_order(order))
            .unwrap();
        (session, file)
    }

    fn sclp(file: &mut OmfFile) -> ObjectId {
        file.new_object(ClassId::SCLP).unwrap()
    }

    #[test]
    fn test_end_of_data_rules() {
        let (_s, mut file) = scratch(ByteOrder::native());
        let obj = sclp(&mut file);
        file.write_prop(obj, PropCode::SCLP_SOURCE_TRACK, 0, TypeCode::INT32, &7i32.to_ne_bytes())
            .unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(
            file.read_prop(obj, PropCode::SCLP_SOURCE_TRACK, 4, SwapPolicy::Swap, TypeCode::INT32, &mut buf),
            Err(Error::EndOfData)
        ));

        let mut partial = [0xAAu8; 4];
        let err = file
            .read_prop(obj, PropCode::SCLP_SOURCE_TRACK, 2, SwapPolicy::NoSwap, TypeCode::INT32, &mut partial)
            .unwrap_err();
        assert!(matches!(err, Error::EndOfData));
        assert_eq!(&partial[..2], &7i32.to_ne_bytes()[2..]);
    }

    #[test]
    fn test_not_present_and_bad_codes() {
        let (_s, mut file) = scratch(ByteOrder::native());
        let obj = sclp(&mut file);
        let mut buf = [0u8; 4];
        assert!(file
            .read_prop(obj, PropCode::SCLP_SOURCE_TRACK, 0, SwapPolicy::Swap, TypeCode::INT32, &mut buf)
            .unwrap_err()
            .is_not_present());
        assert!(matches!(
            file.read_prop(obj, PropCode(9999), 0, SwapPolicy::Swap, TypeCode::INT32, &mut buf),
            Err(Error::BadProperty(_))
        ));
        // 1.x-only type on a 2.x file.
        assert!(matches!(
            file.read_prop(obj, PropCode::CPNT_EDIT_RATE, 0, SwapPolicy::Swap, TypeCode::EXACT_EDIT_RATE, &mut buf),
            Err(Error::BadType(_))
        ));
    }

    #[test]
    fn test_semantic_check_rejects_wrong_class() {
        let (_s, mut file) = scratch(ByteOrder::native());
        let head = file.head();
        let err = file
            .write_prop(head, PropCode::SCLP_SOURCE_TRACK, 0, TypeCode::INT32, &[0; 4])
            .unwrap_err();
        assert!(matches!(err, Error::ObjectSemantic(_)));

        let obj = sclp(&mut file);
        let err = file
            .write_prop(obj, PropCode::SCLP_SOURCE_TRACK, 0, TypeCode::UINT32, &[0; 4])
            .unwrap_err();
        assert!(matches!(err, Error::ObjectSemantic(_)));
    }

    #[test]
    fn test_semantic_checks_can_be_disabled() {
        let session = Session::with_config(crate::file::SessionConfig::new().with_semantic_checks(false)).unwrap();
        let mut file = session.create_scratch(FileOptions::default()).unwrap();
        let head = file.head();
        file.write_prop(head, PropCode::SCLP_SOURCE_TRACK, 0, TypeCode::INT32, &[0; 4])
            .unwrap();
    }

    #[test]
    fn test_foreign_order_swaps_both_ways() {
        let (_s, mut file) = scratch(ByteOrder::native().swapped());
        let obj = sclp(&mut file);
        let value = 0x0102_0304i32;
        file.write_prop(obj, PropCode::SCLP_SOURCE_TRACK, 0, TypeCode::INT32, &value.to_ne_bytes())
            .unwrap();

        let mut raw = [0u8; 4];
        file.read_prop(obj, PropCode::SCLP_SOURCE_TRACK, 0, SwapPolicy::NoSwap, TypeCode::INT32, &mut raw)
            .unwrap();
        assert_eq!(raw, value.swap_bytes().to_ne_bytes());

        let mut host = [0u8; 4];
        file.read_prop(obj, PropCode::SCLP_SOURCE_TRACK, 0, SwapPolicy::Swap, TypeCode::INT32, &mut host)
            .unwrap();
        assert_eq!(i32::from_ne_bytes(host), value);
    }

    #[test]
    fn test_swap_of_odd_width_fails() {
        let (_s, mut file) = scratch(ByteOrder::native().swapped());
        let obj = sclp(&mut file);
        assert!(matches!(
            file.write_prop(obj, PropCode::SCLP_SOURCE_TRACK, 0, TypeCode::INT32, &[1, 2, 3]),
            Err(Error::SwapFailed(3))
        ));
    }

    #[test]
    fn test_presence_length_and_removal() {
        let (_s, mut file) = scratch(ByteOrder::native());
        let obj = sclp(&mut file);
        assert!(!file.is_prop_present(obj, PropCode::SCLP_SOURCE_TRACK, TypeCode::INT32).unwrap());
        file.write_i32(obj, PropCode::SCLP_SOURCE_TRACK, 1).unwrap();
        assert!(file.is_prop_present(obj, PropCode::SCLP_SOURCE_TRACK, TypeCode::INT32).unwrap());
        assert_eq!(file.prop_length(obj, PropCode::SCLP_SOURCE_TRACK, TypeCode::INT32).unwrap(), 4);
        file.remove_prop(obj, PropCode::SCLP_SOURCE_TRACK, TypeCode::INT32).unwrap();
        assert!(file.read_i32(obj, PropCode::SCLP_SOURCE_TRACK).unwrap_err().is_not_present());
    }
}
