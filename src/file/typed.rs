//! Typed property accessors.
//!
//! Thin wrappers over the generic accessor. Each one knows its type's field
//! layout and, for enumerations, the on-disk value table; everything else
//! (swapping, semantic checks, the write guard) happens underneath.

use std::time::SystemTime;

use crate::container::{ObjectId, RefToken};
use crate::core::{
    ClassId, EditHint, FadeType, FrameLayout, ProductReleaseType, ProductVersion, PropCode, Rational,
    Revision, TimeStamp, TypeCode, Uid, VersionType,
};
use crate::util::{extended_to_f64, f64_to_extended, ByteOrder, Error, Result, EXTENDED_SIZE};

use super::access::SwapPolicy;
use super::handle::OmfFile;

/// Stored size of an object reference.
pub const OBJ_REF_SIZE: u64 = 4;

/// Stored size of a 32-bit position array element.
pub const POSITION32_SIZE: u64 = 4;

/// Strings and unique names never occupy fewer bytes than this.
pub const MIN_STRING_SIZE: usize = 5;

/// One entry of a 1.x mob index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MobIndexEntry {
    pub mob_id: Uid,
    pub mob: ObjectId,
}

impl MobIndexEntry {
    /// Stored size: the mob id then a reference.
    pub const SIZE: u64 = 16;
}

/// Fixed on-disk width of a built-in type, `None` for variable-length types.
pub fn fixed_width(ty: TypeCode) -> Option<usize> {
    let width = match ty {
        TypeCode::BOOLEAN | TypeCode::INT8 | TypeCode::UINT8 => 1,
        TypeCode::INT16 | TypeCode::UINT16 | TypeCode::VERSION_TYPE => 2,
        TypeCode::FRAME_LAYOUT | TypeCode::FADE_TYPE | TypeCode::EDIT_HINT => 2,
        TypeCode::INT32 | TypeCode::UINT32 | TypeCode::POSITION32 | TypeCode::LENGTH32 => 4,
        TypeCode::CLASS_ID | TypeCode::OBJECT_TAG | TypeCode::OBJ_REF => 4,
        TypeCode::TIME_STAMP => TimeStamp::SIZE,
        TypeCode::INT64 | TypeCode::POSITION64 | TypeCode::LENGTH64 => 8,
        TypeCode::RATIONAL | TypeCode::EXACT_EDIT_RATE => Rational::SIZE,
        TypeCode::PRODUCT_VERSION => ProductVersion::SIZE,
        TypeCode::UID => Uid::SIZE,
        _ => return None,
    };
    Some(width)
}

fn check_width(ty: TypeCode, expected: usize) -> Result<()> {
    match fixed_width(ty) {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(Error::TypeWidthMismatch { expected, actual: actual.unwrap_or(0) }),
    }
}

macro_rules! scalar_accessors {
    ($($read:ident, $write:ident, $t:ty, $code:expr;)*) => {
        impl OmfFile {
            $(
                #[doc = concat!("Read a `", stringify!($t), "` property.")]
                pub fn $read(&mut self, obj: ObjectId, prop: PropCode) -> Result<$t> {
                    Ok(<$t>::from_ne_bytes(self.read_field(obj, prop, $code, 0)?))
                }

                #[doc = concat!("Write a `", stringify!($t), "` property.")]
                pub fn $write(&mut self, obj: ObjectId, prop: PropCode, value: $t) -> Result<()> {
                    self.write_prop(obj, prop, 0, $code, &value.to_ne_bytes())
                }
            )*
        }
    };
}

scalar_accessors! {
    read_i8, write_i8, i8, TypeCode::INT8;
    read_i16, write_i16, i16, TypeCode::INT16;
    read_i32, write_i32, i32, TypeCode::INT32;
    read_i64, write_i64, i64, TypeCode::INT64;
    read_u8, write_u8, u8, TypeCode::UINT8;
    read_u16, write_u16, u16, TypeCode::UINT16;
    read_u32, write_u32, u32, TypeCode::UINT32;
}

impl OmfFile {
    fn read_field<const N: usize>(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode, offset: u64) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_prop(obj, prop, offset, SwapPolicy::Swap, ty, &mut buf)?;
        Ok(buf)
    }

    // ------------------------------------------------------------------
    // Booleans and compounds
    // ------------------------------------------------------------------

    pub fn read_bool(&mut self, obj: ObjectId, prop: PropCode) -> Result<bool> {
        let [b] = self.read_field::<1>(obj, prop, TypeCode::BOOLEAN, 0)?;
        Ok(b != 0)
    }

    pub fn write_bool(&mut self, obj: ObjectId, prop: PropCode, value: bool) -> Result<()> {
        self.write_prop(obj, prop, 0, TypeCode::BOOLEAN, &[value as u8])
    }

    /// Read a `Rational` property.
    pub fn read_rational(&mut self, obj: ObjectId, prop: PropCode) -> Result<Rational> {
        self.read_rational_as(obj, prop, TypeCode::RATIONAL)
    }

    /// Write a `Rational` property.
    pub fn write_rational(&mut self, obj: ObjectId, prop: PropCode, value: Rational) -> Result<()> {
        self.write_rational_as(obj, prop, TypeCode::RATIONAL, value)
    }

    /// Read an edit rate stored as `ExactEditRate` (1.x) or `Rational` (2.x).
    pub fn read_exact_edit_rate(&mut self, obj: ObjectId, prop: PropCode) -> Result<Rational> {
        let ty = self.edit_rate_type();
        self.read_rational_as(obj, prop, ty)
    }

    /// Write an edit rate in the revision's representation.
    pub fn write_exact_edit_rate(&mut self, obj: ObjectId, prop: PropCode, value: Rational) -> Result<()> {
        let ty = self.edit_rate_type();
        self.write_rational_as(obj, prop, ty, value)
    }

    fn edit_rate_type(&self) -> TypeCode {
        match self.revision() {
            Revision::V1 => TypeCode::EXACT_EDIT_RATE,
            Revision::V2 => TypeCode::RATIONAL,
        }
    }

    pub(crate) fn read_rational_as(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode) -> Result<Rational> {
        check_width(ty, Rational::SIZE)?;
        let numerator = i32::from_ne_bytes(self.read_field(obj, prop, ty, 0)?);
        let denominator = i32::from_ne_bytes(self.read_field(obj, prop, ty, 4)?);
        Ok(Rational::new(numerator, denominator))
    }

    pub(crate) fn write_rational_as(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode, value: Rational) -> Result<()> {
        check_width(ty, Rational::SIZE)?;
        self.write_prop(obj, prop, 0, ty, &value.numerator.to_ne_bytes())?;
        self.write_prop(obj, prop, 4, ty, &value.denominator.to_ne_bytes())
    }

    pub fn read_uid(&mut self, obj: ObjectId, prop: PropCode) -> Result<Uid> {
        let ty = TypeCode::UID;
        Ok(Uid::new(
            i32::from_ne_bytes(self.read_field(obj, prop, ty, 0)?),
            u32::from_ne_bytes(self.read_field(obj, prop, ty, 4)?),
            u32::from_ne_bytes(self.read_field(obj, prop, ty, 8)?),
        ))
    }

    pub fn write_uid(&mut self, obj: ObjectId, prop: PropCode, value: Uid) -> Result<()> {
        let ty = TypeCode::UID;
        self.write_prop(obj, prop, 0, ty, &value.prefix.to_ne_bytes())?;
        self.write_prop(obj, prop, 4, ty, &value.major.to_ne_bytes())?;
        self.write_prop(obj, prop, 8, ty, &value.minor.to_ne_bytes())
    }

    pub fn read_time_stamp(&mut self, obj: ObjectId, prop: PropCode) -> Result<TimeStamp> {
        let ty = TypeCode::TIME_STAMP;
        let seconds = u32::from_ne_bytes(self.read_field(obj, prop, ty, 0)?);
        let [gmt] = self.read_field::<1>(obj, prop, ty, 4)?;
        Ok(TimeStamp::new(seconds, gmt != 0))
    }

    pub fn write_time_stamp(&mut self, obj: ObjectId, prop: PropCode, value: TimeStamp) -> Result<()> {
        let ty = TypeCode::TIME_STAMP;
        self.write_prop(obj, prop, 0, ty, &value.seconds.to_ne_bytes())?;
        self.write_prop(obj, prop, 4, ty, &[value.is_gmt as u8])
    }

    /// Read a timestamp as platform time.
    pub fn read_system_time(&mut self, obj: ObjectId, prop: PropCode) -> Result<SystemTime> {
        Ok(self.read_time_stamp(obj, prop)?.to_system_time())
    }

    /// Write platform time as a GMT timestamp.
    pub fn write_system_time(&mut self, obj: ObjectId, prop: PropCode, value: SystemTime) -> Result<()> {
        self.write_time_stamp(obj, prop, TimeStamp::from_system_time(value))
    }

    pub fn read_version_type(&mut self, obj: ObjectId, prop: PropCode) -> Result<VersionType> {
        let [major, minor] = self.read_field::<2>(obj, prop, TypeCode::VERSION_TYPE, 0)?;
        Ok(VersionType::new(major, minor))
    }

    pub fn write_version_type(&mut self, obj: ObjectId, prop: PropCode, value: VersionType) -> Result<()> {
        self.write_prop(obj, prop, 0, TypeCode::VERSION_TYPE, &[value.major, value.minor])
    }

    pub fn read_product_version(&mut self, obj: ObjectId, prop: PropCode) -> Result<ProductVersion> {
        let ty = TypeCode::PRODUCT_VERSION;
        let mut fields = [0u16; 5];
        for (i, field) in fields.iter_mut().enumerate() {
            *field = u16::from_ne_bytes(self.read_field(obj, prop, ty, i as u64 * 2)?);
        }
        Ok(ProductVersion {
            major: fields[0],
            minor: fields[1],
            tertiary: fields[2],
            release: ProductReleaseType::from_disk(fields[3]),
            patch_level: fields[4],
        })
    }

    pub fn write_product_version(&mut self, obj: ObjectId, prop: PropCode, value: ProductVersion) -> Result<()> {
        let ty = TypeCode::PRODUCT_VERSION;
        let fields = [
            value.major,
            value.minor,
            value.tertiary,
            value.release.to_disk(),
            value.patch_level,
        ];
        for (i, field) in fields.iter().enumerate() {
            self.write_prop(obj, prop, i as u64 * 2, ty, &field.to_ne_bytes())?;
        }
        Ok(())
    }

    /// Read a class id; an object tag in 1.x files, a class-id value in 2.x.
    pub fn read_class_id(&mut self, obj: ObjectId, prop: PropCode) -> Result<ClassId> {
        let ty = self.class_id_type();
        check_width(ty, 4)?;
        Ok(ClassId(self.read_field(obj, prop, ty, 0)?))
    }

    pub fn write_class_id(&mut self, obj: ObjectId, prop: PropCode, value: ClassId) -> Result<()> {
        let ty = self.class_id_type();
        check_width(ty, 4)?;
        self.write_prop(obj, prop, 0, ty, value.as_bytes())
    }

    fn class_id_type(&self) -> TypeCode {
        match self.revision() {
            Revision::V1 => TypeCode::OBJECT_TAG,
            Revision::V2 => TypeCode::CLASS_ID,
        }
    }

    /// Read a stored byte-order magic.
    pub fn read_byte_order_magic(&mut self, obj: ObjectId, prop: PropCode) -> Result<ByteOrder> {
        let magic = self.read_i16(obj, prop)? as u16;
        ByteOrder::from_magic(magic).ok_or_else(|| Error::invalid(format!("unknown byte order magic {magic:#06x}")))
    }

    pub fn write_byte_order_magic(&mut self, obj: ObjectId, prop: PropCode, order: ByteOrder) -> Result<()> {
        self.write_i16(obj, prop, order.magic() as i16)
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    pub fn read_string(&mut self, obj: ObjectId, prop: PropCode) -> Result<String> {
        self.read_cstring(obj, prop, TypeCode::STRING)
    }

    /// Write a string, NUL-terminated and padded to at least five bytes.
    pub fn write_string(&mut self, obj: ObjectId, prop: PropCode, value: &str) -> Result<()> {
        self.write_cstring(obj, prop, TypeCode::STRING, value)
    }

    pub fn read_unique_name(&mut self, obj: ObjectId, prop: PropCode) -> Result<String> {
        self.read_cstring(obj, prop, TypeCode::UNIQUE_NAME)
    }

    pub fn write_unique_name(&mut self, obj: ObjectId, prop: PropCode, value: &str) -> Result<()> {
        self.write_cstring(obj, prop, TypeCode::UNIQUE_NAME, value)
    }

    fn read_cstring(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode) -> Result<String> {
        let len = self.prop_length(obj, prop, ty)? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let mut buf = vec![0u8; len];
        self.read_prop(obj, prop, 0, SwapPolicy::NoSwap, ty, &mut buf)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(len);
        buf.truncate(end);
        Ok(String::from_utf8(buf)?)
    }

    fn write_cstring(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode, value: &str) -> Result<()> {
        if value.as_bytes().contains(&0) {
            return Err(Error::invalid("string contains an interior NUL"));
        }
        let mut bytes = Vec::with_capacity(value.len().max(MIN_STRING_SIZE - 1) + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        if bytes.len() < MIN_STRING_SIZE {
            bytes.resize(MIN_STRING_SIZE, 0);
        }

        let old_len = if self.is_prop_present(obj, prop, ty)? {
            self.prop_length(obj, prop, ty)?
        } else {
            0
        };
        self.write_prop(obj, prop, 0, ty, &bytes)?;
        let new_len = bytes.len() as u64;
        if old_len > new_len {
            self.delete_prop_bytes(obj, prop, ty, new_len, old_len - new_len)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Positions and lengths
    // ------------------------------------------------------------------

    /// Read a position, whichever width it was stored with.
    pub fn read_position(&mut self, obj: ObjectId, prop: PropCode) -> Result<i64> {
        self.read_dual_width(obj, prop, TypeCode::POSITION32, TypeCode::POSITION64)
    }

    /// Write a position, 32-bit when it fits.
    pub fn write_position(&mut self, obj: ObjectId, prop: PropCode, value: i64) -> Result<()> {
        self.write_dual_width(obj, prop, value, TypeCode::POSITION32, TypeCode::POSITION64)
    }

    /// Read a length, whichever width it was stored with.
    pub fn read_length(&mut self, obj: ObjectId, prop: PropCode) -> Result<i64> {
        self.read_dual_width(obj, prop, TypeCode::LENGTH32, TypeCode::LENGTH64)
    }

    /// Write a length, 32-bit when it fits.
    pub fn write_length(&mut self, obj: ObjectId, prop: PropCode, value: i64) -> Result<()> {
        self.write_dual_width(obj, prop, value, TypeCode::LENGTH32, TypeCode::LENGTH64)
    }

    fn read_dual_width(&mut self, obj: ObjectId, prop: PropCode, narrow: TypeCode, wide: TypeCode) -> Result<i64> {
        match self.read_field::<4>(obj, prop, narrow, 0) {
            Ok(b) => Ok(i32::from_ne_bytes(b) as i64),
            Err(Error::PropertyNotPresent) if self.revision() == Revision::V2 => {
                Ok(i64::from_ne_bytes(self.read_field(obj, prop, wide, 0)?))
            }
            Err(e) => Err(e),
        }
    }

    fn write_dual_width(
        &mut self,
        obj: ObjectId,
        prop: PropCode,
        value: i64,
        narrow: TypeCode,
        wide: TypeCode,
    ) -> Result<()> {
        self.check_may_write()?;
        let fits = i32::try_from(value);
        if self.revision() == Revision::V1 {
            let v = fits.map_err(|_| Error::ValueOutOfRange(value))?;
            return self.write_prop(obj, prop, 0, narrow, &v.to_ne_bytes());
        }

        let (keep, stale) = if fits.is_ok() { (narrow, wide) } else { (wide, narrow) };
        self.resolve(prop, keep)?;
        self.check_semantics(obj, prop, keep)?;
        match fits {
            Ok(v) => self.write_prop(obj, prop, 0, narrow, &v.to_ne_bytes())?,
            Err(_) => self.write_prop(obj, prop, 0, wide, &value.to_ne_bytes())?,
        }
        // Only once the new encoding is stored.
        if self.is_prop_present(obj, prop, stale)? {
            self.remove_prop(obj, prop, stale)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Enumerations
    // ------------------------------------------------------------------

    pub fn read_frame_layout(&mut self, obj: ObjectId, prop: PropCode) -> Result<FrameLayout> {
        let v = self.read_enum_code(obj, prop, TypeCode::FRAME_LAYOUT)?;
        FrameLayout::from_disk(v).ok_or_else(|| Error::invalid(format!("frame layout code {v}")))
    }

    pub fn write_frame_layout(&mut self, obj: ObjectId, prop: PropCode, value: FrameLayout) -> Result<()> {
        self.write_prop(obj, prop, 0, TypeCode::FRAME_LAYOUT, &value.to_disk().to_ne_bytes())
    }

    pub fn read_fade_type(&mut self, obj: ObjectId, prop: PropCode) -> Result<FadeType> {
        let v = self.read_enum_code(obj, prop, TypeCode::FADE_TYPE)?;
        FadeType::from_disk(v).ok_or_else(|| Error::invalid(format!("fade type code {v}")))
    }

    pub fn write_fade_type(&mut self, obj: ObjectId, prop: PropCode, value: FadeType) -> Result<()> {
        self.write_prop(obj, prop, 0, TypeCode::FADE_TYPE, &value.to_disk().to_ne_bytes())
    }

    pub fn read_edit_hint(&mut self, obj: ObjectId, prop: PropCode) -> Result<EditHint> {
        let v = self.read_enum_code(obj, prop, TypeCode::EDIT_HINT)?;
        EditHint::from_disk(v).ok_or_else(|| Error::invalid(format!("edit hint code {v}")))
    }

    pub fn write_edit_hint(&mut self, obj: ObjectId, prop: PropCode, value: EditHint) -> Result<()> {
        self.write_prop(obj, prop, 0, TypeCode::EDIT_HINT, &value.to_disk().to_ne_bytes())
    }

    fn read_enum_code(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode) -> Result<i16> {
        Ok(i16::from_ne_bytes(self.read_field(obj, prop, ty, 0)?))
    }

    // ------------------------------------------------------------------
    // Object references
    // ------------------------------------------------------------------

    /// Object named by a reference property.
    pub fn read_obj_ref(&mut self, obj: ObjectId, prop: PropCode) -> Result<ObjectId> {
        self.read_ref_at(obj, prop, TypeCode::OBJ_REF, 0)
    }

    /// Point a reference property at `target`.
    pub fn write_obj_ref(&mut self, obj: ObjectId, prop: PropCode, target: ObjectId) -> Result<()> {
        self.write_ref_at(obj, prop, TypeCode::OBJ_REF, 0, target)
    }

    fn read_ref_at(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode, offset: u64) -> Result<ObjectId> {
        let token = u32::from_ne_bytes(self.read_field(obj, prop, ty, offset)?);
        let v = self.value_handle(obj, prop, ty)?.ok_or(Error::PropertyNotPresent)?;
        Ok(self.container.referenced_object(v, RefToken(token))?)
    }

    fn write_ref_at(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode, offset: u64, target: ObjectId) -> Result<()> {
        let v = self.value_handle_for_write(obj, prop, ty)?;
        let token = self.container.reference_data(v, target)?;
        self.write_prop(obj, prop, offset, ty, &token.0.to_ne_bytes())
    }

    /// Number of entries in an object-reference array.
    pub fn obj_ref_array_len(&mut self, obj: ObjectId, prop: PropCode) -> Result<u32> {
        self.get_array_length(obj, prop, TypeCode::OBJ_REF_ARRAY, OBJ_REF_SIZE)
    }

    /// Entry `index` (1-based) of an object-reference array.
    pub fn read_nth_obj_ref(&mut self, obj: ObjectId, prop: PropCode, index: u32) -> Result<ObjectId> {
        let ty = TypeCode::OBJ_REF_ARRAY;
        let offset = self.get_nth_element_header(obj, prop, index, ty, OBJ_REF_SIZE)?;
        self.read_ref_at(obj, prop, ty, offset)
    }

    /// Set entry `index`; `index` may be one past the end to append.
    pub fn write_nth_obj_ref(&mut self, obj: ObjectId, prop: PropCode, index: u32, target: ObjectId) -> Result<()> {
        let ty = TypeCode::OBJ_REF_ARRAY;
        let offset = self.put_nth_element_header(obj, prop, index, ty, OBJ_REF_SIZE)?;
        self.write_ref_at(obj, prop, ty, offset, target)
    }

    /// Append a reference and return its index.
    pub fn append_obj_ref(&mut self, obj: ObjectId, prop: PropCode, target: ObjectId) -> Result<u32> {
        let index = self.obj_ref_array_len(obj, prop)? + 1;
        self.write_nth_obj_ref(obj, prop, index, target)?;
        Ok(index)
    }

    /// Remove entry `index`.
    pub fn remove_nth_obj_ref(&mut self, obj: ObjectId, prop: PropCode, index: u32) -> Result<()> {
        self.remove_nth_element(obj, prop, index, TypeCode::OBJ_REF_ARRAY, OBJ_REF_SIZE)
    }

    /// All entries of an object-reference array; empty when absent.
    pub fn read_obj_refs(&mut self, obj: ObjectId, prop: PropCode) -> Result<Vec<ObjectId>> {
        let len = self.obj_ref_array_len(obj, prop)?;
        (1..=len).map(|i| self.read_nth_obj_ref(obj, prop, i)).collect()
    }

    // ------------------------------------------------------------------
    // Mob index (1.x)
    // ------------------------------------------------------------------

    pub fn mob_index_len(&mut self, obj: ObjectId, prop: PropCode) -> Result<u32> {
        self.get_array_length(obj, prop, TypeCode::MOB_INDEX, MobIndexEntry::SIZE)
    }

    pub fn read_nth_mob_index(&mut self, obj: ObjectId, prop: PropCode, index: u32) -> Result<MobIndexEntry> {
        let ty = TypeCode::MOB_INDEX;
        let offset = self.get_nth_element_header(obj, prop, index, ty, MobIndexEntry::SIZE)?;
        let mob_id = Uid::new(
            i32::from_ne_bytes(self.read_field(obj, prop, ty, offset)?),
            u32::from_ne_bytes(self.read_field(obj, prop, ty, offset + 4)?),
            u32::from_ne_bytes(self.read_field(obj, prop, ty, offset + 8)?),
        );
        let mob = self.read_ref_at(obj, prop, ty, offset + 12)?;
        Ok(MobIndexEntry { mob_id, mob })
    }

    pub fn write_nth_mob_index(&mut self, obj: ObjectId, prop: PropCode, index: u32, entry: MobIndexEntry) -> Result<()> {
        let ty = TypeCode::MOB_INDEX;
        let offset = self.put_nth_element_header(obj, prop, index, ty, MobIndexEntry::SIZE)?;
        self.write_prop(obj, prop, offset, ty, &entry.mob_id.prefix.to_ne_bytes())?;
        self.write_prop(obj, prop, offset + 4, ty, &entry.mob_id.major.to_ne_bytes())?;
        self.write_prop(obj, prop, offset + 8, ty, &entry.mob_id.minor.to_ne_bytes())?;
        self.write_ref_at(obj, prop, ty, offset + 12, entry.mob)
    }

    /// Remove entry `index`.
    pub fn remove_nth_mob_index(&mut self, obj: ObjectId, prop: PropCode, index: u32) -> Result<()> {
        self.remove_nth_element(obj, prop, index, TypeCode::MOB_INDEX, MobIndexEntry::SIZE)
    }

    pub fn append_mob_index(&mut self, obj: ObjectId, prop: PropCode, entry: MobIndexEntry) -> Result<u32> {
        let index = self.mob_index_len(obj, prop)? + 1;
        self.write_nth_mob_index(obj, prop, index, entry)?;
        Ok(index)
    }

    // ------------------------------------------------------------------
    // Position arrays (frame indexes)
    // ------------------------------------------------------------------

    pub fn position_array_len(&mut self, obj: ObjectId, prop: PropCode) -> Result<u32> {
        self.get_array_length(obj, prop, TypeCode::POSITION32_ARRAY, POSITION32_SIZE)
    }

    pub fn read_nth_position(&mut self, obj: ObjectId, prop: PropCode, index: u32) -> Result<i64> {
        let ty = TypeCode::POSITION32_ARRAY;
        let offset = self.get_nth_element_header(obj, prop, index, ty, POSITION32_SIZE)?;
        Ok(i32::from_ne_bytes(self.read_field(obj, prop, ty, offset)?) as i64)
    }

    pub fn append_position(&mut self, obj: ObjectId, prop: PropCode, value: i64) -> Result<u32> {
        let ty = TypeCode::POSITION32_ARRAY;
        let v = i32::try_from(value).map_err(|_| Error::ValueOutOfRange(value))?;
        let index = self.position_array_len(obj, prop)? + 1;
        let offset = self.put_nth_element_header(obj, prop, index, ty, POSITION32_SIZE)?;
        self.write_prop(obj, prop, offset, ty, &v.to_ne_bytes())?;
        Ok(index)
    }

    // ------------------------------------------------------------------
    // Data values
    // ------------------------------------------------------------------

    /// Length of a byte-blob property.
    pub fn data_value_length(&mut self, obj: ObjectId, prop: PropCode) -> Result<u64> {
        self.prop_length(obj, prop, TypeCode::DATA_VALUE)
    }

    /// Read blob bytes at `offset`; returns how many were copied.
    ///
    /// Unlike scalar reads, a short read near the end is not an error.
    /// Starting at or past the end is.
    pub fn read_data_value(&mut self, obj: ObjectId, prop: PropCode, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.check_semantics(obj, prop, TypeCode::DATA_VALUE)?;
        let v = self
            .value_handle(obj, prop, TypeCode::DATA_VALUE)?
            .ok_or(Error::PropertyNotPresent)?;
        if offset >= self.container.value_size(v)? {
            return Err(Error::EndOfData);
        }
        Ok(self.container.read_value_data(v, buf, offset)?)
    }

    /// Write blob bytes at `offset`; writing at the current end appends.
    pub fn write_data_value(&mut self, obj: ObjectId, prop: PropCode, offset: u64, bytes: &[u8]) -> Result<()> {
        self.write_prop(obj, prop, offset, TypeCode::DATA_VALUE, bytes)
    }

    /// Read a whole blob.
    pub fn read_data_value_all(&mut self, obj: ObjectId, prop: PropCode) -> Result<Vec<u8>> {
        let len = self.data_value_length(obj, prop)? as usize;
        let mut buf = vec![0u8; len];
        if len > 0 {
            self.read_data_value(obj, prop, 0, &mut buf)?;
        }
        Ok(buf)
    }

    /// Read an 80-bit extended float stored inside a blob.
    pub fn read_extended(&mut self, obj: ObjectId, prop: PropCode, offset: u64) -> Result<f64> {
        let mut buf = [0u8; EXTENDED_SIZE];
        if self.read_data_value(obj, prop, offset, &mut buf)? < EXTENDED_SIZE {
            return Err(Error::EndOfData);
        }
        Ok(extended_to_f64(&buf))
    }

    /// Write an 80-bit extended float inside a blob.
    pub fn write_extended(&mut self, obj: ObjectId, prop: PropCode, offset: u64, value: f64) -> Result<()> {
        self.write_data_value(obj, prop, offset, &f64_to_extended(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{FileOptions, Session};

    fn scratch(rev: Revision, order: ByteOrder) -> (Session, OmfFile) {
        let session = Session::begin().unwrap();
        let file = session
            .create_scratch(FileOptions::new(rev).with_byte_order(order))
            .unwrap();
        (session, file)
    }

    fn orders() -> [ByteOrder; 2] {
        [ByteOrder::native(), ByteOrder::native().swapped()]
    }

    #[test]
    fn test_scalar_boundaries() {
        for order in orders() {
            let (_s, mut file) = scratch(Revision::V2, order);
            let obj = file.new_object(ClassId::CDCI).unwrap();
            for v in [0, 1, -1, i32::MAX, i32::MIN] {
                file.write_i32(obj, PropCode::DIDD_STORED_WIDTH, v).unwrap();
                assert_eq!(file.read_i32(obj, PropCode::DIDD_STORED_WIDTH).unwrap(), v);
            }
            for v in [0, 2, u32::MAX] {
                file.write_u32(obj, PropCode::CDCI_HORIZ_SUBSAMPLING, v).unwrap();
                assert_eq!(file.read_u32(obj, PropCode::CDCI_HORIZ_SUBSAMPLING).unwrap(), v);
            }
            file.write_bool(obj, PropCode::MDFL_IS_OMFI, true).unwrap();
            assert!(file.read_bool(obj, PropCode::MDFL_IS_OMFI).unwrap());
        }
    }

    #[test]
    fn test_compounds() {
        for order in orders() {
            let (_s, mut file) = scratch(Revision::V2, order);
            let mob = file.new_object(ClassId::SMOB).unwrap();
            let sclp = file.new_object(ClassId::SCLP).unwrap();

            for uid in [Uid::default(), Uid::new(-7, 0xDEAD_BEEF, 42)] {
                file.write_uid(mob, PropCode::MOBJ_MOB_ID, uid).unwrap();
                assert_eq!(file.read_uid(mob, PropCode::MOBJ_MOB_ID).unwrap(), uid);
            }

            for r in [Rational::new(30000, 1001), Rational::new(25, 1)] {
                file.write_exact_edit_rate(sclp, PropCode::CPNT_EDIT_RATE, r).unwrap();
                assert_eq!(file.read_exact_edit_rate(sclp, PropCode::CPNT_EDIT_RATE).unwrap(), r);
            }

            let ts = TimeStamp::new(1_700_000_000, true);
            file.write_time_stamp(mob, PropCode::MOBJ_CREATION_TIME, ts).unwrap();
            assert_eq!(file.read_time_stamp(mob, PropCode::MOBJ_CREATION_TIME).unwrap(), ts);
            assert_eq!(file.prop_length(mob, PropCode::MOBJ_CREATION_TIME, TypeCode::TIME_STAMP).unwrap(), 5);

            let head = file.head();
            let pv = ProductVersion {
                major: 2,
                minor: 1,
                tertiary: 3,
                release: ProductReleaseType::Beta,
                patch_level: 9,
            };
            file.write_product_version(head, PropCode::HEAD_TOOLKIT_VERSION, pv).unwrap();
            assert_eq!(file.read_product_version(head, PropCode::HEAD_TOOLKIT_VERSION).unwrap(), pv);
        }
    }

    #[test]
    fn test_edit_rate_type_follows_revision() {
        let (_s, mut v1) = scratch(Revision::V1, ByteOrder::native());
        let trak = v1.new_object(ClassId::TRAK).unwrap();
        v1.write_exact_edit_rate(trak, PropCode::CPNT_EDIT_RATE, Rational::new(24, 1)).unwrap();
        assert!(v1.is_prop_present(trak, PropCode::CPNT_EDIT_RATE, TypeCode::EXACT_EDIT_RATE).unwrap());
        // Rational exists in 1.x but is not this property's 1.x type.
        assert!(matches!(
            v1.write_rational(trak, PropCode::CPNT_EDIT_RATE, Rational::new(24, 1)),
            Err(Error::ObjectSemantic(_))
        ));
    }

    #[test]
    fn test_length_switches_width_both_ways() {
        let (_s, mut file) = scratch(Revision::V2, ByteOrder::native());
        let sclp = file.new_object(ClassId::SCLP).unwrap();
        let long = i64::from(i32::MAX) + 1;

        file.write_length(sclp, PropCode::CPNT_LENGTH, 10).unwrap();
        file.write_length(sclp, PropCode::CPNT_LENGTH, long).unwrap();
        assert!(file.is_prop_present(sclp, PropCode::CPNT_LENGTH, TypeCode::LENGTH64).unwrap());
        assert!(!file.is_prop_present(sclp, PropCode::CPNT_LENGTH, TypeCode::LENGTH32).unwrap());
        assert_eq!(file.read_length(sclp, PropCode::CPNT_LENGTH).unwrap(), long);

        file.write_length(sclp, PropCode::CPNT_LENGTH, -3).unwrap();
        assert!(file.is_prop_present(sclp, PropCode::CPNT_LENGTH, TypeCode::LENGTH32).unwrap());
        assert!(!file.is_prop_present(sclp, PropCode::CPNT_LENGTH, TypeCode::LENGTH64).unwrap());
        assert_eq!(file.read_length(sclp, PropCode::CPNT_LENGTH).unwrap(), -3);
    }

    #[test]
    fn test_width_assertion() {
        let (_s, mut file) = scratch(Revision::V2, ByteOrder::native());
        let sclp = file.new_object(ClassId::SCLP).unwrap();
        assert!(matches!(
            file.read_rational_as(sclp, PropCode::CPNT_EDIT_RATE, TypeCode::UID),
            Err(Error::TypeWidthMismatch { expected: 8, actual: 12 })
        ));
    }

    #[test]
    fn test_short_strings_padded() {
        let (_s, mut file) = scratch(Revision::V2, ByteOrder::native());
        let mob = file.new_object(ClassId::CMOB).unwrap();
        for s in ["", "a", "ab", "abc", "abcd", "a longer mob name"] {
            file.write_string(mob, PropCode::MOBJ_NAME, s).unwrap();
            let stored = file.prop_length(mob, PropCode::MOBJ_NAME, TypeCode::STRING).unwrap();
            assert_eq!(stored as usize, (s.len() + 1).max(MIN_STRING_SIZE));
            assert_eq!(file.read_string(mob, PropCode::MOBJ_NAME).unwrap(), s);
        }
        assert!(file.write_string(mob, PropCode::MOBJ_NAME, "a\0b").is_err());
    }

    #[test]
    fn test_unique_name() {
        let (_s, mut file) = scratch(Revision::V2, ByteOrder::native());
        let ddef = file.new_object(ClassId::DDEF).unwrap();
        file.write_unique_name(ddef, PropCode::DDEF_DATA_KIND_ID, "omfi:data:Picture").unwrap();
        assert_eq!(
            file.read_unique_name(ddef, PropCode::DDEF_DATA_KIND_ID).unwrap(),
            "omfi:data:Picture"
        );
    }

    #[test]
    fn test_position_promotion() {
        let (_s, mut file) = scratch(Revision::V2, ByteOrder::native());
        let sclp = file.new_object(ClassId::SCLP).unwrap();
        let p = PropCode::SCLP_START_TIME;

        file.write_position(sclp, p, 1000).unwrap();
        assert!(file.is_prop_present(sclp, p, TypeCode::POSITION32).unwrap());
        assert!(!file.is_prop_present(sclp, p, TypeCode::POSITION64).unwrap());

        let big = i32::MAX as i64 + 10;
        file.write_position(sclp, p, big).unwrap();
        assert!(!file.is_prop_present(sclp, p, TypeCode::POSITION32).unwrap());
        assert_eq!(file.read_position(sclp, p).unwrap(), big);

        file.write_position(sclp, p, -5).unwrap();
        assert!(!file.is_prop_present(sclp, p, TypeCode::POSITION64).unwrap());
        assert_eq!(file.read_position(sclp, p).unwrap(), -5);
    }

    #[test]
    fn test_v1_length_is_32_bit() {
        let (_s, mut file) = scratch(Revision::V1, ByteOrder::native());
        let trak = file.new_object(ClassId::TRAK).unwrap();
        file.write_length(trak, PropCode::CPNT_LENGTH, 77).unwrap();
        assert_eq!(file.read_length(trak, PropCode::CPNT_LENGTH).unwrap(), 77);
        assert!(matches!(
            file.write_length(trak, PropCode::CPNT_LENGTH, i64::MAX),
            Err(Error::ValueOutOfRange(_))
        ));
    }

    #[test]
    fn test_enum_tables() {
        let (_s, mut file) = scratch(Revision::V2, ByteOrder::native());
        let cdci = file.new_object(ClassId::CDCI).unwrap();
        for layout in [
            FrameLayout::FullFrame,
            FrameLayout::SingleField,
            FrameLayout::SeparateFields,
            FrameLayout::MixedFields,
        ] {
            file.write_frame_layout(cdci, PropCode::DIDD_FRAME_LAYOUT, layout).unwrap();
            assert_eq!(file.read_frame_layout(cdci, PropCode::DIDD_FRAME_LAYOUT).unwrap(), layout);
        }
        file.write_frame_layout(cdci, PropCode::DIDD_FRAME_LAYOUT, FrameLayout::SeparateFields)
            .unwrap();
        let mut raw = [0u8; 2];
        file.read_prop(cdci, PropCode::DIDD_FRAME_LAYOUT, 0, SwapPolicy::Swap, TypeCode::FRAME_LAYOUT, &mut raw)
            .unwrap();
        assert_eq!(i16::from_ne_bytes(raw), FrameLayout::SeparateFields.to_disk());

        let sclp = file.new_object(ClassId::SCLP).unwrap();
        file.write_fade_type(sclp, PropCode::SCLP_FADE_IN_TYPE, FadeType::LinearPower).unwrap();
        assert_eq!(file.read_fade_type(sclp, PropCode::SCLP_FADE_IN_TYPE).unwrap(), FadeType::LinearPower);
        file.write_edit_hint(sclp, PropCode::CPNT_EDIT_HINT, EditHint::Proportional).unwrap();
        assert_eq!(file.read_edit_hint(sclp, PropCode::CPNT_EDIT_HINT).unwrap(), EditHint::Proportional);

        file.write_prop(cdci, PropCode::DIDD_FRAME_LAYOUT, 0, TypeCode::FRAME_LAYOUT, &99i16.to_ne_bytes())
            .unwrap();
        assert!(matches!(
            file.read_frame_layout(cdci, PropCode::DIDD_FRAME_LAYOUT),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_obj_ref_and_arrays() {
        let (_s, mut file) = scratch(Revision::V2, ByteOrder::native());
        let smob = file.new_object(ClassId::SMOB).unwrap();
        let mdes = file.new_object(ClassId::WAVD).unwrap();
        file.write_obj_ref(smob, PropCode::SMOB_MEDIA_DESCRIPTION, mdes).unwrap();
        assert_eq!(file.read_obj_ref(smob, PropCode::SMOB_MEDIA_DESCRIPTION).unwrap(), mdes);

        let head = file.head();
        assert!(file.read_obj_refs(head, PropCode::HEAD_MOBS).unwrap().is_empty());
        assert_eq!(file.append_obj_ref(head, PropCode::HEAD_MOBS, smob).unwrap(), 1);
        assert_eq!(file.read_obj_refs(head, PropCode::HEAD_MOBS).unwrap(), vec![smob]);
    }

    #[test]
    fn test_mob_index_v1() {
        let (_s, mut file) = scratch(Revision::V1, ByteOrder::native().swapped());
        let head = file.head();
        let a = file.new_object(ClassId::SMOB).unwrap();
        let b = file.new_object(ClassId::SMOB).unwrap();
        let ea = MobIndexEntry { mob_id: Uid::new(1, 2, 3), mob: a };
        let eb = MobIndexEntry { mob_id: Uid::new(4, 5, 6), mob: b };
        file.append_mob_index(head, PropCode::HEAD_SOURCE_MOBS, ea).unwrap();
        file.append_mob_index(head, PropCode::HEAD_SOURCE_MOBS, eb).unwrap();
        assert_eq!(file.mob_index_len(head, PropCode::HEAD_SOURCE_MOBS).unwrap(), 2);
        assert_eq!(file.read_nth_mob_index(head, PropCode::HEAD_SOURCE_MOBS, 2).unwrap(), eb);
        assert_eq!(file.read_nth_mob_index(head, PropCode::HEAD_SOURCE_MOBS, 1).unwrap(), ea);
    }

    #[test]
    fn test_position_array() {
        let (_s, mut file) = scratch(Revision::V2, ByteOrder::native());
        let idat = file.new_object(ClassId::IDAT).unwrap();
        for v in [0, 4096, 9000] {
            file.append_position(idat, PropCode::IDAT_FRAME_INDEX, v).unwrap();
        }
        assert_eq!(file.position_array_len(idat, PropCode::IDAT_FRAME_INDEX).unwrap(), 3);
        assert_eq!(file.read_nth_position(idat, PropCode::IDAT_FRAME_INDEX, 3).unwrap(), 9000);
    }

    #[test]
    fn test_data_value_and_extended() {
        let (_s, mut file) = scratch(Revision::V2, ByteOrder::native());
        let wave = file.new_object(ClassId::WAVE).unwrap();
        file.write_data_value(wave, PropCode::WAVE_DATA, 0, b"abcdef").unwrap();
        file.write_data_value(wave, PropCode::WAVE_DATA, 6, b"gh").unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(file.read_data_value(wave, PropCode::WAVE_DATA, 4, &mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"efgh");
        assert!(matches!(
            file.read_data_value(wave, PropCode::WAVE_DATA, 8, &mut buf),
            Err(Error::EndOfData)
        ));

        let aifd = file.new_object(ClassId::AIFD).unwrap();
        file.write_extended(aifd, PropCode::AIFD_SUMMARY, 0, 44100.0).unwrap();
        assert_eq!(file.read_extended(aifd, PropCode::AIFD_SUMMARY, 0).unwrap(), 44100.0);
    }
}
