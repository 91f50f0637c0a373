//! Arrayed properties: a 16-bit element count followed by fixed-size elements.
//!
//! Indices are 1-based. The length is derived from the value size, the
//! stored count is kept in step for readers that trust it.

use crate::container::ObjectId;
use crate::core::{PropCode, TypeCode};
use crate::util::{Error, Result};

use super::access::SwapPolicy;
use super::handle::OmfFile;

/// Size of the element count header.
pub const ARRAY_HEADER_SIZE: u64 = 2;

/// Largest count the 16-bit header can hold.
pub const MAX_ARRAY_ELEMENTS: u32 = u16::MAX as u32;

impl OmfFile {
    /// Number of elements in an arrayed property; 0 when absent.
    pub fn get_array_length(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode, elem_size: u64) -> Result<u32> {
        let Some(v) = self.value_handle(obj, prop, ty)? else {
            return Ok(0);
        };
        let size = self.container.value_size(v)?;
        if size < ARRAY_HEADER_SIZE || elem_size == 0 {
            return Ok(0);
        }
        Ok(((size - ARRAY_HEADER_SIZE) / elem_size) as u32)
    }

    /// Prepare element `index` for writing and return its byte offset.
    ///
    /// `index` may name an existing element or the one just past the end.
    /// The first element of an absent property creates it, writing a zeroed
    /// element before the count so the value never starts out immediate.
    pub fn put_nth_element_header(
        &mut self,
        obj: ObjectId,
        prop: PropCode,
        index: u32,
        ty: TypeCode,
        elem_size: u64,
    ) -> Result<u64> {
        self.check_may_write()?;
        if index == 0 {
            return Err(Error::RequirePositive);
        }

        if !self.is_prop_present(obj, prop, ty)? {
            if index != 1 {
                return Err(Error::BadIndex { index, len: 0 });
            }
            let zeroed = vec![0u8; (ARRAY_HEADER_SIZE + elem_size) as usize];
            self.write_prop_unswapped(obj, prop, ty, &zeroed)?;
            self.write_count(obj, prop, ty, 1)?;
            return Ok(ARRAY_HEADER_SIZE);
        }

        let len = self.get_array_length(obj, prop, ty, elem_size)?;
        if index > len + 1 {
            return Err(Error::BadIndex { index, len });
        }
        let count = len.max(index);
        if count > MAX_ARRAY_ELEMENTS {
            return Err(Error::ArrayFull(len));
        }
        self.write_count(obj, prop, ty, count as u16)?;
        Ok(element_offset(index, elem_size))
    }

    /// Byte offset of existing element `index`.
    pub fn get_nth_element_header(
        &mut self,
        obj: ObjectId,
        prop: PropCode,
        index: u32,
        ty: TypeCode,
        elem_size: u64,
    ) -> Result<u64> {
        if index == 0 {
            return Err(Error::RequirePositive);
        }
        if !self.is_prop_present(obj, prop, ty)? {
            return Err(Error::PropertyNotPresent);
        }
        let len = self.get_array_length(obj, prop, ty, elem_size)?;
        if index > len {
            return Err(Error::BadIndex { index, len });
        }
        Ok(element_offset(index, elem_size))
    }

    /// Remove element `index`; later elements move down by one.
    pub fn remove_nth_element(
        &mut self,
        obj: ObjectId,
        prop: PropCode,
        index: u32,
        ty: TypeCode,
        elem_size: u64,
    ) -> Result<()> {
        self.check_may_write()?;
        let offset = self.get_nth_element_header(obj, prop, index, ty, elem_size)?;
        let count = self.read_count(obj, prop, ty)?;
        self.write_count(obj, prop, ty, count.saturating_sub(1))?;
        self.delete_prop_bytes(obj, prop, ty, offset, elem_size)
    }

    fn read_count(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_prop(obj, prop, 0, SwapPolicy::Swap, ty, &mut buf)?;
        Ok(u16::from_ne_bytes(buf))
    }

    fn write_count(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode, count: u16) -> Result<()> {
        self.write_prop(obj, prop, 0, ty, &count.to_ne_bytes())
    }

    /// Write a multi-scalar block verbatim, with semantic checks but no swap.
    fn write_prop_unswapped(&mut self, obj: ObjectId, prop: PropCode, ty: TypeCode, bytes: &[u8]) -> Result<()> {
        let v = self.value_handle_for_write(obj, prop, ty)?;
        self.container.write_value_data(v, bytes, 0)?;
        Ok(())
    }
}

#[inline]
fn element_offset(index: u32, elem_size: u64) -> u64 {
    ARRAY_HEADER_SIZE + (index as u64 - 1) * elem_size
}
