//! Byte-order primitives.
//!
//! OMF files record their byte order as a 2-byte magic on the head object
//! (`0x4D4D` big-endian, `0x4949` little-endian). Multi-byte scalars are
//! stored in that order and swapped on access when it differs from native.

use std::fmt;

use crate::util::{Error, Result};

/// Stored magic for big-endian ("MM") files.
pub const BIG_ENDIAN_MAGIC: u16 = 0x4D4D;

/// Stored magic for little-endian ("II") files.
pub const LITTLE_ENDIAN_MAGIC: u16 = 0x4949;

/// Byte order of stored data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the running machine.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    /// The opposite order.
    #[inline]
    pub const fn swapped(self) -> Self {
        match self {
            Self::Little => Self::Big,
            Self::Big => Self::Little,
        }
    }

    /// True when data in this order must be swapped to be read natively.
    #[inline]
    pub const fn is_foreign(self) -> bool {
        !matches!(
            (self, Self::native()),
            (Self::Little, Self::Little) | (Self::Big, Self::Big)
        )
    }

    /// The on-disk magic. Symmetric, so it reads the same in either order.
    #[inline]
    pub const fn magic(self) -> u16 {
        match self {
            Self::Little => LITTLE_ENDIAN_MAGIC,
            Self::Big => BIG_ENDIAN_MAGIC,
        }
    }

    /// Decode a stored magic.
    pub const fn from_magic(magic: u16) -> Option<Self> {
        match magic {
            LITTLE_ENDIAN_MAGIC => Some(Self::Little),
            BIG_ENDIAN_MAGIC => Some(Self::Big),
            _ => None,
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::native()
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Little => write!(f, "little-endian (II)"),
            Self::Big => write!(f, "big-endian (MM)"),
        }
    }
}

/// Reverse a 2-byte value in place.
#[inline]
pub fn swap16(bytes: &mut [u8; 2]) {
    bytes.swap(0, 1);
}

/// Reverse a 4-byte value in place.
#[inline]
pub fn swap32(bytes: &mut [u8; 4]) {
    bytes.reverse();
}

/// Reverse an 8-byte value in place.
#[inline]
pub fn swap64(bytes: &mut [u8; 8]) {
    bytes.reverse();
}

/// Swap a scalar held in `buf` according to its length.
///
/// Only 2, 4 and 8 byte scalars have a swap primitive; anything else is a
/// registry/type mismatch and fails with [`Error::SwapFailed`].
pub fn swap_scalar(buf: &mut [u8]) -> Result<()> {
    match buf.len() {
        2 => swap16(buf.try_into().map_err(|_| Error::SwapFailed(2))?),
        4 => swap32(buf.try_into().map_err(|_| Error::SwapFailed(4))?),
        8 => swap64(buf.try_into().map_err(|_| Error::SwapFailed(8))?),
        n => return Err(Error::SwapFailed(n)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_primitives() {
        let mut a = [0x12, 0x34];
        swap16(&mut a);
        assert_eq!(a, [0x34, 0x12]);

        let mut b = 0x01020304u32.to_ne_bytes();
        swap32(&mut b);
        assert_eq!(u32::from_ne_bytes(b), 0x04030201);

        let mut c = 0x0102030405060708u64.to_ne_bytes();
        swap64(&mut c);
        assert_eq!(u64::from_ne_bytes(c), 0x0807060504030201);
    }

    #[test]
    fn test_swap_is_involution() {
        let original = (-123456789i32).to_ne_bytes();
        let mut v = original;
        swap_scalar(&mut v).unwrap();
        swap_scalar(&mut v).unwrap();
        assert_eq!(v, original);
    }

    #[test]
    fn test_swap_scalar_sizes() {
        assert!(swap_scalar(&mut [0u8; 2]).is_ok());
        assert!(swap_scalar(&mut [0u8; 4]).is_ok());
        assert!(swap_scalar(&mut [0u8; 8]).is_ok());
        assert!(matches!(swap_scalar(&mut [0u8; 3]), Err(Error::SwapFailed(3))));
        assert!(matches!(swap_scalar(&mut [0u8; 12]), Err(Error::SwapFailed(12))));
    }

    #[test]
    fn test_magic() {
        assert_eq!(ByteOrder::from_magic(0x4D4D), Some(ByteOrder::Big));
        assert_eq!(ByteOrder::from_magic(0x4949), Some(ByteOrder::Little));
        assert_eq!(ByteOrder::from_magic(0x1234), None);
        // Symmetric magic survives a swap.
        assert_eq!(ByteOrder::Big.magic().swap_bytes(), ByteOrder::Big.magic());
    }

    #[test]
    fn test_foreign() {
        assert!(!ByteOrder::native().is_foreign());
        assert!(ByteOrder::native().swapped().is_foreign());
    }
}
