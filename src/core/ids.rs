//! Symbolic identifiers: class ids, type and property codes, file revisions.

use std::fmt;

/// On-disk schema generation of a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Revision {
    /// OMF 1.x
    V1,
    /// OMF 2.x
    V2,
}

impl Revision {
    /// Both revisions, oldest first.
    pub const ALL: [Revision; 2] = [Revision::V1, Revision::V2];

    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::V1 => 0,
            Self::V2 => 1,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "1.x"),
            Self::V2 => write!(f, "2.x"),
        }
    }
}

/// Which revisions a registration applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValidRevisions {
    V1Only,
    V2Only,
    Both,
}

impl ValidRevisions {
    /// True if `rev` is covered.
    #[inline]
    pub const fn includes(self, rev: Revision) -> bool {
        matches!(
            (self, rev),
            (Self::Both, _) | (Self::V1Only, Revision::V1) | (Self::V2Only, Revision::V2)
        )
    }

    /// Covered revisions, oldest first.
    pub fn revisions(self) -> impl Iterator<Item = Revision> {
        Revision::ALL.into_iter().filter(move |r| self.includes(*r))
    }
}

/// Four-character class identifier ("MOBJ", "CDCI", ...).
///
/// Stored as an object tag in 1.x files and as a class-id value in 2.x.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub [u8; 4]);

impl ClassId {
    /// Build from a four-character string. Shorter strings are space padded.
    pub fn from_str_padded(s: &str) -> Self {
        let mut tag = *b"    ";
        for (dst, src) in tag.iter_mut().zip(s.bytes()) {
            *dst = src;
        }
        Self(tag)
    }

    /// Raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub const OOBJ: Self = Self(*b"OOBJ");
    pub const HEAD: Self = Self(*b"HEAD");
    pub const MOBJ: Self = Self(*b"MOBJ");
    pub const SMOB: Self = Self(*b"SMOB");
    pub const CMOB: Self = Self(*b"CMOB");
    pub const CPNT: Self = Self(*b"CPNT");
    pub const SEGM: Self = Self(*b"SEGM");
    pub const TRAK: Self = Self(*b"TRAK");
    pub const MSLT: Self = Self(*b"MSLT");
    pub const SCLP: Self = Self(*b"SCLP");
    pub const FILL: Self = Self(*b"FILL");
    pub const SEQU: Self = Self(*b"SEQU");
    pub const DDEF: Self = Self(*b"DDEF");
    pub const MDES: Self = Self(*b"MDES");
    pub const MDFL: Self = Self(*b"MDFL");
    pub const DIDD: Self = Self(*b"DIDD");
    pub const CDCI: Self = Self(*b"CDCI");
    pub const RGBA: Self = Self(*b"RGBA");
    pub const WAVD: Self = Self(*b"WAVD");
    pub const AIFD: Self = Self(*b"AIFD");
    pub const MDAT: Self = Self(*b"MDAT");
    pub const IDAT: Self = Self(*b"IDAT");
    pub const WAVE: Self = Self(*b"WAVE");
    pub const AIFC: Self = Self(*b"AIFC");
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({self})")
    }
}

/// Symbolic type code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeCode(pub u32);

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Symbolic property code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropCode(pub u32);

impl fmt::Display for PropCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A value held separately for each revision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevMap<T> {
    slots: [Option<T>; 2],
}

impl<T> Default for RevMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RevMap<T> {
    /// Empty map.
    pub fn new() -> Self {
        Self { slots: [None, None] }
    }

    /// Value for `rev`.
    #[inline]
    pub fn get(&self, rev: Revision) -> Option<&T> {
        self.slots[rev.index()].as_ref()
    }

    /// Mutable value for `rev`.
    #[inline]
    pub fn get_mut(&mut self, rev: Revision) -> Option<&mut T> {
        self.slots[rev.index()].as_mut()
    }

    /// Set the value for `rev`, returning the previous one.
    pub fn insert(&mut self, rev: Revision, value: T) -> Option<T> {
        self.slots[rev.index()].replace(value)
    }

    /// Iterate populated revisions.
    pub fn iter(&self) -> impl Iterator<Item = (Revision, &T)> {
        Revision::ALL
            .into_iter()
            .filter_map(move |r| self.get(r).map(|v| (r, v)))
    }
}
