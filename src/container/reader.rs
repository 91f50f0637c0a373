//! Container file reader.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use super::format::*;
use super::store::{Container, ObjectId, ObjectRecord, PropHandle, RefToken, TypeHandle, ValueRecord};
use crate::util::{Error, Result};

/// Raw bytes of a container file.
/// Supports both memory-mapped and buffered I/O modes.
pub struct IStreams {
    inner: StreamsInner,
    version: u16,
    complete: bool,
}

enum StreamsInner {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Whole file read into memory (fallback)
    Buffer(Vec<u8>),
}

impl IStreams {
    /// Open a file for reading with memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::UnexpectedEof(size));
        }

        let inner = if use_mmap {
            // Safety: the map is only read and dropped before the file is rewritten.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            StreamsInner::Mmap(mmap)
        } else {
            let mut buf = Vec::with_capacity(size as usize);
            file.read_to_end(&mut buf)?;
            StreamsInner::Buffer(buf)
        };

        let (version, complete) = Self::parse_header(Self::bytes_of(&inner))?;
        Ok(Self { inner, version, complete })
    }

    fn bytes_of(inner: &StreamsInner) -> &[u8] {
        match inner {
            StreamsInner::Mmap(m) => &m[..],
            StreamsInner::Buffer(b) => b.as_slice(),
        }
    }

    /// Parse and validate the header.
    fn parse_header(data: &[u8]) -> Result<(u16, bool)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }
        if &data[0..5] != BENTO_MAGIC {
            return Err(Error::InvalidMagic);
        }
        let complete = data[COMPLETE_OFFSET] == COMPLETE_FLAG;
        let version = u16::from_be_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
        if version != CURRENT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok((version, complete))
    }

    /// All file bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        Self::bytes_of(&self.inner)
    }

    /// Format version.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// True once the TOC was fully written.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Bounds-checked little-endian cursor over the file bytes.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(Error::UnexpectedEof(u64::MAX))?;
        if end > self.data.len() {
            return Err(Error::UnexpectedEof(end as u64));
        }
        let s = &self.data[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        Ok(u64::from_le_bytes(a))
    }

    fn name(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        Ok(String::from_utf8(self.take(len)?.to_vec())?)
    }
}

/// Load a whole container into memory.
pub fn load(path: impl AsRef<Path>) -> Result<Container> {
    let path = path.as_ref();
    let streams = IStreams::open_opts(path, cfg!(feature = "mmap"))?;
    if !streams.is_complete() {
        return Err(Error::Container("container was not closed cleanly".into()));
    }
    let file_bytes = streams.bytes();
    let toc_pos = u64::from_le_bytes(
        file_bytes[TOC_POS_OFFSET..TOC_POS_OFFSET + 8]
            .try_into()
            .map_err(|_| Error::UnexpectedEof(TOC_POS_OFFSET as u64))?,
    );
    let mut cur = Cursor::new(file_bytes, toc_pos as usize);

    let num_types = cur.u32()?;
    let type_names = (0..num_types).map(|_| cur.name()).collect::<Result<Vec<_>>>()?;
    let num_props = cur.u32()?;
    let prop_names = (0..num_props).map(|_| cur.name()).collect::<Result<Vec<_>>>()?;

    let root = match cur.u32()? {
        NO_ROOT => None,
        id => Some(ObjectId(id)),
    };
    let next_object = cur.u32()?;

    let num_objects = cur.u32()?;
    let mut objects = BTreeMap::new();
    for _ in 0..num_objects {
        let id = ObjectId(cur.u32()?);
        let num_values = cur.u32()?;
        let mut values = Vec::with_capacity(num_values as usize);
        for _ in 0..num_values {
            let prop = PropHandle(cur.u32()?);
            let ty = TypeHandle(cur.u32()?);
            if prop.0 >= num_props || ty.0 >= num_types {
                return Err(Error::Container(format!("value of object {} names unknown dictionary entry", id.0)));
            }
            let (data, immediate) = match cur.u8()? {
                STORAGE_IMMEDIATE => {
                    let len = cur.u8()? as usize;
                    let inline = cur.take(IMMEDIATE_LIMIT)?;
                    if len > IMMEDIATE_LIMIT {
                        return Err(Error::Container(format!("immediate value of {len} bytes")));
                    }
                    (inline[..len].to_vec(), true)
                }
                STORAGE_EXTERNAL => {
                    let pos = cur.u64()? as usize;
                    let len = cur.u64()? as usize;
                    let bytes = Cursor::new(file_bytes, pos).take(len)?;
                    (bytes.to_vec(), false)
                }
                other => return Err(Error::Container(format!("unknown storage tag {other}"))),
            };
            let num_refs = cur.u32()?;
            let mut refs = Vec::with_capacity(num_refs as usize);
            for _ in 0..num_refs {
                refs.push((RefToken(cur.u32()?), ObjectId(cur.u32()?)));
            }
            values.push(ValueRecord { prop, ty, data, refs, immediate });
        }
        objects.insert(id, ObjectRecord { values });
    }

    debug!(path = %path.display(), objects = objects.len(), "container loaded");
    Ok(Container::from_parts(type_names, prop_names, objects, next_object, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::writer::save;

    #[test]
    fn test_save_load_roundtrip() {
        let temp = tempfile::NamedTempFile::new().unwrap();

        let mut c = Container::new();
        let head = c.new_object().unwrap();
        let other = c.new_object().unwrap();
        c.set_root(head).unwrap();
        let p = c.register_property("OMFI:HEAD:Mobs");
        let t = c.register_type("omfi:ObjRefArray");
        let small = c.register_property("OMFI:Small");
        let v = c.new_value(head, p, t).unwrap();
        let token = c.reference_data(v, other).unwrap();
        c.write_value_data(v, &[1, 0, 9, 9, 9, 9], 0).unwrap();
        let s = c.new_value(other, small, t).unwrap();
        c.write_value_data(s, &[7, 7], 0).unwrap();

        save(&c, temp.path()).unwrap();
        let loaded = load(temp.path()).unwrap();

        assert_eq!(loaded.root(), Some(head));
        assert_eq!(loaded.num_objects(), 2);
        let p2 = loaded.lookup_property("OMFI:HEAD:Mobs").unwrap();
        let t2 = loaded.lookup_type("omfi:ObjRefArray").unwrap();
        let v2 = loaded.use_value(head, p2, t2).unwrap();
        assert_eq!(loaded.value_size(v2).unwrap(), 6);
        assert_eq!(loaded.referenced_object(v2, token).unwrap(), other);

        let s2 = loaded.use_value(other, loaded.lookup_property("OMFI:Small").unwrap(), t2).unwrap();
        assert!(loaded.is_immediate(s2).unwrap());
        let mut buf = [0u8; 2];
        loaded.read_value_data(s2, &mut buf, 0).unwrap();
        assert_eq!(buf, [7, 7]);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), b"NotBento________").unwrap();
        assert!(matches!(load(temp.path()), Err(Error::InvalidMagic)));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load("/nonexistent/dir/file.omf"),
            Err(Error::FileNotFound(_))
        ));
    }
}
