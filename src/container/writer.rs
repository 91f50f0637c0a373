//! Container writer.
//!
//! The image is encoded in memory, written to a staging file beside the
//! target and renamed over it, so a failed save leaves the old file intact.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use tracing::{debug, warn};

use super::format::*;
use super::store::Container;
use crate::util::{Error, Result};

/// Suffix of the staging file a save writes before renaming.
pub const STAGING_SUFFIX: &str = ".partial";

/// Write the whole container to `path`.
pub fn save(container: &Container, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let image = encode(container)?;
    let staging = staging_path(path)?;

    let installed = write_staged(&staging, &image)
        .and_then(|_| fs::rename(&staging, path).map_err(Error::from));
    if let Err(e) = installed {
        if staging.exists() {
            if let Err(cleanup) = fs::remove_file(&staging) {
                warn!(path = %staging.display(), error = %cleanup, "staging file left behind");
            }
        }
        return Err(e);
    }

    debug!(
        path = %path.display(),
        objects = container.objects.len(),
        bytes = image.len(),
        "container saved"
    );
    Ok(())
}

fn staging_path(path: &Path) -> Result<PathBuf> {
    let mut name: OsString = path
        .file_name()
        .ok_or_else(|| Error::other(format!("{} names no file", path.display())))?
        .to_owned();
    name.push(STAGING_SUFFIX);
    Ok(path.with_file_name(name))
}

fn write_staged(staging: &Path, image: &[u8]) -> Result<()> {
    let mut file = File::create(staging)?;
    file.write_all(image)?;
    file.sync_all()?;
    Ok(())
}

/// Header, out-of-line value data, then the TOC.
fn encode(container: &Container) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut toc = Vec::new();

    toc.write_u32::<LittleEndian>(container.type_names.len() as u32)?;
    for name in &container.type_names {
        put_name(&mut toc, name)?;
    }
    toc.write_u32::<LittleEndian>(container.prop_names.len() as u32)?;
    for name in &container.prop_names {
        put_name(&mut toc, name)?;
    }
    toc.write_u32::<LittleEndian>(container.root.map(|r| r.0).unwrap_or(NO_ROOT))?;
    toc.write_u32::<LittleEndian>(container.next_object)?;

    toc.write_u32::<LittleEndian>(container.objects.len() as u32)?;
    for (id, rec) in &container.objects {
        toc.write_u32::<LittleEndian>(id.0)?;
        toc.write_u32::<LittleEndian>(rec.values.len() as u32)?;
        for value in &rec.values {
            toc.write_u32::<LittleEndian>(value.prop.0)?;
            toc.write_u32::<LittleEndian>(value.ty.0)?;
            if value.immediate && value.data.len() <= IMMEDIATE_LIMIT {
                toc.write_u8(STORAGE_IMMEDIATE)?;
                toc.write_u8(value.data.len() as u8)?;
                let mut inline = [0u8; IMMEDIATE_LIMIT];
                inline[..value.data.len()].copy_from_slice(&value.data);
                toc.extend_from_slice(&inline);
            } else {
                toc.write_u8(STORAGE_EXTERNAL)?;
                toc.write_u64::<LittleEndian>((HEADER_SIZE + data.len()) as u64)?;
                toc.write_u64::<LittleEndian>(value.data.len() as u64)?;
                data.extend_from_slice(&value.data);
            }
            toc.write_u32::<LittleEndian>(value.refs.len() as u32)?;
            for (token, target) in &value.refs {
                toc.write_u32::<LittleEndian>(token.0)?;
                toc.write_u32::<LittleEndian>(target.0)?;
            }
        }
    }

    let toc_pos = (HEADER_SIZE + data.len()) as u64;
    let mut image = Vec::with_capacity(toc_pos as usize + toc.len());
    image.extend_from_slice(BENTO_MAGIC);
    image.write_u8(COMPLETE_FLAG)?;
    image.write_u16::<BigEndian>(CURRENT_VERSION)?;
    image.write_u64::<LittleEndian>(toc_pos)?;
    image.extend_from_slice(&data);
    image.extend_from_slice(&toc);
    Ok(image)
}

fn put_name(out: &mut Vec<u8>, name: &str) -> Result<()> {
    let len = u16::try_from(name.len()).map_err(|_| Error::other(format!("name too long: {name}")))?;
    out.write_u16::<LittleEndian>(len)?;
    out.extend_from_slice(name.as_bytes());
    Ok(())
}
