//! Open file handle.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use tracing::{debug, warn};

use super::session::{FileOptions, Session};
use crate::container::{self, Container, ObjectId};
use crate::core::{
    ClassId, FileCache, ProductVersion, PropCode, Revision, SchemaEvent, TimeStamp, TypeCode,
    VersionType,
};
use crate::util::{ByteOrder, Error, Result};

/// Identifier of a media handle within its file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(pub u32);

/// How a media handle was opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaMode {
    /// Created for writing.
    Created,
    /// Opened for reading or appending.
    Opened,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct MediaRecord {
    pub(crate) mode: MediaMode,
    pub(crate) data_obj: ObjectId,
    pub(crate) stream_active: bool,
}

/// An open OMF file.
///
/// Every accessor takes `&mut self`: reading may pull in schema changes the
/// session has registered since the last call. The handle can move between
/// threads but not be shared by them.
pub struct OmfFile {
    session: Session,
    events: Receiver<SchemaEvent>,
    pub(crate) container: Container,
    pub(crate) cache: FileCache,
    revision: Revision,
    byte_order: ByteOrder,
    head: ObjectId,
    path: Option<PathBuf>,
    semantic_checks: bool,
    media: BTreeMap<MediaId, MediaRecord>,
    next_media: u32,
}

impl std::fmt::Debug for OmfFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmfFile")
            .field("revision", &self.revision)
            .field("byte_order", &self.byte_order)
            .field("path", &self.path)
            .field("objects", &self.container.num_objects())
            .field("media", &self.media.len())
            .finish()
    }
}

impl OmfFile {
    fn assemble(
        session: Session,
        mut container: Container,
        revision: Revision,
        byte_order: ByteOrder,
        head: ObjectId,
        path: Option<PathBuf>,
    ) -> Self {
        // Subscribe before building so no registration falls between the two.
        let events = session.subscribe();
        let cache = FileCache::build(&session.registry(), revision, &mut container);
        let semantic_checks = session.config().semantic_checks;
        Self {
            session,
            events,
            container,
            cache,
            revision,
            byte_order,
            head,
            path,
            semantic_checks,
            media: BTreeMap::new(),
            next_media: 1,
        }
    }

    pub(crate) fn create(
        session: Session,
        mut container: Container,
        options: FileOptions,
        path: Option<PathBuf>,
    ) -> Result<Self> {
        let head = container.new_object()?;
        container.set_root(head)?;
        let mut file = Self::assemble(session, container, options.revision, options.byte_order, head, path);

        let version = match options.revision {
            Revision::V1 => VersionType::new(1, 0),
            Revision::V2 => VersionType::new(2, 1),
        };
        let toolkit: ProductVersion = file.session.config().product.version;
        file.write_class_id(head, PropCode::OBJ_CLASS, ClassId::HEAD)?;
        file.write_byte_order_magic(head, PropCode::HEAD_BYTE_ORDER, options.byte_order)?;
        file.write_version_type(head, PropCode::HEAD_VERSION, version)?;
        file.write_time_stamp(head, PropCode::HEAD_LAST_MODIFIED, TimeStamp::now())?;
        file.write_product_version(head, PropCode::HEAD_TOOLKIT_VERSION, toolkit)?;
        Ok(file)
    }

    pub(crate) fn open(session: Session, mut container: Container, path: Option<PathBuf>) -> Result<Self> {
        let head = container
            .root()
            .ok_or_else(|| Error::invalid("container has no head object"))?;
        let revision = detect_revision(&session, &container, head)?;

        // The magic is symmetric, so the stored bytes read the same either way.
        let byte_order = {
            let registry = session.registry();
            let prop_name = registry
                .prop_def(PropCode::HEAD_BYTE_ORDER)
                .and_then(|p| p.rows.get(revision))
                .map(|r| r.name.clone())
                .ok_or(Error::BadProperty(PropCode::HEAD_BYTE_ORDER))?;
            let type_name = registry
                .type_def(TypeCode::INT16)
                .and_then(|t| t.name(revision))
                .ok_or(Error::BadType(TypeCode::INT16))?
                .to_string();
            drop(registry);
            let p = container.register_property(&prop_name);
            let t = container.register_type(&type_name);
            let v = container
                .use_value(head, p, t)
                .map_err(|_| Error::invalid("head object has no byte order"))?;
            let mut magic = [0u8; 2];
            container.read_value_data(v, &mut magic, 0)?;
            ByteOrder::from_magic(u16::from_ne_bytes(magic))
                .ok_or_else(|| Error::invalid(format!("unknown byte order magic {magic:02x?}")))?
        };

        let file = Self::assemble(session, container, revision, byte_order, head, path);
        file.report_unknown_names();
        Ok(file)
    }

    fn report_unknown_names(&self) {
        for (i, name) in self.container.prop_names.iter().enumerate() {
            if self.cache.prop_code(container::PropHandle(i as u32)).is_none() {
                warn!(property = %name, "property name not in registry");
            }
        }
    }

    /// Stamp and save a writable file, then make it read-only.
    ///
    /// Fails with [`Error::MediaStillOpen`] while media handles are open;
    /// the file is left untouched so the caller can close or abort them and
    /// try again. Scratch files and read-only files are not written.
    pub fn close(&mut self) -> Result<()> {
        if !self.media.is_empty() {
            return Err(Error::MediaStillOpen(self.media.len()));
        }
        if self.container.is_writable() {
            let head = self.head;
            self.write_time_stamp(head, PropCode::HEAD_LAST_MODIFIED, TimeStamp::now())?;
            if let Some(path) = &self.path {
                container::save(&self.container, path)?;
            }
            self.container.set_writable(false);
        }
        debug!(path = ?self.path, objects = self.container.num_objects(), "closed file");
        Ok(())
    }

    /// Write the file to disk without closing it.
    pub fn save(&mut self) -> Result<()> {
        if !self.container.is_writable() {
            return Err(Error::ReadOnly);
        }
        match &self.path {
            Some(path) => container::save(&self.container, path),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Session the file was opened in.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// File revision, fixed at create/open.
    #[inline]
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Byte order recorded in the head object.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Head object.
    #[inline]
    pub fn head(&self) -> ObjectId {
        self.head
    }

    /// Path the file saves to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True if property writes are accepted at all.
    pub fn is_writable(&self) -> bool {
        self.container.is_writable()
    }

    /// Underlying container, for raw inspection.
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub(crate) fn semantic_checks(&self) -> bool {
        self.semantic_checks
    }

    /// Apply schema registrations made since the last call.
    pub(crate) fn sync_schema(&mut self) {
        let pending: Vec<SchemaEvent> = self.events.try_iter().collect();
        if pending.is_empty() {
            return;
        }
        let registry = self.session.registry();
        for event in pending {
            self.cache.apply(&registry, event, &mut self.container);
        }
    }

    // ------------------------------------------------------------------
    // Media bookkeeping and the write guard
    // ------------------------------------------------------------------

    pub(crate) fn register_media(&mut self, mode: MediaMode, data_obj: ObjectId) -> MediaId {
        let id = MediaId(self.next_media);
        self.next_media += 1;
        self.media.insert(id, MediaRecord { mode, data_obj, stream_active: false });
        id
    }

    pub(crate) fn set_stream_active(&mut self, id: MediaId, active: bool) {
        if let Some(rec) = self.media.get_mut(&id) {
            rec.stream_active = active;
        }
    }

    pub(crate) fn unregister_media(&mut self, id: MediaId) {
        self.media.remove(&id);
    }

    pub(crate) fn media_record(&self, id: MediaId) -> Option<MediaRecord> {
        self.media.get(&id).copied()
    }

    /// Ids of the media handles open on this file.
    pub fn open_media(&self) -> Vec<MediaId> {
        self.media.keys().copied().collect()
    }

    /// Forget a media handle that was dropped without being closed.
    ///
    /// The codec is not called, so descriptor properties it would have
    /// written on close are missing. Objects the media created stay in the
    /// file. Returns false if `id` is not open.
    pub fn abort_media(&mut self, id: MediaId) -> bool {
        match self.media.remove(&id) {
            Some(rec) => {
                warn!(media = id.0, mode = ?rec.mode, "media aborted without close");
                true
            }
            None => false,
        }
    }

    /// Number of media handles open on this file.
    pub fn open_media_count(&self) -> usize {
        self.media.len()
    }

    /// Fail unless property writes are allowed right now.
    ///
    /// Writes are refused on read-only files and while any created media
    /// handle on the file is streaming.
    pub fn check_may_write(&self) -> Result<()> {
        if !self.container.is_writable() {
            return Err(Error::ReadOnly);
        }
        match self
            .media
            .iter()
            .find(|(_, r)| r.mode == MediaMode::Created && r.stream_active)
        {
            Some((id, _)) => Err(Error::WriteBlockedByMedia(id.0)),
            None => Ok(()),
        }
    }
}

fn detect_revision(session: &Session, container: &Container, head: ObjectId) -> Result<Revision> {
    let registry = session.registry();
    let head_values = container.values_of(head)?;
    for rev in [Revision::V2, Revision::V1] {
        let Some(row) = registry.prop_def(PropCode::OBJ_CLASS).and_then(|p| p.rows.get(rev)) else {
            continue;
        };
        if let Some(handle) = container.lookup_property(&row.name) {
            if head_values.iter().any(|v| v.prop == handle) {
                return Ok(rev);
            }
        }
    }
    Err(Error::invalid("head object carries no class id"))
}
