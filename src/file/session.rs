//! Session: the registry, the codec table and the files opened against them.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, info};

use super::handle::OmfFile;
use crate::codec::{self, Codec, CodecEntry, CodecTable};
use crate::container::{self, Container};
use crate::core::{
    ClassId, ClassKind, ProductVersion, PropCode, Registry, Revision, SchemaEvent, SwapNeed,
    TypeCode, ValidRevisions,
};
use crate::util::{ByteOrder, Result};

/// Application identity stamped on files created in a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductIdentification {
    pub company: String,
    pub product: String,
    pub version: ProductVersion,
}

impl Default for ProductIdentification {
    fn default() -> Self {
        Self {
            company: "omf-rs".to_string(),
            product: env!("CARGO_PKG_NAME").to_string(),
            version: ProductVersion::toolkit(),
        }
    }
}

/// Session-wide settings.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Check object class and property type on every access.
    pub semantic_checks: bool,
    pub product: ProductIdentification,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            semantic_checks: true,
            product: ProductIdentification::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable semantic checks. Disable only for trusted files.
    pub fn with_semantic_checks(mut self, enabled: bool) -> Self {
        self.semantic_checks = enabled;
        self
    }

    /// Set the product identification.
    pub fn with_product(mut self, product: ProductIdentification) -> Self {
        self.product = product;
        self
    }
}

/// Options for new files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileOptions {
    pub revision: Revision,
    /// Byte order of the head object and all values written natively.
    pub byte_order: ByteOrder,
}

impl FileOptions {
    pub fn new(revision: Revision) -> Self {
        Self { revision, byte_order: ByteOrder::native() }
    }

    /// Set the byte order recorded in the head object.
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }
}

impl Default for FileOptions {
    fn default() -> Self {
        Self::new(Revision::V2)
    }
}

pub(crate) struct SessionShared {
    pub(crate) config: SessionConfig,
    pub(crate) registry: RwLock<Registry>,
    pub(crate) codecs: RwLock<CodecTable>,
    subscribers: Mutex<Vec<Sender<SchemaEvent>>>,
}

/// Toolkit session.
///
/// Cheap to clone; every clone and every file opened from it shares one
/// registry and one codec table.
#[derive(Clone)]
pub struct Session {
    pub(crate) shared: Arc<SessionShared>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("semantic_checks", &self.shared.config.semantic_checks)
            .field("codecs", &self.shared.codecs.read().len())
            .finish()
    }
}

impl Session {
    /// Begin a session with default settings.
    pub fn begin() -> Result<Self> {
        Self::with_config(SessionConfig::default())
    }

    /// Begin a session with the built-in schema and codecs.
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        let registry = Registry::with_builtin_schema()?;
        let session = Self {
            shared: Arc::new(SessionShared {
                config,
                registry: RwLock::new(registry),
                codecs: RwLock::new(CodecTable::new()),
                subscribers: Mutex::new(Vec::new()),
            }),
        };
        codec::register_builtin(&session)?;
        debug!(codecs = session.shared.codecs.read().len(), "session started");
        Ok(session)
    }

    /// End the session. Files still open keep their own reference.
    pub fn end(self) {
        debug!("session ended");
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Shared view of the registry.
    pub fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.shared.registry.read()
    }

    // ------------------------------------------------------------------
    // Schema registration
    // ------------------------------------------------------------------

    /// Register a class.
    pub fn register_class(
        &self,
        kind: ClassKind,
        valid: ValidRevisions,
        id: ClassId,
        superclass: Option<ClassId>,
    ) -> Result<()> {
        self.shared.registry.write().register_class(kind, valid, id, superclass)
    }

    /// Register a type under a fixed code.
    pub fn register_type(
        &self,
        code: TypeCode,
        valid: ValidRevisions,
        name: &str,
        swap: SwapNeed,
    ) -> Result<()> {
        self.shared.registry.write().register_type(code, valid, name, swap)?;
        self.notify(SchemaEvent::Type(code));
        Ok(())
    }

    /// Register a property under a fixed code.
    pub fn register_property(
        &self,
        code: PropCode,
        valid: ValidRevisions,
        name: &str,
        class: ClassId,
        ty: TypeCode,
        optional: bool,
    ) -> Result<()> {
        self.shared
            .registry
            .write()
            .register_property(code, valid, name, class, ty, optional)?;
        self.notify(SchemaEvent::Property(code));
        Ok(())
    }

    /// Register a type under a freshly minted code.
    pub fn register_dynamic_type(
        &self,
        valid: ValidRevisions,
        name: &str,
        swap: SwapNeed,
    ) -> Result<TypeCode> {
        let code = self.shared.registry.write().register_dynamic_type(valid, name, swap)?;
        self.notify(SchemaEvent::Type(code));
        Ok(code)
    }

    /// Register a property under a freshly minted code.
    pub fn register_dynamic_property(
        &self,
        valid: ValidRevisions,
        name: &str,
        class: ClassId,
        ty: TypeCode,
        optional: bool,
    ) -> Result<PropCode> {
        let code = self
            .shared
            .registry
            .write()
            .register_dynamic_property(valid, name, class, ty, optional)?;
        self.notify(SchemaEvent::Property(code));
        Ok(code)
    }

    pub(crate) fn subscribe(&self) -> Receiver<SchemaEvent> {
        let (tx, rx) = channel();
        self.shared.subscribers.lock().push(tx);
        rx
    }

    fn notify(&self, event: SchemaEvent) {
        let mut subscribers = self.shared.subscribers.lock();
        subscribers.retain(|tx| tx.send(event).is_ok());
    }

    // ------------------------------------------------------------------
    // Codecs
    // ------------------------------------------------------------------

    /// Initialise a codec and add it to the session's codec table.
    pub fn register_codec(&self, codec: Arc<dyn Codec>) -> Result<()> {
        codec.init(self)?;
        let entry = CodecEntry::new(codec)?;
        let id = entry.meta().id.clone();
        self.shared.codecs.write().register(entry)?;
        debug!(codec = %id, "registered codec");
        Ok(())
    }

    /// Codec registered under `id`.
    pub fn codec(&self, id: &str) -> Result<Arc<CodecEntry>> {
        self.shared.codecs.read().by_id(id)
    }

    /// Codecs indexed under a descriptor class, newest first.
    pub fn codecs_for_class(&self, class: ClassId) -> Vec<Arc<CodecEntry>> {
        self.shared.codecs.read().by_class(class)
    }

    /// Ids of all registered codecs, in registration order.
    pub fn codec_ids(&self) -> Vec<String> {
        self.shared.codecs.read().ids()
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Create a file of the given revision in native byte order.
    pub fn create_file(&self, path: impl AsRef<Path>, revision: Revision) -> Result<OmfFile> {
        self.create_file_with(path, FileOptions::new(revision))
    }

    /// Create a file with explicit options.
    pub fn create_file_with(&self, path: impl AsRef<Path>, options: FileOptions) -> Result<OmfFile> {
        let path = path.as_ref();
        // Claim the path now so an unwritable location fails early.
        std::fs::File::create(path)?;
        let file = OmfFile::create(self.clone(), Container::new(), options, Some(path.to_path_buf()))?;
        info!(path = %path.display(), revision = %options.revision, byte_order = %options.byte_order, "created file");
        Ok(file)
    }

    /// Create a memory-only file. Closing it discards the contents.
    pub fn create_scratch(&self, options: FileOptions) -> Result<OmfFile> {
        OmfFile::create(self.clone(), Container::new(), options, None)
    }

    /// Open an existing file read-only.
    pub fn open_file(&self, path: impl AsRef<Path>) -> Result<OmfFile> {
        self.open(path.as_ref(), false)
    }

    /// Open an existing file for modification.
    pub fn open_file_modify(&self, path: impl AsRef<Path>) -> Result<OmfFile> {
        self.open(path.as_ref(), true)
    }

    fn open(&self, path: &Path, writable: bool) -> Result<OmfFile> {
        let mut container = container::load(path)?;
        container.set_writable(writable);
        let save_to: Option<PathBuf> = writable.then(|| path.to_path_buf());
        let file = OmfFile::open(self.clone(), container, save_to)?;
        info!(
            path = %path.display(),
            revision = %file.revision(),
            byte_order = %file.byte_order(),
            writable,
            "opened file"
        );
        Ok(file)
    }
}
