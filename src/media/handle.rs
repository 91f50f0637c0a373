//! Media handle lifecycle: create, open, close.

use std::any::Any;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::{CodecEntry, DataKind, InfoSelector, MediaInfo};
use crate::container::ObjectId;
use crate::core::{ClassId, PropCode, Rational, Revision, TimeStamp, Uid};
use crate::file::{MediaId, MediaMode, MobIndexEntry, OmfFile};
use crate::util::{Error, Result};

/// Parameters for new media.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaParams {
    pub mob_id: Uid,
    pub kind: DataKind,
    /// Samples per second for audio, frames per second for video.
    pub sample_rate: Rational,
    pub name: Option<String>,
}

impl MediaParams {
    pub fn new(mob_id: Uid, kind: DataKind, sample_rate: Rational) -> Self {
        Self {
            mob_id,
            kind,
            sample_rate,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Per-channel binding of an audio stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelDesc {
    pub sample_rate: Rational,
    /// 1-based track in the source mob.
    pub track: u32,
    /// 1-based physical output channel.
    pub physical_out: u32,
}

/// An open media stream.
///
/// The handle is separate from its [`OmfFile`]; every operation takes the
/// file it was opened on. It must be closed with [`MediaHandle::close`]
/// before the file can be closed; a handle dropped without closing is
/// released with [`OmfFile::abort_media`].
pub struct MediaHandle {
    id: MediaId,
    mode: MediaMode,
    kind: DataKind,
    mob: ObjectId,
    mob_id: Uid,
    mdes: ObjectId,
    data_obj: ObjectId,
    sample_rate: Rational,
    pub(crate) channels: Vec<ChannelDesc>,
    pub(crate) codec: Arc<CodecEntry>,
    pub(crate) user_data: Option<Box<dyn Any + Send>>,
}

impl std::fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHandle")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("kind", &self.kind)
            .field("mob_id", &self.mob_id)
            .field("codec", &self.codec.id())
            .field("channels", &self.channels.len())
            .finish()
    }
}

impl MediaHandle {
    /// Create media of `params.kind` with codec `codec_id`.
    ///
    /// Builds the source mob, its descriptor and the media data object, then
    /// starts the stream. Property writes on `file` are refused until the
    /// handle is closed. On failure nothing built here stays in the file.
    pub fn create(file: &mut OmfFile, codec_id: &str, params: MediaParams) -> Result<Self> {
        let codec = file.session().codec(codec_id)?;
        let meta = codec.meta().clone();
        if !meta.supports_revision(file.revision()) {
            return Err(Error::FileRevisionUnsupported {
                codec: meta.id,
                revision: file.revision().to_string(),
            });
        }
        if !meta.supports_kind(params.kind) {
            return Err(Error::Media(format!("codec {} does not produce {}", meta.id, params.kind.name())));
        }
        let (Some(mdes_class), Some(data_class)) = (meta.mdes_class, meta.data_class) else {
            return Err(Error::Media(format!("codec {} declares no descriptor class", meta.id)));
        };
        file.check_may_write()?;

        let mut built = Vec::with_capacity(3);
        match Self::start_created(file, &codec, mdes_class, data_class, &params, &mut built) {
            Ok(media) => {
                debug!(media = media.id.0, codec = %meta.id, mob_id = %params.mob_id, "created media");
                Ok(media)
            }
            Err(e) => {
                discard_objects(file, &built);
                Err(e)
            }
        }
    }

    /// Build the objects for new media, start the codec, then link the
    /// source mob into the head. Every object made is pushed to `built`.
    fn start_created(
        file: &mut OmfFile,
        codec: &Arc<CodecEntry>,
        mdes_class: ClassId,
        data_class: ClassId,
        params: &MediaParams,
        built: &mut Vec<ObjectId>,
    ) -> Result<Self> {
        let mob = file.new_object(ClassId::SMOB)?;
        built.push(mob);
        file.write_uid(mob, PropCode::MOBJ_MOB_ID, params.mob_id)?;
        if let Some(name) = &params.name {
            file.write_string(mob, PropCode::MOBJ_NAME, name)?;
        }
        file.write_time_stamp(mob, PropCode::MOBJ_CREATION_TIME, TimeStamp::now())?;

        let mdes = file.new_object(mdes_class)?;
        built.push(mdes);
        file.write_exact_edit_rate(mdes, PropCode::MDFL_SAMPLE_RATE, params.sample_rate)?;
        file.write_length(mdes, PropCode::MDFL_LENGTH, 0)?;
        file.write_bool(mdes, PropCode::MDFL_IS_OMFI, true)?;
        codec.init_mdes_props(file, mdes)?;
        file.write_obj_ref(mob, PropCode::SMOB_MEDIA_DESCRIPTION, mdes)?;

        let data_obj = file.new_object(data_class)?;
        built.push(data_obj);
        file.write_uid(data_obj, PropCode::MDAT_MOB_ID, params.mob_id)?;

        let id = file.register_media(MediaMode::Created, data_obj);
        let mut media = Self {
            id,
            mode: MediaMode::Created,
            kind: params.kind,
            mob,
            mob_id: params.mob_id,
            mdes,
            data_obj,
            sample_rate: params.sample_rate,
            channels: Vec::new(),
            codec: codec.clone(),
            user_data: None,
        };
        let started = codec
            .create(&mut media, file)
            .and_then(|_| media.load_channels(file))
            .and_then(|_| link_source_mob(file, mob, data_obj, params.mob_id));
        if let Err(e) = started {
            file.unregister_media(id);
            return Err(e);
        }
        file.set_stream_active(id, true);
        Ok(media)
    }

    /// Open existing media by source mob id.
    ///
    /// The codec is chosen from the descriptor's class: the newest codec
    /// registered for the class that accepts the descriptor wins, falling back
    /// to superclasses.
    pub fn open(file: &mut OmfFile, mob_id: Uid) -> Result<Self> {
        let mob = find_mob(file, mob_id)?;
        let mdes = file.read_obj_ref(mob, PropCode::SMOB_MEDIA_DESCRIPTION)?;
        let data_obj = find_media_data(file, mob_id)?;
        let codec = select_codec(file, mdes)?;
        let kind = codec
            .meta()
            .data_kinds
            .iter()
            .find_map(|k| DataKind::from_name(k))
            .ok_or_else(|| Error::Media(format!("codec {} declares no data kind", codec.id())))?;
        let sample_rate = file.read_exact_edit_rate(mdes, PropCode::MDFL_SAMPLE_RATE)?;

        let id = file.register_media(MediaMode::Opened, data_obj);
        let mut media = Self {
            id,
            mode: MediaMode::Opened,
            kind,
            mob,
            mob_id,
            mdes,
            data_obj,
            sample_rate,
            channels: Vec::new(),
            codec: codec.clone(),
            user_data: None,
        };
        if let Err(e) = codec.open(&mut media, file).and_then(|_| media.load_channels(file)) {
            file.unregister_media(id);
            return Err(e);
        }
        debug!(media = id.0, codec = %codec.id(), %mob_id, "opened media");
        Ok(media)
    }

    /// Finish the stream and release the handle.
    ///
    /// For created media the codec writes the final descriptor properties.
    /// The handle is released even if that fails.
    pub fn close(mut self, file: &mut OmfFile) -> Result<()> {
        file.set_stream_active(self.id, false);
        let codec = self.codec.clone();
        let result = codec.close(&mut self, file);
        file.unregister_media(self.id);
        match &result {
            Ok(()) => debug!(media = self.id.0, codec = %codec.id(), "closed media"),
            Err(e) => warn!(media = self.id.0, codec = %codec.id(), error = %e, "media close failed"),
        }
        result
    }

    /// Fill the channel table from the codec's audio info, if it has one.
    fn load_channels(&mut self, file: &mut OmfFile) -> Result<()> {
        if self.kind != DataKind::Sound {
            return Ok(());
        }
        let codec = self.codec.clone();
        match codec.get_info(self, file, InfoSelector::Audio) {
            Ok(MediaInfo::Audio(info)) => {
                self.channels = channel_table(info.channels, self.sample_rate);
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) if e.is_unsupported() => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn id(&self) -> MediaId {
        self.id
    }

    pub fn mode(&self) -> MediaMode {
        self.mode
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// The source mob.
    pub fn mob(&self) -> ObjectId {
        self.mob
    }

    pub fn mob_id(&self) -> Uid {
        self.mob_id
    }

    /// The media descriptor.
    pub fn mdes(&self) -> ObjectId {
        self.mdes
    }

    /// The media data object holding the essence.
    pub fn data_object(&self) -> ObjectId {
        self.data_obj
    }

    pub fn sample_rate(&self) -> Rational {
        self.sample_rate
    }

    pub(crate) fn set_sample_rate(&mut self, rate: Rational) {
        self.sample_rate = rate;
    }

    /// Id of the codec currently bound to the handle.
    pub fn codec_id(&self) -> &str {
        self.codec.id()
    }

    pub fn codec(&self) -> &Arc<CodecEntry> {
        &self.codec
    }

    /// Per-channel descriptors; empty for video.
    pub fn channels(&self) -> &[ChannelDesc] {
        &self.channels
    }

    /// Codec-private state.
    pub fn user_data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.user_data.as_mut()?.downcast_mut::<T>()
    }

    pub fn user_data_ref<T: Any>(&self) -> Option<&T> {
        self.user_data.as_ref()?.downcast_ref::<T>()
    }

    /// Replace the codec-private state.
    pub fn set_user_data<T: Any + Send>(&mut self, data: T) {
        self.user_data = Some(Box::new(data));
    }

    /// Remove the codec-private state if it has type `T`.
    pub fn take_user_data<T: Any + Send>(&mut self) -> Option<Box<T>> {
        let data = self.user_data.take()?;
        match data.downcast::<T>() {
            Ok(typed) => Some(typed),
            Err(other) => {
                self.user_data = Some(other);
                None
            }
        }
    }

    pub fn clear_user_data(&mut self) {
        self.user_data = None;
    }
}

/// One descriptor per channel, bound to consecutive tracks and outputs.
pub(crate) fn channel_table(channels: u16, sample_rate: Rational) -> Vec<ChannelDesc> {
    (1..=channels as u32)
        .map(|n| ChannelDesc {
            sample_rate,
            track: n,
            physical_out: n,
        })
        .collect()
}

fn link_source_mob(file: &mut OmfFile, mob: ObjectId, data_obj: ObjectId, mob_id: Uid) -> Result<()> {
    let head = file.head();
    file.append_obj_ref(head, PropCode::HEAD_MOBS, mob)?;
    file.append_obj_ref(head, PropCode::HEAD_MEDIA_DATA, data_obj)?;
    if file.revision() == Revision::V1 {
        file.append_mob_index(head, PropCode::HEAD_SOURCE_MOBS, MobIndexEntry { mob_id, mob })?;
    }
    Ok(())
}

/// Undo a failed create: drop head entries naming `objects`, then the
/// objects themselves.
fn discard_objects(file: &mut OmfFile, objects: &[ObjectId]) {
    if objects.is_empty() {
        return;
    }
    if let Err(e) = unlink_from_head(file, objects) {
        warn!(error = %e, "could not unlink discarded media objects");
    }
    for &obj in objects {
        if let Err(e) = file.delete_object(obj) {
            warn!(object = obj.0, error = %e, "could not delete discarded media object");
        }
    }
}

fn unlink_from_head(file: &mut OmfFile, objects: &[ObjectId]) -> Result<()> {
    let head = file.head();
    for prop in [PropCode::HEAD_MOBS, PropCode::HEAD_MEDIA_DATA] {
        let refs = file.read_obj_refs(head, prop)?;
        for (i, target) in refs.iter().enumerate().rev() {
            if objects.contains(target) {
                file.remove_nth_obj_ref(head, prop, i as u32 + 1)?;
            }
        }
    }
    if file.revision() == Revision::V1 {
        let len = file.mob_index_len(head, PropCode::HEAD_SOURCE_MOBS)?;
        for i in (1..=len).rev() {
            let entry = file.read_nth_mob_index(head, PropCode::HEAD_SOURCE_MOBS, i)?;
            if objects.contains(&entry.mob) {
                file.remove_nth_mob_index(head, PropCode::HEAD_SOURCE_MOBS, i)?;
            }
        }
    }
    Ok(())
}

fn find_mob(file: &mut OmfFile, mob_id: Uid) -> Result<ObjectId> {
    let head = file.head();
    for mob in file.read_obj_refs(head, PropCode::HEAD_MOBS)? {
        match file.read_uid(mob, PropCode::MOBJ_MOB_ID) {
            Ok(id) if id == mob_id => return Ok(mob),
            Ok(_) => {}
            Err(e) if e.is_not_present() => {}
            Err(e) => return Err(e),
        }
    }
    Err(Error::Media(format!("no mob with id {mob_id}")))
}

fn find_media_data(file: &mut OmfFile, mob_id: Uid) -> Result<ObjectId> {
    let head = file.head();
    for data in file.read_obj_refs(head, PropCode::HEAD_MEDIA_DATA)? {
        match file.read_uid(data, PropCode::MDAT_MOB_ID) {
            Ok(id) if id == mob_id => return Ok(data),
            Ok(_) => {}
            Err(e) if e.is_not_present() => {}
            Err(e) => return Err(e),
        }
    }
    Err(Error::Media(format!("no media data for mob {mob_id}")))
}

/// Codec for a descriptor: walk from its class up through superclasses,
/// trying the newest registration first at each level.
fn select_codec(file: &mut OmfFile, mdes: ObjectId) -> Result<Arc<CodecEntry>> {
    let start = file.class_of(mdes)?;
    let limit = file.session().registry().num_classes(file.revision());
    let mut class = Some(start);
    let mut steps = 0;
    while let Some(current) = class {
        if steps > limit {
            return Err(Error::ClassCycle(start));
        }
        steps += 1;
        let candidates = file.session().codecs_for_class(current);
        for codec in candidates {
            if !codec.meta().supports_revision(file.revision()) {
                continue;
            }
            match codec.semantic_check(file, mdes) {
                Ok(()) => return Ok(codec),
                Err(e) if e.is_unsupported() => return Ok(codec),
                Err(e) => debug!(codec = %codec.id(), error = %e, "codec declined descriptor"),
            }
        }
        class = file.class_find_superclass(current);
    }
    Err(Error::CodecNotFound(start.to_string()))
}
