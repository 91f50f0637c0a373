//! Media codecs.
//!
//! A codec interprets the essence stream of one media descriptor class.
//! Codecs implement [`Codec`]; every operation has a default that reports
//! [`Error::InvalidOpForCodec`], so a codec only writes the capabilities it
//! has. Callers treat that error as "not supported" rather than fatal.
//!
//! Registered codecs live in a session's [`CodecTable`] as [`CodecEntry`]
//! values. Media handles call codecs through the entry, which checks the
//! codec and file revisions before every call.

mod aifc;
mod avr;
mod cdci;
mod dispatch;
mod passthrough;
mod pcm;
mod table;
mod wave;

use std::sync::Arc;

use crate::container::ObjectId;
use crate::core::{ClassId, FrameLayout, Rational, Revision};
use crate::file::{OmfFile, Session};
use crate::media::MediaHandle;
use crate::util::{Error, Result};

pub use aifc::{Aifc, AifcCodec};
pub use avr::{AvrCodec, AvrFormat, AVR_FORMATS};
pub use cdci::CdciCodec;
pub use passthrough::pass_through;
pub use pcm::{PcmCodec, PcmFormat};
pub use table::CodecTable;
pub use wave::{Wave, WaveCodec};

/// Oldest codec revision this build dispatches to.
pub const MIN_CODEC_REVISION: u32 = 2;

/// Codec revision of the built-in codecs.
pub const CODEC_REVISION: u32 = 3;

/// Data kind name for audio essence.
pub const SOUND_KIND: &str = "omfi:data:Sound";

/// Data kind name for video essence.
pub const PICTURE_KIND: &str = "omfi:data:Picture";

/// Kind of essence a media handle carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataKind {
    Sound,
    Picture,
}

impl DataKind {
    /// Registered data-kind name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sound => SOUND_KIND,
            Self::Picture => PICTURE_KIND,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            SOUND_KIND => Some(Self::Sound),
            PICTURE_KIND => Some(Self::Picture),
            _ => None,
        }
    }
}

/// Codec operation slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodecOp {
    Open,
    Create,
    Close,
    GetInfo,
    PutInfo,
    ReadSamples,
    WriteSamples,
    ReadLines,
    WriteLines,
    SetFrame,
    GetFrameOffset,
    GetNumChannels,
    InitMdesProps,
    SemanticCheck,
    AddFrameIndexEntry,
}

impl CodecOp {
    /// Every slot, in dispatch-table order.
    pub const ALL: [CodecOp; 15] = [
        Self::Open,
        Self::Create,
        Self::Close,
        Self::GetInfo,
        Self::PutInfo,
        Self::ReadSamples,
        Self::WriteSamples,
        Self::ReadLines,
        Self::WriteLines,
        Self::SetFrame,
        Self::GetFrameOffset,
        Self::GetNumChannels,
        Self::InitMdesProps,
        Self::SemanticCheck,
        Self::AddFrameIndexEntry,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Create => "create",
            Self::Close => "close",
            Self::GetInfo => "get_info",
            Self::PutInfo => "put_info",
            Self::ReadSamples => "read_samples",
            Self::WriteSamples => "write_samples",
            Self::ReadLines => "read_lines",
            Self::WriteLines => "write_lines",
            Self::SetFrame => "set_frame",
            Self::GetFrameOffset => "get_frame_offset",
            Self::GetNumChannels => "num_channels",
            Self::InitMdesProps => "init_mdes_props",
            Self::SemanticCheck => "semantic_check",
            Self::AddFrameIndexEntry => "add_frame_index_entry",
        }
    }
}

impl std::fmt::Display for CodecOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a codec reports about itself at registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecMetaInfo {
    /// Unique id ("WAVE", "CDCI", ...).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Oldest file revision handled.
    pub min_revision: Revision,
    /// Newest file revision handled.
    pub max_revision: Revision,
    /// Data kinds the codec produces, as registered names.
    pub data_kinds: Vec<String>,
    /// Media descriptor class the codec is indexed under.
    pub mdes_class: Option<ClassId>,
    /// Class of the media data object holding the essence.
    pub data_class: Option<ClassId>,
    /// Interface revision the codec was written against.
    pub codec_revision: u32,
}

impl CodecMetaInfo {
    /// True if files of `rev` fall within the declared range.
    pub fn supports_revision(&self, rev: Revision) -> bool {
        self.min_revision <= rev && rev <= self.max_revision
    }

    /// True if the codec produces `kind`.
    pub fn supports_kind(&self, kind: DataKind) -> bool {
        self.data_kinds.iter().any(|k| k == kind.name())
    }
}

/// Audio format of a media stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioInfo {
    pub channels: u16,
    pub sample_rate: Rational,
    pub bits_per_sample: u16,
}

impl AudioInfo {
    pub const fn new(channels: u16, sample_rate: Rational, bits_per_sample: u16) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample,
        }
    }

    /// Bytes per sample frame across all channels.
    pub const fn frame_bytes(&self) -> u64 {
        self.channels as u64 * ((self.bits_per_sample as u64 + 7) / 8)
    }
}

/// Geometry and pixel format of a video stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoInfo {
    pub width: u32,
    /// Lines per field.
    pub height: u32,
    pub layout: FrameLayout,
    /// Bits per component.
    pub component_width: u32,
    /// 1 for 4:4:4, 2 for 4:2:2.
    pub horiz_subsampling: u32,
    /// Compression name recorded on the descriptor; `None` for raw data.
    pub compression: Option<String>,
}

impl VideoInfo {
    /// Bytes in one stored line.
    pub fn line_bytes(&self) -> u64 {
        let component_bytes = (self.component_width as u64 + 7) / 8;
        let sub = self.horiz_subsampling.max(1) as u64;
        // One luma sample per pixel plus two chroma samples every `sub` pixels.
        self.width as u64 * component_bytes * (sub + 2) / sub
    }

    /// Stored lines in one frame, all fields included.
    pub fn lines_per_frame(&self) -> u64 {
        self.height as u64 * self.layout.fields_per_frame() as u64
    }

    /// Bytes in one frame.
    pub fn frame_bytes(&self) -> u64 {
        self.line_bytes() * self.lines_per_frame()
    }
}

/// Which piece of format information to get.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfoSelector {
    Audio,
    Video,
    /// Samples (audio frames or video frames) in the stream.
    SampleCount,
    /// Largest single sample in bytes.
    MaxSampleSize,
}

/// Format information passed through `get_info` / `put_info`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaInfo {
    Audio(AudioInfo),
    Video(VideoInfo),
    SampleCount(u64),
    MaxSampleSize(u64),
}

/// Error for an operation a codec does not implement.
pub fn unsupported<C: Codec + ?Sized>(codec: &C, op: CodecOp) -> Error {
    Error::InvalidOpForCodec {
        codec: codec.meta_info().id,
        op: op.name(),
    }
}

/// A media codec.
///
/// Only [`Codec::meta_info`] is required. `init` runs each time the codec is
/// registered and must succeed without side effects when repeated.
///
/// Operations on an open stream receive the media handle and its file as
/// separate borrows; codec state lives in the handle's user data.
pub trait Codec: Send + Sync {
    fn init(&self, _session: &Session) -> Result<()> {
        Ok(())
    }

    fn meta_info(&self) -> CodecMetaInfo;

    fn open(&self, _media: &mut MediaHandle, _file: &mut OmfFile) -> Result<()> {
        Err(unsupported(self, CodecOp::Open))
    }

    fn create(&self, _media: &mut MediaHandle, _file: &mut OmfFile) -> Result<()> {
        Err(unsupported(self, CodecOp::Create))
    }

    fn close(&self, _media: &mut MediaHandle, _file: &mut OmfFile) -> Result<()> {
        Err(unsupported(self, CodecOp::Close))
    }

    fn get_info(&self, _media: &mut MediaHandle, _file: &mut OmfFile, _selector: InfoSelector) -> Result<MediaInfo> {
        Err(unsupported(self, CodecOp::GetInfo))
    }

    fn put_info(&self, _media: &mut MediaHandle, _file: &mut OmfFile, _info: &MediaInfo) -> Result<()> {
        Err(unsupported(self, CodecOp::PutInfo))
    }

    /// Read up to `count` samples into `buf`; returns the number read.
    fn read_samples(&self, _media: &mut MediaHandle, _file: &mut OmfFile, _count: u64, _buf: &mut [u8]) -> Result<u64> {
        Err(unsupported(self, CodecOp::ReadSamples))
    }

    fn write_samples(&self, _media: &mut MediaHandle, _file: &mut OmfFile, _count: u64, _buf: &[u8]) -> Result<()> {
        Err(unsupported(self, CodecOp::WriteSamples))
    }

    fn read_lines(&self, _media: &mut MediaHandle, _file: &mut OmfFile, _count: u32, _buf: &mut [u8]) -> Result<()> {
        Err(unsupported(self, CodecOp::ReadLines))
    }

    fn write_lines(&self, _media: &mut MediaHandle, _file: &mut OmfFile, _count: u32, _buf: &[u8]) -> Result<()> {
        Err(unsupported(self, CodecOp::WriteLines))
    }

    /// Position the stream at 1-based `frame`.
    fn set_frame(&self, _media: &mut MediaHandle, _file: &mut OmfFile, _frame: u64) -> Result<()> {
        Err(unsupported(self, CodecOp::SetFrame))
    }

    /// Byte offset of 1-based `frame` in the essence.
    fn get_frame_offset(&self, _media: &mut MediaHandle, _file: &mut OmfFile, _frame: u64) -> Result<u64> {
        Err(unsupported(self, CodecOp::GetFrameOffset))
    }

    /// Channels of `kind` described by `mdes`. Needs no open stream.
    fn num_channels(&self, _file: &mut OmfFile, _mdes: ObjectId, _kind: DataKind) -> Result<u16> {
        Err(unsupported(self, CodecOp::GetNumChannels))
    }

    /// Write default descriptor properties on a fresh `mdes`.
    fn init_mdes_props(&self, _file: &mut OmfFile, _mdes: ObjectId) -> Result<()> {
        Err(unsupported(self, CodecOp::InitMdesProps))
    }

    /// Check that `mdes` describes media this codec can handle.
    fn semantic_check(&self, _file: &mut OmfFile, _mdes: ObjectId) -> Result<()> {
        Err(unsupported(self, CodecOp::SemanticCheck))
    }

    fn add_frame_index_entry(&self, _media: &mut MediaHandle, _file: &mut OmfFile, _offset: u64) -> Result<()> {
        Err(unsupported(self, CodecOp::AddFrameIndexEntry))
    }
}

/// A registered codec with the metadata it reported.
pub struct CodecEntry {
    codec: Arc<dyn Codec>,
    meta: CodecMetaInfo,
}

impl std::fmt::Debug for CodecEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecEntry").field("meta", &self.meta).finish()
    }
}

impl CodecEntry {
    /// Query the codec's metadata and check its interface revision.
    pub fn new(codec: Arc<dyn Codec>) -> Result<Self> {
        let meta = codec.meta_info();
        check_codec_revision(&meta)?;
        Ok(Self { codec, meta })
    }

    pub fn meta(&self) -> &CodecMetaInfo {
        &self.meta
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }
}

pub(crate) fn check_codec_revision(meta: &CodecMetaInfo) -> Result<()> {
    if !(MIN_CODEC_REVISION..=CODEC_REVISION).contains(&meta.codec_revision) {
        return Err(Error::CodecRevision {
            codec: meta.id.clone(),
            revision: meta.codec_revision,
        });
    }
    Ok(())
}

/// Register the codecs every session starts with.
///
/// AVR resolves CDCI during its `init`, so CDCI goes first.
pub fn register_builtin(session: &Session) -> Result<()> {
    session.register_codec(Arc::new(WaveCodec::new()))?;
    session.register_codec(Arc::new(AifcCodec::new()))?;
    session.register_codec(Arc::new(CdciCodec::new()))?;
    session.register_codec(Arc::new(AvrCodec::new()))?;
    Ok(())
}
