//! AVR video: named raw-CDCI formats.
//!
//! An AVR descriptor is a CDCI descriptor whose compression name is one of
//! the AVR resolutions. The codec translates that name into CDCI geometry and
//! hands every stream operation to the CDCI codec through [`pass_through`].

use std::any::Any;
use std::sync::{Arc, OnceLock};

use super::cdci::write_video_props;
use super::{
    pass_through, Codec, CodecEntry, CodecMetaInfo, DataKind, InfoSelector, MediaInfo, VideoInfo, CODEC_REVISION,
    PICTURE_KIND,
};
use crate::container::ObjectId;
use crate::core::{ClassId, FrameLayout, PropCode, Revision};
use crate::file::{OmfFile, Session};
use crate::media::MediaHandle;
use crate::util::{Error, Result};

/// Frame geometry of one AVR resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AvrFormat {
    pub name: &'static str,
    pub width: u32,
    /// Lines per field.
    pub height: u32,
    pub layout: FrameLayout,
}

impl AvrFormat {
    /// CDCI parameters for this resolution: 8-bit 4:2:2.
    pub fn video_info(&self) -> VideoInfo {
        VideoInfo {
            width: self.width,
            height: self.height,
            layout: self.layout,
            component_width: 8,
            horiz_subsampling: 2,
            compression: Some(self.name.to_string()),
        }
    }
}

/// Known AVR resolutions (NTSC).
pub const AVR_FORMATS: &[AvrFormat] = &[
    AvrFormat { name: "AVR1", width: 352, height: 243, layout: FrameLayout::SingleField },
    AvrFormat { name: "AVR2", width: 352, height: 243, layout: FrameLayout::SingleField },
    AvrFormat { name: "AVR3", width: 640, height: 243, layout: FrameLayout::SeparateFields },
    AvrFormat { name: "AVR4", width: 640, height: 243, layout: FrameLayout::SeparateFields },
    AvrFormat { name: "AVR5", width: 640, height: 243, layout: FrameLayout::SeparateFields },
    AvrFormat { name: "AVR6", width: 640, height: 243, layout: FrameLayout::SeparateFields },
    AvrFormat { name: "AVR12", width: 720, height: 243, layout: FrameLayout::SeparateFields },
];

/// Look up an AVR resolution by name.
pub fn avr_format(name: &str) -> Option<&'static AvrFormat> {
    AVR_FORMATS.iter().find(|f| f.name == name)
}

/// The AVR codec; wraps the session's CDCI codec.
#[derive(Debug, Default)]
pub struct AvrCodec {
    inner: OnceLock<Arc<CodecEntry>>,
}

struct AvrState {
    format: &'static AvrFormat,
    inner: Option<Box<dyn Any + Send>>,
}

impl AvrCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> Result<&Arc<CodecEntry>> {
        self.inner
            .get()
            .ok_or_else(|| Error::CodecNotFound("CDCI".into()))
    }

    fn descriptor_format(&self, file: &mut OmfFile, mdes: ObjectId) -> Result<&'static AvrFormat> {
        let name = file.read_string(mdes, PropCode::DIDD_COMPRESSION)?;
        avr_format(&name).ok_or_else(|| Error::invalid(format!("{name} is not an AVR format")))
    }

    /// Run a CDCI operation with the handle bound to the inner codec.
    fn delegate<T>(
        &self,
        media: &mut MediaHandle,
        op: impl FnOnce(&CodecEntry, &mut MediaHandle) -> Result<T>,
    ) -> Result<T> {
        let inner = self.inner()?;
        let mut state = media
            .take_user_data::<AvrState>()
            .ok_or_else(|| Error::Media("AVR stream state missing".into()))?;
        let result = pass_through(inner, media, &mut state.inner, op);
        media.set_user_data(*state);
        result
    }

    fn start(&self, media: &mut MediaHandle, file: &mut OmfFile, open: bool) -> Result<()> {
        let format = self.descriptor_format(file, media.mdes())?;
        media.set_user_data(AvrState { format, inner: None });
        let result = self.delegate(media, |cdci, m| if open { cdci.open(m, file) } else { cdci.create(m, file) });
        if result.is_err() {
            media.clear_user_data();
        }
        result
    }
}

impl Codec for AvrCodec {
    fn init(&self, session: &Session) -> Result<()> {
        if self.inner.get().is_none() {
            let cdci = session.codec("CDCI")?;
            // A concurrent init may have won; either value is the same codec.
            let _ = self.inner.set(cdci);
        }
        Ok(())
    }

    fn meta_info(&self) -> CodecMetaInfo {
        CodecMetaInfo {
            id: "AVR".into(),
            name: "AVR video over raw CDCI".into(),
            min_revision: Revision::V2,
            max_revision: Revision::V2,
            data_kinds: vec![PICTURE_KIND.into()],
            mdes_class: Some(ClassId::CDCI),
            data_class: Some(ClassId::IDAT),
            codec_revision: CODEC_REVISION,
        }
    }

    fn init_mdes_props(&self, file: &mut OmfFile, mdes: ObjectId) -> Result<()> {
        write_video_props(file, mdes, &AVR_FORMATS[0].video_info())
    }

    fn semantic_check(&self, file: &mut OmfFile, mdes: ObjectId) -> Result<()> {
        self.descriptor_format(file, mdes).map(|_| ())
    }

    fn num_channels(&self, file: &mut OmfFile, mdes: ObjectId, kind: DataKind) -> Result<u16> {
        self.inner()?.num_channels(file, mdes, kind)
    }

    fn create(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        self.start(media, file, false)
    }

    fn open(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        self.start(media, file, true)
    }

    fn close(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        self.delegate(media, |cdci, m| cdci.close(m, file))
    }

    fn get_info(&self, media: &mut MediaHandle, file: &mut OmfFile, selector: InfoSelector) -> Result<MediaInfo> {
        self.delegate(media, |cdci, m| cdci.get_info(m, file, selector))
    }

    /// Video info is accepted by AVR name; the geometry fields are derived
    /// from the name and whatever the caller passed for them is ignored.
    fn put_info(&self, media: &mut MediaHandle, file: &mut OmfFile, info: &MediaInfo) -> Result<()> {
        let MediaInfo::Video(video) = info else {
            return self.delegate(media, |cdci, m| cdci.put_info(m, file, info));
        };
        let format = match &video.compression {
            Some(name) => avr_format(name).ok_or_else(|| Error::Media(format!("unknown AVR format {name}")))?,
            None => {
                let st = media
                    .user_data_mut::<AvrState>()
                    .ok_or_else(|| Error::Media("AVR stream state missing".into()))?;
                st.format
            }
        };
        let translated = MediaInfo::Video(format.video_info());
        self.delegate(media, |cdci, m| cdci.put_info(m, file, &translated))?;
        if let Some(st) = media.user_data_mut::<AvrState>() {
            st.format = format;
        }
        Ok(())
    }

    fn read_samples(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u64, buf: &mut [u8]) -> Result<u64> {
        self.delegate(media, |cdci, m| cdci.read_samples(m, file, count, buf))
    }

    fn write_samples(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u64, buf: &[u8]) -> Result<()> {
        self.delegate(media, |cdci, m| cdci.write_samples(m, file, count, buf))
    }

    fn read_lines(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u32, buf: &mut [u8]) -> Result<()> {
        self.delegate(media, |cdci, m| cdci.read_lines(m, file, count, buf))
    }

    fn write_lines(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u32, buf: &[u8]) -> Result<()> {
        self.delegate(media, |cdci, m| cdci.write_lines(m, file, count, buf))
    }

    fn set_frame(&self, media: &mut MediaHandle, file: &mut OmfFile, frame: u64) -> Result<()> {
        self.delegate(media, |cdci, m| cdci.set_frame(m, file, frame))
    }

    fn get_frame_offset(&self, media: &mut MediaHandle, file: &mut OmfFile, frame: u64) -> Result<u64> {
        self.delegate(media, |cdci, m| cdci.get_frame_offset(m, file, frame))
    }

    fn add_frame_index_entry(&self, media: &mut MediaHandle, file: &mut OmfFile, offset: u64) -> Result<()> {
        self.delegate(media, |cdci, m| cdci.add_frame_index_entry(m, file, offset))
    }
}
