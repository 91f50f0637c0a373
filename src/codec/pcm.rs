//! Uncompressed PCM audio shared by the WAVE and AIFC codecs.
//!
//! Both keep a format summary chunk on the descriptor and the sample bytes
//! verbatim in a data-value property of the media data object. They differ
//! only in the summary layout, so the codec is generic over [`PcmFormat`].

use std::marker::PhantomData;

use super::{
    unsupported, AudioInfo, Codec, CodecMetaInfo, CodecOp, DataKind, InfoSelector, MediaInfo, CODEC_REVISION,
    SOUND_KIND,
};
use crate::container::ObjectId;
use crate::core::{ClassId, PropCode, Rational, Revision, TypeCode};
use crate::file::OmfFile;
use crate::media::{MediaHandle, MediaMode};
use crate::util::{Error, Result};

/// Sample rate used when a descriptor carries none.
pub(crate) const DEFAULT_SAMPLE_RATE: Rational = Rational::new(48000, 1);

/// Sample width used for new descriptors.
pub(crate) const DEFAULT_BITS: u16 = 16;

/// Layout of one PCM container format.
pub trait PcmFormat: Send + Sync + 'static {
    const ID: &'static str;
    const NAME: &'static str;
    const MDES_CLASS: ClassId;
    const DATA_CLASS: ClassId;
    /// Descriptor property holding the summary chunk.
    const SUMMARY: PropCode;
    /// Data property holding the samples.
    const DATA: PropCode;

    /// Header chunks describing `frames` sample frames of `info`.
    fn encode_summary(info: &AudioInfo, frames: u64) -> Result<Vec<u8>>;

    /// Format and frame count from a summary.
    fn decode_summary(bytes: &[u8]) -> Result<(AudioInfo, u64)>;
}

/// PCM codec over a summary format.
pub struct PcmCodec<F> {
    _format: PhantomData<F>,
}

impl<F: PcmFormat> PcmCodec<F> {
    pub fn new() -> Self {
        Self { _format: PhantomData }
    }
}

impl<F: PcmFormat> Default for PcmCodec<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct PcmState {
    info: AudioInfo,
    frames: u64,
    /// 0-based read cursor, in frames.
    pos: u64,
}

fn state(media: &mut MediaHandle) -> Result<&mut PcmState> {
    media
        .user_data_mut::<PcmState>()
        .ok_or_else(|| Error::Media("PCM stream state missing".into()))
}

fn check_format(info: &AudioInfo) -> Result<()> {
    if info.channels == 0 {
        return Err(Error::Media("audio needs at least one channel".into()));
    }
    if info.bits_per_sample == 0 || info.bits_per_sample > 32 {
        return Err(Error::Media(format!("unsupported sample width {}", info.bits_per_sample)));
    }
    if info.sample_rate.denominator == 0 || info.sample_rate.numerator <= 0 {
        return Err(Error::Media(format!("invalid sample rate {}", info.sample_rate)));
    }
    Ok(())
}

/// Map a short read inside a summary chunk to a data error.
pub(crate) fn truncated(format: &'static str) -> impl Fn(std::io::Error) -> Error {
    move |_| Error::invalid(format!("truncated {format} summary"))
}

/// Integer rate for summary chunks that hold whole samples per second.
pub(crate) fn whole_rate(rate: Rational) -> u32 {
    rate.to_f64().round().clamp(0.0, u32::MAX as f64) as u32
}

impl<F: PcmFormat> PcmCodec<F> {
    fn read_summary(&self, file: &mut OmfFile, mdes: ObjectId) -> Result<(AudioInfo, u64)> {
        let bytes = file.read_data_value_all(mdes, F::SUMMARY)?;
        F::decode_summary(&bytes)
    }

    fn write_summary(&self, file: &mut OmfFile, mdes: ObjectId, info: &AudioInfo, frames: u64) -> Result<()> {
        let bytes = F::encode_summary(info, frames)?;
        if file.is_prop_present(mdes, F::SUMMARY, TypeCode::DATA_VALUE)? {
            file.remove_prop(mdes, F::SUMMARY, TypeCode::DATA_VALUE)?;
        }
        file.write_data_value(mdes, F::SUMMARY, 0, &bytes)
    }

    fn stored_frames(&self, file: &mut OmfFile, data: ObjectId, frame_bytes: u64) -> Result<u64> {
        match file.data_value_length(data, F::DATA) {
            Ok(len) if frame_bytes > 0 => Ok(len / frame_bytes),
            Ok(_) => Ok(0),
            Err(e) if e.is_not_present() => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl<F: PcmFormat> Codec for PcmCodec<F> {
    fn meta_info(&self) -> CodecMetaInfo {
        CodecMetaInfo {
            id: F::ID.into(),
            name: F::NAME.into(),
            min_revision: Revision::V1,
            max_revision: Revision::V2,
            data_kinds: vec![SOUND_KIND.into()],
            mdes_class: Some(F::MDES_CLASS),
            data_class: Some(F::DATA_CLASS),
            codec_revision: CODEC_REVISION,
        }
    }

    fn init_mdes_props(&self, file: &mut OmfFile, mdes: ObjectId) -> Result<()> {
        let rate = match file.read_exact_edit_rate(mdes, PropCode::MDFL_SAMPLE_RATE) {
            Ok(rate) => rate,
            Err(e) if e.is_not_present() => DEFAULT_SAMPLE_RATE,
            Err(e) => return Err(e),
        };
        self.write_summary(file, mdes, &AudioInfo::new(1, rate, DEFAULT_BITS), 0)
    }

    fn create(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        let (mut info, _) = self.read_summary(file, media.mdes())?;
        info.sample_rate = media.sample_rate();
        check_format(&info)?;
        media.set_user_data(PcmState { info, frames: 0, pos: 0 });
        Ok(())
    }

    fn open(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        let (mut info, _) = self.read_summary(file, media.mdes())?;
        info.sample_rate = media.sample_rate();
        let frames = self.stored_frames(file, media.data_object(), info.frame_bytes())?;
        media.set_user_data(PcmState { info, frames, pos: 0 });
        Ok(())
    }

    fn close(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        if media.mode() != MediaMode::Created {
            return Ok(());
        }
        let (info, frames) = {
            let st = state(media)?;
            (st.info, st.frames)
        };
        let mdes = media.mdes();
        self.write_summary(file, mdes, &info, frames)?;
        file.write_exact_edit_rate(mdes, PropCode::MDFL_SAMPLE_RATE, info.sample_rate)?;
        file.write_length(mdes, PropCode::MDFL_LENGTH, frames as i64)
    }

    fn get_info(&self, media: &mut MediaHandle, _file: &mut OmfFile, selector: InfoSelector) -> Result<MediaInfo> {
        let st = state(media)?;
        match selector {
            InfoSelector::Audio => Ok(MediaInfo::Audio(st.info)),
            InfoSelector::SampleCount => Ok(MediaInfo::SampleCount(st.frames)),
            InfoSelector::MaxSampleSize => Ok(MediaInfo::MaxSampleSize(st.info.frame_bytes())),
            InfoSelector::Video => Err(unsupported(self, CodecOp::GetInfo)),
        }
    }

    fn put_info(&self, media: &mut MediaHandle, _file: &mut OmfFile, info: &MediaInfo) -> Result<()> {
        let MediaInfo::Audio(audio) = info else {
            return Err(unsupported(self, CodecOp::PutInfo));
        };
        check_format(audio)?;
        let st = state(media)?;
        if st.frames > 0 && st.info != *audio {
            return Err(Error::Media("audio format cannot change after samples are written".into()));
        }
        st.info = *audio;
        Ok(())
    }

    fn write_samples(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u64, buf: &[u8]) -> Result<()> {
        if media.mode() != MediaMode::Created {
            return Err(Error::Media("media was opened for reading".into()));
        }
        let (frame_bytes, frames) = {
            let st = state(media)?;
            (st.info.frame_bytes(), st.frames)
        };
        let len = (count * frame_bytes) as usize;
        if buf.len() < len {
            return Err(Error::Media(format!("buffer holds fewer than {count} samples")));
        }
        file.write_media_bytes(media, F::DATA, frames * frame_bytes, &buf[..len])?;
        state(media)?.frames += count;
        Ok(())
    }

    fn read_samples(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u64, buf: &mut [u8]) -> Result<u64> {
        let data = media.data_object();
        let st = state(media)?;
        let frame_bytes = st.info.frame_bytes();
        let remaining = st.frames.saturating_sub(st.pos);
        if remaining == 0 {
            return Err(Error::EndOfData);
        }
        let n = count.min(remaining).min(buf.len() as u64 / frame_bytes);
        if n == 0 {
            return Err(Error::Media("buffer too small for one sample".into()));
        }
        let offset = st.pos * frame_bytes;
        file.read_data_value(data, F::DATA, offset, &mut buf[..(n * frame_bytes) as usize])?;
        st.pos += n;
        Ok(n)
    }

    fn set_frame(&self, media: &mut MediaHandle, _file: &mut OmfFile, frame: u64) -> Result<()> {
        if frame == 0 {
            return Err(Error::RequirePositive);
        }
        let st = state(media)?;
        if frame > st.frames {
            return Err(Error::EndOfData);
        }
        st.pos = frame - 1;
        Ok(())
    }

    fn get_frame_offset(&self, media: &mut MediaHandle, _file: &mut OmfFile, frame: u64) -> Result<u64> {
        if frame == 0 {
            return Err(Error::RequirePositive);
        }
        Ok((frame - 1) * state(media)?.info.frame_bytes())
    }

    fn num_channels(&self, file: &mut OmfFile, mdes: ObjectId, kind: DataKind) -> Result<u16> {
        match kind {
            DataKind::Sound => Ok(self.read_summary(file, mdes)?.0.channels),
            DataKind::Picture => Ok(0),
        }
    }

    fn semantic_check(&self, file: &mut OmfFile, mdes: ObjectId) -> Result<()> {
        let (info, _) = self.read_summary(file, mdes)?;
        if info.channels == 0 || info.bits_per_sample == 0 {
            return Err(Error::invalid(format!("{} summary describes no samples", F::ID)));
        }
        Ok(())
    }
}
