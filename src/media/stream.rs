//! Sample I/O and format negotiation on an open media handle.

use crate::codec::{AudioInfo, DataKind, InfoSelector, MediaInfo, VideoInfo};
use crate::core::{PropCode, TypeCode};
use crate::file::{MediaMode, OmfFile};
use crate::util::{Error, Result};

use super::handle::{channel_table, MediaHandle};

impl MediaHandle {
    /// Write `count` samples from `buf`.
    pub fn write_samples(&mut self, file: &mut OmfFile, count: u64, buf: &[u8]) -> Result<()> {
        let codec = self.codec.clone();
        codec.write_samples(self, file, count, buf)
    }

    /// Read up to `count` samples into `buf`; returns how many were read.
    pub fn read_samples(&mut self, file: &mut OmfFile, count: u64, buf: &mut [u8]) -> Result<u64> {
        let codec = self.codec.clone();
        codec.read_samples(self, file, count, buf)
    }

    pub fn write_lines(&mut self, file: &mut OmfFile, count: u32, buf: &[u8]) -> Result<()> {
        let codec = self.codec.clone();
        codec.write_lines(self, file, count, buf)
    }

    pub fn read_lines(&mut self, file: &mut OmfFile, count: u32, buf: &mut [u8]) -> Result<()> {
        let codec = self.codec.clone();
        codec.read_lines(self, file, count, buf)
    }

    /// Position the read cursor at 1-based `frame`.
    pub fn set_frame(&mut self, file: &mut OmfFile, frame: u64) -> Result<()> {
        let codec = self.codec.clone();
        codec.set_frame(self, file, frame)
    }

    /// Byte offset of 1-based `frame` in the essence.
    pub fn get_frame_offset(&mut self, file: &mut OmfFile, frame: u64) -> Result<u64> {
        let codec = self.codec.clone();
        codec.get_frame_offset(self, file, frame)
    }

    pub fn add_frame_index_entry(&mut self, file: &mut OmfFile, offset: u64) -> Result<()> {
        let codec = self.codec.clone();
        codec.add_frame_index_entry(self, file, offset)
    }

    pub fn get_info(&mut self, file: &mut OmfFile, selector: InfoSelector) -> Result<MediaInfo> {
        let codec = self.codec.clone();
        codec.get_info(self, file, selector)
    }

    pub fn put_info(&mut self, file: &mut OmfFile, info: &MediaInfo) -> Result<()> {
        let codec = self.codec.clone();
        codec.put_info(self, file, info)
    }

    /// Channels of `kind` the descriptor describes.
    pub fn num_channels(&mut self, file: &mut OmfFile, kind: DataKind) -> Result<u16> {
        let codec = self.codec.clone();
        codec.num_channels(file, self.mdes(), kind)
    }

    /// Samples in the stream.
    pub fn sample_count(&mut self, file: &mut OmfFile) -> Result<u64> {
        match self.get_info(file, InfoSelector::SampleCount)? {
            MediaInfo::SampleCount(n) => Ok(n),
            other => Err(Error::Media(format!("codec answered {other:?} for a sample count"))),
        }
    }

    pub fn get_audio_info(&mut self, file: &mut OmfFile) -> Result<AudioInfo> {
        match self.get_info(file, InfoSelector::Audio)? {
            MediaInfo::Audio(info) => Ok(info),
            other => Err(Error::Media(format!("codec answered {other:?} for audio info"))),
        }
    }

    /// Set the audio format and rebuild the channel table to match.
    pub fn put_audio_info(&mut self, file: &mut OmfFile, info: AudioInfo) -> Result<()> {
        self.put_info(file, &MediaInfo::Audio(info))?;
        let channels = channel_table(info.channels, info.sample_rate);
        self.channels = channels;
        self.set_sample_rate(info.sample_rate);
        Ok(())
    }

    pub fn get_video_info(&mut self, file: &mut OmfFile) -> Result<VideoInfo> {
        match self.get_info(file, InfoSelector::Video)? {
            MediaInfo::Video(info) => Ok(info),
            other => Err(Error::Media(format!("codec answered {other:?} for video info"))),
        }
    }

    pub fn put_video_info(&mut self, file: &mut OmfFile, info: VideoInfo) -> Result<()> {
        self.put_info(file, &MediaInfo::Video(info))
    }
}

impl OmfFile {
    /// Write essence bytes for an active created stream.
    ///
    /// This is the one write path open while media is streaming. It only
    /// reaches the data object of `media`.
    pub fn write_media_bytes(&mut self, media: &MediaHandle, prop: PropCode, offset: u64, bytes: &[u8]) -> Result<()> {
        let record = self
            .media_record(media.id())
            .ok_or_else(|| Error::Media(format!("media {} is not open on this file", media.id().0)))?;
        if record.mode != MediaMode::Created || !record.stream_active {
            return Err(Error::Media("media stream is not active".into()));
        }
        if record.data_obj != media.data_object() {
            return Err(Error::Media("media handle does not match its stream".into()));
        }
        if !self.is_writable() {
            return Err(Error::ReadOnly);
        }
        let resolved = self.resolve(prop, TypeCode::DATA_VALUE)?;
        self.check_semantics(record.data_obj, prop, TypeCode::DATA_VALUE)?;
        self.store(record.data_obj, resolved, offset, bytes)
    }
}
