//! Uniform entry points into a registered codec.
//!
//! Every call re-checks the codec's interface revision and the file's
//! revision against the codec's declared range before handing over.

use tracing::trace;

use super::{check_codec_revision, CodecEntry, CodecOp, DataKind, InfoSelector, MediaInfo};
use crate::container::ObjectId;
use crate::file::OmfFile;
use crate::media::MediaHandle;
use crate::util::{Error, Result};

impl CodecEntry {
    fn admit(&self, file: &OmfFile, op: CodecOp) -> Result<()> {
        check_codec_revision(&self.meta)?;
        let rev = file.revision();
        if !self.meta.supports_revision(rev) {
            return Err(Error::FileRevisionUnsupported {
                codec: self.meta.id.clone(),
                revision: rev.to_string(),
            });
        }
        trace!(codec = %self.meta.id, op = %op, "codec call");
        Ok(())
    }

    pub fn open(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        self.admit(file, CodecOp::Open)?;
        self.codec.open(media, file)
    }

    pub fn create(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        self.admit(file, CodecOp::Create)?;
        self.codec.create(media, file)
    }

    pub fn close(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        self.admit(file, CodecOp::Close)?;
        self.codec.close(media, file)
    }

    pub fn get_info(&self, media: &mut MediaHandle, file: &mut OmfFile, selector: InfoSelector) -> Result<MediaInfo> {
        self.admit(file, CodecOp::GetInfo)?;
        self.codec.get_info(media, file, selector)
    }

    pub fn put_info(&self, media: &mut MediaHandle, file: &mut OmfFile, info: &MediaInfo) -> Result<()> {
        self.admit(file, CodecOp::PutInfo)?;
        self.codec.put_info(media, file, info)
    }

    pub fn read_samples(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u64, buf: &mut [u8]) -> Result<u64> {
        self.admit(file, CodecOp::ReadSamples)?;
        self.codec.read_samples(media, file, count, buf)
    }

    pub fn write_samples(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u64, buf: &[u8]) -> Result<()> {
        self.admit(file, CodecOp::WriteSamples)?;
        self.codec.write_samples(media, file, count, buf)
    }

    pub fn read_lines(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u32, buf: &mut [u8]) -> Result<()> {
        self.admit(file, CodecOp::ReadLines)?;
        self.codec.read_lines(media, file, count, buf)
    }

    pub fn write_lines(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u32, buf: &[u8]) -> Result<()> {
        self.admit(file, CodecOp::WriteLines)?;
        self.codec.write_lines(media, file, count, buf)
    }

    pub fn set_frame(&self, media: &mut MediaHandle, file: &mut OmfFile, frame: u64) -> Result<()> {
        self.admit(file, CodecOp::SetFrame)?;
        self.codec.set_frame(media, file, frame)
    }

    pub fn get_frame_offset(&self, media: &mut MediaHandle, file: &mut OmfFile, frame: u64) -> Result<u64> {
        self.admit(file, CodecOp::GetFrameOffset)?;
        self.codec.get_frame_offset(media, file, frame)
    }

    pub fn num_channels(&self, file: &mut OmfFile, mdes: ObjectId, kind: DataKind) -> Result<u16> {
        self.admit(file, CodecOp::GetNumChannels)?;
        self.codec.num_channels(file, mdes, kind)
    }

    pub fn init_mdes_props(&self, file: &mut OmfFile, mdes: ObjectId) -> Result<()> {
        self.admit(file, CodecOp::InitMdesProps)?;
        self.codec.init_mdes_props(file, mdes)
    }

    pub fn semantic_check(&self, file: &mut OmfFile, mdes: ObjectId) -> Result<()> {
        self.admit(file, CodecOp::SemanticCheck)?;
        self.codec.semantic_check(file, mdes)
    }

    pub fn add_frame_index_entry(&self, media: &mut MediaHandle, file: &mut OmfFile, offset: u64) -> Result<()> {
        self.admit(file, CodecOp::AddFrameIndexEntry)?;
        self.codec.add_frame_index_entry(media, file, offset)
    }
}
