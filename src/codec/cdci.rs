//! Uncompressed component (Y'CbCr) video.
//!
//! Geometry lives on the CDCI descriptor; frames are stored back to back in
//! `IDAT:ImageData`. Frames can be written whole or line by line, and an
//! optional frame index is kept in `IDAT:FrameIndex`.

use tracing::warn;

use super::{
    unsupported, Codec, CodecMetaInfo, CodecOp, DataKind, InfoSelector, MediaInfo, VideoInfo, CODEC_REVISION,
    PICTURE_KIND,
};
use crate::container::ObjectId;
use crate::core::{ClassId, FrameLayout, PropCode, Revision};
use crate::file::OmfFile;
use crate::media::{MediaHandle, MediaMode};
use crate::util::{Error, Result};

/// Geometry written on new descriptors: full-height NTSC, 8-bit 4:2:2.
pub const DEFAULT_VIDEO: VideoInfo = VideoInfo {
    width: 720,
    height: 486,
    layout: FrameLayout::FullFrame,
    component_width: 8,
    horiz_subsampling: 2,
    compression: None,
};

/// The raw CDCI codec.
#[derive(Debug, Default)]
pub struct CdciCodec;

impl CdciCodec {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug)]
struct CdciState {
    info: VideoInfo,
    /// Complete frames written or stored.
    frames: u64,
    /// Lines written into the frame after `frames`.
    write_line: u64,
    /// 0-based read cursor.
    pos: u64,
    read_line: u64,
    frame_index: Vec<i64>,
}

fn state(media: &mut MediaHandle) -> Result<&mut CdciState> {
    media
        .user_data_mut::<CdciState>()
        .ok_or_else(|| Error::Media("CDCI stream state missing".into()))
}

fn check_geometry(info: &VideoInfo) -> Result<()> {
    if info.width == 0 || info.height == 0 {
        return Err(Error::Media(format!("invalid frame size {}x{}", info.width, info.height)));
    }
    if !(1..=16).contains(&info.component_width) {
        return Err(Error::Media(format!("unsupported component width {}", info.component_width)));
    }
    if !matches!(info.horiz_subsampling, 1 | 2) || info.width % info.horiz_subsampling != 0 {
        return Err(Error::Media(format!(
            "horizontal subsampling {} does not fit width {}",
            info.horiz_subsampling, info.width
        )));
    }
    Ok(())
}

/// Read the geometry recorded on a CDCI descriptor.
pub(crate) fn read_video_props(file: &mut OmfFile, mdes: ObjectId) -> Result<VideoInfo> {
    let compression = match file.read_string(mdes, PropCode::DIDD_COMPRESSION) {
        Ok(name) if name.is_empty() => None,
        Ok(name) => Some(name),
        Err(e) if e.is_not_present() => None,
        Err(e) => return Err(e),
    };
    Ok(VideoInfo {
        width: file.read_i32(mdes, PropCode::DIDD_STORED_WIDTH)?.max(0) as u32,
        height: file.read_i32(mdes, PropCode::DIDD_STORED_HEIGHT)?.max(0) as u32,
        layout: file.read_frame_layout(mdes, PropCode::DIDD_FRAME_LAYOUT)?,
        component_width: file.read_i32(mdes, PropCode::CDCI_COMPONENT_WIDTH)?.max(0) as u32,
        horiz_subsampling: file.read_u32(mdes, PropCode::CDCI_HORIZ_SUBSAMPLING)?,
        compression,
    })
}

/// Record geometry on a CDCI descriptor.
pub(crate) fn write_video_props(file: &mut OmfFile, mdes: ObjectId, info: &VideoInfo) -> Result<()> {
    file.write_i32(mdes, PropCode::DIDD_STORED_WIDTH, info.width as i32)?;
    file.write_i32(mdes, PropCode::DIDD_STORED_HEIGHT, info.height as i32)?;
    file.write_frame_layout(mdes, PropCode::DIDD_FRAME_LAYOUT, info.layout)?;
    file.write_i32(mdes, PropCode::CDCI_COMPONENT_WIDTH, info.component_width as i32)?;
    file.write_u32(mdes, PropCode::CDCI_HORIZ_SUBSAMPLING, info.horiz_subsampling)?;
    if let Some(name) = &info.compression {
        file.write_string(mdes, PropCode::DIDD_COMPRESSION, name)?;
    }
    Ok(())
}

impl Codec for CdciCodec {
    fn meta_info(&self) -> CodecMetaInfo {
        CodecMetaInfo {
            id: "CDCI".into(),
            name: "Uncompressed component video".into(),
            min_revision: Revision::V2,
            max_revision: Revision::V2,
            data_kinds: vec![PICTURE_KIND.into()],
            mdes_class: Some(ClassId::CDCI),
            data_class: Some(ClassId::IDAT),
            codec_revision: CODEC_REVISION,
        }
    }

    fn init_mdes_props(&self, file: &mut OmfFile, mdes: ObjectId) -> Result<()> {
        write_video_props(file, mdes, &DEFAULT_VIDEO)
    }

    fn semantic_check(&self, file: &mut OmfFile, mdes: ObjectId) -> Result<()> {
        let info = read_video_props(file, mdes)?;
        if let Some(name) = info.compression {
            return Err(Error::invalid(format!("descriptor is compressed ({name}), not raw CDCI")));
        }
        Ok(())
    }

    fn create(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        let info = read_video_props(file, media.mdes())?;
        check_geometry(&info)?;
        media.set_user_data(CdciState {
            info,
            frames: 0,
            write_line: 0,
            pos: 0,
            read_line: 0,
            frame_index: Vec::new(),
        });
        Ok(())
    }

    fn open(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        let info = read_video_props(file, media.mdes())?;
        check_geometry(&info)?;
        let data = media.data_object();
        let stored = match file.data_value_length(data, PropCode::IDAT_IMAGE_DATA) {
            Ok(len) => len,
            Err(e) if e.is_not_present() => 0,
            Err(e) => return Err(e),
        };
        let count = file.position_array_len(data, PropCode::IDAT_FRAME_INDEX)?;
        let frame_index = (1..=count)
            .map(|i| file.read_nth_position(data, PropCode::IDAT_FRAME_INDEX, i))
            .collect::<Result<Vec<_>>>()?;
        media.set_user_data(CdciState {
            frames: stored / info.frame_bytes(),
            info,
            write_line: 0,
            pos: 0,
            read_line: 0,
            frame_index,
        });
        Ok(())
    }

    fn close(&self, media: &mut MediaHandle, file: &mut OmfFile) -> Result<()> {
        if media.mode() != MediaMode::Created {
            return Ok(());
        }
        let (mdes, data) = (media.mdes(), media.data_object());
        let st = state(media)?;
        if st.write_line > 0 {
            warn!(lines = st.write_line, "closing video with a partially written frame");
        }
        write_video_props(file, mdes, &st.info)?;
        file.write_length(mdes, PropCode::MDFL_LENGTH, st.frames as i64)?;
        for &offset in &st.frame_index {
            file.append_position(data, PropCode::IDAT_FRAME_INDEX, offset)?;
        }
        Ok(())
    }

    fn get_info(&self, media: &mut MediaHandle, _file: &mut OmfFile, selector: InfoSelector) -> Result<MediaInfo> {
        let st = state(media)?;
        match selector {
            InfoSelector::Video => Ok(MediaInfo::Video(st.info.clone())),
            InfoSelector::SampleCount => Ok(MediaInfo::SampleCount(st.frames)),
            InfoSelector::MaxSampleSize => Ok(MediaInfo::MaxSampleSize(st.info.frame_bytes())),
            InfoSelector::Audio => Err(unsupported(self, CodecOp::GetInfo)),
        }
    }

    fn put_info(&self, media: &mut MediaHandle, _file: &mut OmfFile, info: &MediaInfo) -> Result<()> {
        let MediaInfo::Video(video) = info else {
            return Err(unsupported(self, CodecOp::PutInfo));
        };
        check_geometry(video)?;
        let st = state(media)?;
        if (st.frames > 0 || st.write_line > 0) && st.info != *video {
            return Err(Error::Media("video format cannot change after frames are written".into()));
        }
        st.info = video.clone();
        Ok(())
    }

    fn write_samples(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u64, buf: &[u8]) -> Result<()> {
        if media.mode() != MediaMode::Created {
            return Err(Error::Media("media was opened for reading".into()));
        }
        let (frame_bytes, frames) = {
            let st = state(media)?;
            if st.write_line > 0 {
                return Err(Error::Media("a frame is partially written by lines".into()));
            }
            (st.info.frame_bytes(), st.frames)
        };
        let len = (count * frame_bytes) as usize;
        if buf.len() < len {
            return Err(Error::Media(format!("buffer holds fewer than {count} frames")));
        }
        file.write_media_bytes(media, PropCode::IDAT_IMAGE_DATA, frames * frame_bytes, &buf[..len])?;
        state(media)?.frames += count;
        Ok(())
    }

    fn write_lines(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u32, buf: &[u8]) -> Result<()> {
        if media.mode() != MediaMode::Created {
            return Err(Error::Media("media was opened for reading".into()));
        }
        let (line_bytes, offset) = {
            let st = state(media)?;
            let lb = st.info.line_bytes();
            (lb, st.frames * st.info.frame_bytes() + st.write_line * lb)
        };
        let len = (count as u64 * line_bytes) as usize;
        if buf.len() < len {
            return Err(Error::Media(format!("buffer holds fewer than {count} lines")));
        }
        file.write_media_bytes(media, PropCode::IDAT_IMAGE_DATA, offset, &buf[..len])?;
        let st = state(media)?;
        let per_frame = st.info.lines_per_frame();
        st.write_line += count as u64;
        st.frames += st.write_line / per_frame;
        st.write_line %= per_frame;
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
            return Err(Error::Media("buffer too small for one frame".into()));
        }
        file.read_data_value(
            data,
            PropCode::IDAT_IMAGE_DATA,
            st.pos * frame_bytes,
            &mut buf[..(n * frame_bytes) as usize],
        )?;
        st.pos += n;
        st.read_line = 0;
        Ok(n)
    }

    fn read_lines(&self, media: &mut MediaHandle, file: &mut OmfFile, count: u32, buf: &mut [u8]) -> Result<()> {
        let data = media.data_object();
        let st = state(media)?;
        let line_bytes = st.info.line_bytes();
        let per_frame = st.info.lines_per_frame();
        let start = st.pos * per_frame + st.read_line;
        if start + count as u64 > st.frames * per_frame {
            return Err(Error::EndOfData);
        }
        let len = (count as u64 * line_bytes) as usize;
        if buf.len() < len {
            return Err(Error::Media(format!("buffer holds fewer than {count} lines")));
        }
        file.read_data_value(data, PropCode::IDAT_IMAGE_DATA, start * line_bytes, &mut buf[..len])?;
        let next = start + count as u64;
        st.pos = next / per_frame;
        st.read_line = next % per_frame;
        Ok(())
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
        st.read_line = 0;
        Ok(())
    }

    fn get_frame_offset(&self, media: &mut MediaHandle, _file: &mut OmfFile, frame: u64) -> Result<u64> {
        if frame == 0 {
            return Err(Error::RequirePositive);
        }
        let st = state(media)?;
        match st.frame_index.get((frame - 1) as usize) {
            Some(&offset) => Ok(offset.max(0) as u64),
            None => Ok((frame - 1) * st.info.frame_bytes()),
        }
    }

    fn num_channels(&self, _file: &mut OmfFile, _mdes: ObjectId, kind: DataKind) -> Result<u16> {
        Ok(match kind {
            DataKind::Picture => 1,
            DataKind::Sound => 0,
        })
    }

    fn add_frame_index_entry(&self, media: &mut MediaHandle, _file: &mut OmfFile, offset: u64) -> Result<()> {
        let offset = i64::try_from(offset).map_err(|_| Error::ValueOutOfRange(i64::MAX))?;
        state(media)?.frame_index.push(offset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{FileOptions, Session};

    #[test]
    fn test_descriptor_props_roundtrip() {
        let session = Session::begin().unwrap();
        let mut file = session.create_scratch(FileOptions::new(Revision::V2)).unwrap();
        let mdes = file.new_object(ClassId::CDCI).unwrap();
        CdciCodec.init_mdes_props(&mut file, mdes).unwrap();
        assert_eq!(read_video_props(&mut file, mdes).unwrap(), DEFAULT_VIDEO);
        assert!(CdciCodec.semantic_check(&mut file, mdes).is_ok());

        let named = VideoInfo {
            compression: Some("JPEG".into()),
            ..DEFAULT_VIDEO
        };
        write_video_props(&mut file, mdes, &named).unwrap();
        assert_eq!(read_video_props(&mut file, mdes).unwrap(), named);
        assert!(CdciCodec.semantic_check(&mut file, mdes).is_err());
    }

    #[test]
    fn test_geometry_checks() {
        assert!(check_geometry(&DEFAULT_VIDEO).is_ok());
        let odd = VideoInfo { width: 719, ..DEFAULT_VIDEO };
        assert!(check_geometry(&odd).is_err());
        let empty = VideoInfo { height: 0, ..DEFAULT_VIDEO };
        assert!(check_geometry(&empty).is_err());
    }
}
