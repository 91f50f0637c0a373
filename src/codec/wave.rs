//! RIFF WAVE audio.
//!
//! The summary is a canonical 44-byte RIFF header: `fmt ` chunk followed by
//! the `data` chunk header. Samples are little-endian PCM.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::pcm::{truncated, whole_rate, PcmCodec, PcmFormat};
use super::AudioInfo;
use crate::core::{ClassId, PropCode, Rational};
use crate::util::{Error, Result};

const WAVE_FORMAT_PCM: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;

/// RIFF WAVE summary layout.
pub struct Wave;

/// The WAVE codec.
pub type WaveCodec = PcmCodec<Wave>;

impl PcmFormat for Wave {
    const ID: &'static str = "WAVE";
    const NAME: &'static str = "RIFF WAVE audio";
    const MDES_CLASS: ClassId = ClassId::WAVD;
    const DATA_CLASS: ClassId = ClassId::WAVE;
    const SUMMARY: PropCode = PropCode::WAVD_SUMMARY;
    const DATA: PropCode = PropCode::WAVE_DATA;

    fn encode_summary(info: &AudioInfo, frames: u64) -> Result<Vec<u8>> {
        let block_align = u16::try_from(info.frame_bytes())
            .map_err(|_| Error::Media(format!("WAVE frame of {} bytes is too wide", info.frame_bytes())))?;
        let rate = whole_rate(info.sample_rate);
        let byte_rate = rate
            .checked_mul(u32::from(block_align))
            .ok_or_else(|| Error::Media(format!("WAVE byte rate overflows at {rate} Hz")))?;
        let data_len = frames
            .saturating_mul(u64::from(block_align))
            .min(u64::from(u32::MAX) - 36) as u32;

        let mut out = Vec::with_capacity(44);
        out.extend_from_slice(b"RIFF");
        out.write_u32::<LittleEndian>(36 + data_len)?;
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.write_u32::<LittleEndian>(FMT_CHUNK_SIZE)?;
        out.write_u16::<LittleEndian>(WAVE_FORMAT_PCM)?;
        out.write_u16::<LittleEndian>(info.channels)?;
        out.write_u32::<LittleEndian>(rate)?;
        out.write_u32::<LittleEndian>(byte_rate)?;
        out.write_u16::<LittleEndian>(block_align)?;
        out.write_u16::<LittleEndian>(info.bits_per_sample)?;
        out.extend_from_slice(b"data");
        out.write_u32::<LittleEndian>(data_len)?;
        Ok(out)
    }

    fn decode_summary(bytes: &[u8]) -> Result<(AudioInfo, u64)> {
        let eof = truncated("RIFF");
        let mut cur = Cursor::new(bytes);
        let mut tag = [0u8; 4];
        cur.read_exact(&mut tag).map_err(&eof)?;
        if &tag != b"RIFF" {
            return Err(Error::invalid("summary is not a RIFF chunk"));
        }
        cur.read_u32::<LittleEndian>().map_err(&eof)?;
        cur.read_exact(&mut tag).map_err(&eof)?;
        if &tag != b"WAVE" {
            return Err(Error::invalid("RIFF form is not WAVE"));
        }

        let mut format = None;
        let mut data_len = None;
        while (cur.position() as usize) + 8 <= bytes.len() {
            cur.read_exact(&mut tag).map_err(&eof)?;
            let size = cur.read_u32::<LittleEndian>().map_err(&eof)?;
            let body = cur.position();
            match &tag {
                b"fmt " => {
                    let code = cur.read_u16::<LittleEndian>().map_err(&eof)?;
                    if code != WAVE_FORMAT_PCM {
                        return Err(Error::invalid(format!("WAVE format {code} is not PCM")));
                    }
                    let channels = cur.read_u16::<LittleEndian>().map_err(&eof)?;
                    let rate = cur.read_u32::<LittleEndian>().map_err(&eof)?;
                    let _byte_rate = cur.read_u32::<LittleEndian>().map_err(&eof)?;
                    let _block_align = cur.read_u16::<LittleEndian>().map_err(&eof)?;
                    let bits = cur.read_u16::<LittleEndian>().map_err(&eof)?;
                    format = Some(AudioInfo::new(channels, Rational::new(rate as i32, 1), bits));
                }
                // The summary holds the data chunk header only.
                b"data" => {
                    data_len = Some(size as u64);
                    break;
                }
                _ => {}
            }
            // Chunks are padded to even length.
            cur.set_position(body + size as u64 + (size as u64 & 1));
        }

        let info = format.ok_or_else(|| Error::invalid("RIFF summary has no fmt chunk"))?;
        let frame_bytes = info.frame_bytes().max(1);
        Ok((info, data_len.unwrap_or(0) / frame_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_header() {
        let info = AudioInfo::new(2, Rational::new(44100, 1), 16);
        let bytes = Wave::encode_summary(&info, 10).unwrap();
        assert_eq!(bytes.len(), 44);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 36 + 40);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 40);

        let (back, frames) = Wave::decode_summary(&bytes).unwrap();
        assert_eq!(back, info);
        assert_eq!(frames, 10);
    }

    #[test]
    fn test_rejects_formats_the_header_cannot_hold() {
        let wide = AudioInfo::new(20_000, Rational::new(48000, 1), 32);
        assert!(matches!(Wave::encode_summary(&wide, 0), Err(Error::Media(_))));

        let fast = AudioInfo::new(2000, Rational::new(1_000_000, 1), 32);
        assert!(matches!(Wave::encode_summary(&fast, 0), Err(Error::Media(_))));
    }

    #[test]
    fn test_skips_unknown_chunks() {
        let info = AudioInfo::new(1, Rational::new(48000, 1), 24);
        let canonical = Wave::encode_summary(&info, 0).unwrap();
        let mut bytes = canonical[..12].to_vec();
        bytes.extend_from_slice(b"bext");
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 0]);
        bytes.extend_from_slice(&canonical[12..]);
        assert_eq!(Wave::decode_summary(&bytes).unwrap().0, info);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Wave::decode_summary(b"FORM").is_err());
        assert!(Wave::decode_summary(b"RIF").is_err());
        let mut no_fmt = b"RIFF".to_vec();
        no_fmt.extend_from_slice(&4u32.to_le_bytes());
        no_fmt.extend_from_slice(b"WAVE");
        assert!(Wave::decode_summary(&no_fmt).is_err());
    }
}
