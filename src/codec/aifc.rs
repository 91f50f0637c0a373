//! AIFF-C audio.
//!
//! The summary is the FORM header with `FVER`, `COMM` and the `SSND` chunk
//! header. Samples are big-endian PCM. The sample rate is an 80-bit extended
//! float inside `COMM`.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::pcm::{truncated, PcmCodec, PcmFormat};
use super::AudioInfo;
use crate::core::{ClassId, PropCode, Rational};
use crate::util::{extended_to_f64, f64_to_extended, Error, Result, EXTENDED_SIZE};

const AIFC_VERSION_1: u32 = 0xA280_5140;
const COMPRESSION_NONE: &[u8; 4] = b"NONE";
const COMPRESSION_NAME: &[u8] = b"not compressed";

/// AIFF-C summary layout.
pub struct Aifc;

/// The AIFC codec.
pub type AifcCodec = PcmCodec<Aifc>;

fn pstring_len(s: &[u8]) -> u32 {
    let len = 1 + s.len() as u32;
    len + (len & 1)
}

fn rate_from_f64(rate: f64) -> Rational {
    if rate.fract() == 0.0 && rate <= i32::MAX as f64 {
        Rational::new(rate as i32, 1)
    } else {
        Rational::new((rate * 1000.0).round() as i32, 1000)
    }
}

impl PcmFormat for Aifc {
    const ID: &'static str = "AIFC";
    const NAME: &'static str = "AIFF-C audio";
    const MDES_CLASS: ClassId = ClassId::AIFD;
    const DATA_CLASS: ClassId = ClassId::AIFC;
    const SUMMARY: PropCode = PropCode::AIFD_SUMMARY;
    const DATA: PropCode = PropCode::AIFC_DATA;

    fn encode_summary(info: &AudioInfo, frames: u64) -> Result<Vec<u8>> {
        let comm_size = 2 + 4 + 2 + EXTENDED_SIZE as u32 + 4 + pstring_len(COMPRESSION_NAME);
        let data_len = (frames * info.frame_bytes()).min(u32::MAX as u64 / 2) as u32;
        let form_size = 4 + (8 + 4) + (8 + comm_size) + (8 + 8 + data_len);

        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(b"FORM");
        out.write_u32::<BigEndian>(form_size)?;
        out.extend_from_slice(b"AIFC");

        out.extend_from_slice(b"FVER");
        out.write_u32::<BigEndian>(4)?;
        out.write_u32::<BigEndian>(AIFC_VERSION_1)?;

        out.extend_from_slice(b"COMM");
        out.write_u32::<BigEndian>(comm_size)?;
        out.write_i16::<BigEndian>(info.channels as i16)?;
        out.write_u32::<BigEndian>(frames.min(u32::MAX as u64) as u32)?;
        out.write_i16::<BigEndian>(info.bits_per_sample as i16)?;
        out.extend_from_slice(&f64_to_extended(info.sample_rate.to_f64()));
        out.extend_from_slice(COMPRESSION_NONE);
        out.push(COMPRESSION_NAME.len() as u8);
        out.extend_from_slice(COMPRESSION_NAME);
        if (1 + COMPRESSION_NAME.len()) % 2 == 1 {
            out.push(0);
        }

        out.extend_from_slice(b"SSND");
        out.write_u32::<BigEndian>(8 + data_len)?;
        out.write_u32::<BigEndian>(0)?;
        out.write_u32::<BigEndian>(0)?;
        Ok(out)
    }

    fn decode_summary(bytes: &[u8]) -> Result<(AudioInfo, u64)> {
        let eof = truncated("AIFC");
        let mut cur = Cursor::new(bytes);
        let mut tag = [0u8; 4];
        cur.read_exact(&mut tag).map_err(&eof)?;
        if &tag != b"FORM" {
            return Err(Error::invalid("summary is not a FORM chunk"));
        }
        cur.read_u32::<BigEndian>().map_err(&eof)?;
        cur.read_exact(&mut tag).map_err(&eof)?;
        let compressed_form = match &tag {
            b"AIFC" => true,
            b"AIFF" => false,
            _ => return Err(Error::invalid("FORM type is neither AIFC nor AIFF")),
        };

        let mut found = None;
        while (cur.position() as usize) + 8 <= bytes.len() {
            cur.read_exact(&mut tag).map_err(&eof)?;
            let size = cur.read_u32::<BigEndian>().map_err(&eof)?;
            let body = cur.position();
            if &tag == b"COMM" {
                let channels = cur.read_i16::<BigEndian>().map_err(&eof)?;
                let frames = cur.read_u32::<BigEndian>().map_err(&eof)?;
                let bits = cur.read_i16::<BigEndian>().map_err(&eof)?;
                let mut ext = [0u8; EXTENDED_SIZE];
                cur.read_exact(&mut ext).map_err(&eof)?;
                if compressed_form {
                    let mut kind = [0u8; 4];
                    cur.read_exact(&mut kind).map_err(&eof)?;
                    if &kind != COMPRESSION_NONE {
                        let name = String::from_utf8_lossy(&kind).into_owned();
                        return Err(Error::invalid(format!("AIFC compression {name} is not supported")));
                    }
                }
                if channels <= 0 || bits <= 0 {
                    return Err(Error::invalid("COMM chunk describes no samples"));
                }
                let info = AudioInfo::new(channels as u16, rate_from_f64(extended_to_f64(&ext)), bits as u16);
                found = Some((info, frames as u64));
            }
            if &tag == b"SSND" {
                break;
            }
            cur.set_position(body + size as u64 + (size as u64 & 1));
        }
        found.ok_or_else(|| Error::invalid("AIFC summary has no COMM chunk"))
    }
}
