//! Media handles: streams of audio or video essence.
//!
//! ```ignore
//! use omf::prelude::*;
//!
//! let params = MediaParams::new(Uid::new(42, 1, 1), DataKind::Sound, Rational::new(48000, 1));
//! let mut media = MediaHandle::create(&mut file, "WAVE", params)?;
//! media.put_audio_info(&mut file, AudioInfo::new(2, Rational::new(48000, 1), 16))?;
//! media.write_samples(&mut file, frames, &pcm)?;
//! media.close(&mut file)?;
//! ```

mod handle;
mod stream;

pub use crate::file::MediaMode;
pub use handle::{ChannelDesc, MediaHandle, MediaParams};
