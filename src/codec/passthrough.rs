//! Delegation from a wrapping codec to the codec it wraps.

use std::any::Any;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::CodecEntry;
use crate::media::MediaHandle;
use crate::util::Result;

type UserData = Option<Box<dyn Any + Send>>;

/// A media handle temporarily bound to another codec.
///
/// Holds the handle's own codec and user data while the inner codec runs,
/// and puts them back when dropped, whichever way the call ended.
struct Rebound<'a> {
    media: &'a mut MediaHandle,
    inner_private: &'a mut UserData,
    saved_codec: Option<Arc<CodecEntry>>,
    saved_user_data: UserData,
}

impl<'a> Rebound<'a> {
    fn new(media: &'a mut MediaHandle, inner: Arc<CodecEntry>, inner_private: &'a mut UserData) -> Self {
        let saved_codec = std::mem::replace(&mut media.codec, inner);
        let saved_user_data = std::mem::replace(&mut media.user_data, inner_private.take());
        Self {
            media,
            inner_private,
            saved_codec: Some(saved_codec),
            saved_user_data,
        }
    }
}

impl Deref for Rebound<'_> {
    type Target = MediaHandle;

    fn deref(&self) -> &MediaHandle {
        &*self.media
    }
}

impl DerefMut for Rebound<'_> {
    fn deref_mut(&mut self) -> &mut MediaHandle {
        &mut *self.media
    }
}

impl Drop for Rebound<'_> {
    fn drop(&mut self) {
        // The inner codec may have replaced its state; keep whatever it left.
        *self.inner_private = std::mem::replace(&mut self.media.user_data, self.saved_user_data.take());
        if let Some(codec) = self.saved_codec.take() {
            self.media.codec = codec;
        }
    }
}

/// Run `op` against `inner` with `media` bound to it.
///
/// For the duration of the call the handle's codec is `inner` and its user
/// data is `inner_private`. Afterwards both are restored, and any state the
/// inner codec left behind goes back into `inner_private`.
pub fn pass_through<T>(
    inner: &Arc<CodecEntry>,
    media: &mut MediaHandle,
    inner_private: &mut UserData,
    op: impl FnOnce(&CodecEntry, &mut MediaHandle) -> Result<T>,
) -> Result<T> {
    let mut bound = Rebound::new(media, inner.clone(), inner_private);
    op(inner.as_ref(), &mut *bound)
}
