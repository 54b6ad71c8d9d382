//! Release-on-drop ownership of an acquired capture stream

use crate::collaborators::{CaptureStream, Frame, MediaCaptureProvider};
use std::sync::Arc;

/// Exclusive owner of a capture stream
///
/// The stream goes back to its provider exactly once: on [`release`] or when
/// the guard is dropped, whichever comes first. Dropping covers every exit
/// path including task abort and unwinding.
///
/// [`release`]: ActiveCapture::release
pub struct ActiveCapture<P: MediaCaptureProvider> {
    provider: Arc<P>,
    stream: Option<P::Stream>,
}

impl<P: MediaCaptureProvider> ActiveCapture<P> {
    pub fn new(provider: Arc<P>, stream: P::Stream) -> Self {
        Self {
            provider,
            stream: Some(stream),
        }
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream.as_ref().map(CaptureStream::id)
    }

    pub fn current_frame(&mut self) -> Option<Frame> {
        self.stream.as_mut().map(CaptureStream::current_frame)
    }

    pub fn release(mut self) {
        self.release_stream();
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            tracing::debug!(stream = stream.id(), "Releasing capture stream");
            self.provider.release(stream);
        }
    }
}

impl<P: MediaCaptureProvider> Drop for ActiveCapture<P> {
    fn drop(&mut self) {
        self.release_stream();
    }
}
