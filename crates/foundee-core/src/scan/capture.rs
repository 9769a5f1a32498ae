//! Capture sessions: the source of raw QR payloads.
//!
//! A session is acquired when scanning starts and must be released on every
//! exit path. [`CaptureGuard`] owns the session and releases it on drop.

use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;

use crate::qr_image;

/// One read from a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A QR code was decoded.
    Decoded(String),
    /// A frame was read but held no readable code.
    Empty,
    /// The source has no more frames.
    Closed,
}

pub trait CaptureSession: Send {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Frame>>;

    /// Frees the underlying device or files. Called exactly once.
    fn release(&mut self);
}

/// Owns an active capture session and releases it when dropped.
pub struct CaptureGuard {
    session: Option<Box<dyn CaptureSession>>,
}

impl CaptureGuard {
    pub fn new(session: Box<dyn CaptureSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Reads the next frame. A released guard reports [`Frame::Closed`].
    ///
    /// # Errors
    /// Propagates errors from the session.
    pub async fn next_frame(&mut self) -> Result<Frame> {
        match self.session.as_mut() {
            Some(session) => session.next_frame().await,
            None => Ok(Frame::Closed),
        }
    }

    pub fn release(mut self) {
        self.release_in_place();
    }

    fn release_in_place(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release();
            tracing::debug!("capture session released");
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.release_in_place();
    }
}

impl std::fmt::Debug for CaptureGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureGuard")
            .field("active", &self.session.is_some())
            .finish()
    }
}

/// Reads frames from image files, one file per frame.
pub struct ImageCapture {
    pending: VecDeque<PathBuf>,
}

impl ImageCapture {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            pending: paths.into_iter().collect(),
        }
    }
}

impl CaptureSession for ImageCapture {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Frame>> {
        Box::pin(async move {
            let Some(path) = self.pending.pop_front() else {
                return Ok(Frame::Closed);
            };
            tracing::debug!(path = %path.display(), "reading frame");
            let decoded = tokio::task::spawn_blocking(move || qr_image::decode_file(&path))
                .await
                .context("Image decoding task failed")??;
            Ok(decoded.map_or(Frame::Empty, Frame::Decoded))
        })
    }

    fn release(&mut self) {
        self.pending.clear();
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::ScriptedCapture;
    use super::*;

    #[test]
    fn test_guard_releases_once_on_drop() {
        let (capture, releases) = ScriptedCapture::new(vec![]);
        let guard = CaptureGuard::new(Box::new(capture));
        drop(guard);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_release_does_not_double_release() {
        let (capture, releases) = ScriptedCapture::new(vec![]);
        CaptureGuard::new(Box::new(capture)).release();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_image_capture_reads_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let blank = dir.path().join("blank.png");
        image::GrayImage::from_pixel(40, 40, image::Luma([255]))
            .save(&blank)
            .unwrap();
        let code = dir.path().join("code.png");
        std::fs::write(&code, qr_image::render_png("https://foundee.example/qr/abc").unwrap())
            .unwrap();

        let mut capture = ImageCapture::new([blank, code]);
        assert_eq!(capture.next_frame().await.unwrap(), Frame::Empty);
        assert_eq!(
            capture.next_frame().await.unwrap(),
            Frame::Decoded("https://foundee.example/qr/abc".to_string())
        );
        assert_eq!(capture.next_frame().await.unwrap(), Frame::Closed);
    }

    #[tokio::test]
    async fn test_image_capture_missing_file_errors() {
        let mut capture = ImageCapture::new([PathBuf::from("/nonexistent/foundee.png")]);
        assert!(capture.next_frame().await.is_err());
    }
}
