//! Scan flow: turns a camera frame or typed id into a viewer route.
//!
//! ```text
//! Idle --begin_capture--> Scanning --decoded--> Resolved
//!                            |   \--invalid/closed--> Idle (+ notice)
//!                            \--cancel--> Cancelled
//! Idle --submit_manual--> Resolved
//! ```
//!
//! The capture session is released before geolocation is attempted and on
//! every other exit from `Scanning`, including drop.

pub mod capture;
pub mod geo;

use std::time::Duration;

use anyhow::{Result, bail};
use url::Url;

pub use capture::{CaptureGuard, CaptureSession, Frame, ImageCapture};
pub use geo::{FixedLocation, Geolocator, HttpGeolocator, NoLocation, locate_best_effort};

use crate::notice::Notice;
use crate::routes::{Route, decode_segment};

pub const INVALID_CODE: &str = "Invalid QR code";
pub const NO_CODE_FOUND: &str = "No QR code found";

#[derive(Debug, Default)]
pub enum ScanState {
    /// Waiting for the user to start a capture or type an id.
    #[default]
    Idle,
    /// A capture session is open.
    Scanning(CaptureGuard),
    /// Navigate to the viewer.
    Resolved(Route),
    /// The user aborted a capture. Behaves like `Idle` for the next action.
    Cancelled,
}

impl ScanState {
    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanState::Scanning(_))
    }
}

#[derive(Debug, Default)]
pub struct ScanFlow {
    state: ScanState,
    notice: Option<Notice>,
}

impl ScanFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// The route to follow once resolved.
    pub fn resolved(&self) -> Option<&Route> {
        match &self.state {
            ScanState::Resolved(route) => Some(route),
            _ => None,
        }
    }

    /// Hands out the pending notice once.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Enters `Scanning` with an open capture session.
    ///
    /// # Errors
    /// Returns an error if a capture is already running.
    pub fn begin_capture(&mut self, session: Box<dyn CaptureSession>) -> Result<()> {
        if self.state.is_scanning() {
            bail!("a capture session is already active");
        }
        self.notice = None;
        self.state = ScanState::Scanning(CaptureGuard::new(session));
        Ok(())
    }

    /// Reads frames until one decodes or the source closes.
    ///
    /// Returns the viewer route when a valid code was read. Invalid payloads
    /// and exhausted sources return to `Idle` with a notice.
    ///
    /// # Errors
    /// Returns an error if not scanning or the capture source fails. The
    /// session is released and the flow is back in `Idle` either way.
    pub async fn capture(
        &mut self,
        geo: &dyn Geolocator,
        geo_timeout: Duration,
    ) -> Result<Option<Route>> {
        loop {
            let ScanState::Scanning(guard) = &mut self.state else {
                bail!("no capture session is active");
            };
            let frame = match guard.next_frame().await {
                Ok(frame) => frame,
                Err(e) => {
                    self.stop_capture();
                    self.notice = Some(Notice::error(format!("Capture failed: {e:#}")));
                    return Err(e);
                }
            };
            match frame {
                Frame::Empty => {}
                Frame::Closed => {
                    self.stop_capture();
                    self.notice = Some(Notice::info(NO_CODE_FOUND));
                    return Ok(None);
                }
                Frame::Decoded(payload) => {
                    return Ok(self.handle_payload(&payload, geo, geo_timeout).await);
                }
            }
        }
    }

    /// Processes a decoded payload as if it came from the camera.
    pub async fn handle_payload(
        &mut self,
        payload: &str,
        geo: &dyn Geolocator,
        geo_timeout: Duration,
    ) -> Option<Route> {
        self.stop_capture();

        let Some(code_id) = extract_code_id(payload) else {
            tracing::debug!(payload, "scanned payload is not a code URL");
            self.notice = Some(Notice::error(INVALID_CODE));
            return None;
        };

        let coords = locate_best_effort(geo, geo_timeout).await;
        let route = Route::viewer(code_id, coords);
        self.state = ScanState::Resolved(route.clone());
        Some(route)
    }

    /// Treats trimmed, non-empty input as a code id. No location is sent.
    pub fn submit_manual(&mut self, input: &str) -> Option<Route> {
        let code_id = input.trim();
        if code_id.is_empty() {
            return None;
        }
        self.stop_capture();
        let route = Route::viewer(code_id, None);
        self.state = ScanState::Resolved(route.clone());
        Some(route)
    }

    /// Aborts an active capture.
    pub fn cancel(&mut self) {
        if self.state.is_scanning() {
            self.state = ScanState::Cancelled;
            tracing::debug!("capture cancelled");
        }
    }

    fn stop_capture(&mut self) {
        if let ScanState::Scanning(guard) = std::mem::take(&mut self.state) {
            guard.release();
        }
    }
}

/// Extracts the code id from a scanned URL: the last non-empty path segment.
pub fn extract_code_id(payload: &str) -> Option<String> {
    let url = Url::parse(payload.trim()).ok()?;
    let id = url
        .path_segments()?
        .rfind(|segment| !segment.is_empty())
        .map(decode_segment)?;
    (!id.trim().is_empty()).then_some(id)
}
