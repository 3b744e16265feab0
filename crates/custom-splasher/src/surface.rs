//! The surface the splash is shown on.

use custom_splasher_core::logging::targets;
use custom_splasher_media::Frame;

pub use crate::error::SurfaceError;
use crate::geometry::OverlayGeometry;

/// A borderless, always-on-top surface that displays frames.
pub trait Surface {
    /// Size of the screen the overlay will appear on, if known.
    fn screen_size(&self) -> Option<(u32, u32)>;

    /// Make the surface borderless and always on top, titled `title`, at `geometry`.
    fn apply_style(&mut self, geometry: &OverlayGeometry, title: &str) -> Result<(), SurfaceError>;

    /// Display `frame`. The frame is already sized to the overlay.
    fn present(&mut self, frame: &Frame) -> Result<(), SurfaceError>;

    /// Bring the overlay to the foreground if it is not there already.
    fn request_foreground(&mut self) -> Result<(), SurfaceError>;

    /// Hide and destroy the surface. Must not fail.
    fn close(&mut self);
}

/// The overlay title for process `pid`.
pub fn window_title(pid: u32) -> String {
    format!("Custom Splasher (PID {pid})")
}

/// A surface that shows nothing, for headless runs.
#[derive(Debug, Default)]
pub struct NullSurface {
    geometry: Option<OverlayGeometry>,
    frames: u64,
    closed: bool,
}

impl NullSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The geometry last applied.
    pub fn geometry(&self) -> Option<OverlayGeometry> {
        self.geometry
    }

    /// Number of frames presented.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Surface for NullSurface {
    fn screen_size(&self) -> Option<(u32, u32)> {
        None
    }

    fn apply_style(&mut self, geometry: &OverlayGeometry, title: &str) -> Result<(), SurfaceError> {
        tracing::debug!(target: targets::OVERLAY, ?geometry, title, "headless overlay styled");
        self.geometry = Some(*geometry);
        Ok(())
    }

    fn present(&mut self, _frame: &Frame) -> Result<(), SurfaceError> {
        if self.closed {
            return Err(SurfaceError::Closed);
        }
        self.frames += 1;
        Ok(())
    }

    fn request_foreground(&mut self) -> Result<(), SurfaceError> {
        if self.closed {
            return Err(SurfaceError::Closed);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
