//! Decoded frames and the overlay's frame styling.
//!
//! A [`Frame`] is an owned RGB8 pixel buffer. [`FrameStyle`] turns a decoded
//! frame into what the overlay shows: resized to the overlay, optionally
//! colour-inverted, then brightened by an additive tint. Styling is a pure
//! function of the frame and the style, so it can be re-applied freely.

use image::RgbImage;
use image::imageops::{self, FilterType};

use custom_splasher_core::logging::targets;

/// A single decoded RGB frame.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap a decoded RGB image.
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from tightly packed RGB bytes.
    ///
    /// Returns `None` if `data` is not exactly `width * height * 3` bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::new)
    }

    /// A frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Packed RGB bytes, row-major.
    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// The underlying image buffer.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Consume the frame, returning the image buffer.
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Expand to opaque RGBA bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.expand(|[r, g, b]| [r, g, b, 255])
    }

    /// Expand to opaque BGRA bytes (the usual swapchain order on Windows).
    pub fn to_bgra(&self) -> Vec<u8> {
        self.expand(|[r, g, b]| [b, g, r, 255])
    }

    fn expand(&self, f: impl Fn([u8; 3]) -> [u8; 4]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.image.as_raw().len() / 3 * 4);
        for px in self.image.pixels() {
            out.extend_from_slice(&f(px.0));
        }
        out
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("dimensions", &format!("{}x{}", self.width(), self.height()))
            .field("data_size", &self.as_raw().len())
            .finish()
    }
}

/// How frames are styled before presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStyle {
    /// Output width in pixels (at least 1).
    pub width: u32,
    /// Output height in pixels (at least 1).
    pub height: u32,
    /// Replace every channel `c` with `255 - c`.
    pub invert: bool,
    /// Added to every pixel after inversion, saturating at 255.
    pub tint: [u8; 3],
}

impl FrameStyle {
    /// A style that only resizes to `width` x `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            invert: false,
            tint: [0, 0, 0],
        }
    }

    /// Enable or disable colour inversion.
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Set the additive tint.
    pub fn with_tint(mut self, tint: [u8; 3]) -> Self {
        self.tint = tint;
        self
    }

    /// Style a frame: resize, then invert, then add the tint.
    pub fn apply(&self, frame: &Frame) -> Frame {
        let mut image = if frame.width() == self.width && frame.height() == self.height {
            frame.image.clone()
        } else {
            imageops::resize(&frame.image, self.width, self.height, FilterType::Triangle)
        };

        if self.invert || self.tint != [0, 0, 0] {
            for px in image.pixels_mut() {
                for (channel, tint) in px.0.iter_mut().zip(self.tint) {
                    let value = if self.invert { 255 - *channel } else { *channel };
                    *channel = value.saturating_add(tint);
                }
            }
        }

        tracing::trace!(
            target: targets::FRAME,
            from = %format!("{}x{}", frame.width(), frame.height()),
            to = %format!("{}x{}", self.width, self.height),
            "frame styled"
        );

        Frame::new(image)
    }
}
