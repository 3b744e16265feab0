//! Video frame decoders.
//!
//! A [`VideoDecoder`] yields frames one at a time and reports the stream's
//! native frame rate. The always-available backend plays animated GIFs
//! through the `image` crate; container formats (MP4, FLV, AVI, OGV) need
//! the `ffmpeg` feature.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Delay, DynamicImage, ImageError, RgbImage};

use crate::error::{MediaError, Result};

/// Frame delay assumed for animations that declare none, in milliseconds.
const DEFAULT_FRAME_DELAY_MS: f64 = 100.0;

/// A source of sequential video frames.
pub trait VideoDecoder {
    /// The stream's native frame rate in frames per second.
    ///
    /// May be zero, negative or NaN for broken streams; callers validate it.
    fn native_fps(&self) -> f64;

    /// Decode the next frame.
    ///
    /// Returns `Ok(None)` at end of stream. Errors are per-frame failures;
    /// the decoder may still produce later frames.
    fn decode_next(&mut self) -> Result<Option<RgbImage>>;
}

/// Plays an animated GIF as a video stream.
///
/// The native rate is taken from the first frame's delay. Frames are
/// decoded lazily, one per [`decode_next`](VideoDecoder::decode_next) call.
pub struct AnimatedImageDecoder {
    frames: image::Frames<'static>,
    /// The first frame, decoded up front to learn the frame rate.
    pending: Option<RgbImage>,
    native_fps: f64,
}

impl AnimatedImageDecoder {
    /// Open an animated GIF.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Unreadable`] if the file cannot be read, is not
    /// a GIF, or contains no frames.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unreadable = |reason: String| MediaError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
        let decoder = GifDecoder::new(BufReader::new(file))
            .map_err(|e| unreadable(format!("not an animated image: {e}")))?;

        let mut frames = decoder.into_frames();
        let first = match frames.next() {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(unreadable(format!("failed to decode first frame: {e}"))),
            None => return Err(unreadable("animation contains no frames".to_string())),
        };

        let native_fps = 1000.0 / delay_millis(first.delay());

        Ok(Self {
            frames,
            pending: Some(to_rgb(first)),
            native_fps,
        })
    }
}

impl VideoDecoder for AnimatedImageDecoder {
    fn native_fps(&self) -> f64 {
        self.native_fps
    }

    fn decode_next(&mut self) -> Result<Option<RgbImage>> {
        if let Some(first) = self.pending.take() {
            return Ok(Some(first));
        }

        match self.frames.next() {
            None => Ok(None),
            Some(Ok(frame)) => Ok(Some(to_rgb(frame))),
            Some(Err(e)) if is_end_of_stream(&e) => Ok(None),
            Some(Err(e)) => Err(MediaError::FrameDecode(e.to_string())),
        }
    }
}

impl std::fmt::Debug for AnimatedImageDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimatedImageDecoder")
            .field("native_fps", &self.native_fps)
            .finish_non_exhaustive()
    }
}

fn delay_millis(delay: Delay) -> f64 {
    let (num, denom) = delay.numer_denom_ms();
    if num == 0 || denom == 0 {
        DEFAULT_FRAME_DELAY_MS
    } else {
        f64::from(num) / f64::from(denom)
    }
}

fn to_rgb(frame: image::Frame) -> RgbImage {
    DynamicImage::ImageRgba8(frame.into_buffer()).into_rgb8()
}

/// A truncated stream ends playback rather than failing a frame.
fn is_end_of_stream(err: &ImageError) -> bool {
    matches!(err, ImageError::IoError(e) if e.kind() == io::ErrorKind::UnexpectedEof)
}
