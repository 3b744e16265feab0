//! Media sources: a still image or a video stream opened from a path.
//!
//! [`MediaSource::open`] classifies the file by extension and produces frames
//! on demand through the [`FrameSource`] trait. A still image yields the same
//! frame on every pull; a video advances one frame per pull until it reports
//! [`FramePull::Exhausted`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use custom_splasher_core::logging::targets;

use crate::error::{MediaError, Result};
use crate::frame::Frame;
use crate::video::{AnimatedImageDecoder, VideoDecoder};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "flv", "avi", "ogv", "gif"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "jfif", "bmp"];

/// How a path is treated, judged by its extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Video,
    Image,
    /// Tried as video first, then as an image.
    Unrecognized,
}

/// Classify a media path by its (case-insensitive) extension.
pub fn classify(path: impl AsRef<Path>) -> MediaClass {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some(e) if VIDEO_EXTENSIONS.contains(&e) => MediaClass::Video,
        Some(e) if IMAGE_EXTENSIONS.contains(&e) => MediaClass::Image,
        _ => MediaClass::Unrecognized,
    }
}

/// The kind of an opened media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Compute the effective frame interval `1000 / (native_fps * speed)` ms.
///
/// The result is rounded to the nearest millisecond (halves away from zero)
/// and never shorter than 1 ms. For 30 fps at speed 2.5 this is 13 ms.
///
/// # Errors
///
/// Returns [`MediaError::InvalidFrameRate`] when the product is zero,
/// negative or not finite.
pub fn frame_interval_for(native_fps: f64, speed: f64) -> Result<Duration> {
    let rate = native_fps * speed;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(MediaError::InvalidFrameRate { native_fps, speed });
    }

    let millis = (1000.0 / rate).round().max(1.0);
    Ok(Duration::from_millis(millis as u64))
}

/// The result of pulling a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePull {
    /// A decoded frame.
    Frame(Frame),
    /// The stream has no more frames. Not an error.
    Exhausted,
}

/// A producer of frames for the splash overlay.
pub trait FrameSource {
    /// Whether this source is a still image or a video.
    fn kind(&self) -> MediaKind;

    /// The effective interval between video frames. `None` for still images.
    fn frame_interval(&self) -> Option<Duration>;

    /// Pull the next frame.
    ///
    /// Errors are per-frame decode failures; the source stays usable.
    fn next_frame(&mut self) -> Result<FramePull>;

    /// Whether a video has run out of frames.
    fn is_exhausted(&self) -> bool;

    /// Drop the decoder and any decoded data. Idempotent.
    ///
    /// After release every pull returns [`FramePull::Exhausted`].
    fn release(&mut self);
}

enum Content {
    Image {
        frame: Option<Frame>,
    },
    Video {
        decoder: Option<Box<dyn VideoDecoder>>,
        interval: Duration,
        exhausted: bool,
    },
}

/// A still image or video opened from a file.
pub struct MediaSource {
    path: PathBuf,
    content: Content,
}

impl MediaSource {
    /// Open the media at `path`, playing video at `speed` times its native rate.
    ///
    /// # Errors
    ///
    /// - [`MediaError::NotFound`] if `path` does not exist
    /// - [`MediaError::Unreadable`] if no decoder accepts the file
    /// - [`MediaError::InvalidFrameRate`] if a video's rate times `speed` is unusable
    pub fn open(path: impl AsRef<Path>, speed: f64) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let source = match classify(path) {
            MediaClass::Video => Self::open_video(path, speed)?,
            MediaClass::Image => Self::open_image(path)?,
            MediaClass::Unrecognized => match Self::open_video(path, speed) {
                Ok(source) => source,
                Err(video_err) => {
                    tracing::debug!(
                        target: targets::MEDIA,
                        path = %path.display(),
                        "cannot play as video ({video_err}), trying as image"
                    );
                    match Self::open_image(path) {
                        Ok(source) => source,
                        Err(image_err) => {
                            tracing::debug!(target: targets::MEDIA, "not an image either: {image_err}");
                            return Err(match video_err {
                                MediaError::Unreadable { .. } => video_err,
                                _ => image_err,
                            });
                        }
                    }
                }
            },
        };

        Ok(source)
    }

    /// Wrap an already opened video decoder.
    pub fn from_decoder(
        path: impl Into<PathBuf>,
        decoder: Box<dyn VideoDecoder>,
        speed: f64,
    ) -> Result<Self> {
        let path = path.into();
        let interval = frame_interval_for(decoder.native_fps(), speed)?;

        tracing::info!(
            target: targets::MEDIA,
            path = %path.display(),
            interval_ms = interval.as_millis() as u64,
            "video detected, {} ms per frame",
            interval.as_millis()
        );

        Ok(Self {
            path,
            content: Content::Video {
                decoder: Some(decoder),
                interval,
                exhausted: false,
            },
        })
    }

    /// Wrap an already decoded still image.
    pub fn from_frame(path: impl Into<PathBuf>, frame: Frame) -> Self {
        let path = path.into();
        tracing::info!(
            target: targets::MEDIA,
            path = %path.display(),
            width = frame.width(),
            height = frame.height(),
            "image detected"
        );

        Self {
            path,
            content: Content::Image { frame: Some(frame) },
        }
    }

    fn open_video(path: &Path, speed: f64) -> Result<Self> {
        let decoder = open_video_decoder(path)?;
        Self::from_decoder(path, decoder, speed)
    }

    fn open_image(path: &Path) -> Result<Self> {
        let unreadable = |reason: String| MediaError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let image = image::ImageReader::open(path)
            .map_err(|e| unreadable(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| unreadable(e.to_string()))?
            .decode()
            .map_err(|e| unreadable(e.to_string()))?;

        Ok(Self::from_frame(path, Frame::new(image.into_rgb8())))
    }

    /// The path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`release`](FrameSource::release) has run.
    pub fn is_released(&self) -> bool {
        match &self.content {
            Content::Image { frame } => frame.is_none(),
            Content::Video { decoder, .. } => decoder.is_none(),
        }
    }
}

/// Pick a video decoder for `path`.
///
/// GIF animations are always playable. Other containers need the `ffmpeg`
/// feature; without it they are reported as unreadable.
fn open_video_decoder(path: &Path) -> Result<Box<dyn VideoDecoder>> {
    let is_gif = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"));

    match AnimatedImageDecoder::open(path) {
        Ok(decoder) => return Ok(Box::new(decoder)),
        Err(e) if is_gif => return Err(e),
        Err(_) => {}
    }

    #[cfg(feature = "ffmpeg")]
    {
        crate::ffmpeg_backend::FfmpegDecoder::open(path)
            .map(|decoder| Box::new(decoder) as Box<dyn VideoDecoder>)
    }

    #[cfg(not(feature = "ffmpeg"))]
    {
        Err(MediaError::Unreadable {
            path: path.to_path_buf(),
            reason: "video playback requires the `ffmpeg` feature".to_string(),
        })
    }
}

impl FrameSource for MediaSource {
    fn kind(&self) -> MediaKind {
        match self.content {
            Content::Image { .. } => MediaKind::Image,
            Content::Video { .. } => MediaKind::Video,
        }
    }

    fn frame_interval(&self) -> Option<Duration> {
        match self.content {
            Content::Image { .. } => None,
            Content::Video { interval, .. } => Some(interval),
        }
    }

    fn next_frame(&mut self) -> Result<FramePull> {
        match &mut self.content {
            Content::Image { frame } => Ok(frame
                .clone()
                .map_or(FramePull::Exhausted, FramePull::Frame)),
            Content::Video {
                decoder, exhausted, ..
            } => {
                let Some(active) = decoder.as_mut() else {
                    return Ok(FramePull::Exhausted);
                };
                if *exhausted {
                    return Ok(FramePull::Exhausted);
                }

                match active.decode_next()? {
                    Some(image) => Ok(FramePull::Frame(Frame::new(image))),
                    None => {
                        *exhausted = true;
                        tracing::debug!(
                            target: targets::MEDIA,
                            path = %self.path.display(),
                            "video exhausted"
                        );
                        Ok(FramePull::Exhausted)
                    }
                }
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        match self.content {
            Content::Image { .. } => false,
            Content::Video { exhausted, .. } => exhausted,
        }
    }

    fn release(&mut self) {
        let released = match &mut self.content {
            Content::Image { frame } => frame.take().is_some(),
            Content::Video { decoder, .. } => decoder.take().is_some(),
        };
        if released {
            tracing::debug!(target: targets::MEDIA, path = %self.path.display(), "media released");
        }
    }
}

impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSource")
            .field("path", &self.path)
            .field("kind", &self.kind())
            .field("frame_interval", &self.frame_interval())
            .field("exhausted", &self.is_exhausted())
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgb, RgbImage, Rgba, RgbaImage};

    fn write_png(path: &Path, rgb: [u8; 3]) {
        RgbImage::from_pixel(3, 2, Rgb(rgb)).save(path).unwrap();
    }

    fn write_gif(path: &Path, frames: usize) {
        let file = std::fs::File::create(path).unwrap();
        let mut encoder = GifEncoder::new(file);
        let frames = (0..frames).map(|i| {
            image::Frame::from_parts(
                RgbaImage::from_pixel(2, 2, Rgba([(i * 60) as u8, 0, 0, 255])),
                0,
                0,
                Delay::from_numer_denom_ms(100, 1),
            )
        });
        encoder.encode_frames(frames).unwrap();
    }

    /// Yields scripted decode results.
    struct ScriptedDecoder {
        fps: f64,
        script: std::vec::IntoIter<Result<Option<RgbImage>>>,
    }

    impl VideoDecoder for ScriptedDecoder {
        fn native_fps(&self) -> f64 {
            self.fps
        }

        fn decode_next(&mut self) -> Result<Option<RgbImage>> {
            self.script.next().unwrap_or(Ok(None))
        }
    }

    fn scripted(fps: f64, script: Vec<Result<Option<RgbImage>>>) -> Box<dyn VideoDecoder> {
        Box::new(ScriptedDecoder {
            fps,
            script: script.into_iter(),
        })
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("a.mp4"), MediaClass::Video);
        assert_eq!(classify("a.FLV"), MediaClass::Video);
        assert_eq!(classify("dir/a.ogv"), MediaClass::Video);
        assert_eq!(classify("a.gif"), MediaClass::Video);
        assert_eq!(classify("a.png"), MediaClass::Image);
        assert_eq!(classify("a.JPEG"), MediaClass::Image);
        assert_eq!(classify("a.jfif"), MediaClass::Image);
        assert_eq!(classify("a.bmp"), MediaClass::Image);
        assert_eq!(classify("a.webm"), MediaClass::Unrecognized);
        assert_eq!(classify("noext"), MediaClass::Unrecognized);
    }

    #[test]
    fn test_frame_interval_rounding() {
        assert_eq!(frame_interval_for(30.0, 2.5).unwrap(), Duration::from_millis(13));
        assert_eq!(frame_interval_for(25.0, 1.0).unwrap(), Duration::from_millis(40));
        // 2.5 ms rounds half away from zero.
        assert_eq!(frame_interval_for(400.0, 1.0).unwrap(), Duration::from_millis(3));
        // Sub-millisecond intervals clamp to 1 ms.
        assert_eq!(frame_interval_for(10_000.0, 1.0).unwrap(), Duration::from_millis(1));
    }

    #[test]
    fn test_frame_interval_rejects_bad_rates() {
        for (fps, speed) in [
            (0.0, 2.5),
            (30.0, 0.0),
            (30.0, -1.0),
            (f64::NAN, 1.0),
            (f64::INFINITY, 1.0),
        ] {
            assert!(
                matches!(
                    frame_interval_for(fps, speed),
                    Err(MediaError::InvalidFrameRate { .. })
                ),
                "{fps} * {speed}"
            );
        }
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = MediaSource::open(dir.path().join("missing.png"), 1.0).unwrap_err();
        assert!(matches!(err, MediaError::NotFound { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_image_pull_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        write_png(&path, [10, 20, 30]);

        let mut media = MediaSource::open(&path, 2.5).unwrap();
        assert_eq!(media.kind(), MediaKind::Image);
        assert_eq!(media.frame_interval(), None);

        let first = media.next_frame().unwrap();
        for _ in 0..5 {
            assert_eq!(media.next_frame().unwrap(), first);
        }
        let FramePull::Frame(frame) = first else {
            panic!("expected a frame");
        };
        assert_eq!(frame.as_raw()[..3], [10, 20, 30]);
        assert!(!media.is_exhausted());
    }

    #[test]
    fn test_gif_plays_then_stays_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        write_gif(&path, 3);

        let mut media = MediaSource::open(&path, 2.0).unwrap();
        assert_eq!(media.kind(), MediaKind::Video);
        // 10 fps at double speed.
        assert_eq!(media.frame_interval(), Some(Duration::from_millis(50)));

        for _ in 0..3 {
            assert!(matches!(media.next_frame().unwrap(), FramePull::Frame(_)));
        }
        assert_eq!(media.next_frame().unwrap(), FramePull::Exhausted);
        assert!(media.is_exhausted());
        assert_eq!(media.next_frame().unwrap(), FramePull::Exhausted);
    }

    #[test]
    fn test_gif_with_bad_speed_is_invalid_frame_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        write_gif(&path, 1);

        let err = MediaSource::open(&path, 0.0).unwrap_err();
        assert!(matches!(err, MediaError::InvalidFrameRate { .. }));
    }

    #[test]
    fn test_unrecognized_extension_falls_back_to_image() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("still.png");
        write_png(&png, [1, 2, 3]);
        let renamed = dir.path().join("still.splash");
        std::fs::rename(&png, &renamed).unwrap();

        let media = MediaSource::open(&renamed, 1.0).unwrap();
        assert_eq!(media.kind(), MediaKind::Image);
    }

    #[test]
    fn test_unrecognized_animation_with_bad_speed_opens_as_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splash.anim");
        write_gif(&path, 1);

        let mut media = MediaSource::open(&path, 0.0).unwrap();
        assert_eq!(media.kind(), MediaKind::Image);
        assert_eq!(media.frame_interval(), None);
        assert!(matches!(media.next_frame(), Ok(FramePull::Frame(_))));
    }

    #[test]
    fn test_unrecognized_garbage_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.bin");
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5, 6, 7]).unwrap();

        let err = MediaSource::open(&path, 1.0).unwrap_err();
        assert!(matches!(err, MediaError::Unreadable { .. }));
    }

    #[test]
    fn test_broken_container_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mp4");
        std::fs::write(&path, b"not a movie").unwrap();

        let err = MediaSource::open(&path, 1.0).unwrap_err();
        assert!(matches!(err, MediaError::Unreadable { .. }));
    }

    #[test]
    fn test_decode_error_is_per_frame() {
        let frame = RgbImage::from_pixel(1, 1, Rgb([9, 9, 9]));
        let decoder = scripted(
            30.0,
            vec![
                Ok(Some(frame.clone())),
                Err(MediaError::FrameDecode("corrupt packet".into())),
                Ok(Some(frame)),
            ],
        );
        let mut media = MediaSource::from_decoder("clip.mp4", decoder, 1.0).unwrap();
        assert_eq!(media.frame_interval(), Some(Duration::from_millis(33)));

        assert!(matches!(media.next_frame(), Ok(FramePull::Frame(_))));
        assert!(matches!(media.next_frame(), Err(MediaError::FrameDecode(_))));
        assert!(!media.is_exhausted());
        assert!(matches!(media.next_frame(), Ok(FramePull::Frame(_))));
        assert_eq!(media.next_frame().unwrap(), FramePull::Exhausted);
    }

    #[test]
    fn test_release_is_idempotent() {
        let decoder = scripted(30.0, vec![Ok(Some(RgbImage::new(1, 1)))]);
        let mut media = MediaSource::from_decoder("clip.mp4", decoder, 1.0).unwrap();

        media.release();
        media.release();
        assert!(media.is_released());
        assert_eq!(media.next_frame().unwrap(), FramePull::Exhausted);

        let mut still = MediaSource::from_frame("still.png", Frame::solid(1, 1, [0, 0, 0]));
        still.release();
        still.release();
        assert_eq!(still.next_frame().unwrap(), FramePull::Exhausted);
    }
}
