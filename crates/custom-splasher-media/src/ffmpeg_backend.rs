//! FFmpeg-backed video decoding (`ffmpeg` feature).

use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as Scaler, flag::Flags};
use ffmpeg::util::frame::video::Video;
use image::RgbImage;

use custom_splasher_core::logging::targets;

use crate::error::{MediaError, Result};
use crate::video::VideoDecoder;

/// Decodes the best video stream of a container file into RGB frames.
pub struct FfmpegDecoder {
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: Scaler,
    stream_index: usize,
    native_fps: f64,
    /// The demuxer is exhausted and the decoder has been flushed.
    draining: bool,
}

impl FfmpegDecoder {
    /// Open `path` and prepare its best video stream for decoding.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unreadable = |e: ffmpeg::Error| MediaError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        ffmpeg::init().map_err(unreadable)?;
        let input = ffmpeg::format::input(&path).map_err(unreadable)?;

        let (stream_index, native_fps, parameters) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or_else(|| unreadable(ffmpeg::Error::StreamNotFound))?;
            let rate = stream.avg_frame_rate();
            let native_fps = if rate.denominator() == 0 {
                0.0
            } else {
                f64::from(rate.numerator()) / f64::from(rate.denominator())
            };
            (stream.index(), native_fps, stream.parameters())
        };

        let decoder = ffmpeg::codec::context::Context::from_parameters(parameters)
            .and_then(|context| context.decoder().video())
            .map_err(unreadable)?;

        let scaler = Scaler::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            Flags::BILINEAR,
        )
        .map_err(unreadable)?;

        tracing::debug!(
            target: targets::MEDIA,
            width = decoder.width(),
            height = decoder.height(),
            native_fps,
            "ffmpeg video stream opened"
        );

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            native_fps,
            draining: false,
        })
    }

    fn convert(&mut self, decoded: &Video) -> Result<RgbImage> {
        let mut rgb = Video::empty();
        self.scaler
            .run(decoded, &mut rgb)
            .map_err(|e| MediaError::FrameDecode(e.to_string()))?;

        let (width, height) = (rgb.width(), rgb.height());
        let stride = rgb.stride(0);
        let row_bytes = width as usize * 3;
        let data = rgb.data(0);

        let mut packed = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            packed.extend_from_slice(&data[start..start + row_bytes]);
        }

        RgbImage::from_raw(width, height, packed)
            .ok_or_else(|| MediaError::FrameDecode("scaled frame has unexpected size".to_string()))
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn native_fps(&self) -> f64 {
        self.native_fps
    }

    fn decode_next(&mut self) -> Result<Option<RgbImage>> {
        let mut decoded = Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
            if self.draining {
                return Ok(None);
            }

            let packet = match self.input.packets().next() {
                Some((stream, packet)) if stream.index() == self.stream_index => Some(packet),
                Some(_) => continue,
                None => None,
            };

            match packet {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .map_err(|e| MediaError::FrameDecode(e.to_string()))?,
                None => {
                    self.draining = true;
                    self.decoder
                        .send_eof()
                        .map_err(|e| MediaError::FrameDecode(e.to_string()))?;
                }
            }
        }
    }
}
