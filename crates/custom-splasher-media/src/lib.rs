//! Media module for Custom Splasher.
//!
//! This crate turns a media file into a stream of frames for the splash overlay:
//!
//! - **Media sources**: open a still image or a video by path and pull frames on demand
//! - **Frame styling**: resize, invert and tint frames for the overlay
//!
//! # Opening Media
//!
//! ```ignore
//! use custom_splasher_media::{FramePull, MediaSource};
//!
//! let mut media = MediaSource::open("intro.gif", 2.5)?;
//! println!("{:?} frame every {:?}", media.kind(), media.frame_interval());
//!
//! while let FramePull::Frame(frame) = media.next_frame()? {
//!     println!("{}x{}", frame.width(), frame.height());
//! }
//! ```
//!
//! ## Supported Formats
//!
//! - Still images: PNG, JPEG, BMP
//! - Animated GIF, played as video
//! - MP4, FLV, AVI, OGV with the `ffmpeg` feature

mod error;
#[cfg(feature = "ffmpeg")]
mod ffmpeg_backend;
pub mod frame;
pub mod source;
pub mod video;

pub use error::{MediaError, Result};

// Re-export commonly used types at the crate root
pub use frame::{Frame, FrameStyle};
pub use source::{FramePull, FrameSource, MediaClass, MediaKind, MediaSource, classify, frame_interval_for};
pub use video::{AnimatedImageDecoder, VideoDecoder};

#[cfg(feature = "ffmpeg")]
pub use ffmpeg_backend::FfmpegDecoder;
