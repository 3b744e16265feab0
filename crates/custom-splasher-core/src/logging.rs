//! Logging facilities for Custom Splasher.
//!
//! Custom Splasher uses the `tracing` crate for instrumentation. Every crate
//! logs against one of the targets below so a single `RUST_LOG` directive can
//! select a subsystem:
//!
//! ```text
//! RUST_LOG=info,custom_splasher_core::timer=trace
//! ```
//!
//! Installing a subscriber is left to the binary.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Timer registry target.
    pub const TIMER: &str = "custom_splasher_core::timer";
    /// Media opening and decoding target.
    pub const MEDIA: &str = "custom_splasher_media::source";
    /// Frame post-processing target.
    pub const FRAME: &str = "custom_splasher_media::frame";
    /// Configuration loading and coercion target.
    pub const CONFIG: &str = "custom_splasher::config";
    /// Splash lifecycle state machine target.
    pub const LIFECYCLE: &str = "custom_splasher::lifecycle";
    /// Process launching target.
    pub const LAUNCHER: &str = "custom_splasher::launcher";
    /// Overlay window and presentation target.
    pub const OVERLAY: &str = "custom_splasher::overlay";
}
