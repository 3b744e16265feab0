//! Configuration file and the per-run snapshot.
//!
//! [`SplashConfig`] mirrors the JSON file one to one. Every key is optional
//! and unknown keys are ignored. Integer keys written as floats are truncated
//! toward zero when loaded. [`SplashConfig::snapshot`] validates the
//! raw values into the immutable [`Snapshot`] a run works from.
//!
//! ```json
//! {
//!     "target_program": "cmd",
//!     "launch_interval": 1500,
//!     "exit_interval": 2000,
//!     "layout": { "height": 400, "width": 700, "offset_x": -10, "offset_y": -10, "force_topmost": true },
//!     "media": { "file": "video.mp4", "speed": 2.5, "reverse_color": false, "addictive_color": [0, 0, 0] },
//!     "cmd_preprocess": ""
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

use custom_splasher_core::logging::targets;
use custom_splasher_media::FrameStyle;

use crate::error::{ConfigCoercionError, ConfigError};

/// Where the configuration lives unless overridden on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "CustomSplasherConfig.json";

/// Integer keys and their JSON pointers.
const INTEGER_FIELDS: [(&str, &str); 6] = [
    ("launch_interval", "/launch_interval"),
    ("exit_interval", "/exit_interval"),
    ("layout.height", "/layout/height"),
    ("layout.width", "/layout/width"),
    ("layout.offset_x", "/layout/offset_x"),
    ("layout.offset_y", "/layout/offset_y"),
];

const CHANNELS: [&str; 3] = [
    "media.addictive_color[0]",
    "media.addictive_color[1]",
    "media.addictive_color[2]",
];

/// The raw configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplashConfig {
    /// Command line of the program to launch.
    pub target_program: String,
    /// Milliseconds from start until the target is launched.
    pub launch_interval: i64,
    /// Milliseconds from launch until the overlay exits.
    pub exit_interval: i64,
    pub layout: LayoutConfig,
    pub media: MediaConfig,
    /// Shell command run just before launching. Empty to skip.
    pub cmd_preprocess: String,
}

impl Default for SplashConfig {
    fn default() -> Self {
        Self {
            target_program: "cmd".to_string(),
            launch_interval: 1500,
            exit_interval: 2000,
            layout: LayoutConfig::default(),
            media: MediaConfig::default(),
            cmd_preprocess: String::new(),
        }
    }
}

/// Overlay size and placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub height: i64,
    pub width: i64,
    /// Horizontal shift from the screen centre.
    pub offset_x: i64,
    /// Vertical shift from the screen centre.
    pub offset_y: i64,
    /// Keep pulling the overlay to the foreground.
    pub force_topmost: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            height: 400,
            width: 700,
            offset_x: -10,
            offset_y: -10,
            force_topmost: true,
        }
    }
}

/// What to show and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub file: String,
    /// Playback speed multiplier for video.
    pub speed: f64,
    /// Invert every colour channel.
    pub reverse_color: bool,
    /// RGB added to every pixel. The key name is kept for file compatibility.
    pub addictive_color: Vec<i64>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            file: "video.mp4".to_string(),
            speed: 2.5,
            reverse_color: false,
            addictive_color: vec![0, 0, 0],
        }
    }
}

/// Validated overlay layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub offset_x: i64,
    pub offset_y: i64,
    pub force_topmost: bool,
}

/// Validated media settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSettings {
    pub file: PathBuf,
    pub speed: f64,
    pub invert: bool,
    pub tint: [u8; 3],
}

/// The configuration of one run, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub target_program: String,
    /// At least 1 ms.
    pub launch_delay: Duration,
    /// At least 1 ms.
    pub exit_delay: Duration,
    pub layout: Layout,
    pub media: MediaSettings,
    /// `None` when no pre-launch command is configured.
    pub pre_launch: Option<String>,
}

impl Snapshot {
    /// The frame styling this snapshot asks for.
    pub fn frame_style(&self) -> FrameStyle {
        FrameStyle::new(self.layout.width, self.layout.height)
            .with_invert(self.media.invert)
            .with_tint(self.media.tint)
    }
}

impl SplashConfig {
    /// Validate into a [`Snapshot`], logging every value that had to be clamped.
    pub fn snapshot(&self) -> Snapshot {
        let (snapshot, corrections) = self.snapshot_with_corrections();
        for correction in &corrections {
            tracing::warn!(target: targets::CONFIG, "{correction}");
        }
        snapshot
    }

    /// Validate into a [`Snapshot`], returning the corrections made.
    pub fn snapshot_with_corrections(&self) -> (Snapshot, Vec<ConfigCoercionError>) {
        let mut corrections = Vec::new();

        let launch_ms = clamp_field(
            "launch_interval",
            self.launch_interval,
            1,
            i64::MAX,
            &mut corrections,
        );
        let exit_ms = clamp_field(
            "exit_interval",
            self.exit_interval,
            1,
            i64::MAX,
            &mut corrections,
        );
        let width = clamp_field(
            "layout.width",
            self.layout.width,
            1,
            i64::from(u32::MAX),
            &mut corrections,
        );
        let height = clamp_field(
            "layout.height",
            self.layout.height,
            1,
            i64::from(u32::MAX),
            &mut corrections,
        );

        let mut tint = [0u8; 3];
        for (i, field) in CHANNELS.into_iter().enumerate() {
            let raw = self.media.addictive_color.get(i).copied().unwrap_or(0);
            tint[i] = clamp_field(field, raw, 0, 255, &mut corrections) as u8;
        }

        let pre_launch = Some(self.cmd_preprocess.trim())
            .filter(|cmd| !cmd.is_empty())
            .map(str::to_string);

        let snapshot = Snapshot {
            target_program: self.target_program.clone(),
            launch_delay: Duration::from_millis(launch_ms as u64),
            exit_delay: Duration::from_millis(exit_ms as u64),
            layout: Layout {
                width: width as u32,
                height: height as u32,
                offset_x: self.layout.offset_x,
                offset_y: self.layout.offset_y,
                force_topmost: self.layout.force_topmost,
            },
            media: MediaSettings {
                file: PathBuf::from(&self.media.file),
                speed: self.media.speed,
                invert: self.media.reverse_color,
                tint,
            },
            pre_launch,
        };

        (snapshot, corrections)
    }
}

/// Truncate float values of integer keys toward zero, in place.
fn truncate_float_fields(root: &mut Value) -> Vec<ConfigCoercionError> {
    let mut corrections = Vec::new();

    for (field, pointer) in INTEGER_FIELDS {
        if let Some(slot) = root.pointer_mut(pointer) {
            truncate_float(field, slot, &mut corrections);
        }
    }

    if let Some(Value::Array(channels)) = root.pointer_mut("/media/addictive_color") {
        for (i, slot) in channels.iter_mut().enumerate() {
            let field = CHANNELS.get(i).copied().unwrap_or("media.addictive_color");
            truncate_float(field, slot, &mut corrections);
        }
    }

    corrections
}

fn truncate_float(field: &'static str, slot: &mut Value, corrections: &mut Vec<ConfigCoercionError>) {
    if !slot.is_f64() {
        return;
    }
    let Some(raw) = slot.as_f64() else {
        return;
    };

    // Saturates at the i64 range.
    let truncated = raw.trunc() as i64;
    *slot = Value::from(truncated);
    corrections.push(ConfigCoercionError {
        field,
        value: format!("{raw:?}"),
        coerced: truncated.to_string(),
    });
}

/// Parse the file contents, accepting floats for integer keys.
fn parse_config(content: &str) -> serde_json::Result<(SplashConfig, Vec<ConfigCoercionError>)> {
    let mut root: Value = serde_json::from_str(content)?;
    let corrections = truncate_float_fields(&mut root);
    let config = serde_json::from_value(root)?;
    Ok((config, corrections))
}

fn clamp_field(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
    corrections: &mut Vec<ConfigCoercionError>,
) -> i64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        corrections.push(ConfigCoercionError {
            field,
            value: value.to_string(),
            coerced: clamped.to_string(),
        });
    }
    clamped
}

/// Reads and writes the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration.
    ///
    /// Never fails: a missing file or one that cannot be read or parsed
    /// yields the full default configuration.
    pub fn load(&self) -> SplashConfig {
        match self.try_load() {
            Ok(Some(config)) => {
                tracing::info!(target: targets::CONFIG, path = %self.path.display(), "config loaded");
                config
            }
            Ok(None) => {
                tracing::info!(
                    target: targets::CONFIG,
                    path = %self.path.display(),
                    "no config file, using defaults"
                );
                SplashConfig::default()
            }
            Err(e) => {
                tracing::warn!(target: targets::CONFIG, "failed to read config, using defaults: {e}");
                SplashConfig::default()
            }
        }
    }

    /// Load the configuration, reporting what went wrong.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn try_load(&self) -> Result<Option<SplashConfig>, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let (config, corrections) = parse_config(&content).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        for correction in &corrections {
            tracing::warn!(target: targets::CONFIG, "{correction}");
        }
        Ok(Some(config))
    }

    /// Write `config` as UTF-8 JSON indented by four spaces.
    pub fn save(&self, config: &SplashConfig) -> Result<(), ConfigError> {
        let json = to_json_pretty(config).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;

        fs::write(&self.path, json).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(target: targets::CONFIG, path = %self.path.display(), "config saved");
        Ok(())
    }
}

fn to_json_pretty(config: &SplashConfig) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    config.serialize(&mut serializer)?;
    Ok(out)
}
