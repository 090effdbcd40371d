use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_VIDEO_FILE: &str = "BadApple.mp4";
pub const DEFAULT_FRAMES_DIR: &str = "badapple_frames";
pub const DEFAULT_OUTPUT_FILE: &str = "badapple_frames.bin";
pub const DEFAULT_WIDTH: u32 = 64;
pub const DEFAULT_HEIGHT: u32 = 48;
/// Bad Apple!! runs 6572 frames at 30 FPS.
pub const DEFAULT_FRAME_COUNT: u32 = 6572;
pub const DEFAULT_THRESHOLD: u8 = 128;

/// On-disk form of the configuration. Every field is optional so a file only
/// needs to name what it changes.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PackConfigFile {
    pub video: Option<PathBuf>,
    pub frames_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_count: Option<u32>,
    pub threshold: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackConfig {
    pub video: PathBuf,
    pub frames_dir: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub threshold: u8,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            video: PathBuf::from(DEFAULT_VIDEO_FILE),
            frames_dir: PathBuf::from(DEFAULT_FRAMES_DIR),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            frame_count: DEFAULT_FRAME_COUNT,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl PackConfig {
    /// Defaults, then the optional config file on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => read_config_file(path)?,
            None => PackConfigFile::default(),
        };
        Ok(Self::default().merged(file))
    }

    pub fn merged(self, file: PackConfigFile) -> Self {
        Self {
            video: file.video.unwrap_or(self.video),
            frames_dir: file.frames_dir.unwrap_or(self.frames_dir),
            output: file.output.unwrap_or(self.output),
            width: file.width.unwrap_or(self.width),
            height: file.height.unwrap_or(self.height),
            frame_count: file.frame_count.unwrap_or(self.frame_count),
            threshold: file.threshold.unwrap_or(self.threshold),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("frame dimensions must be non-zero, got {}x{}", self.width, self.height);
        }
        if self.frame_count == 0 {
            bail!("frame count must be at least 1");
        }
        Ok(())
    }

    /// Bytes per packed frame: one bit per pixel, rounded up to a whole byte.
    pub fn frame_size(&self) -> usize {
        packed_frame_size(self.width, self.height)
    }

    /// Exact size of the binary stream for the configured frame count.
    pub fn stream_size(&self) -> u64 {
        self.frame_size() as u64 * self.frame_count as u64
    }
}

pub fn packed_frame_size(width: u32, height: u32) -> usize {
    (width as usize * height as usize + 7) / 8
}

fn read_config_file(path: &Path) -> Result<PackConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}
