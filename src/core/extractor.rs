use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use thiserror::Error;

use crate::config::PackConfig;

pub const FFMPEG: &str = "ffmpeg";

/// ffmpeg output pattern; indices start at 1 and are zero-padded to 4 digits.
pub const FRAME_PATTERN: &str = "frame_%04d.png";

/// Location ffmpeg writes frame `index` (1-based) to.
pub fn frame_path(frames_dir: &Path, index: u32) -> PathBuf {
    frames_dir.join(format!("frame_{:04}.png", index))
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("video file not found: {}", .0.display())]
    InputMissing(PathBuf),
    #[error("{0} not found; please install FFmpeg first")]
    ToolMissing(String),
    #[error("{program} failed ({status}): {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("failed to prepare frames directory {}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Runs ffmpeg to scale a video into numbered PNG frames.
pub struct FrameExtractor {
    program: String,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(FFMPEG)
    }
}

impl FrameExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    pub fn check_input(video: &Path) -> Result<(), ExtractError> {
        if video.is_file() {
            Ok(())
        } else {
            Err(ExtractError::InputMissing(video.to_path_buf()))
        }
    }

    /// Probe for the tool with `-version`; any spawn failure or non-zero exit
    /// counts as unavailable.
    pub fn check_available(&self) -> Result<(), ExtractError> {
        let mut command = FfmpegCommand::new_with_path(&self.program);
        command.arg("-version");
        command
            .as_inner_mut()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match command.spawn().and_then(|mut child| child.wait()) {
            Ok(status) if status.success() => Ok(()),
            _ => Err(ExtractError::ToolMissing(self.program.clone())),
        }
    }

    /// Paths are passed as `OsStr` so they reach ffmpeg unchanged.
    pub fn build_command(&self, config: &PackConfig) -> FfmpegCommand {
        let mut command = FfmpegCommand::new_with_path(&self.program);
        command
            .arg("-nostdin")
            .overwrite()
            .arg("-i")
            .arg(&config.video)
            .arg("-vf")
            .arg(format!("scale={}:{}", config.width, config.height))
            .arg("-frames:v")
            .arg(config.frame_count.to_string())
            .arg(config.frames_dir.join(FRAME_PATTERN));
        command.as_inner_mut().stdin(Stdio::null());
        command
    }

    /// Create the frames directory and run the extraction, blocking until the
    /// tool exits.
    pub fn extract(&self, config: &PackConfig) -> Result<(), ExtractError> {
        Self::check_input(&config.video)?;
        fs::create_dir_all(&config.frames_dir).map_err(|source| ExtractError::OutputDir {
            path: config.frames_dir.clone(),
            source,
        })?;

        let mut command = self.build_command(config);
        log::debug!("{:?}", command.as_inner());
        println!("Extracting frames from {}...", config.video.display());

        let mut child = command.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ExtractError::ToolMissing(self.program.clone()),
            _ => self.failed("spawn failed", e.to_string()),
        })?;

        // Drain the log so ffmpeg never blocks on a full stderr pipe.
        let mut errors = Vec::new();
        let events = child
            .iter()
            .map_err(|e| self.failed("no output", e.to_string()))?;
        for event in events {
            match event {
                FfmpegEvent::Error(line)
                | FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) => {
                    log::debug!("[ffmpeg] {}", line);
                    errors.push(line);
                }
                _ => {}
            }
        }

        let status = child
            .wait()
            .map_err(|e| self.failed("wait failed", e.to_string()))?;
        if !status.success() {
            return Err(self.failed(&status.to_string(), errors.join("\n")));
        }

        println!("Extracted frames to {}/", config.frames_dir.display());
        Ok(())
    }

    fn failed(&self, status: &str, stderr: String) -> ExtractError {
        ExtractError::ToolFailed {
            program: self.program.clone(),
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        }
    }
}
