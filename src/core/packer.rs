use anyhow::{Context, Result};
use rayon::prelude::*;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::PackConfig;
use crate::core::extractor::frame_path;
use crate::core::processor::FrameProcessor;
use crate::decoder::load_frame;

const PROGRESS_INTERVAL: u32 = 100;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackSummary {
    pub frames_written: u32,
    /// 1-based indices that had no image and were written as blank frames.
    pub missing: Vec<u32>,
    pub bytes_written: u64,
}

/// Pack frames `1..=frame_count` from `frames_dir` into `out`.
///
/// Frames are decoded in parallel batches but always written in increasing
/// index order, so frame `i` lands at byte `(i - 1) * frame_size`.
pub fn pack_frames<W: Write>(config: &PackConfig, mut out: W) -> Result<PackSummary> {
    let processor = FrameProcessor::new(config.width, config.height, config.threshold);
    let frame_size = processor.frame_size();
    let batch_len = (num_cpus::get() as u32 * 4).max(1);
    let total = config.frame_count;

    let mut summary = PackSummary::default();
    let mut start = 1;
    while start <= total {
        let end = start.saturating_add(batch_len - 1).min(total);

        let batch: Vec<Option<Vec<u8>>> = (start..=end)
            .into_par_iter()
            .map(|index| pack_one(&processor, &config.frames_dir, index))
            .collect::<Result<_>>()?;

        for (index, packed) in (start..=end).zip(batch) {
            let bytes = match packed {
                Some(bytes) => bytes,
                None => {
                    log::warn!("Frame {} not found, writing blank frame", index);
                    summary.missing.push(index);
                    processor.blank_frame()
                }
            };
            debug_assert_eq!(bytes.len(), frame_size);
            out.write_all(&bytes)
                .with_context(|| format!("Failed to write frame {}", index))?;
            summary.frames_written += 1;
            summary.bytes_written += bytes.len() as u64;

            if index % PROGRESS_INTERVAL == 0 {
                log::info!("Processed {}/{} frames...", index, total);
            }
        }

        if end == total {
            break;
        }
        start = end + 1;
    }

    out.flush().context("Failed to flush packed frames")?;
    Ok(summary)
}

/// `None` when the frame image does not exist.
fn pack_one(processor: &FrameProcessor, frames_dir: &Path, index: u32) -> Result<Option<Vec<u8>>> {
    let path = frame_path(frames_dir, index);
    if !path.exists() {
        return Ok(None);
    }
    let frame = load_frame(&path, processor.width, processor.height)
        .with_context(|| format!("Failed to load frame {}", index))?;
    Ok(Some(processor.process_frame(&frame)))
}

/// Sibling path the stream is written to before it replaces the output.
fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(OsString::from).unwrap_or_default();
    name.push(".partial");
    output.with_file_name(name)
}

/// Pack into `config.output`, replacing any existing file only once every
/// frame has been written.
pub fn pack_to_file(config: &PackConfig) -> Result<PackSummary> {
    println!("Converting frames to binary format...");
    let partial = partial_path(&config.output);
    let file = File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;

    let summary = match pack_frames(config, BufWriter::new(file)) {
        Ok(summary) => summary,
        Err(e) => {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
    };
    fs::rename(&partial, &config.output)
        .with_context(|| format!("Failed to move {} into place", partial.display()))?;

    println!("Created binary file: {}", config.output.display());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn config_in(dir: &Path, width: u32, height: u32, frame_count: u32) -> PackConfig {
        PackConfig {
            video: dir.join("in.mp4"),
            frames_dir: dir.join("frames"),
            output: dir.join("out.bin"),
            width,
            height,
            frame_count,
            threshold: 128,
        }
    }

    fn write_frame(config: &PackConfig, index: u32, value: u8) -> PathBuf {
        std::fs::create_dir_all(&config.frames_dir).unwrap();
        let path = frame_path(&config.frames_dir, index);
        GrayImage::from_pixel(config.width, config.height, Luma([value]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn stream_size_is_fixed_regardless_of_missing_frames() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), 3, 3, 5);
        write_frame(&config, 2, 255);
        write_frame(&config, 4, 255);

        let summary = pack_to_file(&config).unwrap();
        let data = std::fs::read(&config.output).unwrap();

        assert_eq!(data.len() as u64, config.stream_size());
        assert_eq!(summary.bytes_written, config.stream_size());
        assert_eq!(summary.frames_written, 5);
        assert_eq!(summary.missing, vec![1, 3, 5]);
    }

    #[test]
    fn frames_land_at_affine_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), 3, 3, 4);
        write_frame(&config, 1, 0);
        write_frame(&config, 2, 255);
        write_frame(&config, 4, 200);

        let mut out = Vec::new();
        pack_frames(&config, &mut out).unwrap();

        let size = config.frame_size();
        let frame = |i: usize| &out[(i - 1) * size..i * size];
        assert_eq!(frame(1), &[0x00, 0x00]);
        assert_eq!(frame(2), &[0xFF, 0x80]);
        assert_eq!(frame(3), &[0x00, 0x00]);
        assert_eq!(frame(4), &[0xFF, 0x80]);
    }

    #[test]
    fn empty_directory_yields_all_zero_stream() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), 64, 48, 3);

        let mut out = Vec::new();
        let summary = pack_frames(&config, &mut out).unwrap();
        assert_eq!(out.len(), 3 * 384);
        assert!(out.iter().all(|&b| b == 0));
        assert_eq!(summary.missing, vec![1, 2, 3]);
    }

    #[test]
    fn order_holds_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let count = num_cpus::get() as u32 * 4 * 2 + 3;
        let config = config_in(dir.path(), 8, 1, count);
        for index in (1..=count).filter(|i| i % 3 == 0) {
            write_frame(&config, index, 255);
        }

        let mut out = Vec::new();
        pack_frames(&config, &mut out).unwrap();
        assert_eq!(out.len(), count as usize);
        for (i, byte) in out.iter().enumerate() {
            let expected = if (i + 1) % 3 == 0 { 0xFF } else { 0x00 };
            assert_eq!(*byte, expected, "frame {}", i + 1);
        }
    }

    #[test]
    fn corrupt_frame_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), 2, 2, 1);
        std::fs::create_dir_all(&config.frames_dir).unwrap();
        std::fs::write(frame_path(&config.frames_dir, 1), b"garbage").unwrap();

        assert!(pack_frames(&config, Vec::new()).is_err());
    }

    #[test]
    fn failed_pack_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), 2, 2, 2);
        std::fs::write(&config.output, [0x90u8, 0x00]).unwrap();
        write_frame(&config, 1, 255);
        std::fs::write(frame_path(&config.frames_dir, 2), b"garbage").unwrap();

        assert!(pack_to_file(&config).is_err());
        assert_eq!(std::fs::read(&config.output).unwrap(), vec![0x90, 0x00]);
        assert!(!partial_path(&config.output).exists());
    }

    #[test]
    fn failed_first_pack_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), 2, 2, 1);
        std::fs::create_dir_all(&config.frames_dir).unwrap();
        std::fs::write(frame_path(&config.frames_dir, 1), b"garbage").unwrap();

        assert!(pack_to_file(&config).is_err());
        assert!(!config.output.exists());
        assert!(!partial_path(&config.output).exists());
    }

    #[test]
    fn partial_path_is_a_sibling() {
        assert_eq!(
            partial_path(Path::new("out/frames.bin")),
            Path::new("out/frames.bin.partial")
        );
    }
}
