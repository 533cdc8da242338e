//! PGM/PPM frame dump.
//!
//! Depth frames are written as 16-bit binary PGM, color frames as 8-bit binary PPM.
//! File names carry the pair index and the frame number so consecutive rounds
//! never overwrite each other.

use std::fs;
use std::path::{Path, PathBuf};

use contracts::{DepthMetadata, FrameHeader, ImageMetadata, SensorIndex, RGB24_CHANNELS};

/// Writes frames of one capture run into a directory
pub struct FrameDumper {
    dir: PathBuf,
    written: u64,
}

impl FrameDumper {
    /// Create the output directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of files written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Write a depth frame as `depth_<index>_<frame>.pgm`
    pub fn write_depth(
        &mut self,
        index: SensorIndex,
        frame: &DepthMetadata,
    ) -> std::io::Result<PathBuf> {
        let header = frame.header();
        check_len(header, frame.pixels().len(), 1)?;
        let path = self
            .dir
            .join(format!("depth_{}_{:06}.pgm", index, header.frame_number));

        image::save_buffer(
            &path,
            bytemuck::cast_slice(frame.pixels()),
            header.width,
            header.height,
            image::ColorType::L16,
        )
        .map_err(std::io::Error::other)?;

        self.written += 1;
        Ok(path)
    }

    /// Write a color frame as `color_<index>_<frame>.ppm`
    pub fn write_image(
        &mut self,
        index: SensorIndex,
        frame: &ImageMetadata,
    ) -> std::io::Result<PathBuf> {
        let header = frame.header();
        check_len(header, frame.pixels().len(), RGB24_CHANNELS)?;
        let path = self
            .dir
            .join(format!("color_{}_{:06}.ppm", index, header.frame_number));

        image::save_buffer(
            &path,
            frame.pixels(),
            header.width,
            header.height,
            image::ColorType::Rgb8,
        )
        .map_err(std::io::Error::other)?;

        self.written += 1;
        Ok(path)
    }
}

/// The encoder panics on a size mismatch, so reject it up front
fn check_len(header: &FrameHeader, len: usize, channels: usize) -> std::io::Result<()> {
    let expected = header.width as usize * header.height as usize * channels;
    if len == 0 || len != expected {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "frame {} holds {len} samples, expected {expected} for {}x{}",
                header.frame_number, header.width, header.height
            ),
        ));
    }
    Ok(())
}
