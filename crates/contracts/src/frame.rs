//! Output modes and per-sensor frame metadata buffers

use serde::{Deserialize, Serialize};

/// Map output mode applied to every generator at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMode {
    /// Horizontal resolution (pixels)
    pub width: u32,

    /// Vertical resolution (pixels)
    pub height: u32,

    /// Frames per second
    pub fps: u32,
}

impl OutputMode {
    /// VGA @ 30 fps, the mode every generator is configured with by default
    pub const VGA_30: Self = Self {
        width: 640,
        height: 480,
        fps: 30,
    };

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Nominal interval between frames in microseconds
    pub fn frame_interval_us(&self) -> u64 {
        if self.fps == 0 {
            0
        } else {
            1_000_000 / u64::from(self.fps)
        }
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::VGA_30
    }
}

/// Frame header of the most recently fetched frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    pub width: u32,
    pub height: u32,

    /// Driver timestamp (microseconds since generation started)
    pub timestamp_us: u64,

    /// Driver frame counter, 0 until the first frame arrives
    pub frame_number: u32,
}

/// Reusable per-sensor frame buffer
///
/// Allocated empty at generator creation and overwritten in place on every fetch;
/// no history is retained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameMetadata<P> {
    header: FrameHeader,
    pixels: Vec<P>,
}

/// Depth buffer, one `u16` per pixel
pub type DepthMetadata = FrameMetadata<u16>;

/// Color buffer, three `u8` (RGB) per pixel
pub type ImageMetadata = FrameMetadata<u8>;

/// Bytes per pixel of an RGB24 image buffer
pub const RGB24_CHANNELS: usize = 3;

impl<P: Copy + Default> FrameMetadata<P> {
    pub fn new() -> Self {
        Self {
            header: FrameHeader::default(),
            pixels: Vec::new(),
        }
    }

    #[inline]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    #[inline]
    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    #[inline]
    pub fn frame_number(&self) -> u32 {
        self.header.frame_number
    }

    /// True until a frame has been written into the buffer
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Overwrite the header and resize the pixel storage in place
    ///
    /// Returns the pixel slice for the caller to fill. The allocation is reused
    /// when the length is unchanged.
    pub fn overwrite(&mut self, header: FrameHeader, len: usize) -> &mut [P] {
        self.header = header;
        self.pixels.resize(len, P::default());
        &mut self.pixels
    }
}
