//! Pixel output.

use crate::palette::PALETTE;

/// Receives the pixels produced by a screen device.
///
/// Colours are 4-bit indices: `bright << 3 | colour`.
pub trait PixelSink {
    fn begin_frame(&mut self);

    fn emit_pixel(&mut self, x: u16, y: u16, colour: u8);

    /// The frame is complete and may be displayed.
    fn end_frame(&mut self);
}

/// ARGB32 frame buffer.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    pixels: Vec<u32>,
    frames_completed: u64,
}

impl FrameBuffer {
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![PALETTE[0]; usize::from(width) * usize::from(height)],
            frames_completed: 0,
        }
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[must_use]
    pub fn pixel(&self, x: u16, y: u16) -> Option<u32> {
        if x >= self.width {
            return None;
        }
        self.pixels
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }

    /// Frames signalled ready since construction.
    #[must_use]
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }
}

impl PixelSink for FrameBuffer {
    fn begin_frame(&mut self) {}

    fn emit_pixel(&mut self, x: u16, y: u16, colour: u8) {
        if x < self.width && y < self.height {
            let index = usize::from(y) * usize::from(self.width) + usize::from(x);
            self.pixels[index] = PALETTE[usize::from(colour & 0x0F)];
        }
    }

    fn end_frame(&mut self) {
        self.frames_completed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_map_through_palette() {
        let mut fb = FrameBuffer::new(4, 2);
        fb.emit_pixel(3, 1, 10);
        assert_eq!(fb.pixel(3, 1), Some(0xFFFF_0000));
        assert_eq!(fb.pixel(0, 0), Some(0xFF00_0000));
        assert_eq!(fb.pixel(4, 0), None);
    }

    #[test]
    fn out_of_range_pixels_are_dropped() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.emit_pixel(5, 5, 7);
        assert!(fb.pixels().iter().all(|&p| p == PALETTE[0]));
        fb.end_frame();
        assert_eq!(fb.frames_completed(), 1);
    }
}
