//! Lazy, tact-driven screen renderer.

use std::sync::Arc;

use crate::display::{DisplayParameters, RenderingTact};
use crate::sink::PixelSink;

/// Frames per FLASH phase.
const FLASH_FRAME_COUNT: u64 = 16;

/// Turns ranges of frame tacts into pixels.
///
/// The device keeps its own cursor: each tact of a frame is rendered at most
/// once, however the caller slices the calls. Several devices may share one
/// [`DisplayParameters`]; they never share cursors.
#[derive(Debug, Clone)]
pub struct ScreenDevice {
    params: Arc<DisplayParameters>,
    /// First tact of the current frame not yet rendered.
    next_tact: u32,
    frame_count: u64,
    flash_phase: bool,
    frames_ready: u64,
}

impl ScreenDevice {
    #[must_use]
    pub fn new(params: Arc<DisplayParameters>) -> Self {
        Self {
            params,
            next_tact: 0,
            frame_count: 0,
            flash_phase: false,
            frames_ready: 0,
        }
    }

    #[must_use]
    pub fn params(&self) -> &DisplayParameters {
        &self.params
    }

    pub fn reset(&mut self) {
        self.next_tact = 0;
        self.frame_count = 0;
        self.flash_phase = false;
        self.frames_ready = 0;
    }

    /// Rewind the cursor to tact 0 and open a new frame on the sink.
    pub fn start_new_frame(&mut self, sink: &mut dyn PixelSink) {
        self.next_tact = 0;
        self.frame_count += 1;
        if self.frame_count.is_multiple_of(FLASH_FRAME_COUNT) {
            self.flash_phase = !self.flash_phase;
        }
        sink.begin_frame();
    }

    /// Render frame tacts `from..=to`.
    ///
    /// Tacts already rendered this frame and tacts past the end of the frame
    /// are skipped. `vram` reads screen memory without side effects.
    pub fn render_screen(
        &mut self,
        from: u32,
        to: u32,
        border: u8,
        vram: impl Fn(u16) -> u8,
        sink: &mut dyn PixelSink,
    ) {
        let from = from.max(self.next_tact);
        let to = to.min(self.params.frame_tacts() - 1);
        if from > to {
            return;
        }
        for tact in from..=to {
            match self.params.rendering_tact(tact) {
                RenderingTact::Hidden => {}
                RenderingTact::Border { x, y } => {
                    sink.emit_pixel(x, y, border);
                    sink.emit_pixel(x + 1, y, border);
                }
                RenderingTact::Display {
                    x,
                    y,
                    pixel_address,
                    attribute_address,
                    bit,
                } => {
                    let pixels = vram(pixel_address);
                    let (ink, paper) = self.decode_attribute(vram(attribute_address));
                    for (offset, mask) in [(0, 1u8 << bit), (1, 1u8 << (bit - 1))] {
                        let colour = if pixels & mask != 0 { ink } else { paper };
                        sink.emit_pixel(x + offset, y, colour);
                    }
                }
            }
        }
        self.next_tact = to + 1;
    }

    /// Set the number of frames opened so far, and the FLASH phase with it.
    pub fn restore_frame_count(&mut self, frame_count: u64) {
        self.frame_count = frame_count;
        self.flash_phase = (frame_count / FLASH_FRAME_COUNT) % 2 == 1;
    }

    /// Move the cursor so rendering continues after `last_rendered`.
    pub fn resume_after(&mut self, last_rendered: Option<u32>) {
        self.next_tact = last_rendered.map_or(0, |tact| tact + 1);
    }

    /// Tell the sink the frame may be displayed.
    pub fn sign_frame_ready(&mut self, sink: &mut dyn PixelSink) {
        self.frames_ready += 1;
        sink.end_frame();
    }

    /// Wait states for a contended access at frame-relative `tact`.
    #[must_use]
    pub fn contention_value(&self, tact: u64) -> u8 {
        self.params.contention_value(tact)
    }

    /// Last tact rendered in the current frame, if any.
    #[must_use]
    pub fn last_rendered_tact(&self) -> Option<u32> {
        self.next_tact.checked_sub(1)
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[must_use]
    pub fn frames_ready(&self) -> u64 {
        self.frames_ready
    }

    #[must_use]
    pub fn flash_phase(&self) -> bool {
        self.flash_phase
    }

    /// Ink and paper colour indices for an attribute byte (`FBPPPIII`).
    fn decode_attribute(&self, attribute: u8) -> (u8, u8) {
        let bright = (attribute & 0x40) >> 3;
        let ink = (attribute & 0x07) | bright;
        let paper = ((attribute >> 3) & 0x07) | bright;
        if attribute & 0x80 != 0 && self.flash_phase {
            (paper, ink)
        } else {
            (ink, paper)
        }
    }
}
