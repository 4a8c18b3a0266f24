//! 48K frame geometry and the per-tact lookup tables derived from it.
//!
//! Frame tact 0 is the start of the INT pulse. Each raster line is 224
//! tacts and begins with its 128 display tacts:
//!
//! ```text
//! tact in line:   0 ........ 127 | 128 .. 143 | 144 ..... 207 | 208 .. 223
//!                 display (2 px) | right bdr  | retrace       | left bdr of next line
//! ```
//!
//! Raster lines 0-15 are never visible, 16-63 are top border, 64-255 carry
//! the 192 display lines, 256-303 are bottom border and 304-311 retrace.

/// T-states per raster line.
pub const LINE_TACTS: u32 = 224;
/// Raster lines per frame.
pub const RASTER_LINES: u32 = 312;
/// T-states per frame.
pub const FRAME_TACTS: u32 = LINE_TACTS * RASTER_LINES;
/// Frames per second.
pub const REFRESH_RATE: u32 = 50;

const FIRST_VISIBLE_LINE: u32 = 16;
const FIRST_DISPLAY_LINE: u32 = 64;
const DISPLAY_LINES: u32 = 192;
const VISIBLE_LINES: u32 = 288;
const DISPLAY_TACTS: u32 = 128;
const RIGHT_BORDER_END: u32 = 144;
const LEFT_BORDER_START: u32 = 208;

/// Border width in pixels on each side of the 256-pixel display.
pub const BORDER_PIXELS: u16 = 32;
/// Visible picture size.
pub const SCREEN_WIDTH: u16 = 320;
pub const SCREEN_HEIGHT: u16 = VISIBLE_LINES as u16;

/// First tact at which a memory access can be delayed: one tact before the
/// ULA fetches the first display byte.
pub const CONTENTION_START: u32 = FIRST_DISPLAY_LINE * LINE_TACTS - 1;
const CONTENTION_PATTERN: [u8; 8] = [6, 5, 4, 3, 2, 1, 0, 0];

/// What the beam does during one frame tact. Each tact covers two pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderingTact {
    /// Blanking or retrace.
    Hidden,
    Border {
        x: u16,
        y: u16,
    },
    Display {
        x: u16,
        y: u16,
        pixel_address: u16,
        attribute_address: u16,
        /// Bit of the pixel byte shown in the first of the two pixels.
        bit: u8,
    },
}

/// Immutable frame timing shared by the screen devices and the bus.
#[derive(Debug, Clone)]
pub struct DisplayParameters {
    contention: Box<[u8]>,
    rendering: Box<[RenderingTact]>,
}

impl DisplayParameters {
    /// Standard 48K PAL timing.
    #[must_use]
    pub fn zx_spectrum_48() -> Self {
        let contention = (0..FRAME_TACTS).map(contention_at).collect();
        let rendering = (0..FRAME_TACTS).map(rendering_at).collect();
        Self {
            contention,
            rendering,
        }
    }

    #[must_use]
    pub fn frame_tacts(&self) -> u32 {
        FRAME_TACTS
    }

    #[must_use]
    pub fn refresh_rate(&self) -> u32 {
        REFRESH_RATE
    }

    #[must_use]
    pub fn screen_width(&self) -> u16 {
        SCREEN_WIDTH
    }

    #[must_use]
    pub fn screen_height(&self) -> u16 {
        SCREEN_HEIGHT
    }

    /// Wait states for a contended access at frame-relative `tact`.
    ///
    /// Only depends on `tact % frame_tacts`.
    #[must_use]
    pub fn contention_value(&self, tact: u64) -> u8 {
        self.contention[(tact % u64::from(FRAME_TACTS)) as usize]
    }

    /// Beam activity at `tact`, which must be inside the frame.
    #[must_use]
    pub fn rendering_tact(&self, tact: u32) -> RenderingTact {
        self.rendering
            .get(tact as usize)
            .copied()
            .unwrap_or(RenderingTact::Hidden)
    }

    /// Addresses the ULA shares with the CPU.
    #[must_use]
    pub const fn is_contended_address(address: u16) -> bool {
        address & 0xC000 == 0x4000
    }
}

impl Default for DisplayParameters {
    fn default() -> Self {
        Self::zx_spectrum_48()
    }
}

fn contention_at(tact: u32) -> u8 {
    if tact < CONTENTION_START {
        return 0;
    }
    let offset = tact - CONTENTION_START;
    let line = offset / LINE_TACTS;
    let column = offset % LINE_TACTS;
    if line < DISPLAY_LINES && column < DISPLAY_TACTS {
        CONTENTION_PATTERN[(column % 8) as usize]
    } else {
        0
    }
}

fn rendering_at(tact: u32) -> RenderingTact {
    let line = tact / LINE_TACTS;
    let column = tact % LINE_TACTS;
    let (line, x) = if column < DISPLAY_TACTS {
        (line, BORDER_PIXELS as u32 + column * 2)
    } else if column < RIGHT_BORDER_END {
        (line, BORDER_PIXELS as u32 + 256 + (column - DISPLAY_TACTS) * 2)
    } else if column >= LEFT_BORDER_START {
        // Drawn at the end of the previous raster line.
        (line + 1, (column - LEFT_BORDER_START) * 2)
    } else {
        return RenderingTact::Hidden;
    };
    if !(FIRST_VISIBLE_LINE..FIRST_VISIBLE_LINE + VISIBLE_LINES).contains(&line) {
        return RenderingTact::Hidden;
    }
    let y = (line - FIRST_VISIBLE_LINE) as u16;
    let x = x as u16;
    let in_display_rows = (FIRST_DISPLAY_LINE..FIRST_DISPLAY_LINE + DISPLAY_LINES).contains(&line);
    if !in_display_rows || column >= DISPLAY_TACTS {
        return RenderingTact::Border { x, y };
    }
    let screen_y = (line - FIRST_DISPLAY_LINE) as u16;
    let char_col = (column / 4) as u16;
    // Bitmap: 010Y7Y6 Y2Y1Y0 Y5Y4Y3 X4..X0. Attributes: 010110Y7Y6 Y5Y4Y3 X4..X0.
    let pixel_address = 0x4000
        | ((screen_y & 0xC0) << 5)
        | ((screen_y & 0x07) << 8)
        | ((screen_y & 0x38) << 2)
        | char_col;
    let attribute_address = 0x5800 | ((screen_y >> 3) << 5) | char_col;
    RenderingTact::Display {
        x,
        y,
        pixel_address,
        attribute_address,
        bit: 7 - 2 * (column % 4) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn frame_is_69888_tacts() {
        assert_eq!(DisplayParameters::zx_spectrum_48().frame_tacts(), 69_888);
    }

    #[test]
    fn contention_pattern_starts_at_14335() {
        let params = DisplayParameters::zx_spectrum_48();
        let values: Vec<u8> = (14_334..14_344).map(|t| params.contention_value(t)).collect();
        assert_eq!(values, [0, 6, 5, 4, 3, 2, 1, 0, 0, 6]);
    }

    #[test]
    fn no_contention_in_border_or_retrace() {
        let params = DisplayParameters::zx_spectrum_48();
        // Right border of the first display line.
        assert_eq!(params.contention_value(u64::from(CONTENTION_START + 130)), 0);
        // Just past the last contended line.
        assert_eq!(
            params.contention_value(u64::from(CONTENTION_START + 192 * LINE_TACTS)),
            0
        );
        assert_eq!(params.contention_value(0), 0);
    }

    #[test]
    fn contended_range_is_second_16k() {
        assert!(!DisplayParameters::is_contended_address(0x3FFF));
        assert!(DisplayParameters::is_contended_address(0x4000));
        assert!(DisplayParameters::is_contended_address(0x7FFF));
        assert!(!DisplayParameters::is_contended_address(0x8000));
    }

    #[test]
    fn first_display_tact_maps_to_top_left_of_bitmap() {
        let params = DisplayParameters::zx_spectrum_48();
        assert_eq!(
            params.rendering_tact(64 * LINE_TACTS),
            RenderingTact::Display {
                x: 32,
                y: 48,
                pixel_address: 0x4000,
                attribute_address: 0x5800,
                bit: 7,
            }
        );
    }

    #[test]
    fn second_character_row_addresses() {
        let params = DisplayParameters::zx_spectrum_48();
        // Display line 8, byte column 1, second pixel pair.
        match params.rendering_tact(72 * LINE_TACTS + 5) {
            RenderingTact::Display {
                pixel_address,
                attribute_address,
                bit,
                ..
            } => {
                assert_eq!(pixel_address, 0x4021);
                assert_eq!(attribute_address, 0x5821);
                assert_eq!(bit, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn left_border_belongs_to_next_line() {
        let params = DisplayParameters::zx_spectrum_48();
        assert_eq!(
            params.rendering_tact(15 * LINE_TACTS + LEFT_BORDER_START),
            RenderingTact::Border { x: 0, y: 0 }
        );
        assert_eq!(params.rendering_tact(15 * LINE_TACTS), RenderingTact::Hidden);
        assert_eq!(params.rendering_tact(16 * LINE_TACTS + 150), RenderingTact::Hidden);
    }

    #[test]
    fn every_visible_pixel_pair_appears_once() {
        let params = DisplayParameters::zx_spectrum_48();
        let mut seen = vec![0u8; usize::from(SCREEN_WIDTH) * usize::from(SCREEN_HEIGHT)];
        for tact in 0..FRAME_TACTS {
            let (x, y) = match params.rendering_tact(tact) {
                RenderingTact::Hidden => continue,
                RenderingTact::Border { x, y } | RenderingTact::Display { x, y, .. } => (x, y),
            };
            for dx in 0..2 {
                seen[usize::from(y) * usize::from(SCREEN_WIDTH) + usize::from(x + dx)] += 1;
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    quickcheck! {
        fn contention_is_periodic_in_frame(tact: u64) -> bool {
            let params = DisplayParameters::zx_spectrum_48();
            let frame = u64::from(params.frame_tacts());
            params.contention_value(tact) == params.contention_value(tact % frame)
                && params.contention_value(tact % frame) == params.contention_value(tact % frame + frame)
        }
    }
}
