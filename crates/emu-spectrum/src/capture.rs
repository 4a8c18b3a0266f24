//! Headless capture: PNG screenshots of a frame buffer.

use std::error::Error;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use emu_core::CancellationToken;
use sinclair_ula::FrameBuffer;

use crate::debug::DebugStepMode;
use crate::spectrum::{EmulationMode, Spectrum};

/// ARGB32 pixels as RGBA bytes, alpha forced opaque.
#[must_use]
pub fn rgba(frame: &FrameBuffer) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frame.pixels().len() * 4);
    for &pixel in frame.pixels() {
        bytes.push((pixel >> 16) as u8);
        bytes.push((pixel >> 8) as u8);
        bytes.push(pixel as u8);
        bytes.push(0xFF);
    }
    bytes
}

/// Encode the frame buffer as an 8-bit RGBA PNG.
pub fn write_png<W: Write>(frame: &FrameBuffer, out: W) -> Result<(), Box<dyn Error>> {
    let mut encoder = png::Encoder::new(out, u32::from(frame.width()), u32::from(frame.height()));
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&rgba(frame))?;
    Ok(())
}

/// Save the frame buffer as a PNG file.
pub fn save_screenshot(frame: &FrameBuffer, path: &Path) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    write_png(frame, BufWriter::new(file))
}

/// Run `num_frames` frames, saving each as `dir/000001.png` and so on.
///
/// Stops early, without error, if `cancel` fires.
pub fn save_frame_sequence(
    spectrum: &mut Spectrum<FrameBuffer>,
    dir: &Path,
    num_frames: u32,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;

    for i in 1..=num_frames {
        if !spectrum.execute_cycle(cancel, EmulationMode::UntilFrameEnds, DebugStepMode::default())
        {
            log::info!("Frame capture cancelled after {} frames", i - 1);
            break;
        }
        save_screenshot(spectrum.pixel_sink(), &dir.join(format!("{i:06}.png")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sinclair_ula::PixelSink;

    #[test]
    fn rgba_is_opaque_red_green_blue() {
        let mut frame = FrameBuffer::new(2, 1);
        // Bright red.
        frame.emit_pixel(1, 0, 10);
        let bytes = rgba(&frame);
        assert_eq!(&bytes[..4], &[0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(&bytes[4..], &[0xFF, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn png_has_frame_dimensions() {
        let frame = FrameBuffer::new(320, 288);
        let mut encoded = Vec::new();
        write_png(&frame, &mut encoded).expect("encode");
        assert_eq!(&encoded[1..4], b"PNG");

        let reader = png::Decoder::new(&encoded[..]).read_info().expect("decode");
        assert_eq!(reader.info().width, 320);
        assert_eq!(reader.info().height, 288);
    }
}
