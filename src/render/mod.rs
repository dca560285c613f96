pub(crate) mod canvas;
pub(crate) mod cpu;
pub(crate) mod device;
pub(crate) mod image;
pub(crate) mod shader;

/// Rendered frame pixels, row-major RGBA8.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
    /// Whether color channels are multiplied by alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Convert to straight (unpremultiplied) alpha in place, for image encoders.
    pub fn unpremultiply(&mut self) {
        if !self.premultiplied {
            return;
        }
        for px in self.data.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        self.premultiplied = false;
    }
}
