use std::sync::Arc;

use crate::{
    foundation::core::{Color, Rect, Size},
    foundation::error::{FlurryError, FlurryResult},
    foundation::math::mul_div255_u8,
    resource::value::ResourceValue,
};

/// Immutable premultiplied RGBA8 raster shared between draw operations.
#[derive(Clone)]
pub struct RasterImage {
    pixmap: Arc<vello_cpu::Pixmap>,
}

impl RasterImage {
    /// Wrap a pixmap without copying.
    pub fn from_pixmap(pixmap: vello_cpu::Pixmap) -> Self {
        Self {
            pixmap: Arc::new(pixmap),
        }
    }

    /// Copy premultiplied RGBA8 rows. The length must be `width * height * 4`.
    pub fn from_premul_rgba8(width: u32, height: u32, rgba8_premul: &[u8]) -> FlurryResult<Self> {
        let w: u16 = width
            .try_into()
            .map_err(|_| FlurryError::evaluation("image width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| FlurryError::evaluation("image height exceeds u16"))?;
        if rgba8_premul.len() != width as usize * height as usize * 4 {
            return Err(FlurryError::evaluation("image byte length mismatch"));
        }

        let mut may_have_opacities = false;
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for px in rgba8_premul.chunks_exact(4) {
            let a = px[3];
            may_have_opacities |= a != 255;
            pixels.push(vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a,
            });
        }

        Ok(Self::from_pixmap(vello_cpu::Pixmap::from_parts_with_opacity(
            pixels,
            w,
            h,
            may_have_opacities,
        )))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        u32::from(self.pixmap.width())
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        u32::from(self.pixmap.height())
    }

    /// Pixel size as a kurbo size.
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width()), f64::from(self.height()))
    }

    /// Full image rect in pixel space.
    pub fn rect(&self) -> Rect {
        self.size().to_rect()
    }

    /// Raw premultiplied pixels.
    pub fn premul_rgba8(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    /// Pointer identity, not pixel equality.
    pub fn same_image(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixmap, &other.pixmap)
    }

    pub(crate) fn pixmap(&self) -> &Arc<vello_cpu::Pixmap> {
        &self.pixmap
    }

    /// Copy with every premultiplied pixel multiplied by `tint`.
    pub fn tinted(&self, tint: Color) -> Self {
        let [tr, tg, tb, ta] = tint.to_rgba8();
        let (tr, tg, tb, ta) = (
            u16::from(tr),
            u16::from(tg),
            u16::from(tb),
            u16::from(ta),
        );

        let mut may_have_opacities = false;
        let src = self.pixmap.data_as_u8_slice();
        let mut pixels = Vec::with_capacity(src.len() / 4);
        for px in src.chunks_exact(4) {
            // Channel multiply, then alpha multiply to keep the result premultiplied.
            let r = mul_div255_u8(u16::from(mul_div255_u8(u16::from(px[0]), tr)), ta);
            let g = mul_div255_u8(u16::from(mul_div255_u8(u16::from(px[1]), tg)), ta);
            let b = mul_div255_u8(u16::from(mul_div255_u8(u16::from(px[2]), tb)), ta);
            let a = mul_div255_u8(u16::from(px[3]), ta);
            may_have_opacities |= a != 255;
            pixels.push(vello_cpu::peniko::color::PremulRgba8 { r, g, b, a });
        }

        Self::from_pixmap(vello_cpu::Pixmap::from_parts_with_opacity(
            pixels,
            self.pixmap.width(),
            self.pixmap.height(),
            may_have_opacities,
        ))
    }
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl ResourceValue for RasterImage {
    fn same_value(&self, other: &Self) -> bool {
        self.same_image(other)
    }
}

/// Off-screen rendering of a subtree, placed at `bounds` in the space it was rendered from.
///
/// Owns its pixels until [`RenderTarget::dispose`]; touching the image afterwards is a lifetime
/// bug in the caller and panics.
#[derive(Debug)]
pub struct RenderTarget {
    image: Option<RasterImage>,
    bounds: Rect,
}

impl RenderTarget {
    /// Target holding `image` placed at `bounds`.
    pub fn new(image: RasterImage, bounds: Rect) -> Self {
        Self {
            image: Some(image),
            bounds,
        }
    }

    /// The pixels. Panics after dispose.
    pub fn image(&self) -> &RasterImage {
        match &self.image {
            Some(image) => image,
            None => panic!("render target used after dispose"),
        }
    }

    /// The pixels, or [`FlurryError::Disposed`].
    pub fn try_image(&self) -> FlurryResult<&RasterImage> {
        self.image
            .as_ref()
            .ok_or(FlurryError::Disposed("render target"))
    }

    /// Placement in the space the target was rendered from.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Pixel memory held, zero after dispose.
    pub fn byte_len(&self) -> usize {
        self.image
            .as_ref()
            .map(|i| i.width() as usize * i.height() as usize * 4)
            .unwrap_or(0)
    }

    /// Release the pixels. Idempotent.
    pub fn dispose(&mut self) {
        self.image = None;
    }

    /// Whether the pixels were released.
    pub fn is_disposed(&self) -> bool {
        self.image.is_none()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/image.rs"]
mod tests;
