use crate::{
    foundation::core::{Affine, BezPath, Color, Point, Rect, rect_is_empty},
    foundation::error::{FlurryError, FlurryResult},
    graph::op::RenderOp,
    render::{
        FrameRGBA,
        canvas::{Canvas, CanvasState},
        image::{RasterImage, RenderTarget},
    },
};

/// Largest off-screen target edge the CPU rasterizer will allocate.
pub const MAX_TARGET_DIM: u32 = 4096;

#[derive(Clone, Copy, Debug)]
enum Saved {
    Transform(Affine),
    Opacity,
}

/// [`Canvas`] backed by a `vello_cpu` render context.
pub struct CpuCanvas {
    ctx: vello_cpu::RenderContext,
    width: u16,
    height: u16,
    transform: Affine,
    stack: Vec<Saved>,
}

impl CpuCanvas {
    /// Transparent canvas. Each edge must be in `1..=u16::MAX`.
    pub fn new(width: u32, height: u32) -> FlurryResult<Self> {
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| FlurryError::evaluation("canvas width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| FlurryError::evaluation("canvas height exceeds u16"))?;
        if width_u16 == 0 || height_u16 == 0 {
            return Err(FlurryError::evaluation("canvas must be at least 1x1"));
        }

        Ok(Self {
            ctx: vello_cpu::RenderContext::new(width_u16, height_u16),
            width: width_u16,
            height: height_u16,
            transform: Affine::IDENTITY,
            stack: Vec::new(),
        })
    }

    /// Fill the whole canvas with a straight-alpha background color.
    pub fn clear(&mut self, rgba: [u8; 4]) {
        let [r, g, b, a] = rgba;
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    fn into_pixmap(mut self) -> vello_cpu::Pixmap {
        // Close layers left open by an unbalanced caller before flushing.
        while let Some(saved) = self.stack.pop() {
            if let Saved::Opacity = saved {
                self.ctx.pop_layer();
            }
        }
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        pixmap
    }

    /// Rasterize into a premultiplied frame.
    pub fn finish(self) -> FrameRGBA {
        let (width, height) = (self.width(), self.height());
        let pixmap = self.into_pixmap();
        FrameRGBA {
            width,
            height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }

    /// Rasterize into a shareable image.
    pub fn finish_image(self) -> RasterImage {
        RasterImage::from_pixmap(self.into_pixmap())
    }
}

impl Canvas for CpuCanvas {
    fn push_transform(&mut self, transform: Affine) {
        self.stack.push(Saved::Transform(self.transform));
        self.transform *= transform;
    }

    fn push_opacity(&mut self, opacity: f32) {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.ctx.push_opacity_layer(opacity);
        self.stack.push(Saved::Opacity);
    }

    fn pop(&mut self) {
        match self.stack.pop() {
            Some(Saved::Transform(t)) => self.transform = t,
            Some(Saved::Opacity) => self.ctx.pop_layer(),
            None => tracing::warn!("cpu canvas pop without matching push"),
        }
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        let [r, g, b, a] = color.to_rgba8();
        if a == 0 {
            return;
        }
        self.ctx.set_transform(affine_to_cpu(self.transform));
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        self.ctx.fill_path(&bezpath_to_cpu(path));
    }

    fn draw_image(&mut self, image: &RasterImage, src: Rect, dst: Rect, tint: Option<Color>) {
        if rect_is_empty(src) || rect_is_empty(dst) {
            return;
        }
        let image = match tint {
            Some(t) if !t.is_white() => image.tinted(t),
            _ => image.clone(),
        };

        // Image pixels live in user space; map the src region onto dst.
        let place = self.transform
            * Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(dst.width() / src.width(), dst.height() / src.height())
            * Affine::translate((-src.x0, -src.y0));

        self.ctx.set_transform(affine_to_cpu(place));
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(image.pixmap().clone()),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        });
        self.ctx
            .fill_rect(&vello_cpu::kurbo::Rect::new(src.x0, src.y0, src.x1, src.y1));
    }
}

/// Render `ops` to a new frame of `width`×`height`, optionally cleared to `clear_rgba` first.
pub fn render_ops_to_frame(
    ops: &[RenderOp],
    width: u32,
    height: u32,
    clear_rgba: Option<[u8; 4]>,
) -> FlurryResult<FrameRGBA> {
    let mut canvas = CpuCanvas::new(width, height)?;
    if let Some(rgba) = clear_rgba {
        canvas.clear(rgba);
    }
    for op in ops {
        op.render(&mut canvas);
    }
    Ok(canvas.finish())
}

/// Rasterize `ops` into an off-screen target covering `bounds`, snapped outward to whole pixels.
pub fn rasterize_ops(ops: &[RenderOp], bounds: Rect, max_dim: u32) -> FlurryResult<RenderTarget> {
    if rect_is_empty(bounds) {
        return Err(FlurryError::render("cannot rasterize empty bounds"));
    }
    let x0 = bounds.x0.floor();
    let y0 = bounds.y0.floor();
    let w = (bounds.x1.ceil() - x0).max(1.0);
    let h = (bounds.y1.ceil() - y0).max(1.0);
    if w > f64::from(max_dim) || h > f64::from(max_dim) {
        return Err(FlurryError::render(format!(
            "render target too large: {w}x{h} (max {max_dim}x{max_dim})"
        )));
    }
    let (w, h) = (w as u32, h as u32);

    let mut canvas = CpuCanvas::new(w, h)?;
    {
        let mut state = CanvasState::new(&mut canvas);
        state.push_transform(Affine::translate((-x0, -y0)));
        for op in ops {
            op.render(state.canvas());
        }
    }
    let image = canvas.finish_image();
    Ok(RenderTarget::new(
        image,
        Rect::new(x0, y0, x0 + f64::from(w), y0 + f64::from(h)),
    ))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
