use crate::{
    foundation::core::{Affine, BezPath, Color, Rect},
    render::image::RasterImage,
};

/// Raster canvas capability that draw operations execute against.
///
/// State pushes are scoped: every `push_*` must be matched by exactly one `pop`. Use
/// [`CanvasState`] so the pops also happen on early returns and unwinding.
pub trait Canvas {
    /// Compose `transform` onto the current transform.
    fn push_transform(&mut self, transform: Affine);

    /// Multiply subsequent drawing by `opacity`.
    fn push_opacity(&mut self, opacity: f32);

    /// Undo the most recent push.
    fn pop(&mut self);

    /// Fill `path` with a solid color.
    fn fill_path(&mut self, path: &BezPath, color: Color);

    /// Draw the `src` region of `image` into `dst` (user space), optionally multiplying every
    /// pixel by `tint`.
    fn draw_image(&mut self, image: &RasterImage, src: Rect, dst: Rect, tint: Option<Color>);
}

/// RAII scope over a canvas that pops everything it pushed when dropped.
pub struct CanvasState<'a> {
    canvas: &'a mut dyn Canvas,
    pushed: usize,
}

impl<'a> CanvasState<'a> {
    /// Scope with nothing pushed yet.
    pub fn new(canvas: &'a mut dyn Canvas) -> Self {
        Self { canvas, pushed: 0 }
    }

    /// Push a transform that is popped on drop.
    pub fn push_transform(&mut self, transform: Affine) {
        self.canvas.push_transform(transform);
        self.pushed += 1;
    }

    /// Push an opacity that is popped on drop.
    pub fn push_opacity(&mut self, opacity: f32) {
        self.canvas.push_opacity(opacity);
        self.pushed += 1;
    }

    /// The canvas, for drawing inside the scope.
    pub fn canvas(&mut self) -> &mut dyn Canvas {
        &mut *self.canvas
    }
}

impl Drop for CanvasState<'_> {
    fn drop(&mut self) {
        for _ in 0..self.pushed {
            self.canvas.pop();
        }
    }
}

/// One recorded draw call with the canvas state in effect at the time.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasCall {
    /// A [`Canvas::fill_path`] call.
    FillPath {
        /// Accumulated transform.
        transform: Affine,
        /// Accumulated opacity.
        opacity: f32,
        /// Fill color.
        color: Color,
        /// Path bounding box before the transform.
        bounds: Rect,
    },
    /// A [`Canvas::draw_image`] call.
    DrawImage {
        /// Accumulated transform.
        transform: Affine,
        /// Accumulated opacity.
        opacity: f32,
        /// Source region in image pixels.
        src: Rect,
        /// Destination in user space.
        dst: Rect,
        /// Channel multiplier.
        tint: Option<Color>,
        /// Pixel size of the drawn image.
        image_size: (u32, u32),
    },
}

#[derive(Clone, Copy, Debug)]
enum Saved {
    Transform(Affine),
    Opacity(f32),
}

/// Canvas that records calls instead of rasterizing. Useful for headless inspection.
#[derive(Debug)]
pub struct RecordingCanvas {
    transform: Affine,
    opacity: f32,
    stack: Vec<Saved>,
    calls: Vec<CanvasCall>,
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            opacity: 1.0,
            stack: Vec::new(),
            calls: Vec::new(),
        }
    }
}

impl RecordingCanvas {
    /// Empty recording at identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> &[CanvasCall] {
        &self.calls
    }

    /// Number of pushes not yet popped.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Canvas for RecordingCanvas {
    fn push_transform(&mut self, transform: Affine) {
        self.stack.push(Saved::Transform(self.transform));
        self.transform *= transform;
    }

    fn push_opacity(&mut self, opacity: f32) {
        self.stack.push(Saved::Opacity(self.opacity));
        self.opacity *= opacity;
    }

    fn pop(&mut self) {
        match self.stack.pop() {
            Some(Saved::Transform(t)) => self.transform = t,
            Some(Saved::Opacity(o)) => self.opacity = o,
            None => tracing::warn!("recording canvas pop without matching push"),
        }
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        use kurbo::Shape as _;

        self.calls.push(CanvasCall::FillPath {
            transform: self.transform,
            opacity: self.opacity,
            color,
            bounds: path.bounding_box(),
        });
    }

    fn draw_image(&mut self, image: &RasterImage, src: Rect, dst: Rect, tint: Option<Color>) {
        self.calls.push(CanvasCall::DrawImage {
            transform: self.transform,
            opacity: self.opacity,
            src,
            dst,
            tint,
            image_size: (image.width(), image.height()),
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
