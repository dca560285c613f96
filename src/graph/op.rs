use std::rc::Rc;

use crate::{
    foundation::core::{Affine, BezPath, Color, Point, Rect, union_bounds},
    render::{
        canvas::{Canvas, CanvasState},
        image::{RasterImage, RenderTarget},
    },
};

/// Draw callback executed against the canvas in the op's local space.
pub type DrawFn = Rc<dyn Fn(&mut dyn Canvas)>;

/// Hit predicate evaluated on a point in the op's local space.
pub type HitTestFn = Rc<dyn Fn(Point) -> bool>;

/// What a [`RenderOp`] draws, in its local space.
#[derive(Clone)]
pub enum DrawCommand {
    /// Solid path fill.
    FillPath {
        /// Outline to fill.
        path: BezPath,
        /// Fill color.
        color: Color,
    },
    /// The `src` region of `image` scaled into `dst`.
    Image {
        /// Premultiplied source pixels.
        image: RasterImage,
        /// Region of `image`, in pixels.
        src: Rect,
        /// Placement in local space.
        dst: Rect,
        /// Per-channel multiplier applied while compositing.
        tint: Option<Color>,
    },
    /// Arbitrary drawing code.
    Custom(DrawFn),
}

/// One drawing operation produced by a render node for the current frame.
#[derive(Clone)]
pub struct RenderOp {
    /// What to draw.
    pub command: DrawCommand,
    /// Local to parent space.
    pub transform: Affine,
    /// Group opacity, multiplied down the tree.
    pub opacity: f32,
    /// Bounds of the command before `transform`.
    pub local_bounds: Rect,
    hit: Option<HitTestFn>,
}

impl RenderOp {
    fn with_command(command: DrawCommand, local_bounds: Rect) -> Self {
        Self {
            command,
            transform: Affine::IDENTITY,
            opacity: 1.0,
            local_bounds,
            hit: None,
        }
    }

    /// Fill `path` with `color`; bounds are the path's bounding box.
    pub fn fill_path(path: BezPath, color: Color) -> Self {
        use kurbo::Shape as _;

        let bounds = path.bounding_box();
        Self::with_command(DrawCommand::FillPath { path, color }, bounds)
    }

    /// Draw an image region into `dst`, optionally tinted.
    pub fn image(image: RasterImage, src: Rect, dst: Rect, tint: Option<Color>) -> Self {
        Self::with_command(
            DrawCommand::Image {
                image,
                src,
                dst,
                tint,
            },
            dst,
        )
    }

    /// Replay a render target at the place it was rendered from.
    pub fn render_target(target: &RenderTarget) -> Self {
        let image = target.image().clone();
        let src = image.rect();
        Self::image(image, src, target.bounds(), None)
    }

    /// Run `draw` with `local_bounds` reported for culling and caching.
    pub fn custom(draw: DrawFn, local_bounds: Rect) -> Self {
        Self::with_command(DrawCommand::Custom(draw), local_bounds)
    }

    /// Replace the bounds check with a precise hit predicate.
    pub fn with_hit_test(mut self, hit: HitTestFn) -> Self {
        self.hit = Some(hit);
        self
    }

    /// Apply a parent transform on top of the op's own.
    pub fn with_transform(mut self, parent: Affine) -> Self {
        self.transform = parent * self.transform;
        self
    }

    /// Multiply the op's opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity *= opacity;
        self
    }

    /// Axis-aligned bounds in the parent's space.
    pub fn bounds(&self) -> Rect {
        self.transform.transform_rect_bbox(self.local_bounds)
    }

    /// Whether `point` (parent space) hits this op. Invisible ops are never hit.
    pub fn hit_test(&self, point: Point) -> bool {
        if self.opacity <= 0.0 || self.transform.determinant() == 0.0 {
            return false;
        }
        let local = self.transform.inverse() * point;
        match &self.hit {
            Some(hit) => hit(local),
            None => self.local_bounds.contains(local),
        }
    }

    /// Draw onto `canvas` under the op's transform and opacity. Invisible ops are skipped.
    pub fn render(&self, canvas: &mut dyn Canvas) {
        if self.opacity.is_nan() || self.opacity <= 0.0 {
            return;
        }
        let mut state = CanvasState::new(canvas);
        if self.transform != Affine::IDENTITY {
            state.push_transform(self.transform);
        }
        if self.opacity < 1.0 {
            state.push_opacity(self.opacity);
        }
        match &self.command {
            DrawCommand::FillPath { path, color } => state.canvas().fill_path(path, *color),
            DrawCommand::Image {
                image,
                src,
                dst,
                tint,
            } => state.canvas().draw_image(image, *src, *dst, *tint),
            DrawCommand::Custom(draw) => draw(state.canvas()),
        }
    }
}

impl std::fmt::Debug for RenderOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.command {
            DrawCommand::FillPath { .. } => "fill_path",
            DrawCommand::Image { .. } => "image",
            DrawCommand::Custom(_) => "custom",
        };
        f.debug_struct("RenderOp")
            .field("kind", &kind)
            .field("transform", &self.transform)
            .field("opacity", &self.opacity)
            .field("local_bounds", &self.local_bounds)
            .field("hit_test", &self.hit.is_some())
            .finish()
    }
}

/// Index of the topmost op hit by `point`.
pub fn hit_test(ops: &[RenderOp], point: Point) -> Option<usize> {
    ops.iter().rposition(|op| op.hit_test(point))
}

/// Union of the bounds of every op, `None` when nothing has area.
pub fn ops_bounds(ops: &[RenderOp]) -> Option<Rect> {
    ops.iter().fold(None, |acc, op| union_bounds(acc, op.bounds()))
}

#[cfg(test)]
#[path = "../../tests/unit/graph/op.rs"]
mod tests;
