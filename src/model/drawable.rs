use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use kurbo::Shape as _;

use crate::{
    animation::anim::Animatable,
    foundation::core::{Color, Point, Rect, Size, Vec2},
    foundation::error::{FlurryError, FlurryResult},
    foundation::ids::{ModelId, ResourceId},
    graph::op::RenderOp,
    render::{cpu::MAX_TARGET_DIM, image::RasterImage},
    resource::{
        protocol::{Model, PropertyInfo, PropertyKind, Resource, UpdateContext, commit_version},
        value::compare_and_update,
    },
};

fn default_svg_scale() -> f64 {
    1.0
}

/// What a drawable paints, centered on its local origin.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawableShape {
    /// Filled ellipse.
    Ellipse {
        /// Width and height.
        size: Animatable<Vec2>,
        /// Fill color; white when omitted.
        #[serde(default)]
        color: Animatable<Color>,
    },
    /// Filled, optionally rounded rectangle.
    Rectangle {
        /// Width and height.
        size: Animatable<Vec2>,
        /// Fill color; white when omitted.
        #[serde(default)]
        color: Animatable<Color>,
        /// Corner radius, clamped to half the shorter side.
        #[serde(default)]
        corner_radius: Animatable<f64>,
    },
    /// Bitmap shown one logical unit per pixel.
    Image {
        /// File loaded by [`Drawable::prepare`], relative to the model file.
        #[serde(default)]
        path: Option<PathBuf>,
        /// Decoded pixels.
        #[serde(skip)]
        image: Option<RasterImage>,
    },
    /// Vector document rasterized once per version.
    Svg {
        /// File loaded by [`Drawable::prepare`], relative to the model file.
        #[serde(default)]
        path: Option<PathBuf>,
        /// Raster resolution multiplier; the drawable keeps its logical size.
        #[serde(default = "default_svg_scale")]
        scale: f64,
        /// Parsed document.
        #[serde(skip)]
        tree: Option<Arc<usvg::Tree>>,
    },
}

/// Variant tag of a drawable, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawableKind {
    /// [`DrawableShape::Ellipse`].
    Ellipse,
    /// [`DrawableShape::Rectangle`].
    Rectangle,
    /// [`DrawableShape::Image`].
    Image,
    /// [`DrawableShape::Svg`].
    Svg,
}

/// User-editable drawable model.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Drawable {
    #[serde(skip, default = "ModelId::next")]
    id: ModelId,
    /// What is drawn.
    #[serde(flatten)]
    pub shape: DrawableShape,
}

impl Drawable {
    /// Drawable with a fresh model identity.
    pub fn new(shape: DrawableShape) -> Self {
        Self {
            id: ModelId::next(),
            shape,
        }
    }

    /// Ellipse of `width` by `height` centered on the origin.
    pub fn ellipse(width: f64, height: f64, color: Color) -> Self {
        Self::new(DrawableShape::Ellipse {
            size: Vec2::new(width, height).into(),
            color: color.into(),
        })
    }

    /// Sharp-cornered rectangle centered on the origin.
    pub fn rectangle(width: f64, height: f64, color: Color) -> Self {
        Self::new(DrawableShape::Rectangle {
            size: Vec2::new(width, height).into(),
            color: color.into(),
            corner_radius: 0.0.into(),
        })
    }

    /// Decode an encoded bitmap (PNG, JPEG, ...) into an image drawable.
    pub fn image_from_bytes(bytes: &[u8]) -> FlurryResult<Self> {
        Ok(Self::new(DrawableShape::Image {
            path: None,
            image: Some(decode_image(bytes)?),
        }))
    }

    /// Parse an SVG document rasterized at `scale`.
    pub fn svg_from_bytes(bytes: &[u8], scale: f64) -> FlurryResult<Self> {
        Ok(Self::new(DrawableShape::Svg {
            path: None,
            scale,
            tree: Some(parse_svg(bytes)?),
        }))
    }

    /// Variant tag of the shape.
    pub fn kind(&self) -> DrawableKind {
        match self.shape {
            DrawableShape::Ellipse { .. } => DrawableKind::Ellipse,
            DrawableShape::Rectangle { .. } => DrawableKind::Rectangle,
            DrawableShape::Image { .. } => DrawableKind::Image,
            DrawableShape::Svg { .. } => DrawableKind::Svg,
        }
    }

    /// Load file-backed payloads relative to `root`. Already loaded payloads are kept.
    pub fn prepare(&mut self, root: &Path) -> FlurryResult<()> {
        match &mut self.shape {
            DrawableShape::Image {
                path: Some(path),
                image,
            } if image.is_none() => {
                let full = root.join(path.as_path());
                let bytes = std::fs::read(&full)
                    .with_context(|| format!("read image '{}'", full.display()))?;
                *image = Some(decode_image(&bytes)?);
            }
            DrawableShape::Svg {
                path: Some(path),
                tree,
                ..
            } if tree.is_none() => {
                let full = root.join(path.as_path());
                let bytes = std::fs::read(&full)
                    .with_context(|| format!("read svg '{}'", full.display()))?;
                *tree = Some(parse_svg(&bytes)?);
            }
            _ => {}
        }
        Ok(())
    }

    /// Check animated values and payload presence.
    pub fn validate(&self) -> FlurryResult<()> {
        match &self.shape {
            DrawableShape::Ellipse { size, color } => {
                size.validate("drawable.size")?;
                color.validate("drawable.color")
            }
            DrawableShape::Rectangle {
                size,
                color,
                corner_radius,
            } => {
                size.validate("drawable.size")?;
                color.validate("drawable.color")?;
                corner_radius.validate("drawable.corner_radius")
            }
            DrawableShape::Image { path, image } => {
                if path.is_none() && image.is_none() {
                    return Err(FlurryError::validation(
                        "image drawable needs a path or decoded pixels",
                    ));
                }
                Ok(())
            }
            DrawableShape::Svg { path, scale, tree } => {
                if path.is_none() && tree.is_none() {
                    return Err(FlurryError::validation(
                        "svg drawable needs a path or parsed tree",
                    ));
                }
                if !scale.is_finite() || *scale <= 0.0 {
                    return Err(FlurryError::validation("svg scale must be finite and > 0"));
                }
                Ok(())
            }
        }
    }
}

impl Model for Drawable {
    const PROPERTIES: &'static [PropertyInfo] = &[
        PropertyInfo::new("kind", PropertyKind::Enum, false),
        PropertyInfo::new("size", PropertyKind::Float, true),
        PropertyInfo::new("color", PropertyKind::Color, true),
        PropertyInfo::new("corner_radius", PropertyKind::Float, true),
        PropertyInfo::new("path", PropertyKind::Text, false),
        PropertyInfo::new("scale", PropertyKind::Float, false),
    ];

    fn id(&self) -> ModelId {
        self.id
    }
}

pub(crate) fn decode_image(bytes: &[u8]) -> FlurryResult<RasterImage> {
    let rgba = image::load_from_memory(bytes)
        .context("decode image from memory")?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);
    RasterImage::from_premul_rgba8(width, height, &rgba8_premul)
}

pub(crate) fn parse_svg(bytes: &[u8]) -> FlurryResult<Arc<usvg::Tree>> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    Ok(Arc::new(tree))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

fn svg_logical_size(tree: &usvg::Tree) -> Size {
    let size = tree.size();
    Size::new(f64::from(size.width()), f64::from(size.height()))
}

/// Rasterize `tree` at `scale` times its logical size.
pub(crate) fn rasterize_svg(tree: &usvg::Tree, scale: f64) -> FlurryResult<RasterImage> {
    let logical = svg_logical_size(tree);
    let w = (logical.width * scale).ceil();
    let h = (logical.height * scale).ceil();
    if !(w.is_finite() && h.is_finite()) || w < 1.0 || h < 1.0 {
        return Err(FlurryError::evaluation("svg has invalid width/height"));
    }
    if w > f64::from(MAX_TARGET_DIM) || h > f64::from(MAX_TARGET_DIM) {
        return Err(FlurryError::evaluation(format!(
            "svg raster size too large: {w}x{h} (max {MAX_TARGET_DIM}x{MAX_TARGET_DIM})"
        )));
    }
    let (w, h) = (w as u32, h as u32);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| FlurryError::evaluation("failed to allocate svg pixmap"))?;
    let sx = w as f32 / tree.size().width();
    let sy = h as f32 / tree.size().height();
    resvg::render(
        tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );
    RasterImage::from_premul_rgba8(w, h, pixmap.data())
}

#[derive(Debug)]
enum Content {
    Ellipse {
        size: Vec2,
        color: Color,
    },
    Rectangle {
        size: Vec2,
        color: Color,
        corner_radius: f64,
    },
    Image {
        image: Option<RasterImage>,
    },
    Svg {
        tree: Option<Arc<usvg::Tree>>,
        scale: f64,
        raster: Option<RasterImage>,
        stale: bool,
    },
}

impl Content {
    fn build(shape: &DrawableShape, time: f64) -> Self {
        match shape {
            DrawableShape::Ellipse { size, color } => Self::Ellipse {
                size: size.sample(time),
                color: color.sample(time),
            },
            DrawableShape::Rectangle {
                size,
                color,
                corner_radius,
            } => Self::Rectangle {
                size: size.sample(time),
                color: color.sample(time),
                corner_radius: corner_radius.sample(time),
            },
            DrawableShape::Image { image, .. } => Self::Image {
                image: image.clone(),
            },
            DrawableShape::Svg { scale, tree, .. } => Self::Svg {
                tree: tree.clone(),
                scale: *scale,
                raster: None,
                stale: true,
            },
        }
    }
}

/// Per-render snapshot of a [`Drawable`]: copied values plus the SVG raster built from them.
#[derive(Debug)]
pub struct DrawableResource {
    id: ResourceId,
    model_id: ModelId,
    version: u64,
    content: Content,
    disposed: bool,
}

impl DrawableResource {
    /// Variant tag of the mirrored shape.
    pub fn kind(&self) -> DrawableKind {
        match self.content {
            Content::Ellipse { .. } => DrawableKind::Ellipse,
            Content::Rectangle { .. } => DrawableKind::Rectangle,
            Content::Image { .. } => DrawableKind::Image,
            Content::Svg { .. } => DrawableKind::Svg,
        }
    }

    /// Perform deferred heavy work (SVG rasterization). Returns whether anything was rebuilt.
    pub fn ensure_prepared(&mut self) -> bool {
        let Content::Svg {
            tree,
            scale,
            raster,
            stale,
        } = &mut self.content
        else {
            return false;
        };
        if !*stale {
            return false;
        }
        *stale = false;
        *raster = match tree {
            Some(tree) => match rasterize_svg(tree, *scale) {
                Ok(img) => Some(img),
                Err(err) => {
                    tracing::warn!(error = %err, "svg drawable rasterization failed");
                    None
                }
            },
            None => None,
        };
        tracing::debug!(resource = self.id.raw(), "svg drawable rasterized");
        true
    }

    /// Whether deferred work is pending.
    pub fn needs_prepare(&self) -> bool {
        matches!(self.content, Content::Svg { stale: true, .. })
    }

    /// Local bounds, centered on the origin.
    pub fn bounds(&self) -> Rect {
        let size = match &self.content {
            Content::Ellipse { size, .. } | Content::Rectangle { size, .. } => {
                Size::new(size.x.abs(), size.y.abs())
            }
            Content::Image { image } => image.as_ref().map(RasterImage::size).unwrap_or(Size::ZERO),
            Content::Svg { tree, .. } => tree
                .as_deref()
                .map(svg_logical_size)
                .unwrap_or(Size::ZERO),
        };
        Rect::from_center_size(Point::ORIGIN, size)
    }

    /// Draw operations centered on the origin.
    pub fn ops(&self) -> Vec<RenderOp> {
        if self.disposed {
            panic!("drawable resource used after dispose");
        }
        let bounds = self.bounds();
        match &self.content {
            Content::Ellipse { size, color } => {
                let ellipse = kurbo::Ellipse::new(Point::ORIGIN, (size.x / 2.0, size.y / 2.0), 0.0);
                vec![RenderOp::fill_path(ellipse.to_path(0.1), *color)]
            }
            Content::Rectangle {
                color,
                corner_radius,
                ..
            } => {
                let radius = corner_radius
                    .max(0.0)
                    .min(bounds.width().min(bounds.height()) / 2.0);
                let path = kurbo::RoundedRect::from_rect(bounds, radius).to_path(0.1);
                vec![RenderOp::fill_path(path, *color)]
            }
            Content::Image { image: Some(image) } => {
                vec![RenderOp::image(image.clone(), image.rect(), bounds, None)]
            }
            Content::Svg {
                raster: Some(raster),
                ..
            } => vec![RenderOp::image(raster.clone(), raster.rect(), bounds, None)],
            Content::Image { image: None } | Content::Svg { raster: None, .. } => Vec::new(),
        }
    }
}

impl Resource for DrawableResource {
    type Model = Drawable;

    fn from_model(model: &Drawable, ctx: &UpdateContext<'_>) -> Self {
        let mut resource = Self {
            id: ResourceId::next(),
            model_id: model.id,
            version: 0,
            content: Content::build(&model.shape, ctx.time),
            disposed: false,
        };
        resource.ensure_prepared();
        resource
    }

    fn id(&self) -> ResourceId {
        self.id
    }

    fn model_id(&self) -> ModelId {
        self.model_id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn update(&mut self, model: &Drawable, ctx: &UpdateContext<'_>, update_only: &mut bool) {
        let t = ctx.time;
        let mut changed = false;
        match (&mut self.content, &model.shape) {
            (
                Content::Ellipse { size, color },
                DrawableShape::Ellipse {
                    size: next_size,
                    color: next_color,
                },
            ) => {
                compare_and_update(size, next_size.sample(t), &mut changed);
                compare_and_update(color, next_color.sample(t), &mut changed);
            }
            (
                Content::Rectangle {
                    size,
                    color,
                    corner_radius,
                },
                DrawableShape::Rectangle {
                    size: next_size,
                    color: next_color,
                    corner_radius: next_radius,
                },
            ) => {
                compare_and_update(size, next_size.sample(t), &mut changed);
                compare_and_update(color, next_color.sample(t), &mut changed);
                compare_and_update(corner_radius, next_radius.sample(t), &mut changed);
            }
            (Content::Image { image }, DrawableShape::Image { image: next, .. }) => {
                compare_and_update(image, next.clone(), &mut changed);
            }
            (
                Content::Svg {
                    tree, scale, stale, ..
                },
                DrawableShape::Svg {
                    tree: next_tree,
                    scale: next_scale,
                    ..
                },
            ) => {
                let mut svg_changed = false;
                compare_and_update(tree, next_tree.clone(), &mut svg_changed);
                compare_and_update(scale, *next_scale, &mut svg_changed);
                if svg_changed {
                    *stale = true;
                    changed = true;
                }
            }
            _ => {
                self.content = Content::build(&model.shape, t);
                changed = true;
                *update_only = false;
            }
        }

        if !*update_only {
            self.ensure_prepared();
        }
        commit_version(&mut self.version, changed);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        match &mut self.content {
            Content::Image { image } => *image = None,
            Content::Svg { tree, raster, .. } => {
                *tree = None;
                *raster = None;
            }
            Content::Ellipse { .. } | Content::Rectangle { .. } => {}
        }
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/drawable.rs"]
mod tests;
