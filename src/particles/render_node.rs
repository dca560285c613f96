use std::{cell::RefCell, collections::HashMap, rc::Rc};

use kurbo::Shape as _;

use crate::{
    foundation::core::{Affine, Color, Point, Rect, union_bounds},
    foundation::ids::{NodeId, ResourceId},
    graph::{
        node::{RenderNode, RenderNodeContext, assert_live},
        op::{DrawCommand, RenderOp, ops_bounds},
    },
    model::emitter::EmitterResource,
    particles::particle::Particle,
    render::image::{RasterImage, RenderTarget},
    resource::protocol::Resource,
};

/// Edge length of the sprite used when the emitter has no drawable.
pub const FALLBACK_SPRITE_SIZE: f64 = 10.0;

/// Tinted sprite rasters kept per node before the memo is reset.
const MAX_TINTED_SPRITES: usize = 256;

/// Identity of the sprite currently cached by a [`ParticleRenderNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpriteKey {
    /// Raster of a drawable resource at a version.
    Drawable(ResourceId, u64),
    /// Built-in white dot.
    Fallback,
}

struct Sprite {
    key: SpriteKey,
    /// Raster of `ops`; absent when no device could render it.
    target: Option<RenderTarget>,
    ops: Vec<RenderOp>,
    /// Raster multiplied by a tint, keyed by the tint quantized to RGBA8.
    tinted: HashMap<[u8; 4], RasterImage>,
}

impl Sprite {
    /// The raster for `color`, shared by every particle whose tint quantizes the same.
    fn raster_for(&mut self, color: Color) -> Option<RasterImage> {
        let image = self.target.as_ref()?.try_image().ok()?;
        let key = color.to_rgba8();
        if key == [255; 4] {
            return Some(image.clone());
        }
        if let Some(tinted) = self.tinted.get(&key) {
            return Some(tinted.clone());
        }
        if self.tinted.len() >= MAX_TINTED_SPRITES {
            self.tinted.clear();
        }
        let tinted = image.tinted(color);
        self.tinted.insert(key, tinted.clone());
        Some(tinted)
    }

    fn dispose(&mut self) {
        self.tinted.clear();
        if let Some(target) = self.target.as_mut() {
            target.dispose();
        }
    }
}

fn fallback_ops() -> Vec<RenderOp> {
    let r = FALLBACK_SPRITE_SIZE / 2.0;
    let ellipse = kurbo::Ellipse::new(Point::ORIGIN, (r, r), 0.0);
    vec![RenderOp::fill_path(ellipse.to_path(0.1), Color::WHITE)]
}

fn multiply(a: Color, b: Color) -> Color {
    Color::new(a.r * b.r, a.g * b.g, a.b * b.b, a.a * b.a)
}

/// Apply a color modulation to a vector sprite op.
fn tint_op(mut op: RenderOp, tint: Color) -> RenderOp {
    match &mut op.command {
        DrawCommand::FillPath { color, .. } => *color = multiply(*color, tint),
        DrawCommand::Image { tint: t, .. } => *t = Some(t.map_or(tint, |c| multiply(c, tint))),
        DrawCommand::Custom(_) => {}
    }
    op
}

/// World transform of one particle: scale, then rotate, then translate.
pub fn particle_transform(p: &Particle) -> Affine {
    Affine::translate((f64::from(p.x), f64::from(p.y)))
        * Affine::rotate(f64::from(p.rotation))
        * Affine::scale(f64::from(p.size))
}

/// Draws every alive particle of a shared emitter resource with one cached sprite.
///
/// The sprite is rendered off-screen once per `(drawable identity, drawable version)` and then
/// composited per particle with its own transform, opacity and color.
pub struct ParticleRenderNode {
    id: NodeId,
    emitter: Rc<RefCell<EmitterResource>>,
    sprite: Option<Sprite>,
    seen: Option<((ResourceId, u64), SpriteKey)>,
    last_bounds: Option<Rect>,
    sprite_builds: u64,
    disposed: bool,
}

impl ParticleRenderNode {
    /// Node drawing the particles of `emitter`, which it does not own.
    pub fn new(emitter: Rc<RefCell<EmitterResource>>) -> Self {
        Self {
            id: NodeId::next(),
            emitter,
            sprite: None,
            seen: None,
            last_bounds: None,
            sprite_builds: 0,
            disposed: false,
        }
    }

    /// The drawn emitter resource.
    pub fn emitter(&self) -> &Rc<RefCell<EmitterResource>> {
        &self.emitter
    }

    /// Union of this frame's particle footprints.
    pub fn last_bounds(&self) -> Option<Rect> {
        self.last_bounds
    }

    /// Key of the cached sprite, if one was built.
    pub fn sprite_key(&self) -> Option<SpriteKey> {
        self.sprite.as_ref().map(|s| s.key)
    }

    /// Whether the cached sprite is a raster (as opposed to vector fallback ops).
    pub fn sprite_is_raster(&self) -> bool {
        self.sprite.as_ref().is_some_and(|s| s.target.is_some())
    }

    /// How many times the sprite has been (re)built.
    pub fn sprite_builds(&self) -> u64 {
        self.sprite_builds
    }

    fn current_key(emitter: &EmitterResource) -> SpriteKey {
        match emitter.drawable() {
            Some(d) if !d.is_disposed() => SpriteKey::Drawable(d.id(), d.version()),
            _ => SpriteKey::Fallback,
        }
    }

    fn rebuild_sprite(&mut self, ctx: &RenderNodeContext<'_>, key: SpriteKey, ops: Vec<RenderOp>) {
        if let Some(mut old) = self.sprite.take() {
            old.dispose();
        }
        let target = match ops_bounds(&ops) {
            Some(bounds) if ctx.gfx.is_available() => match ctx.gfx.rasterize(&ops, bounds) {
                Ok(target) => Some(target),
                Err(err) => {
                    tracing::debug!(node = self.id.raw(), error = %err, "sprite raster failed; drawing vector ops");
                    None
                }
            },
            _ => None,
        };
        self.sprite_builds += 1;
        tracing::debug!(node = self.id.raw(), ?key, raster = target.is_some(), "particle sprite rebuilt");
        self.sprite = Some(Sprite {
            key,
            target,
            ops,
            tinted: HashMap::new(),
        });
    }
}

impl RenderNode for ParticleRenderNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process(&mut self, ctx: &RenderNodeContext<'_>, mut input: Vec<RenderOp>) -> Vec<RenderOp> {
        assert_live(self);
        let emitter_rc = Rc::clone(&self.emitter);
        let mut emitter = emitter_rc.borrow_mut();
        if emitter.is_disposed() {
            self.last_bounds = None;
            return input;
        }
        emitter.ensure_simulated();

        let key = Self::current_key(&emitter);
        if self.sprite_key() != Some(key) {
            let ops = match emitter.drawable() {
                Some(d) if key != SpriteKey::Fallback => d.ops(),
                _ => fallback_ops(),
            };
            self.rebuild_sprite(ctx, key, ops);
        }
        let Some(sprite) = self.sprite.as_mut() else {
            return input;
        };

        let mut bounds = None;
        for p in emitter.particles() {
            if !(p.size > 0.0 && p.opacity > 0.0) {
                continue;
            }
            let transform = particle_transform(p);
            let opacity = p.opacity;

            if let Some(target_bounds) = sprite.target.as_ref().map(RenderTarget::bounds) {
                let Some(image) = sprite.raster_for(p.color) else {
                    continue;
                };
                let src = image.rect();
                let op = RenderOp::image(image, src, target_bounds, None)
                    .with_transform(transform)
                    .with_opacity(opacity);
                bounds = union_bounds(bounds, op.bounds());
                input.push(op);
                continue;
            }

            let tint = (!p.color.is_white()).then_some(p.color);
            for op in &sprite.ops {
                let mut op = op.clone().with_transform(transform).with_opacity(opacity);
                if let Some(tint) = tint {
                    op = tint_op(op, tint);
                }
                bounds = union_bounds(bounds, op.bounds());
                input.push(op);
            }
        }
        self.last_bounds = bounds;
        input
    }

    fn has_changes(&self) -> bool {
        let emitter = self.emitter.borrow();
        self.seen != Some((emitter.cache_key(), Self::current_key(&emitter)))
    }

    fn clear_changes(&mut self) {
        let emitter = self.emitter.borrow();
        self.seen = Some((emitter.cache_key(), Self::current_key(&emitter)));
    }

    fn cacheable(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        if let Some(mut sprite) = self.sprite.take() {
            sprite.dispose();
        }
        self.last_bounds = None;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/particles/render_node.rs"]
mod tests;
