use std::{cell::RefCell, rc::Rc};

use crate::{
    foundation::error::FlurryResult,
    foundation::ids::{NodeId, ResourceId},
    graph::{
        node::{RenderNode, RenderNodeContext, assert_live},
        op::{RenderOp, ops_bounds},
    },
    model::filter::FilterEffectResource,
    render::{image::RasterImage, shader::PixelShader},
    resource::protocol::Resource,
};

/// Applies a compiled filter effect to the rasterized output of its owned child.
///
/// Without a shader, a device or anything to draw, the child's operations pass through.
pub struct FilterEffectNode {
    id: NodeId,
    effect: Rc<RefCell<FilterEffectResource>>,
    child: Option<Box<dyn RenderNode>>,
    seen: Option<(ResourceId, u64)>,
    disposed: bool,
}

impl FilterEffectNode {
    /// Filter `child`'s output with the shader compiled in `effect`.
    pub fn new(effect: Rc<RefCell<FilterEffectResource>>, child: Box<dyn RenderNode>) -> Self {
        Self {
            id: NodeId::next(),
            effect,
            child: Some(child),
            seen: None,
            disposed: false,
        }
    }

    fn apply(
        ctx: &RenderNodeContext<'_>,
        shader: &dyn PixelShader,
        input: &[RenderOp],
    ) -> FlurryResult<Option<RenderOp>> {
        let Some(bounds) = ops_bounds(input) else {
            return Ok(None);
        };
        let mut target = ctx.gfx.rasterize(input, bounds)?;
        let image = target.try_image()?;
        let (w, h) = (image.width(), image.height());
        let mut pixels = image.premul_rgba8().to_vec();
        shader.apply(&mut pixels, w, h);
        let filtered = RasterImage::from_premul_rgba8(w, h, &pixels)?;
        let op = RenderOp::image(filtered.clone(), filtered.rect(), target.bounds(), None);
        target.dispose();
        Ok(Some(op))
    }
}

impl RenderNode for FilterEffectNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process(&mut self, ctx: &RenderNodeContext<'_>, input: Vec<RenderOp>) -> Vec<RenderOp> {
        assert_live(self);
        let effect = self.effect.borrow();
        let Some(shader) = effect.shader() else {
            return input;
        };
        if !ctx.gfx.is_available() {
            return input;
        }
        match Self::apply(ctx, shader.as_ref(), &input) {
            Ok(Some(op)) => vec![op],
            Ok(None) => input,
            Err(err) => {
                tracing::debug!(node = self.id.raw(), error = %err, "filter effect skipped");
                input
            }
        }
    }

    fn for_each_child(&mut self, f: &mut dyn FnMut(&mut dyn RenderNode)) {
        if let Some(child) = self.child.as_mut() {
            f(child.as_mut());
        }
    }

    fn has_changes(&self) -> bool {
        self.seen != Some(self.effect.borrow().cache_key())
    }

    fn clear_changes(&mut self) {
        self.seen = Some(self.effect.borrow().cache_key());
    }

    fn cacheable(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        if let Some(mut child) = self.child.take() {
            child.dispose();
        }
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/filter.rs"]
mod tests;
