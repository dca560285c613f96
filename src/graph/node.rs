use std::{cell::RefCell, rc::Rc};

use crate::{foundation::ids::NodeId, graph::op::RenderOp, render::device::GraphicsContext};

/// Per-frame evaluation context handed to every [`RenderNode::process`] call.
#[derive(Clone, Copy, Debug)]
pub struct RenderNodeContext<'a> {
    /// Whether subtrees may be replaced by cached render targets this frame.
    pub allow_render_cache: bool,
    /// Device used to rasterize sprites, caches and filter inputs.
    pub gfx: &'a GraphicsContext,
}

impl<'a> RenderNodeContext<'a> {
    /// Context with caching allowed.
    pub fn new(gfx: &'a GraphicsContext) -> Self {
        Self {
            allow_render_cache: true,
            gfx,
        }
    }

    /// Same context with render-target caching forbidden, for parents that re-render every frame.
    pub fn without_cache(self) -> Self {
        Self {
            allow_render_cache: false,
            ..self
        }
    }
}

/// A disposable element of the render tree.
///
/// A node reports its children through [`RenderNode::for_each_child`]; the processor evaluates
/// them first and passes their concatenated operations to `process`. Nodes must only read
/// already-updated resource state while processing.
pub trait RenderNode {
    /// Identity keying this node's cache entry.
    fn id(&self) -> NodeId;

    /// Operations this node contributes for the current frame, given its children's output.
    ///
    /// Calling this on a disposed node is a lifetime bug and panics.
    fn process(&mut self, ctx: &RenderNodeContext<'_>, input: Vec<RenderOp>) -> Vec<RenderOp>;

    /// Visit the children evaluated before `process`. Leaves have none.
    fn for_each_child(&mut self, _f: &mut dyn FnMut(&mut dyn RenderNode)) {}

    /// Whether this node's own output changed since the last [`RenderNode::clear_changes`].
    fn has_changes(&self) -> bool;

    /// Mark the current state as seen.
    fn clear_changes(&mut self);

    /// Whether the processor may replace this subtree with a cached render target.
    fn cacheable(&self) -> bool {
        false
    }

    /// Tear down the node and every child it owns. Idempotent.
    fn dispose(&mut self);

    /// Whether [`RenderNode::dispose`] has run.
    fn is_disposed(&self) -> bool;
}

/// Node shared between several parents; owned by whoever created it.
pub type SharedNode = Rc<RefCell<dyn RenderNode>>;

/// Wrap `node` for use behind several [`crate::ReferenceNode`]s.
pub fn shared<N: RenderNode + 'static>(node: N) -> SharedNode {
    Rc::new(RefCell::new(node))
}

pub(crate) fn assert_live(node: &dyn RenderNode) {
    if node.is_disposed() {
        panic!("render node {:?} processed after dispose", node.id());
    }
}
