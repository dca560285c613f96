use std::{cell::RefCell, rc::Rc};

use crate::{
    foundation::core::{Affine, Rect},
    foundation::ids::{NodeId, ResourceId},
    graph::{
        node::{RenderNode, RenderNodeContext, SharedNode, assert_live},
        op::{DrawFn, HitTestFn, RenderOp},
    },
    model::drawable::DrawableResource,
    resource::protocol::Resource,
    resource::value::ResourceValue,
};

/// Owns an ordered list of children and disposes them with itself.
pub struct ContainerNode {
    id: NodeId,
    children: Vec<Box<dyn RenderNode>>,
    dirty: bool,
    disposed: bool,
}

impl ContainerNode {
    /// Empty container.
    pub fn new() -> Self {
        Self {
            id: NodeId::next(),
            children: Vec::new(),
            dirty: true,
            disposed: false,
        }
    }

    /// Append a child drawn above the existing ones.
    pub fn push(&mut self, child: Box<dyn RenderNode>) {
        self.children.push(child);
        self.dirty = true;
    }

    /// Detach a child without disposing it; ownership moves to the caller.
    pub fn remove(&mut self, index: usize) -> Option<Box<dyn RenderNode>> {
        if index >= self.children.len() {
            return None;
        }
        self.dirty = true;
        Some(self.children.remove(index))
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the container has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Default for ContainerNode {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderNode for ContainerNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process(&mut self, _ctx: &RenderNodeContext<'_>, input: Vec<RenderOp>) -> Vec<RenderOp> {
        assert_live(self);
        input
    }

    fn for_each_child(&mut self, f: &mut dyn FnMut(&mut dyn RenderNode)) {
        for child in &mut self.children {
            f(child.as_mut());
        }
    }

    fn has_changes(&self) -> bool {
        self.dirty
    }

    fn clear_changes(&mut self) {
        self.dirty = false;
    }

    fn cacheable(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        for mut child in self.children.drain(..) {
            child.dispose();
        }
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Refers to a node owned elsewhere. Disposing this node only drops the reference.
pub struct ReferenceNode {
    id: NodeId,
    target: Option<SharedNode>,
    dirty: bool,
    disposed: bool,
}

impl ReferenceNode {
    /// Reference `target` without taking ownership.
    pub fn new(target: SharedNode) -> Self {
        Self {
            id: NodeId::next(),
            target: Some(target),
            dirty: true,
            disposed: false,
        }
    }

    /// The referenced node, if any.
    pub fn target(&self) -> Option<&SharedNode> {
        self.target.as_ref()
    }

    /// Point at another node. Marks a change only when the target differs.
    pub fn set_target(&mut self, target: Option<SharedNode>) {
        let same = match (&self.target, &target) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if !same {
            self.target = target;
            self.dirty = true;
        }
    }
}

impl RenderNode for ReferenceNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process(&mut self, _ctx: &RenderNodeContext<'_>, input: Vec<RenderOp>) -> Vec<RenderOp> {
        assert_live(self);
        input
    }

    fn for_each_child(&mut self, f: &mut dyn FnMut(&mut dyn RenderNode)) {
        if let Some(target) = &self.target {
            let mut target = target.borrow_mut();
            if !target.is_disposed() {
                f(&mut *target);
            }
        }
    }

    fn has_changes(&self) -> bool {
        self.dirty
    }

    fn clear_changes(&mut self) {
        self.dirty = false;
    }

    fn dispose(&mut self) {
        self.target = None;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Leaf wrapping a draw callback with explicit bounds and an optional hit predicate.
pub struct LambdaNode {
    id: NodeId,
    draw: DrawFn,
    bounds: Rect,
    hit: Option<HitTestFn>,
    dirty: bool,
    disposed: bool,
}

impl LambdaNode {
    /// Node that runs `draw` inside `bounds`.
    pub fn new(bounds: Rect, draw: DrawFn) -> Self {
        Self {
            id: NodeId::next(),
            draw,
            bounds,
            hit: None,
            dirty: true,
            disposed: false,
        }
    }

    /// Precise hit predicate in local space.
    pub fn with_hit_test(mut self, hit: HitTestFn) -> Self {
        self.hit = Some(hit);
        self
    }

    /// Replace the callback; always counts as a change.
    pub fn set_draw(&mut self, bounds: Rect, draw: DrawFn) {
        self.draw = draw;
        self.bounds = bounds;
        self.dirty = true;
    }

    /// Mark the callback's output as changed (e.g. captured state moved).
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }
}

impl RenderNode for LambdaNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process(&mut self, _ctx: &RenderNodeContext<'_>, mut input: Vec<RenderOp>) -> Vec<RenderOp> {
        assert_live(self);
        let mut op = RenderOp::custom(self.draw.clone(), self.bounds);
        if let Some(hit) = &self.hit {
            op = op.with_hit_test(hit.clone());
        }
        input.push(op);
        input
    }

    fn has_changes(&self) -> bool {
        self.dirty
    }

    fn clear_changes(&mut self) {
        self.dirty = false;
    }

    fn cacheable(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Applies an affine transform to everything its owned child produces.
pub struct TransformNode {
    id: NodeId,
    transform: Affine,
    child: Option<Box<dyn RenderNode>>,
    dirty: bool,
    disposed: bool,
}

impl TransformNode {
    /// Own `child` and draw it under `transform`.
    pub fn new(transform: Affine, child: Box<dyn RenderNode>) -> Self {
        Self {
            id: NodeId::next(),
            transform,
            child: Some(child),
            dirty: true,
            disposed: false,
        }
    }

    /// Current transform.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Change the transform; equal values are not a change.
    pub fn set_transform(&mut self, transform: Affine) {
        if !self.transform.same_value(&transform) {
            self.transform = transform;
            self.dirty = true;
        }
    }
}

impl RenderNode for TransformNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process(&mut self, _ctx: &RenderNodeContext<'_>, input: Vec<RenderOp>) -> Vec<RenderOp> {
        assert_live(self);
        input
            .into_iter()
            .map(|op| op.with_transform(self.transform))
            .collect()
    }

    fn for_each_child(&mut self, f: &mut dyn FnMut(&mut dyn RenderNode)) {
        if let Some(child) = self.child.as_mut() {
            f(child.as_mut());
        }
    }

    fn has_changes(&self) -> bool {
        self.dirty
    }

    fn clear_changes(&mut self) {
        self.dirty = false;
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

/// Multiplies the opacity of everything its owned child produces.
pub struct OpacityNode {
    id: NodeId,
    opacity: f32,
    child: Option<Box<dyn RenderNode>>,
    dirty: bool,
    disposed: bool,
}

impl OpacityNode {
    /// Own `child` and draw it at `opacity`.
    pub fn new(opacity: f32, child: Box<dyn RenderNode>) -> Self {
        Self {
            id: NodeId::next(),
            opacity,
            child: Some(child),
            dirty: true,
            disposed: false,
        }
    }

    /// Change the opacity; equal values are not a change.
    pub fn set_opacity(&mut self, opacity: f32) {
        if !self.opacity.same_value(&opacity) {
            self.opacity = opacity;
            self.dirty = true;
        }
    }
}

impl RenderNode for OpacityNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process(&mut self, _ctx: &RenderNodeContext<'_>, input: Vec<RenderOp>) -> Vec<RenderOp> {
        assert_live(self);
        let opacity = if self.opacity.is_finite() {
            self.opacity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if opacity <= 0.0 {
            return Vec::new();
        }
        input
            .into_iter()
            .map(|op| op.with_opacity(opacity))
            .collect()
    }

    fn for_each_child(&mut self, f: &mut dyn FnMut(&mut dyn RenderNode)) {
        if let Some(child) = self.child.as_mut() {
            f(child.as_mut());
        }
    }

    fn has_changes(&self) -> bool {
        self.dirty
    }

    fn clear_changes(&mut self) {
        self.dirty = false;
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

/// Draws an externally owned drawable resource. Staleness is tracked by `(identity, version)`.
pub struct DrawableNode {
    id: NodeId,
    resource: Rc<RefCell<DrawableResource>>,
    seen: Option<(ResourceId, u64)>,
    disposed: bool,
}

impl DrawableNode {
    /// Draw `resource`; the node never disposes it.
    pub fn new(resource: Rc<RefCell<DrawableResource>>) -> Self {
        Self {
            id: NodeId::next(),
            resource,
            seen: None,
            disposed: false,
        }
    }

    /// The drawn resource.
    pub fn resource(&self) -> &Rc<RefCell<DrawableResource>> {
        &self.resource
    }
}

impl RenderNode for DrawableNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process(&mut self, _ctx: &RenderNodeContext<'_>, mut input: Vec<RenderOp>) -> Vec<RenderOp> {
        assert_live(self);
        input.extend(self.resource.borrow().ops());
        input
    }

    fn has_changes(&self) -> bool {
        self.seen != Some(self.resource.borrow().cache_key())
    }

    fn clear_changes(&mut self) {
        self.seen = Some(self.resource.borrow().cache_key());
    }

    fn cacheable(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/nodes.rs"]
mod tests;
