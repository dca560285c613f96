use std::cell::Cell;

use kurbo::Shape as _;

use super::*;
use crate::{
    foundation::core::{Color, Point},
    graph::{node::shared, processor::RenderNodeProcessor},
    model::drawable::Drawable,
    render::{canvas::Canvas, device::GraphicsContext},
    resource::protocol::UpdateContext,
};

/// Leaf that records whether it was disposed.
struct Probe {
    id: NodeId,
    disposed: Rc<Cell<bool>>,
}

impl Probe {
    fn new(flag: &Rc<Cell<bool>>) -> Self {
        Self {
            id: NodeId::next(),
            disposed: flag.clone(),
        }
    }
}

impl RenderNode for Probe {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process(&mut self, _ctx: &RenderNodeContext<'_>, mut input: Vec<RenderOp>) -> Vec<RenderOp> {
        input.push(RenderOp::fill_path(
            Rect::new(0.0, 0.0, 1.0, 1.0).to_path(0.1),
            Color::WHITE,
        ));
        input
    }

    fn has_changes(&self) -> bool {
        false
    }

    fn clear_changes(&mut self) {}

    fn dispose(&mut self) {
        self.disposed.set(true);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

fn lambda(bounds: Rect) -> LambdaNode {
    LambdaNode::new(bounds, Rc::new(|_: &mut dyn Canvas| {}))
}

#[test]
fn container_concatenates_children_in_order() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let mut root = ContainerNode::new();
    root.push(Box::new(lambda(Rect::new(0.0, 0.0, 1.0, 1.0))));
    root.push(Box::new(lambda(Rect::new(5.0, 5.0, 6.0, 6.0))));

    let ops = RenderNodeProcessor::pull_to_root(&mut root, &ctx);
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[1].bounds(), Rect::new(5.0, 5.0, 6.0, 6.0));
}

#[test]
fn container_dispose_cascades() {
    let flag = Rc::new(Cell::new(false));
    let mut root = ContainerNode::new();
    root.push(Box::new(Probe::new(&flag)));
    root.dispose();
    assert!(flag.get());
    assert!(root.is_disposed());
    assert!(root.is_empty());
}

#[test]
fn removed_child_is_not_disposed() {
    let flag = Rc::new(Cell::new(false));
    let mut root = ContainerNode::new();
    root.push(Box::new(Probe::new(&flag)));
    let child = root.remove(0);
    root.dispose();
    assert!(child.is_some());
    assert!(!flag.get());
}

#[test]
fn reference_never_disposes_target() {
    let flag = Rc::new(Cell::new(false));
    let target = shared(Probe::new(&flag));
    let mut a = ReferenceNode::new(target.clone());
    let mut b = ReferenceNode::new(target.clone());

    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    assert_eq!(RenderNodeProcessor::pull_to_root(&mut a, &ctx).len(), 1);

    a.dispose();
    assert!(!flag.get());
    assert!(a.target().is_none());
    assert_eq!(RenderNodeProcessor::pull_to_root(&mut b, &ctx).len(), 1);
}

#[test]
fn reference_retarget_marks_change() {
    let flag = Rc::new(Cell::new(false));
    let target = shared(Probe::new(&flag));
    let mut node = ReferenceNode::new(target.clone());
    node.clear_changes();

    node.set_target(Some(target));
    assert!(!node.has_changes());
    node.set_target(None);
    assert!(node.has_changes());
}

#[test]
fn transform_and_opacity_wrap_child_output() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let inner = OpacityNode::new(0.5, Box::new(lambda(Rect::new(0.0, 0.0, 2.0, 2.0))));
    let mut root = TransformNode::new(Affine::translate((10.0, 0.0)), Box::new(inner));

    let ops = RenderNodeProcessor::pull_to_root(&mut root, &ctx);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].bounds(), Rect::new(10.0, 0.0, 12.0, 2.0));
    assert_eq!(ops[0].opacity, 0.5);
}

#[test]
fn zero_opacity_drops_output() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let mut node = OpacityNode::new(0.0, Box::new(lambda(Rect::new(0.0, 0.0, 2.0, 2.0))));
    assert!(RenderNodeProcessor::pull_to_root(&mut node, &ctx).is_empty());
}

#[test]
fn set_transform_only_flags_real_changes() {
    let mut node = TransformNode::new(Affine::IDENTITY, Box::new(lambda(Rect::ZERO)));
    node.clear_changes();
    node.set_transform(Affine::IDENTITY);
    assert!(!node.has_changes());
    node.set_transform(Affine::scale(2.0));
    assert!(node.has_changes());
}

#[test]
fn lambda_hit_test_survives_processing() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let mut node = lambda(Rect::new(0.0, 0.0, 10.0, 10.0))
        .with_hit_test(Rc::new(|p: Point| p.x < 5.0));
    let ops = RenderNodeProcessor::pull_to_root(&mut node, &ctx);
    assert!(ops[0].hit_test(Point::new(2.0, 2.0)));
    assert!(!ops[0].hit_test(Point::new(7.0, 2.0)));
}

#[test]
fn drawable_node_tracks_resource_version() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let mut model = Drawable::ellipse(4.0, 4.0, Color::WHITE);
    let uctx = UpdateContext::at(0.0);
    let res = Rc::new(RefCell::new(DrawableResource::from_model(&model, &uctx)));
    let mut node = DrawableNode::new(res.clone());

    assert!(node.has_changes());
    node.clear_changes();
    assert!(!node.has_changes());
    assert_eq!(RenderNodeProcessor::pull_to_root(&mut node, &ctx).len(), 1);

    if let crate::model::drawable::DrawableShape::Ellipse { color, .. } = &mut model.shape {
        *color = Color::BLACK.into();
    }
    res.borrow_mut().update(&model, &uctx, &mut true);
    assert!(node.has_changes());

    node.dispose();
    assert!(!res.borrow().is_disposed());
}

#[test]
#[should_panic(expected = "processed after dispose")]
fn processing_disposed_container_panics() {
    let gfx = GraphicsContext::cpu();
    let mut root = ContainerNode::new();
    root.dispose();
    RenderNodeProcessor::pull_to_root(&mut root, &RenderNodeContext::new(&gfx));
}
