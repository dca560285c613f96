use std::{cell::Cell, rc::Rc};

use kurbo::Shape as _;

use super::*;
use crate::{
    foundation::core::{Color, Rect},
    graph::{node::shared, nodes::{ContainerNode, ReferenceNode}, op::DrawCommand},
    render::{cpu::render_ops_to_frame, device::GraphicsContext},
};

#[derive(Clone, Default)]
struct Probe {
    processed: Rc<Cell<u32>>,
    dirty: Rc<Cell<bool>>,
}

struct Counter {
    id: NodeId,
    probe: Probe,
    disposed: bool,
}

impl Counter {
    fn new(probe: &Probe) -> Self {
        probe.dirty.set(true);
        Self {
            id: NodeId::next(),
            probe: probe.clone(),
            disposed: false,
        }
    }
}

impl RenderNode for Counter {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process(&mut self, _ctx: &RenderNodeContext<'_>, mut input: Vec<RenderOp>) -> Vec<RenderOp> {
        self.probe.processed.set(self.probe.processed.get() + 1);
        input.push(RenderOp::fill_path(
            Rect::new(1.0, 1.0, 5.0, 5.0).to_path(0.1),
            Color::WHITE,
        ));
        input
    }

    fn has_changes(&self) -> bool {
        self.probe.dirty.get()
    }

    fn clear_changes(&mut self) {
        self.probe.dirty.set(false);
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

fn processor(after: u32) -> RenderNodeProcessor {
    RenderNodeProcessor::new(ProcessorOpts {
        cache_after_frames: after,
    })
}

fn is_image(ops: &[RenderOp]) -> bool {
    ops.len() == 1 && matches!(ops[0].command, DrawCommand::Image { .. })
}

#[test]
fn stable_subtree_is_cached_after_threshold() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let probe = Probe::default();
    let mut node = Counter::new(&probe);
    let mut proc = processor(2);

    for frame in 1..=2 {
        let ops = proc.process_frame(&mut node, &ctx);
        assert!(!is_image(&ops), "frame {frame}");
    }
    let ops = proc.process_frame(&mut node, &ctx);
    assert!(is_image(&ops));
    assert_eq!(probe.processed.get(), 3);
    assert_eq!(proc.stats().cache_fills, 1);

    let ops = proc.process_frame(&mut node, &ctx);
    assert!(is_image(&ops));
    assert_eq!(probe.processed.get(), 3);
    assert_eq!(proc.stats().cache_hits, 1);
    assert_eq!(proc.stats().cached_targets, 1);
}

#[test]
fn change_invalidates_cache() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let probe = Probe::default();
    let mut node = Counter::new(&probe);
    let mut proc = processor(1);

    proc.process_frame(&mut node, &ctx);
    assert!(is_image(&proc.process_frame(&mut node, &ctx)));

    probe.dirty.set(true);
    let ops = proc.process_frame(&mut node, &ctx);
    assert!(!is_image(&ops));
    assert_eq!(proc.stats().cached_targets, 0);
}

#[test]
fn cached_replay_renders_identically() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let probe = Probe::default();
    let mut node = Counter::new(&probe);
    let mut proc = processor(1);

    let live = proc.process_frame(&mut node, &ctx);
    let cached = proc.process_frame(&mut node, &ctx);
    assert!(is_image(&cached));

    let a = render_ops_to_frame(&live, 8, 8, None).unwrap();
    let b = render_ops_to_frame(&cached, 8, 8, None).unwrap();
    assert_eq!(a.data, b.data);
}

#[test]
fn caching_respects_context_and_device() {
    let probe = Probe::default();
    let mut node = Counter::new(&probe);

    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx).without_cache();
    let mut proc = processor(1);
    for _ in 0..4 {
        assert!(!is_image(&proc.process_frame(&mut node, &ctx)));
    }

    let headless = GraphicsContext::unavailable("no device");
    let ctx = RenderNodeContext::new(&headless);
    for _ in 0..4 {
        assert!(!is_image(&proc.process_frame(&mut node, &ctx)));
    }
    assert_eq!(probe.processed.get(), 8);
    assert_eq!(proc.stats().cache_fills, 0);
}

#[test]
fn unvisited_caches_are_released() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let probe = Probe::default();
    let mut root = ContainerNode::new();
    root.push(Box::new(Counter::new(&probe)));
    let mut proc = processor(1);

    for _ in 0..3 {
        proc.process_frame(&mut root, &ctx);
    }
    assert!(proc.stats().cached_targets >= 1);

    let _ = root.remove(0);
    let ops = proc.process_frame(&mut root, &ctx);
    assert!(ops.is_empty());
    assert_eq!(proc.stats().cached_targets, 0);
    assert!(proc.stats().cache_evictions >= 1);
}

#[test]
fn shared_subtree_is_visited_through_every_reference() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx).without_cache();
    let probe = Probe::default();
    let target = shared(Counter::new(&probe));
    let mut root = ContainerNode::new();
    root.push(Box::new(ReferenceNode::new(target.clone())));
    root.push(Box::new(ReferenceNode::new(target)));

    let ops = processor(3).process_frame(&mut root, &ctx);
    assert_eq!(ops.len(), 2);
    assert_eq!(probe.processed.get(), 2);
}

#[test]
#[should_panic(expected = "processed after dispose")]
fn disposed_root_panics() {
    let gfx = GraphicsContext::cpu();
    let probe = Probe::default();
    let mut node = Counter::new(&probe);
    node.dispose();
    processor(1).process_frame(&mut node, &RenderNodeContext::new(&gfx));
}
