use std::collections::HashMap;

use crate::{
    foundation::ids::NodeId,
    graph::{
        node::{RenderNode, RenderNodeContext, assert_live},
        op::{RenderOp, ops_bounds},
    },
    render::image::RenderTarget,
};

/// Tuning for [`RenderNodeProcessor`]. `FLURRY_CACHE_AFTER_FRAMES` overrides the default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessorOpts {
    /// Frames a cacheable subtree must stay unchanged before it is rasterized and replayed.
    pub cache_after_frames: u32,
}

impl Default for ProcessorOpts {
    fn default() -> Self {
        let cache_after_frames = std::env::var("FLURRY_CACHE_AFTER_FRAMES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(3);
        Self { cache_after_frames }
    }
}

/// Counters since the processor was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Frames processed.
    pub frames: u64,
    /// Subtrees replayed from a render target.
    pub cache_hits: u64,
    /// Render targets created.
    pub cache_fills: u64,
    /// Render targets dropped because their subtree changed or vanished.
    pub cache_evictions: u64,
    /// Render targets currently held.
    pub cached_targets: usize,
}

#[derive(Debug, Default)]
struct CacheEntry {
    stable_frames: u32,
    target: Option<RenderTarget>,
    /// Rasterization failed for the current content; retried after the next change.
    failed: bool,
    last_seen: u64,
}

impl CacheEntry {
    fn invalidate(&mut self) -> bool {
        self.stable_frames = 0;
        self.failed = false;
        match self.target.take() {
            Some(mut target) => {
                target.dispose();
                true
            }
            None => false,
        }
    }
}

/// Flattens render node trees into operation lists, caching stable subtrees as render targets.
#[derive(Debug, Default)]
pub struct RenderNodeProcessor {
    opts: ProcessorOpts,
    caches: HashMap<NodeId, CacheEntry>,
    frame: u64,
    stats: ProcessorStats,
}

impl RenderNodeProcessor {
    /// Processor with no cached subtrees.
    pub fn new(opts: ProcessorOpts) -> Self {
        Self {
            opts,
            caches: HashMap::new(),
            frame: 0,
            stats: ProcessorStats::default(),
        }
    }

    /// Options this processor was built with.
    pub fn opts(&self) -> ProcessorOpts {
        self.opts
    }

    /// Current counters.
    pub fn stats(&self) -> ProcessorStats {
        ProcessorStats {
            cached_targets: self.caches.values().filter(|e| e.target.is_some()).count(),
            ..self.stats
        }
    }

    /// Depth-first flatten of `node`'s subtree, children first, without any caching.
    pub fn pull_to_root(node: &mut dyn RenderNode, ctx: &RenderNodeContext<'_>) -> Vec<RenderOp> {
        assert_live(node);
        let mut input = Vec::new();
        node.for_each_child(&mut |child| input.extend(Self::pull_to_root(child, ctx)));
        node.process(ctx, input)
    }

    /// Evaluate one frame of the tree rooted at `root`.
    ///
    /// Clears every visited node's change flag. Cache entries of nodes that were not visited
    /// this frame are released.
    #[tracing::instrument(skip_all, fields(frame = self.frame + 1))]
    pub fn process_frame(
        &mut self,
        root: &mut dyn RenderNode,
        ctx: &RenderNodeContext<'_>,
    ) -> Vec<RenderOp> {
        self.frame += 1;
        self.stats.frames += 1;
        let caching = ctx.allow_render_cache && ctx.gfx.is_available();
        let (ops, _) = self.visit(root, ctx, caching);

        let frame = self.frame;
        let mut evicted = 0u64;
        self.caches.retain(|_, entry| {
            if entry.last_seen == frame {
                return true;
            }
            entry.invalidate();
            evicted += 1;
            false
        });
        if evicted > 0 {
            tracing::debug!(evicted, "released caches of unvisited nodes");
        }
        self.stats.cache_evictions += evicted;
        ops
    }

    /// Release every cached render target.
    pub fn clear(&mut self) {
        for entry in self.caches.values_mut() {
            entry.invalidate();
        }
        self.caches.clear();
    }

    fn visit(
        &mut self,
        node: &mut dyn RenderNode,
        ctx: &RenderNodeContext<'_>,
        caching: bool,
    ) -> (Vec<RenderOp>, bool) {
        assert_live(node);
        let mut input = Vec::new();
        let mut child_changed = false;
        node.for_each_child(&mut |child| {
            let (ops, changed) = self.visit(child, ctx, caching);
            child_changed |= changed;
            input.extend(ops);
        });

        let changed = child_changed || node.has_changes();
        node.clear_changes();

        if !(caching && node.cacheable()) {
            return (node.process(ctx, input), changed);
        }

        let id = node.id();
        let frame = self.frame;
        let entry = self.caches.entry(id).or_default();
        entry.last_seen = frame;
        if changed {
            if entry.invalidate() {
                tracing::trace!(node = id.raw(), "cached subtree invalidated");
            }
        } else {
            entry.stable_frames = entry.stable_frames.saturating_add(1);
        }

        if let Some(target) = &entry.target {
            self.stats.cache_hits += 1;
            return (vec![RenderOp::render_target(target)], changed);
        }

        let ops = node.process(ctx, input);
        if entry.failed || entry.stable_frames < self.opts.cache_after_frames {
            return (ops, changed);
        }
        let Some(bounds) = ops_bounds(&ops) else {
            return (ops, changed);
        };

        match ctx.gfx.rasterize(&ops, bounds) {
            Ok(target) => {
                tracing::debug!(node = id.raw(), w = target.image().width(), h = target.image().height(), "cached stable subtree");
                let op = RenderOp::render_target(&target);
                entry.target = Some(target);
                self.stats.cache_fills += 1;
                (vec![op], changed)
            }
            Err(err) => {
                tracing::debug!(node = id.raw(), error = %err, "subtree not cacheable");
                entry.failed = true;
                (ops, changed)
            }
        }
    }
}

impl Drop for RenderNodeProcessor {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/processor.rs"]
mod tests;
