use std::{cell::RefCell, rc::Rc};

use crate::{
    foundation::{
        core::{Affine, Color, Point, Rect},
        error::FlurryResult,
    },
    graph::{
        filter::FilterEffectNode,
        node::{RenderNode, RenderNodeContext, SharedNode},
        nodes::{ReferenceNode, TransformNode},
        op::{RenderOp, ops_bounds},
        processor::{ProcessorOpts, ProcessorStats, RenderNodeProcessor},
    },
    model::{
        emitter::{EmitterResource, ParticleEmitter},
        filter::{FilterEffect, FilterEffectResource},
    },
    particles::{render_node::ParticleRenderNode, simulator::SimulatorOpts},
    render::{
        FrameRGBA, cpu::render_ops_to_frame, device::GraphicsContext,
        shader::BuiltinShaderCompiler,
    },
    resource::protocol::{Resource, UpdateContext},
};

/// Canvas, placement and engine tuning for a [`RenderSession`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSessionOpts {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Background the frame is cleared to; `None` leaves it transparent.
    pub clear: Option<Color>,
    /// Canvas position of the emitter's local origin.
    pub origin: Point,
    /// Whether stable subtrees may be cached as render targets.
    pub allow_render_cache: bool,
    /// Render node processor tuning.
    pub processor: ProcessorOpts,
    /// Simulator step and checkpoint tuning.
    pub simulator: SimulatorOpts,
}

impl Default for RenderSessionOpts {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            clear: None,
            origin: Point::new(320.0, 300.0),
            allow_render_cache: true,
            processor: ProcessorOpts::default(),
            simulator: SimulatorOpts::default(),
        }
    }
}

/// Counters for a [`RenderSession`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionStats {
    /// Frames rendered with [`RenderSession::render_frame`].
    pub frames: u64,
    /// Alive particles after the last update.
    pub alive: usize,
    /// Canvas-space bounds of the last frame's operations.
    pub bounds: Option<Rect>,
    /// Processor cache counters.
    pub processor: ProcessorStats,
}

struct FilterSlot {
    model: FilterEffect,
    resource: Rc<RefCell<FilterEffectResource>>,
}

/// One emitter rendered to frames: model, resources, node graph and graphics device.
///
/// The graph is `[FilterEffectNode] -> TransformNode(origin) -> ReferenceNode -> ParticleRenderNode`.
pub struct RenderSession {
    opts: RenderSessionOpts,
    gfx: GraphicsContext,
    compiler: BuiltinShaderCompiler,
    processor: RenderNodeProcessor,
    model: ParticleEmitter,
    emitter: Rc<RefCell<EmitterResource>>,
    particles: Rc<RefCell<ParticleRenderNode>>,
    filter: Option<FilterSlot>,
    root: Box<dyn RenderNode>,
    frames: u64,
    last_bounds: Option<Rect>,
}

impl RenderSession {
    /// Session on the CPU device. Fails when `model` does not validate.
    pub fn new(model: ParticleEmitter, opts: RenderSessionOpts) -> FlurryResult<Self> {
        Self::with_graphics(model, opts, GraphicsContext::cpu())
    }

    /// Session on an explicit graphics context.
    pub fn with_graphics(
        model: ParticleEmitter,
        opts: RenderSessionOpts,
        gfx: GraphicsContext,
    ) -> FlurryResult<Self> {
        model.validate()?;
        let compiler = BuiltinShaderCompiler;
        let ctx = UpdateContext::at(0.0).with_shader_compiler(&compiler);
        let emitter = Rc::new(RefCell::new(EmitterResource::with_opts(
            &model,
            &ctx,
            opts.simulator,
        )));
        let particles = Rc::new(RefCell::new(ParticleRenderNode::new(Rc::clone(&emitter))));
        let root = Self::build_root(&opts, &particles, None);
        Ok(Self {
            opts,
            gfx,
            compiler,
            processor: RenderNodeProcessor::new(opts.processor),
            model,
            emitter,
            particles,
            filter: None,
            root,
            frames: 0,
            last_bounds: None,
        })
    }

    /// Apply `effect` to the whole emitter output.
    pub fn with_filter(mut self, effect: FilterEffect) -> Self {
        self.set_filter(Some(effect));
        self
    }

    /// Replace or remove the whole-output filter. The previous filter resource is disposed.
    pub fn set_filter(&mut self, effect: Option<FilterEffect>) {
        self.root.dispose();
        if let Some(old) = self.filter.take() {
            old.resource.borrow_mut().dispose();
        }
        self.filter = effect.map(|model| {
            let ctx = UpdateContext::at(self.emitter.borrow().time())
                .with_shader_compiler(&self.compiler);
            let resource = Rc::new(RefCell::new(FilterEffectResource::from_model(&model, &ctx)));
            FilterSlot { model, resource }
        });
        let resource = self.filter.as_ref().map(|f| Rc::clone(&f.resource));
        self.root = Self::build_root(&self.opts, &self.particles, resource);
    }

    fn build_root(
        opts: &RenderSessionOpts,
        particles: &Rc<RefCell<ParticleRenderNode>>,
        filter: Option<Rc<RefCell<FilterEffectResource>>>,
    ) -> Box<dyn RenderNode> {
        let target: SharedNode = particles.clone();
        let placed: Box<dyn RenderNode> = Box::new(TransformNode::new(
            Affine::translate(opts.origin.to_vec2()),
            Box::new(ReferenceNode::new(target)),
        ));
        match filter {
            Some(effect) => Box::new(FilterEffectNode::new(effect, placed)),
            None => placed,
        }
    }

    /// Options the session was built with.
    pub fn opts(&self) -> &RenderSessionOpts {
        &self.opts
    }

    /// The graphics context.
    pub fn graphics(&self) -> &GraphicsContext {
        &self.gfx
    }

    /// The emitter model.
    pub fn model(&self) -> &ParticleEmitter {
        &self.model
    }

    /// Edit the emitter model; changes are picked up by the next update.
    pub fn model_mut(&mut self) -> &mut ParticleEmitter {
        &mut self.model
    }

    /// The filter model, if one is set.
    pub fn filter(&self) -> Option<&FilterEffect> {
        self.filter.as_ref().map(|f| &f.model)
    }

    /// Edit the filter model; changes are picked up by the next update.
    pub fn filter_mut(&mut self) -> Option<&mut FilterEffect> {
        self.filter.as_mut().map(|f| &mut f.model)
    }

    /// The emitter resource mirroring the model.
    pub fn emitter(&self) -> &Rc<RefCell<EmitterResource>> {
        &self.emitter
    }

    /// Copy model values at `time` into the resources and simulate.
    pub fn update(&mut self, time: f64) {
        let ctx = UpdateContext::at(time).with_shader_compiler(&self.compiler);
        let mut update_only = false;
        self.emitter
            .borrow_mut()
            .update(&self.model, &ctx, &mut update_only);
        if let Some(filter) = self.filter.as_ref() {
            filter
                .resource
                .borrow_mut()
                .update(&filter.model, &ctx, &mut update_only);
        }
    }

    /// Update to `time` and flatten the graph into canvas-space operations.
    pub fn evaluate(&mut self, time: f64) -> Vec<RenderOp> {
        self.update(time);
        let ctx = RenderNodeContext {
            allow_render_cache: self.opts.allow_render_cache,
            gfx: &self.gfx,
        };
        let ops = self.processor.process_frame(self.root.as_mut(), &ctx);
        self.last_bounds = ops_bounds(&ops);
        ops
    }

    /// Evaluate `time` and rasterize a premultiplied frame.
    #[tracing::instrument(skip(self), fields(width = self.opts.width, height = self.opts.height))]
    pub fn render_frame(&mut self, time: f64) -> FlurryResult<FrameRGBA> {
        let ops = self.evaluate(time);
        let clear = self.opts.clear.map(Color::to_rgba8);
        let frame = render_ops_to_frame(&ops, self.opts.width, self.opts.height, clear)?;
        self.frames += 1;
        tracing::debug!(
            ops = ops.len(),
            alive = self.emitter.borrow().simulator().alive(),
            "frame rendered"
        );
        Ok(frame)
    }

    /// Current counters.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames: self.frames,
            alive: self.emitter.borrow().simulator().alive(),
            bounds: self.last_bounds,
            processor: self.processor.stats(),
        }
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("opts", &self.opts)
            .field("gfx", &self.gfx)
            .field("frames", &self.frames)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.processor.clear();
        self.root.dispose();
        self.particles.borrow_mut().dispose();
        if let Some(filter) = self.filter.take() {
            filter.resource.borrow_mut().dispose();
        }
        self.emitter.borrow_mut().dispose();
        self.gfx.shutdown();
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
