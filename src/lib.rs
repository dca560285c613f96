//! Flurry is a retained-mode render graph with a deterministic, seekable particle simulator.
//!
//! User-editable models are mirrored into versioned resources once per frame; render nodes read
//! those resources and flatten into draw operations, caching stable subtrees as render targets.
//!
//! - Describe an emitter with a [`ParticleEmitter`]
//! - Create a [`RenderSession`]
//! - Render any timeline time with [`RenderSession::render_frame`], in any order
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub(crate) mod animation;
pub(crate) mod foundation;
pub(crate) mod graph;
pub(crate) mod model;
pub(crate) mod particles;
pub(crate) mod render;
pub(crate) mod resource;
/// Session-oriented rendering API.
pub mod session;

pub use crate::foundation::core::{
    Affine, BezPath, Color, Point, Rect, Size, Vec2, rect_is_empty, union_bounds,
};
pub use crate::foundation::error::{FlurryError, FlurryResult};
pub use crate::foundation::ids::{ModelId, NodeId, ResourceId};

pub use crate::animation::anim::{Animatable, InterpMode, Keyframe, Keyframes, Lerp};
pub use crate::animation::ease::Ease;

pub use crate::resource::protocol::{
    Model, PropertyInfo, PropertyKind, Resource, UpdateContext, compare_and_update_nested,
};
pub use crate::resource::value::{ResourceValue, compare_and_update};

pub use crate::render::FrameRGBA;
pub use crate::render::canvas::{Canvas, CanvasCall, CanvasState, RecordingCanvas};
pub use crate::render::cpu::{CpuCanvas, MAX_TARGET_DIM, rasterize_ops, render_ops_to_frame};
pub use crate::render::device::{CpuDevice, GraphicsContext, GraphicsDevice};
pub use crate::render::image::{RasterImage, RenderTarget};
pub use crate::render::shader::{BuiltinShaderCompiler, PixelShader, ShaderCompiler};

pub use crate::graph::filter::FilterEffectNode;
pub use crate::graph::node::{RenderNode, RenderNodeContext, SharedNode, shared};
pub use crate::graph::nodes::{
    ContainerNode, DrawableNode, LambdaNode, OpacityNode, ReferenceNode, TransformNode,
};
pub use crate::graph::op::{DrawCommand, DrawFn, HitTestFn, RenderOp, hit_test, ops_bounds};
pub use crate::graph::processor::{ProcessorOpts, ProcessorStats, RenderNodeProcessor};

pub use crate::model::drawable::{Drawable, DrawableKind, DrawableResource, DrawableShape};
pub use crate::model::emitter::{EmitterResource, ParticleEmitter};
pub use crate::model::filter::{FilterEffect, FilterEffectResource};

pub use crate::particles::noise::Perlin3;
pub use crate::particles::particle::{EmitterParams, EmitterShape, MIN_LIFETIME, Particle};
pub use crate::particles::render_node::{
    FALLBACK_SPRITE_SIZE, ParticleRenderNode, SpriteKey, particle_transform,
};
pub use crate::particles::rng::Rng64;
pub use crate::particles::simulator::{
    Checkpoint, ParticleSimulator, SimulationRun, SimulatorOpts,
};

pub use crate::session::{RenderSession, RenderSessionOpts, SessionStats};
