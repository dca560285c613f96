use std::path::Path;

use anyhow::Context as _;

use crate::{
    animation::anim::Animatable,
    foundation::core::Color,
    foundation::error::FlurryResult,
    foundation::ids::{ModelId, ResourceId},
    model::drawable::{Drawable, DrawableResource},
    particles::{
        particle::{EmitterParams, EmitterShape, Particle},
        simulator::{ParticleSimulator, SimulatorOpts},
    },
    resource::{
        protocol::{
            Model, PropertyInfo, PropertyKind, Resource, UpdateContext, commit_version,
            compare_and_update_nested,
        },
        value::compare_and_update,
    },
};

/// User-editable particle emitter. Every numeric parameter may be keyframed.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ParticleEmitter {
    #[serde(skip, default = "ModelId::next")]
    id: ModelId,
    /// Live particle cap; emission stops while it is reached.
    pub max_particles: u32,
    /// Particles per second.
    pub emission_rate: Animatable<f64>,
    /// Seconds a particle lives.
    pub lifetime: Animatable<f64>,
    /// Relative lifetime jitter; 0.5 allows +-50%.
    pub lifetime_random: Animatable<f64>,
    /// Spawn region.
    pub shape: EmitterShape,
    /// Launch direction in degrees.
    pub direction: Animatable<f64>,
    /// Launch angle jitter in degrees, either side of `direction`.
    pub spread: Animatable<f64>,
    /// Launch speed in pixels per second.
    pub speed: Animatable<f64>,
    /// Relative speed jitter.
    pub speed_random: Animatable<f64>,
    /// Scale at birth.
    pub start_size: Animatable<f64>,
    /// Scale at death.
    pub end_size: Animatable<f64>,
    /// Relative size jitter, fixed per particle.
    pub size_random: Animatable<f64>,
    /// Opacity at birth.
    pub start_opacity: Animatable<f64>,
    /// Opacity at death.
    pub end_opacity: Animatable<f64>,
    /// Absolute opacity offset jitter, fixed per particle.
    pub opacity_random: Animatable<f64>,
    /// Tint at birth.
    pub start_color: Animatable<Color>,
    /// Tint at death.
    pub end_color: Animatable<Color>,
    /// Relative brightness jitter of the tint.
    pub color_random: Animatable<f64>,
    /// Initial rotation in degrees.
    pub rotation: Animatable<f64>,
    /// Initial rotation jitter in degrees.
    pub rotation_random: Animatable<f64>,
    /// Spin in degrees per second.
    pub angular_velocity: Animatable<f64>,
    /// Spin jitter in degrees per second.
    pub angular_velocity_random: Animatable<f64>,
    /// Downward acceleration in pixels per second squared.
    pub gravity: Animatable<f64>,
    /// Fraction of velocity lost per second.
    pub air_resistance: Animatable<f64>,
    /// Noise force in pixels per second squared; 0 disables turbulence.
    pub turbulence_strength: Animatable<f64>,
    /// Spatial frequency of the noise field.
    pub turbulence_scale: Animatable<f64>,
    /// How fast the noise field evolves over time.
    pub turbulence_speed: Animatable<f64>,
    /// Seed of every random draw.
    pub seed: u64,
    /// Sprite drawn per particle; a small white ellipse when absent.
    pub drawable: Option<Drawable>,
}

impl Default for ParticleEmitter {
    fn default() -> Self {
        Self::from_params(&EmitterParams::default())
    }
}

impl ParticleEmitter {
    /// Emitter with constant values taken from `p`.
    pub fn from_params(p: &EmitterParams) -> Self {
        Self {
            id: ModelId::next(),
            max_particles: p.max_particles,
            emission_rate: p.emission_rate.into(),
            lifetime: p.lifetime.into(),
            lifetime_random: p.lifetime_random.into(),
            shape: p.shape,
            direction: p.direction.into(),
            spread: p.spread.into(),
            speed: p.speed.into(),
            speed_random: p.speed_random.into(),
            start_size: p.start_size.into(),
            end_size: p.end_size.into(),
            size_random: p.size_random.into(),
            start_opacity: p.start_opacity.into(),
            end_opacity: p.end_opacity.into(),
            opacity_random: p.opacity_random.into(),
            start_color: p.start_color.into(),
            end_color: p.end_color.into(),
            color_random: p.color_random.into(),
            rotation: p.rotation.into(),
            rotation_random: p.rotation_random.into(),
            angular_velocity: p.angular_velocity.into(),
            angular_velocity_random: p.angular_velocity_random.into(),
            gravity: p.gravity.into(),
            air_resistance: p.air_resistance.into(),
            turbulence_strength: p.turbulence_strength.into(),
            turbulence_scale: p.turbulence_scale.into(),
            turbulence_speed: p.turbulence_speed.into(),
            seed: p.seed,
            drawable: None,
        }
    }

    /// Parse and validate an emitter. Drawable files are not loaded; see [`Self::from_path`].
    pub fn from_json(json: &str) -> FlurryResult<Self> {
        let emitter: Self = serde_json::from_str(json)?;
        emitter.validate()?;
        Ok(emitter)
    }

    /// Load an emitter JSON file and prepare its sprite relative to the file's directory.
    pub fn from_path(path: &Path) -> FlurryResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read emitter '{}'", path.display()))?;
        let mut emitter = Self::from_json(&json)?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        if let Some(drawable) = emitter.drawable.as_mut() {
            drawable.prepare(root)?;
        }
        Ok(emitter)
    }

    /// Use `drawable` as the particle sprite.
    pub fn with_drawable(mut self, drawable: Drawable) -> Self {
        self.drawable = Some(drawable);
        self
    }

    /// Parameter values at timeline `time`.
    pub fn params_at(&self, time: f64) -> EmitterParams {
        EmitterParams {
            max_particles: self.max_particles,
            emission_rate: self.emission_rate.sample(time),
            lifetime: self.lifetime.sample(time),
            lifetime_random: self.lifetime_random.sample(time),
            shape: self.shape,
            direction: self.direction.sample(time),
            spread: self.spread.sample(time),
            speed: self.speed.sample(time),
            speed_random: self.speed_random.sample(time),
            start_size: self.start_size.sample(time),
            end_size: self.end_size.sample(time),
            size_random: self.size_random.sample(time),
            start_opacity: self.start_opacity.sample(time),
            end_opacity: self.end_opacity.sample(time),
            opacity_random: self.opacity_random.sample(time),
            start_color: self.start_color.sample(time),
            end_color: self.end_color.sample(time),
            color_random: self.color_random.sample(time),
            rotation: self.rotation.sample(time),
            rotation_random: self.rotation_random.sample(time),
            angular_velocity: self.angular_velocity.sample(time),
            angular_velocity_random: self.angular_velocity_random.sample(time),
            gravity: self.gravity.sample(time),
            air_resistance: self.air_resistance.sample(time),
            turbulence_strength: self.turbulence_strength.sample(time),
            turbulence_scale: self.turbulence_scale.sample(time),
            turbulence_speed: self.turbulence_speed.sample(time),
            seed: self.seed,
        }
    }

    /// Check keyframe tracks and the sprite. Out-of-range values are not errors; they are
    /// clamped when simulated.
    pub fn validate(&self) -> FlurryResult<()> {
        let scalars = [
            ("emission_rate", &self.emission_rate),
            ("lifetime", &self.lifetime),
            ("lifetime_random", &self.lifetime_random),
            ("direction", &self.direction),
            ("spread", &self.spread),
            ("speed", &self.speed),
            ("speed_random", &self.speed_random),
            ("start_size", &self.start_size),
            ("end_size", &self.end_size),
            ("size_random", &self.size_random),
            ("start_opacity", &self.start_opacity),
            ("end_opacity", &self.end_opacity),
            ("opacity_random", &self.opacity_random),
            ("color_random", &self.color_random),
            ("rotation", &self.rotation),
            ("rotation_random", &self.rotation_random),
            ("angular_velocity", &self.angular_velocity),
            ("angular_velocity_random", &self.angular_velocity_random),
            ("gravity", &self.gravity),
            ("air_resistance", &self.air_resistance),
            ("turbulence_strength", &self.turbulence_strength),
            ("turbulence_scale", &self.turbulence_scale),
            ("turbulence_speed", &self.turbulence_speed),
        ];
        for (name, value) in scalars {
            value.validate(name)?;
        }
        self.start_color.validate("start_color")?;
        self.end_color.validate("end_color")?;
        if let Some(drawable) = &self.drawable {
            drawable.validate()?;
        }
        Ok(())
    }
}

impl Model for ParticleEmitter {
    const PROPERTIES: &'static [PropertyInfo] = &[
        PropertyInfo::new("max_particles", PropertyKind::Integer, false),
        PropertyInfo::new("emission_rate", PropertyKind::Float, true),
        PropertyInfo::new("lifetime", PropertyKind::Float, true),
        PropertyInfo::new("lifetime_random", PropertyKind::Float, true),
        PropertyInfo::new("shape", PropertyKind::Enum, false),
        PropertyInfo::new("direction", PropertyKind::Float, true),
        PropertyInfo::new("spread", PropertyKind::Float, true),
        PropertyInfo::new("speed", PropertyKind::Float, true),
        PropertyInfo::new("speed_random", PropertyKind::Float, true),
        PropertyInfo::new("start_size", PropertyKind::Float, true),
        PropertyInfo::new("end_size", PropertyKind::Float, true),
        PropertyInfo::new("size_random", PropertyKind::Float, true),
        PropertyInfo::new("start_opacity", PropertyKind::Float, true),
        PropertyInfo::new("end_opacity", PropertyKind::Float, true),
        PropertyInfo::new("opacity_random", PropertyKind::Float, true),
        PropertyInfo::new("start_color", PropertyKind::Color, true),
        PropertyInfo::new("end_color", PropertyKind::Color, true),
        PropertyInfo::new("color_random", PropertyKind::Float, true),
        PropertyInfo::new("rotation", PropertyKind::Float, true),
        PropertyInfo::new("rotation_random", PropertyKind::Float, true),
        PropertyInfo::new("angular_velocity", PropertyKind::Float, true),
        PropertyInfo::new("angular_velocity_random", PropertyKind::Float, true),
        PropertyInfo::new("gravity", PropertyKind::Float, true),
        PropertyInfo::new("air_resistance", PropertyKind::Float, true),
        PropertyInfo::new("turbulence_strength", PropertyKind::Float, true),
        PropertyInfo::new("turbulence_scale", PropertyKind::Float, true),
        PropertyInfo::new("turbulence_speed", PropertyKind::Float, true),
        PropertyInfo::new("seed", PropertyKind::Integer, false),
        PropertyInfo::new("drawable", PropertyKind::Nested, false),
    ];

    fn id(&self) -> ModelId {
        self.id
    }
}

macro_rules! track {
    ($dst:expr, $src:expr, $changed:expr; $($field:ident),* $(,)?) => {
        $( compare_and_update(&mut $dst.$field, $src.$field, &mut $changed); )*
    };
}

/// Per-render mirror of a [`ParticleEmitter`] owning its simulator.
///
/// `version` moves when any copied parameter, the timeline time or the sprite changed;
/// `sim_version` moves only with simulation parameters and drives checkpoint invalidation.
#[derive(Debug)]
pub struct EmitterResource {
    id: ResourceId,
    model_id: ModelId,
    version: u64,
    params: EmitterParams,
    sim_version: u64,
    time: f64,
    drawable: Option<DrawableResource>,
    simulator: ParticleSimulator,
    simulated: Option<(u64, u64)>,
    disposed: bool,
}

impl EmitterResource {
    /// Mirror `model` at `ctx.time` and simulate to that time.
    pub fn with_opts(model: &ParticleEmitter, ctx: &UpdateContext<'_>, opts: SimulatorOpts) -> Self {
        let mut resource = Self {
            id: ResourceId::next(),
            model_id: model.id,
            version: 0,
            params: model.params_at(ctx.time),
            sim_version: 0,
            time: ctx.time,
            drawable: model
                .drawable
                .as_ref()
                .map(|d| DrawableResource::from_model(d, ctx)),
            simulator: ParticleSimulator::new(opts),
            simulated: None,
            disposed: false,
        };
        resource.ensure_simulated();
        resource
    }

    /// Parameters copied at the last update.
    pub fn params(&self) -> &EmitterParams {
        &self.params
    }

    /// Bumped whenever the copied parameters change.
    pub fn sim_version(&self) -> u64 {
        self.sim_version
    }

    /// Timeline time of the last update.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Sprite drawable mirror, if the model has one.
    pub fn drawable(&self) -> Option<&DrawableResource> {
        self.drawable.as_ref()
    }

    /// Mutable sprite drawable mirror.
    pub fn drawable_mut(&mut self) -> Option<&mut DrawableResource> {
        self.drawable.as_mut()
    }

    /// The simulator; its particles trail the copied time until simulated.
    pub fn simulator(&self) -> &ParticleSimulator {
        &self.simulator
    }

    /// Whether the live particles lag behind the copied time or parameters.
    pub fn needs_simulation(&self) -> bool {
        self.simulated != Some((self.time.to_bits(), self.sim_version))
    }

    /// Run deferred work: simulate to the copied time and prepare the sprite.
    pub fn ensure_simulated(&mut self) -> bool {
        if self.disposed {
            panic!("emitter resource used after dispose");
        }
        if let Some(drawable) = self.drawable.as_mut() {
            drawable.ensure_prepared();
        }
        if !self.needs_simulation() {
            return false;
        }
        self.simulator
            .simulate(self.time, &self.params, self.sim_version);
        self.simulated = Some((self.time.to_bits(), self.sim_version));
        true
    }

    /// Alive particles as of the last simulation.
    pub fn particles(&self) -> &[Particle] {
        if self.disposed {
            panic!("emitter resource used after dispose");
        }
        self.simulator.particles()
    }
}

impl Resource for EmitterResource {
    type Model = ParticleEmitter;

    fn from_model(model: &ParticleEmitter, ctx: &UpdateContext<'_>) -> Self {
        Self::with_opts(model, ctx, SimulatorOpts::default())
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

    #[tracing::instrument(level = "trace", skip_all, fields(time = ctx.time))]
    fn update(&mut self, model: &ParticleEmitter, ctx: &UpdateContext<'_>, update_only: &mut bool) {
        let next = model.params_at(ctx.time);
        let mut params_changed = false;
        track!(self.params, next, params_changed;
            max_particles, emission_rate, lifetime, lifetime_random, shape, direction, spread,
            speed, speed_random, start_size, end_size, size_random, start_opacity, end_opacity,
            opacity_random, start_color, end_color, color_random, rotation, rotation_random,
            angular_velocity, angular_velocity_random, gravity, air_resistance,
            turbulence_strength, turbulence_scale, turbulence_speed, seed,
        );
        if params_changed {
            self.sim_version += 1;
        }

        let mut changed = params_changed;
        compare_and_update(&mut self.time, ctx.time, &mut changed);
        compare_and_update_nested(
            &mut self.drawable,
            model.drawable.as_ref(),
            ctx,
            update_only,
            &mut changed,
        );

        if !*update_only {
            self.ensure_simulated();
        }
        commit_version(&mut self.version, changed);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(mut drawable) = self.drawable.take() {
            drawable.dispose();
        }
        self.simulator.reset();
        self.simulated = None;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/emitter.rs"]
mod tests;
