use crate::{
    foundation::{core::Color, math::lerp_f32},
    particles::rng::Rng64,
    resource::value::ResourceValue,
};

/// Minimum particle lifetime in seconds; keeps the life fraction finite.
pub const MIN_LIFETIME: f64 = 0.01;

/// One simulated particle. Plain value; identity is only its slot while alive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// Simulation time of emission, seconds.
    pub birth_time: f64,
    /// Seconds from birth to death.
    pub lifetime: f32,
    /// Position relative to the emitter origin, pixels.
    pub x: f32,
    /// Position relative to the emitter origin, pixels; +y is down.
    pub y: f32,
    /// Velocity, pixels per second.
    pub vx: f32,
    /// Velocity, pixels per second.
    pub vy: f32,
    /// Radians.
    pub rotation: f32,
    /// Radians per second.
    pub angular_velocity: f32,
    /// Scale at birth.
    pub base_size: f32,
    /// Scale at the current time.
    pub size: f32,
    /// Opacity at birth.
    pub base_opacity: f32,
    /// Opacity at the current time.
    pub opacity: f32,
    /// Tint at birth.
    pub base_color: Color,
    /// Tint at the current time.
    pub color: Color,
    /// False once the particle outlived its lifetime.
    pub alive: bool,
    size_scale: f32,
    opacity_offset: f32,
    color_scale: f32,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            birth_time: 0.0,
            lifetime: MIN_LIFETIME as f32,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            rotation: 0.0,
            angular_velocity: 0.0,
            base_size: 0.0,
            size: 0.0,
            base_opacity: 0.0,
            opacity: 0.0,
            base_color: Color::WHITE,
            color: Color::WHITE,
            alive: false,
            size_scale: 1.0,
            opacity_offset: 0.0,
            color_scale: 1.0,
        }
    }
}

impl Particle {
    /// Draw a new particle born at `birth_time`.
    ///
    /// The order of RNG draws is fixed; replays from a checkpoint depend on it.
    pub(crate) fn spawn(birth_time: f64, p: &EmitterParams, rng: &mut Rng64) -> Self {
        let lifetime = (p.lifetime * (1.0 + p.lifetime_random * rng.next_signed())).max(MIN_LIFETIME);
        let u = rng.next_f64_01();
        let v = rng.next_f64_01();
        let (x, y) = p.shape.sample(u, v);
        let speed = (p.speed * (1.0 + p.speed_random * rng.next_signed())).max(0.0);
        let angle = (p.direction + p.spread * rng.next_signed()).to_radians();
        let size_scale = (1.0 + p.size_random * rng.next_signed()).max(0.0) as f32;
        let color_scale = (1.0 + p.color_random * rng.next_signed()).max(0.0) as f32;
        let opacity_offset = (p.opacity_random * rng.next_signed()) as f32;
        let rotation = (p.rotation + p.rotation_random * rng.next_signed()).to_radians();
        let angular_velocity =
            (p.angular_velocity + p.angular_velocity_random * rng.next_signed()).to_radians();

        let base_size = p.start_size as f32 * size_scale;
        let base_opacity = (p.start_opacity as f32 + opacity_offset).clamp(0.0, 1.0);
        let base_color = clamp_color(p.start_color.scale_rgb(color_scale));

        Self {
            birth_time,
            lifetime: lifetime as f32,
            x: x as f32,
            y: y as f32,
            vx: (speed * angle.cos()) as f32,
            vy: (speed * angle.sin()) as f32,
            rotation: rotation as f32,
            angular_velocity: angular_velocity as f32,
            base_size,
            size: base_size,
            base_opacity,
            opacity: base_opacity,
            base_color,
            color: base_color,
            alive: true,
            size_scale,
            opacity_offset,
            color_scale,
        }
    }

    /// Recompute size, opacity and color for life fraction `t` in `[0, 1]`.
    pub(crate) fn apply_over_life(&mut self, p: &EmitterParams, t: f32) {
        self.size = lerp_f32(p.start_size as f32, p.end_size as f32, t) * self.size_scale;
        let opacity = lerp_f32(p.start_opacity as f32, p.end_opacity as f32, t);
        self.opacity = (opacity + self.opacity_offset).clamp(0.0, 1.0);
        self.color = clamp_color(Color::lerp(p.start_color, p.end_color, t).scale_rgb(self.color_scale));
    }

    /// Seconds since birth at simulation `time`.
    pub fn age(&self, time: f64) -> f64 {
        time - self.birth_time
    }
}

fn clamp_color(c: Color) -> Color {
    Color::new(
        c.r.clamp(0.0, 1.0),
        c.g.clamp(0.0, 1.0),
        c.b.clamp(0.0, 1.0),
        c.a.clamp(0.0, 1.0),
    )
}

/// Spawn region, centered on the emitter origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmitterShape {
    /// All particles spawn at the origin.
    #[default]
    Point,
    /// Horizontal segment.
    Line {
        /// Extent along x.
        width: f64,
    },
    /// Uniform disc.
    Circle {
        /// Disc radius.
        radius: f64,
    },
    /// Axis-aligned rectangle.
    Box {
        /// Extent along x.
        width: f64,
        /// Extent along y.
        height: f64,
    },
}

impl EmitterShape {
    /// Map two uniform draws in `[0, 1)` to a spawn offset.
    pub fn sample(self, u: f64, v: f64) -> (f64, f64) {
        match self {
            Self::Point => (0.0, 0.0),
            Self::Line { width } => ((u - 0.5) * width, 0.0),
            Self::Circle { radius } => {
                let r = u.sqrt() * radius;
                let a = v * std::f64::consts::TAU;
                (r * a.cos(), r * a.sin())
            }
            Self::Box { width, height } => ((u - 0.5) * width, (v - 0.5) * height),
        }
    }

    fn sanitized(self) -> Self {
        fn dim(v: f64) -> f64 {
            if v.is_finite() { v.max(0.0) } else { 0.0 }
        }
        match self {
            Self::Point => Self::Point,
            Self::Line { width } => Self::Line { width: dim(width) },
            Self::Circle { radius } => Self::Circle {
                radius: dim(radius),
            },
            Self::Box { width, height } => Self::Box {
                width: dim(width),
                height: dim(height),
            },
        }
    }
}

impl ResourceValue for EmitterShape {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Point, Self::Point) => true,
            (Self::Line { width: a }, Self::Line { width: b }) => a.same_value(b),
            (Self::Circle { radius: a }, Self::Circle { radius: b }) => a.same_value(b),
            (
                Self::Box {
                    width: aw,
                    height: ah,
                },
                Self::Box {
                    width: bw,
                    height: bh,
                },
            ) => aw.same_value(bw) && ah.same_value(bh),
            _ => false,
        }
    }
}

/// Emitter parameters as copied into a resource for one frame.
///
/// Angles are degrees, angular velocity degrees per second, distances pixels, times seconds.
/// Direction 0 points along +x and 90 along +y (down).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmitterParams {
    /// Live particle cap; emission stops while it is reached.
    pub max_particles: u32,
    /// Particles per second.
    pub emission_rate: f64,
    /// Seconds a particle lives.
    pub lifetime: f64,
    /// Relative lifetime jitter; 0.5 allows +-50%.
    pub lifetime_random: f64,
    /// Spawn region.
    pub shape: EmitterShape,
    /// Launch direction in degrees.
    pub direction: f64,
    /// Launch angle jitter in degrees, either side of `direction`.
    pub spread: f64,
    /// Launch speed in pixels per second.
    pub speed: f64,
    /// Relative speed jitter.
    pub speed_random: f64,
    /// Scale at birth.
    pub start_size: f64,
    /// Scale at death.
    pub end_size: f64,
    /// Relative size jitter, fixed per particle.
    pub size_random: f64,
    /// Opacity at birth.
    pub start_opacity: f64,
    /// Opacity at death.
    pub end_opacity: f64,
    /// Absolute opacity offset jitter, fixed per particle.
    pub opacity_random: f64,
    /// Tint at birth.
    pub start_color: Color,
    /// Tint at death.
    pub end_color: Color,
    /// Relative brightness jitter of the tint.
    pub color_random: f64,
    /// Initial rotation in degrees.
    pub rotation: f64,
    /// Initial rotation jitter in degrees.
    pub rotation_random: f64,
    /// Spin in degrees per second.
    pub angular_velocity: f64,
    /// Spin jitter in degrees per second.
    pub angular_velocity_random: f64,
    /// Downward acceleration in pixels per second squared.
    pub gravity: f64,
    /// Fraction of velocity lost per second.
    pub air_resistance: f64,
    /// Noise force in pixels per second squared; 0 disables turbulence.
    pub turbulence_strength: f64,
    /// Spatial frequency of the noise field.
    pub turbulence_scale: f64,
    /// How fast the noise field evolves over time.
    pub turbulence_speed: f64,
    /// Seed of every random draw.
    pub seed: u64,
}

impl Default for EmitterParams {
    fn default() -> Self {
        Self {
            max_particles: 1000,
            emission_rate: 30.0,
            lifetime: 2.0,
            lifetime_random: 0.0,
            shape: EmitterShape::Point,
            direction: -90.0,
            spread: 15.0,
            speed: 100.0,
            speed_random: 0.0,
            start_size: 1.0,
            end_size: 1.0,
            size_random: 0.0,
            start_opacity: 1.0,
            end_opacity: 0.0,
            opacity_random: 0.0,
            start_color: Color::WHITE,
            end_color: Color::WHITE,
            color_random: 0.0,
            rotation: 0.0,
            rotation_random: 0.0,
            angular_velocity: 0.0,
            angular_velocity_random: 0.0,
            gravity: 0.0,
            air_resistance: 0.0,
            turbulence_strength: 0.0,
            turbulence_scale: 0.01,
            turbulence_speed: 1.0,
            seed: 0,
        }
    }
}

impl EmitterParams {
    /// Normalize values coming from live editing: non-finite numbers become neutral, rates and
    /// randomness amounts are clamped non-negative and lifetime to at least [`MIN_LIFETIME`].
    pub fn sanitized(&self) -> Self {
        fn finite_or(v: f64, fallback: f64) -> f64 {
            if v.is_finite() { v } else { fallback }
        }
        fn amount(v: f64) -> f64 {
            finite_or(v, 0.0).max(0.0)
        }

        Self {
            max_particles: self.max_particles,
            emission_rate: amount(self.emission_rate),
            lifetime: finite_or(self.lifetime, MIN_LIFETIME).max(MIN_LIFETIME),
            lifetime_random: amount(self.lifetime_random).min(1.0),
            shape: self.shape.sanitized(),
            direction: finite_or(self.direction, 0.0),
            spread: amount(self.spread),
            speed: finite_or(self.speed, 0.0),
            speed_random: amount(self.speed_random),
            start_size: amount(self.start_size),
            end_size: amount(self.end_size),
            size_random: amount(self.size_random),
            start_opacity: finite_or(self.start_opacity, 0.0).clamp(0.0, 1.0),
            end_opacity: finite_or(self.end_opacity, 0.0).clamp(0.0, 1.0),
            opacity_random: amount(self.opacity_random),
            start_color: self.start_color,
            end_color: self.end_color,
            color_random: amount(self.color_random),
            rotation: finite_or(self.rotation, 0.0),
            rotation_random: amount(self.rotation_random),
            angular_velocity: finite_or(self.angular_velocity, 0.0),
            angular_velocity_random: amount(self.angular_velocity_random),
            gravity: finite_or(self.gravity, 0.0),
            air_resistance: amount(self.air_resistance),
            turbulence_strength: finite_or(self.turbulence_strength, 0.0),
            turbulence_scale: finite_or(self.turbulence_scale, 0.0),
            turbulence_speed: finite_or(self.turbulence_speed, 0.0),
            seed: self.seed,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/particles/particle.rs"]
mod tests;
