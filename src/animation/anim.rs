use crate::{
    animation::ease::Ease,
    foundation::core::{Color, Vec2},
    foundation::error::{FlurryError, FlurryResult},
};

/// Interpolation between two values of a keyframed property.
pub trait Lerp: Sized {
    /// Value at fraction `t` between `a` and `b`.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for f32 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        (*a as f64 + ((*b as f64 - *a as f64) * t)) as f32
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Vec2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
    }
}

impl Lerp for Color {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Color::lerp(*a, *b, t as f32)
    }
}

/// A model property that is either fixed or keyframed over timeline seconds.
///
/// Deserializes untagged: a bare value is a constant, an object with `keys` is keyframed.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Animatable<T> {
    /// Same value at every time.
    Constant(T),
    /// Value interpolated between keys.
    Keyframes(Keyframes<T>),
}

impl<T> Animatable<T>
where
    T: Lerp + Clone + Default,
{
    /// Value at timeline `time` (seconds). Total: never fails.
    pub fn sample(&self, time: f64) -> T {
        match self {
            Self::Constant(v) => v.clone(),
            Self::Keyframes(kf) => kf.sample(time),
        }
    }

    /// Check keyframe ordering; `name` prefixes the error message.
    pub fn validate(&self, name: &str) -> FlurryResult<()> {
        match self {
            Self::Constant(_) => Ok(()),
            Self::Keyframes(kf) => kf.validate(name),
        }
    }

    /// Whether the value can change over time.
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Keyframes(kf) if kf.keys.len() > 1)
    }
}

impl<T> From<T> for Animatable<T> {
    fn from(value: T) -> Self {
        Self::Constant(value)
    }
}

impl<T: Default> Default for Animatable<T> {
    fn default() -> Self {
        Self::Constant(T::default())
    }
}

/// Keys of an animated property and how to interpolate between them.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Keyframes<T> {
    /// Keys sorted by time.
    pub keys: Vec<Keyframe<T>>,
    /// Defaults to linear.
    #[serde(default)]
    pub mode: InterpMode,
}

impl<T> Keyframes<T>
where
    T: Lerp + Clone + Default,
{
    /// Build and validate a key list.
    pub fn new(keys: Vec<Keyframe<T>>, mode: InterpMode) -> FlurryResult<Self> {
        let kf = Self { keys, mode };
        kf.validate("keyframes")?;
        Ok(kf)
    }

    /// Keys must be non-empty, finite and sorted by time.
    pub fn validate(&self, name: &str) -> FlurryResult<()> {
        if self.keys.is_empty() {
            return Err(FlurryError::validation(format!(
                "{name}: keyframes must have at least one key"
            )));
        }
        if self.keys.iter().any(|k| !k.time.is_finite()) {
            return Err(FlurryError::validation(format!(
                "{name}: keyframe times must be finite"
            )));
        }
        if !self.keys.windows(2).all(|w| w[0].time <= w[1].time) {
            return Err(FlurryError::validation(format!(
                "{name}: keyframes must be sorted by time"
            )));
        }
        Ok(())
    }

    /// Value at `time`, clamped to the first and last key.
    pub fn sample(&self, time: f64) -> T {
        let Some(first) = self.keys.first() else {
            return T::default();
        };

        let idx = self.keys.partition_point(|k| k.time <= time);
        if idx == 0 {
            return first.value.clone();
        }
        if idx >= self.keys.len() {
            return self.keys[self.keys.len() - 1].value.clone();
        }

        let a = &self.keys[idx - 1];
        let b = &self.keys[idx];
        let span = b.time - a.time;
        if span <= 0.0 {
            return a.value.clone();
        }

        let t = (time - a.time) / span;
        match self.mode {
            InterpMode::Hold => a.value.clone(),
            InterpMode::Linear => T::lerp(&a.value, &b.value, a.ease.apply(t)),
        }
    }
}

/// One key of a [`Keyframes`] track.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Keyframe<T> {
    /// Timeline seconds.
    pub time: f64,
    /// Value reached at `time`.
    pub value: T,
    /// Ease applied toward the next key.
    #[serde(default)]
    pub ease: Ease,
}

impl<T> Keyframe<T> {
    /// A linear key.
    pub fn new(time: f64, value: T) -> Self {
        Self {
            time,
            value,
            ease: Ease::Linear,
        }
    }

    /// Set the ease toward the next key.
    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }
}

/// Interpolation between adjacent keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpMode {
    /// Keep the earlier key's value until the next key.
    Hold,
    /// Eased blend between keys.
    #[default]
    Linear,
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
