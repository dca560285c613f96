use std::sync::Arc;

use crate::foundation::core::{Affine, Color, Point, Vec2};

/// Change-detection equality used by resource updates.
///
/// Floats compare by bit pattern with every NaN equal to every other NaN, so a parameter that
/// stays NaN does not bump a version each frame. Shared payloads compare by pointer identity.
pub trait ResourceValue: Clone {
    /// Whether `other` is unchanged from `self`.
    fn same_value(&self, other: &Self) -> bool;
}

fn same_f32(a: f32, b: f32) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

fn same_f64(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

impl ResourceValue for f32 {
    fn same_value(&self, other: &Self) -> bool {
        same_f32(*self, *other)
    }
}

impl ResourceValue for f64 {
    fn same_value(&self, other: &Self) -> bool {
        same_f64(*self, *other)
    }
}

macro_rules! eq_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl ResourceValue for $t {
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

eq_value!(bool, u32, u64, i32, usize, String);

impl ResourceValue for Color {
    fn same_value(&self, other: &Self) -> bool {
        same_f32(self.r, other.r)
            && same_f32(self.g, other.g)
            && same_f32(self.b, other.b)
            && same_f32(self.a, other.a)
    }
}

impl ResourceValue for Vec2 {
    fn same_value(&self, other: &Self) -> bool {
        same_f64(self.x, other.x) && same_f64(self.y, other.y)
    }
}

impl ResourceValue for Point {
    fn same_value(&self, other: &Self) -> bool {
        same_f64(self.x, other.x) && same_f64(self.y, other.y)
    }
}

impl ResourceValue for Affine {
    fn same_value(&self, other: &Self) -> bool {
        self.as_coeffs()
            .iter()
            .zip(other.as_coeffs().iter())
            .all(|(a, b)| same_f64(*a, *b))
    }
}

impl<T: ?Sized> ResourceValue for Arc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ResourceValue> ResourceValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_value(b),
            _ => false,
        }
    }
}

/// Overwrite `slot` with `value` when they differ and flag the change.
///
/// Returns whether this particular slot changed.
pub fn compare_and_update<T: ResourceValue>(slot: &mut T, value: T, changed: &mut bool) -> bool {
    if slot.same_value(&value) {
        return false;
    }
    *slot = value;
    *changed = true;
    true
}

#[cfg(test)]
#[path = "../../tests/unit/resource/value.rs"]
mod tests;
