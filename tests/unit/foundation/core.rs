use super::*;

#[test]
fn color_rgba8_quantization() {
    assert_eq!(Color::WHITE.to_rgba8(), [255, 255, 255, 255]);
    assert_eq!(Color::new(0.5, 0.0, 2.0, -1.0).to_rgba8(), [128, 0, 255, 0]);
    assert_eq!(Color::new(f32::NAN, 0.0, 0.0, 1.0).to_rgba8(), [0, 0, 0, 255]);
    assert_eq!(Color::from_rgba8(255, 0, 0, 255).to_rgba8(), [255, 0, 0, 255]);
}

#[test]
fn color_white_detection_is_quantized() {
    assert!(Color::WHITE.is_white());
    assert!(Color::new(0.9999, 1.0, 1.0, 1.0).is_white());
    assert!(!Color::new(1.0, 0.9, 1.0, 1.0).is_white());
    assert!(!Color::new(1.0, 1.0, 1.0, 0.5).is_white());
}

#[test]
fn color_lerp_endpoints() {
    let a = Color::new(0.0, 0.0, 0.0, 0.0);
    let b = Color::new(1.0, 0.5, 0.25, 1.0);
    assert_eq!(Color::lerp(a, b, 0.0), a);
    assert_eq!(Color::lerp(a, b, 1.0), b);
    assert_eq!(Color::lerp(a, b, 0.5), Color::new(0.5, 0.25, 0.125, 0.5));
}

#[test]
fn union_bounds_skips_empty() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    let empty = Rect::new(5.0, 5.0, 5.0, 9.0);
    assert_eq!(union_bounds(None, empty), None);
    assert_eq!(union_bounds(Some(a), empty), Some(a));

    let b = Rect::new(20.0, -5.0, 30.0, 5.0);
    assert_eq!(
        union_bounds(Some(a), b),
        Some(Rect::new(0.0, -5.0, 30.0, 10.0))
    );
}

#[test]
fn non_finite_rect_is_empty() {
    assert!(rect_is_empty(Rect::new(0.0, 0.0, f64::NAN, 1.0)));
    assert!(!rect_is_empty(Rect::new(0.0, 0.0, 1.0, 1.0)));
}
