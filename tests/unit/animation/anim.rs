use super::*;

fn ramp() -> Keyframes<f32> {
    Keyframes::new(
        vec![Keyframe::new(1.0, 10.0), Keyframe::new(3.0, 30.0)],
        InterpMode::Linear,
    )
    .unwrap()
}

#[test]
fn constant_ignores_time() {
    let a = Animatable::Constant(4.5f32);
    assert_eq!(a.sample(-10.0), 4.5);
    assert_eq!(a.sample(1e9), 4.5);
    assert!(!a.is_animated());
}

#[test]
fn keyframes_clamp_outside_range() {
    let kf = ramp();
    assert_eq!(kf.sample(0.0), 10.0);
    assert_eq!(kf.sample(1.0), 10.0);
    assert_eq!(kf.sample(3.0), 30.0);
    assert_eq!(kf.sample(99.0), 30.0);
}

#[test]
fn keyframes_interpolate_linearly() {
    let kf = ramp();
    assert!((kf.sample(2.0) - 20.0).abs() < 1e-5);
    assert!((kf.sample(1.5) - 15.0).abs() < 1e-5);
}

#[test]
fn hold_mode_steps() {
    let kf = Keyframes::new(
        vec![Keyframe::new(0.0, 1.0f64), Keyframe::new(1.0, 2.0)],
        InterpMode::Hold,
    )
    .unwrap();
    assert_eq!(kf.sample(0.99), 1.0);
    assert_eq!(kf.sample(1.0), 2.0);
}

#[test]
fn ease_shapes_segment() {
    let kf = Keyframes::new(
        vec![
            Keyframe::new(0.0, 0.0f64).with_ease(Ease::InQuad),
            Keyframe::new(1.0, 1.0),
        ],
        InterpMode::Linear,
    )
    .unwrap();
    assert!((kf.sample(0.5) - 0.25).abs() < 1e-12);
}

#[test]
fn validation_rejects_unsorted_and_empty() {
    assert!(
        Keyframes::new(
            vec![Keyframe::new(2.0, 0.0f32), Keyframe::new(1.0, 0.0)],
            InterpMode::Linear
        )
        .is_err()
    );
    assert!(Keyframes::<f32>::new(vec![], InterpMode::Linear).is_err());

    let empty = Animatable::Keyframes(Keyframes::<f32> {
        keys: vec![],
        mode: InterpMode::Linear,
    });
    assert!(empty.validate("gravity").is_err());
    assert_eq!(empty.sample(1.0), 0.0);
}

#[test]
fn color_keyframes_lerp_channels() {
    let kf = Keyframes::new(
        vec![
            Keyframe::new(0.0, Color::new(0.0, 0.0, 0.0, 1.0)),
            Keyframe::new(2.0, Color::new(1.0, 0.5, 0.0, 1.0)),
        ],
        InterpMode::Linear,
    )
    .unwrap();
    let c = kf.sample(1.0);
    assert!((c.r - 0.5).abs() < 1e-6);
    assert!((c.g - 0.25).abs() < 1e-6);
}

#[test]
fn untagged_json_forms() {
    let c: Animatable<f32> = serde_json::from_str("2.5").unwrap();
    assert_eq!(c.sample(0.0), 2.5);

    let k: Animatable<f32> = serde_json::from_str(
        r#"{"keys":[{"time":0.0,"value":0.0},{"time":1.0,"value":10.0}]}"#,
    )
    .unwrap();
    assert!(k.is_animated());
    assert!((k.sample(0.5) - 5.0).abs() < 1e-5);
}
