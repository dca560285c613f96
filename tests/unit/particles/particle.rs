use super::*;

#[test]
fn sanitize_clamps_lifetime_and_rates() {
    let p = EmitterParams {
        lifetime: 0.0,
        emission_rate: -5.0,
        speed: f64::NAN,
        start_opacity: 3.0,
        shape: EmitterShape::Circle { radius: -2.0 },
        ..EmitterParams::default()
    }
    .sanitized();

    assert_eq!(p.lifetime, MIN_LIFETIME);
    assert_eq!(p.emission_rate, 0.0);
    assert_eq!(p.speed, 0.0);
    assert_eq!(p.start_opacity, 1.0);
    assert_eq!(p.shape, EmitterShape::Circle { radius: 0.0 });
}

#[test]
fn shapes_map_unit_square_into_region() {
    assert_eq!(EmitterShape::Point.sample(0.3, 0.9), (0.0, 0.0));
    assert_eq!(EmitterShape::Line { width: 10.0 }.sample(0.0, 0.7), (-5.0, 0.0));
    assert_eq!(
        EmitterShape::Box {
            width: 4.0,
            height: 2.0
        }
        .sample(1.0, 0.5),
        (2.0, 0.0)
    );

    let (x, y) = EmitterShape::Circle { radius: 3.0 }.sample(0.25, 0.25);
    assert!((x.hypot(y) - 1.5).abs() < 1e-12);
    assert!(x.abs() < 1e-12);
}

#[test]
fn spawn_consumes_fixed_number_of_draws() {
    let params = EmitterParams::default();
    for shape in [
        EmitterShape::Point,
        EmitterShape::Line { width: 5.0 },
        EmitterShape::Circle { radius: 5.0 },
        EmitterShape::Box {
            width: 5.0,
            height: 5.0,
        },
    ] {
        let mut rng = Rng64::new(1);
        let _ = Particle::spawn(0.0, &EmitterParams { shape, ..params }, &mut rng);
        assert_eq!(rng.calls(), 10, "{shape:?}");
    }
}

#[test]
fn spawn_is_deterministic_and_respects_minimum_lifetime() {
    let params = EmitterParams {
        lifetime: 0.01,
        lifetime_random: 1.0,
        ..EmitterParams::default()
    };
    let a = Particle::spawn(0.5, &params, &mut Rng64::new(99));
    let b = Particle::spawn(0.5, &params, &mut Rng64::new(99));
    assert_eq!(a, b);
    assert!(a.alive);
    assert!(f64::from(a.lifetime) >= MIN_LIFETIME - 1e-9);
}

#[test]
fn over_life_interpolates_linearly() {
    let params = EmitterParams {
        start_size: 2.0,
        end_size: 6.0,
        start_opacity: 1.0,
        end_opacity: 0.0,
        start_color: Color::WHITE,
        end_color: Color::BLACK,
        ..EmitterParams::default()
    };
    let mut p = Particle::spawn(0.0, &params, &mut Rng64::new(5));
    assert_eq!(p.size, 2.0);

    p.apply_over_life(&params, 0.5);
    assert_eq!(p.size, 4.0);
    assert_eq!(p.opacity, 0.5);
    assert_eq!(p.color.r, 0.5);
    assert_eq!(p.color.a, 1.0);
}

#[test]
fn shape_change_detection_is_field_wise() {
    let a = EmitterShape::Box {
        width: 1.0,
        height: 2.0,
    };
    assert!(a.same_value(&a));
    assert!(!a.same_value(&EmitterShape::Box {
        width: 1.0,
        height: 3.0
    }));
    assert!(!a.same_value(&EmitterShape::Point));
}
