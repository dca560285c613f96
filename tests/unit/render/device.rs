use std::cell::Cell;

use super::*;
use crate::foundation::core::Color;

fn square_op() -> RenderOp {
    use kurbo::Shape as _;
    RenderOp::fill_path(Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.1), Color::WHITE)
}

#[test]
fn cpu_context_rasterizes() {
    let gfx = GraphicsContext::cpu();
    assert!(gfx.is_available());
    assert_eq!(gfx.device().map(|d| d.name()), Some("cpu"));

    let target = gfx
        .rasterize(&[square_op()], Rect::new(0.0, 0.0, 4.0, 4.0))
        .unwrap();
    assert_eq!(target.image().width(), 4);
}

#[test]
fn failed_initialization_is_permanent() {
    let attempts = Cell::new(0);
    let gfx = GraphicsContext::initialize(|| {
        attempts.set(attempts.get() + 1);
        Err(FlurryError::unavailable("no adapter"))
    });

    assert!(!gfx.is_available());
    assert!(gfx.unavailable_reason().unwrap().contains("no adapter"));
    for _ in 0..3 {
        assert!(matches!(
            gfx.rasterize(&[square_op()], Rect::new(0.0, 0.0, 4.0, 4.0)),
            Err(FlurryError::Unavailable(_))
        ));
    }
    assert_eq!(attempts.get(), 1);
}

#[test]
fn shutdown_releases_device() {
    let mut gfx = GraphicsContext::initialize(|| Ok(Box::new(CpuDevice::new(64))));
    assert_eq!(gfx.device().map(|d| d.max_target_dim()), Some(64));
    gfx.shutdown();
    assert!(!gfx.is_available());
    assert!(gfx.device().is_none());
}

#[test]
fn device_limits_target_size() {
    let gfx = GraphicsContext::with_device(Box::new(CpuDevice::new(8)));
    assert!(
        gfx.rasterize(&[square_op()], Rect::new(0.0, 0.0, 16.0, 4.0))
            .is_err()
    );
}
