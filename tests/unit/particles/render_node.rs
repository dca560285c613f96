use super::*;
use crate::{
    model::{
        drawable::{Drawable, DrawableShape},
        emitter::ParticleEmitter,
    },
    particles::{particle::EmitterParams, simulator::SimulatorOpts},
    render::device::GraphicsContext,
    resource::protocol::UpdateContext,
};

fn opts() -> SimulatorOpts {
    SimulatorOpts {
        step_rate: 60,
        checkpoint_interval: 0.5,
        max_checkpoints: 120,
    }
}

fn params() -> EmitterParams {
    EmitterParams {
        emission_rate: 60.0,
        lifetime: 1.0,
        seed: 42,
        spread: 30.0,
        speed: 50.0,
        ..EmitterParams::default()
    }
}

fn resource(model: &ParticleEmitter, time: f64) -> Rc<RefCell<EmitterResource>> {
    Rc::new(RefCell::new(EmitterResource::with_opts(
        model,
        &UpdateContext::at(time),
        opts(),
    )))
}

fn advance(res: &Rc<RefCell<EmitterResource>>, model: &ParticleEmitter, time: f64) {
    res.borrow_mut()
        .update(model, &UpdateContext::at(time), &mut true);
}

#[test]
fn transform_scales_then_rotates_then_translates() {
    let mut p = Particle::default();
    p.x = 10.0;
    p.y = 0.0;
    p.rotation = std::f32::consts::FRAC_PI_2;
    p.size = 2.0;
    let mapped = particle_transform(&p) * Point::new(1.0, 0.0);
    assert!((mapped.x - 10.0).abs() < 1e-6);
    assert!((mapped.y - 2.0).abs() < 1e-6);
}

#[test]
fn fallback_sprite_is_built_once() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let model = ParticleEmitter::from_params(&params());
    let res = resource(&model, 0.5);
    let mut node = ParticleRenderNode::new(res.clone());

    let ops = node.process(&ctx, Vec::new());
    assert_eq!(node.sprite_key(), Some(SpriteKey::Fallback));
    assert!(node.sprite_is_raster());
    assert_eq!(ops.len(), res.borrow().particles().len());
    assert!(
        ops.iter()
            .all(|op| matches!(op.command, DrawCommand::Image { tint: None, .. }))
    );

    for frame in 1..10 {
        advance(&res, &model, 0.5 + f64::from(frame) / 30.0);
        node.process(&ctx, Vec::new());
    }
    assert_eq!(node.sprite_builds(), 1);
}

#[test]
fn sprite_follows_drawable_version() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let mut model = ParticleEmitter::from_params(&params())
        .with_drawable(Drawable::rectangle(6.0, 4.0, Color::WHITE));
    let res = resource(&model, 0.5);
    let mut node = ParticleRenderNode::new(res.clone());

    node.process(&ctx, Vec::new());
    let first = node.sprite_key();
    assert!(matches!(first, Some(SpriteKey::Drawable(_, 0))));

    advance(&res, &model, 0.6);
    node.process(&ctx, Vec::new());
    assert_eq!(node.sprite_key(), first);

    if let Some(Drawable {
        shape: DrawableShape::Rectangle { size, .. },
        ..
    }) = model.drawable.as_mut()
    {
        *size = crate::foundation::core::Vec2::new(8.0, 8.0).into();
    }
    advance(&res, &model, 0.7);
    node.process(&ctx, Vec::new());
    assert_ne!(node.sprite_key(), first);
    assert_eq!(node.sprite_builds(), 2);
}

#[test]
fn invisible_particles_are_skipped() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let model = ParticleEmitter::from_params(&EmitterParams {
        start_size: 0.0,
        end_size: 0.0,
        ..params()
    });
    let res = resource(&model, 0.5);
    assert!(!res.borrow().particles().is_empty());

    let mut node = ParticleRenderNode::new(res);
    assert!(node.process(&ctx, Vec::new()).is_empty());
    assert_eq!(node.last_bounds(), None);
}

#[test]
fn colored_particles_are_tinted() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let red = Color::new(1.0, 0.0, 0.0, 1.0);
    let model = ParticleEmitter::from_params(&EmitterParams {
        start_color: red,
        end_color: red,
        ..params()
    });
    let mut node = ParticleRenderNode::new(resource(&model, 0.5));
    let ops = node.process(&ctx, Vec::new());
    assert!(!ops.is_empty());

    let target = node.sprite.as_ref().and_then(|s| s.target.as_ref()).unwrap();
    let expected = target.image().tinted(red);
    for op in &ops {
        let DrawCommand::Image { image, tint, .. } = &op.command else {
            panic!("expected image op");
        };
        assert_eq!(*tint, None);
        assert_eq!(image.premul_rgba8(), expected.premul_rgba8());
    }
}

#[test]
fn same_tint_shares_one_tinted_raster() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let orange = Color::new(1.0, 0.5, 0.2, 1.0);
    let model = ParticleEmitter::from_params(&EmitterParams {
        start_color: orange,
        end_color: orange,
        ..params()
    });
    let res = resource(&model, 0.5);
    let mut node = ParticleRenderNode::new(res.clone());

    let images = |ops: &[RenderOp]| -> Vec<RasterImage> {
        ops.iter()
            .map(|op| match &op.command {
                DrawCommand::Image { image, .. } => image.clone(),
                _ => panic!("expected image op"),
            })
            .collect()
    };
    let first = images(&node.process(&ctx, Vec::new()));
    assert!(first.len() >= 2);
    assert!(first.windows(2).all(|w| w[0].same_image(&w[1])));

    advance(&res, &model, 0.75);
    let second = images(&node.process(&ctx, Vec::new()));
    assert!(second.iter().all(|img| img.same_image(&first[0])));

    let sprite = node.sprite.as_ref().unwrap();
    assert_eq!(sprite.tinted.len(), 1);
    assert!(!first[0].same_image(sprite.target.as_ref().unwrap().image()));
}

#[test]
fn white_particles_draw_the_sprite_raster_itself() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let model = ParticleEmitter::from_params(&params());
    let mut node = ParticleRenderNode::new(resource(&model, 0.5));
    let ops = node.process(&ctx, Vec::new());
    assert!(!ops.is_empty());

    let sprite = node.sprite.as_ref().unwrap();
    let raster = sprite.target.as_ref().unwrap().image();
    assert!(sprite.tinted.is_empty());
    assert!(ops.iter().all(
        |op| matches!(&op.command, DrawCommand::Image { image, .. } if image.same_image(raster))
    ));
}

#[test]
fn unavailable_device_falls_back_to_vector_ops() {
    let gfx = GraphicsContext::unavailable("headless");
    let ctx = RenderNodeContext::new(&gfx);
    let half = Color::new(0.5, 0.5, 0.5, 1.0);
    let model = ParticleEmitter::from_params(&EmitterParams {
        start_color: half,
        end_color: half,
        ..params()
    });
    let res = resource(&model, 0.5);
    let mut node = ParticleRenderNode::new(res.clone());
    let ops = node.process(&ctx, Vec::new());

    assert!(!node.sprite_is_raster());
    assert_eq!(ops.len(), res.borrow().particles().len());
    for op in &ops {
        match op.command {
            DrawCommand::FillPath { color, .. } => assert_eq!(color, half),
            _ => panic!("expected vector op"),
        }
    }
}

#[test]
fn bounds_cover_every_emitted_op() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let model = ParticleEmitter::from_params(&params());
    let mut node = ParticleRenderNode::new(resource(&model, 0.8));
    let ops = node.process(&ctx, Vec::new());
    assert_eq!(node.last_bounds(), ops_bounds(&ops));
    assert!(node.last_bounds().is_some());
}

#[test]
fn changes_track_emitter_version() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let model = ParticleEmitter::from_params(&params());
    let res = resource(&model, 0.2);
    let mut node = ParticleRenderNode::new(res.clone());
    assert!(node.has_changes());
    node.clear_changes();
    node.process(&ctx, Vec::new());
    assert!(!node.has_changes());

    advance(&res, &model, 0.3);
    assert!(node.has_changes());
}

#[test]
fn dispose_keeps_shared_emitter_alive() {
    let model = ParticleEmitter::from_params(&params());
    let res = resource(&model, 0.2);
    let mut node = ParticleRenderNode::new(res.clone());
    node.dispose();
    assert!(node.is_disposed());
    assert!(!res.borrow().is_disposed());
}

#[test]
#[should_panic(expected = "processed after dispose")]
fn processing_disposed_node_panics() {
    let gfx = GraphicsContext::cpu();
    let model = ParticleEmitter::from_params(&params());
    let mut node = ParticleRenderNode::new(resource(&model, 0.2));
    node.dispose();
    node.process(&RenderNodeContext::new(&gfx), Vec::new());
}
