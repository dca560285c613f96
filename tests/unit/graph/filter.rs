use kurbo::Shape as _;

use super::*;
use crate::{
    foundation::core::{Color, Rect},
    graph::{nodes::LambdaNode, op::DrawCommand, processor::RenderNodeProcessor},
    model::filter::FilterEffect,
    render::{
        canvas::Canvas, cpu::render_ops_to_frame, device::GraphicsContext,
        shader::BuiltinShaderCompiler,
    },
    resource::protocol::UpdateContext,
};

fn red_square() -> Box<dyn RenderNode> {
    Box::new(LambdaNode::new(
        Rect::new(0.0, 0.0, 4.0, 4.0),
        Rc::new(|canvas: &mut dyn Canvas| {
            canvas.fill_path(
                &Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.1),
                Color::new(1.0, 0.0, 0.0, 1.0),
            );
        }),
    ))
}

fn effect(source: &str) -> Rc<RefCell<FilterEffectResource>> {
    let ctx = UpdateContext::at(0.0).with_shader_compiler(&BuiltinShaderCompiler);
    Rc::new(RefCell::new(FilterEffectResource::from_model(
        &FilterEffect::new(source),
        &ctx,
    )))
}

#[test]
fn compiled_effect_filters_child_pixels() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let mut node = FilterEffectNode::new(effect("invert"), red_square());

    let ops = RenderNodeProcessor::pull_to_root(&mut node, &ctx);
    assert_eq!(ops.len(), 1);
    assert!(matches!(ops[0].command, DrawCommand::Image { .. }));

    let frame = render_ops_to_frame(&ops, 4, 4, None).unwrap();
    assert_eq!(&frame.data[..4], &[0, 255, 255, 255]);
}

#[test]
fn failed_compile_passes_through() {
    let gfx = GraphicsContext::cpu();
    let ctx = RenderNodeContext::new(&gfx);
    let fx = effect("not-an-effect");
    assert!(fx.borrow().last_error().is_some());
    let mut node = FilterEffectNode::new(fx, red_square());

    let ops = RenderNodeProcessor::pull_to_root(&mut node, &ctx);
    assert_eq!(ops.len(), 1);
    assert!(matches!(ops[0].command, DrawCommand::Custom(_)));
}

#[test]
fn unavailable_device_passes_through() {
    let gfx = GraphicsContext::unavailable("headless");
    let ctx = RenderNodeContext::new(&gfx);
    let mut node = FilterEffectNode::new(effect("invert"), red_square());
    let ops = RenderNodeProcessor::pull_to_root(&mut node, &ctx);
    assert!(matches!(ops[0].command, DrawCommand::Custom(_)));
}

#[test]
fn effect_version_marks_node_changed() {
    let fx = effect("invert");
    let mut node = FilterEffectNode::new(fx.clone(), red_square());
    node.clear_changes();
    assert!(!node.has_changes());

    let ctx = UpdateContext::at(0.0).with_shader_compiler(&BuiltinShaderCompiler);
    let mut model = FilterEffect::new("invert");
    model.enabled = false;
    fx.borrow_mut().update(&model, &ctx, &mut true);
    assert!(node.has_changes());
}
