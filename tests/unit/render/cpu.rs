use super::*;
use crate::render::canvas::Canvas as _;

fn px(frame: &FrameRGBA, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * frame.width + x) * 4) as usize;
    [
        frame.data[i],
        frame.data[i + 1],
        frame.data[i + 2],
        frame.data[i + 3],
    ]
}

fn rect_path(r: Rect) -> BezPath {
    use kurbo::Shape as _;
    r.to_path(0.1)
}

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RasterImage {
    let data: Vec<u8> = (0..w * h).flat_map(|_| rgba).collect();
    RasterImage::from_premul_rgba8(w, h, &data).unwrap()
}

#[test]
fn canvas_rejects_degenerate_sizes() {
    assert!(CpuCanvas::new(0, 4).is_err());
    assert!(CpuCanvas::new(100_000, 4).is_err());
}

#[test]
fn fill_path_covers_pixel_aligned_rect() {
    let mut canvas = CpuCanvas::new(8, 8).unwrap();
    canvas.fill_path(
        &rect_path(Rect::new(2.0, 2.0, 6.0, 6.0)),
        Color::from_rgba8(255, 0, 0, 255),
    );
    let frame = canvas.finish();
    assert!(frame.premultiplied);
    assert_eq!(px(&frame, 3, 3), [255, 0, 0, 255]);
    assert_eq!(px(&frame, 0, 0), [0, 0, 0, 0]);
    assert_eq!(px(&frame, 7, 7), [0, 0, 0, 0]);
}

#[test]
fn transform_and_opacity_apply() {
    let mut canvas = CpuCanvas::new(8, 8).unwrap();
    canvas.push_transform(Affine::translate((4.0, 4.0)));
    canvas.push_opacity(0.5);
    canvas.fill_path(&rect_path(Rect::new(0.0, 0.0, 4.0, 4.0)), Color::WHITE);
    canvas.pop();
    canvas.pop();
    let frame = canvas.finish();

    assert_eq!(px(&frame, 1, 1), [0, 0, 0, 0]);
    let [r, _, _, a] = px(&frame, 5, 5);
    assert!((i32::from(a) - 128).abs() <= 2, "alpha {a}");
    assert!((i32::from(r) - 128).abs() <= 2, "red {r}");
}

#[test]
fn clear_fills_background() {
    let frame = render_ops_to_frame(&[], 2, 2, Some([0, 0, 255, 255])).unwrap();
    assert_eq!(px(&frame, 1, 1), [0, 0, 255, 255]);
}

#[test]
fn draw_image_maps_src_onto_dst() {
    let mut canvas = CpuCanvas::new(8, 8).unwrap();
    let img = solid(2, 2, [0, 255, 0, 255]);
    canvas.draw_image(&img, img.rect(), Rect::new(2.0, 2.0, 6.0, 6.0), None);
    let frame = canvas.finish();

    let [_, g, _, a] = px(&frame, 4, 4);
    assert!(g >= 250 && a >= 250);
    assert_eq!(px(&frame, 0, 0), [0, 0, 0, 0]);
}

#[test]
fn draw_image_tint_modulates() {
    let mut canvas = CpuCanvas::new(4, 4).unwrap();
    let img = solid(4, 4, [255, 255, 255, 255]);
    canvas.draw_image(
        &img,
        img.rect(),
        Rect::new(0.0, 0.0, 4.0, 4.0),
        Some(Color::from_rgba8(0, 0, 255, 255)),
    );
    let frame = canvas.finish();
    let [r, g, b, a] = px(&frame, 2, 2);
    assert!(r <= 5 && g <= 5);
    assert!(b >= 250 && a >= 250);
}

#[test]
fn unbalanced_pushes_are_closed_on_finish() {
    let mut canvas = CpuCanvas::new(2, 2).unwrap();
    canvas.push_opacity(0.5);
    canvas.push_transform(Affine::scale(2.0));
    canvas.fill_path(&rect_path(Rect::new(0.0, 0.0, 1.0, 1.0)), Color::WHITE);
    let frame = canvas.finish();
    assert_eq!(frame.data.len(), 16);
}

#[test]
fn rasterize_snaps_bounds_outward() {
    let ops = vec![RenderOp::fill_path(
        rect_path(Rect::new(-2.5, -2.5, 2.5, 2.5)),
        Color::WHITE,
    )];
    let target = rasterize_ops(&ops, Rect::new(-2.5, -2.5, 2.5, 2.5), MAX_TARGET_DIM).unwrap();
    assert_eq!(target.bounds(), Rect::new(-3.0, -3.0, 3.0, 3.0));
    assert_eq!((target.image().width(), target.image().height()), (6, 6));

    let center = &target.image().premul_rgba8()[(3 * 6 + 3) * 4..(3 * 6 + 3) * 4 + 4];
    assert_eq!(center, &[255, 255, 255, 255]);
}

#[test]
fn rasterize_rejects_empty_and_oversized() {
    assert!(rasterize_ops(&[], Rect::ZERO, MAX_TARGET_DIM).is_err());
    assert!(rasterize_ops(&[], Rect::new(0.0, 0.0, 10.0, 10.0), 4).is_err());
}
