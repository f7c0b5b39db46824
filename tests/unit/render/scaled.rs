use super::*;
use crate::{
    foundation::core::ImageBaseType,
    model::{Image, Layer},
    render::{
        display::MaskChannel,
        sink::FrameRGB,
        tables::{CheckSize, CheckType},
    },
};

fn projection_of(w: u32, h: u32, format: PixelFormat, raw: &[u8]) -> Projection {
    let mut img = Image::new(w, h, format.base_type());
    img.add_layer(Layer::new(
        "bg",
        TileStore::from_raw(w, h, format, raw).unwrap(),
    ));
    let mut proj = Projection::for_image(&img);
    let full = img.bounds();
    proj.construct_projection(&mut img, full).unwrap();
    proj
}

fn solid_rgb(w: u32, h: u32, px: [u8; 3]) -> Projection {
    let raw: Vec<u8> = std::iter::repeat_n(px, (w * h) as usize).flatten().collect();
    projection_of(w, h, PixelFormat::Rgb, &raw)
}

fn gradient(w: u32, h: u32) -> (Vec<u8>, Projection) {
    let raw: Vec<u8> = (0..w * h)
        .flat_map(|i| [(i * 7) as u8, (i * 13) as u8, (i * 29) as u8])
        .collect();
    let proj = projection_of(w, h, PixelFormat::Rgb, &raw);
    (raw, proj)
}

fn render(
    renderer: &mut ScaledRenderer,
    proj: &Projection,
    display: &DisplayState<'_>,
    rect: Rect,
) -> FrameRGB {
    let mut frame = FrameRGB::new(rect.width as u32, rect.height as u32);
    renderer
        .render(proj, display, rect, None, &mut frame)
        .unwrap();
    frame
}

#[test]
fn opaque_pixels_render_exactly() {
    let proj = solid_rgb(4, 4, [255, 0, 0]);
    let mut r = ScaledRenderer::default();
    let frame = render(&mut r, &proj, &DisplayState::default(), Rect::new(0, 0, 4, 4));
    assert!(frame.data.chunks_exact(3).all(|p| p == [255, 0, 0]));
    assert_eq!(proj.tiles().outstanding_refs(), 0);
}

#[test]
fn transparent_pixels_show_checks() {
    let proj = Projection::new(16, 16, ImageBaseType::Rgb);
    let mut r = ScaledRenderer::default();
    let frame = render(&mut r, &proj, &DisplayState::default(), Rect::new(0, 0, 16, 16));
    assert_eq!(frame.pixel(0, 0), Some([153; 3]));
    assert_eq!(frame.pixel(7, 7), Some([153; 3]));
    assert_eq!(frame.pixel(8, 0), Some([102; 3]));
    assert_eq!(frame.pixel(0, 8), Some([102; 3]));
    assert_eq!(frame.pixel(8, 8), Some([153; 3]));
}

#[test]
fn area_past_the_image_shows_checks() {
    let proj = solid_rgb(4, 4, [255, 0, 0]);
    let mut r = ScaledRenderer::default();
    let frame = render(&mut r, &proj, &DisplayState::default(), Rect::new(0, 0, 6, 4));
    assert_eq!(frame.pixel(3, 0), Some([255, 0, 0]));
    assert_eq!(frame.pixel(5, 0), Some([153; 3]));
}

#[test]
fn enlargement_replicates_source_pixels() {
    let (raw, proj) = gradient(5, 4);
    let mut r = ScaledRenderer::default();
    let display = DisplayState::default().with_scale(2.0, 2.0);
    let frame = render(&mut r, &proj, &display, Rect::new(0, 0, 10, 8));
    for y in 0..8 {
        for x in 0..10 {
            let i = ((y / 2) * 5 + x / 2) as usize * 3;
            assert_eq!(frame.pixel(x, y), Some([raw[i], raw[i + 1], raw[i + 2]]));
        }
    }
}

#[test]
fn scroll_offset_selects_source_area() {
    let (raw, proj) = gradient(4, 4);
    let mut r = ScaledRenderer::default();
    let display = DisplayState::default().with_offset(2, 1);
    let frame = render(&mut r, &proj, &display, Rect::new(0, 0, 2, 2));
    let i = (4 + 2) * 3;
    assert_eq!(frame.pixel(0, 0), Some([raw[i], raw[i + 1], raw[i + 2]]));
}

#[test]
fn device_offset_moves_the_blit() {
    let proj = solid_rgb(2, 2, [0, 0, 255]);
    let mut r = ScaledRenderer::default();
    let display = DisplayState::default().with_display_offset(3, 2);
    let mut frame = FrameRGB::new(10, 10);
    r.render(&proj, &display, Rect::new(0, 0, 2, 2), None, &mut frame)
        .unwrap();
    assert_eq!(frame.pixel(2, 2), Some([0, 0, 0]));
    assert_eq!(frame.pixel(3, 2), Some([0, 0, 255]));
    assert_eq!(frame.pixel(4, 3), Some([0, 0, 255]));
}

#[test]
fn row_reuse_does_not_change_output() {
    let (_, proj) = gradient(9, 7);
    let display = DisplayState::default().with_scale(3.0, 3.0);
    let rect = Rect::new(0, 0, 27, 21);

    let mut with = ScaledRenderer::default();
    let mut without = ScaledRenderer::new(RenderSettings {
        row_reuse: false,
        ..RenderSettings::default()
    });
    assert_eq!(
        render(&mut with, &proj, &display, rect).data,
        render(&mut without, &proj, &display, rect).data
    );

    let empty = Projection::new(9, 7, ImageBaseType::Gray);
    assert_eq!(
        render(&mut with, &empty, &display, rect).data,
        render(&mut without, &empty, &display, rect).data
    );
}

#[test]
fn reduction_of_uniform_image_is_uniform() {
    let proj = solid_rgb(256, 256, [10, 200, 30]);
    let mut r = ScaledRenderer::default();
    for scale in [0.25, 0.7] {
        let display = DisplayState::default().with_scale(scale, scale);
        let frame = render(&mut r, &proj, &display, Rect::new(0, 0, 40, 40));
        assert!(frame.data.chunks_exact(3).all(|p| p == [10, 200, 30]), "{scale}");
    }
}

#[test]
fn projection_opacity_scales_alpha() {
    let mut proj = solid_rgb(2, 2, [255, 255, 255]);
    proj.set_opacity(0.5);
    let mut r = ScaledRenderer::default();
    let frame = render(&mut r, &proj, &DisplayState::default(), Rect::new(0, 0, 2, 2));
    assert_eq!(frame.pixel(0, 0), Some([204; 3]));
}

#[test]
fn highlight_halves_everything_outside() {
    let proj = solid_rgb(4, 4, [255, 255, 255]);
    let mut r = ScaledRenderer::default();
    let mut frame = FrameRGB::new(4, 4);
    r.render(
        &proj,
        &DisplayState::default(),
        Rect::new(0, 0, 4, 4),
        Some(Rect::new(1, 1, 2, 2)),
        &mut frame,
    )
    .unwrap();
    assert_eq!(frame.pixel(0, 0), Some([127; 3]));
    assert_eq!(frame.pixel(3, 1), Some([127; 3]));
    assert_eq!(frame.pixel(1, 1), Some([255; 3]));
    assert_eq!(frame.pixel(2, 2), Some([255; 3]));
    assert_eq!(frame.pixel(1, 3), Some([127; 3]));
}

#[test]
fn mask_dims_unselected_pixels() {
    let proj = solid_rgb(4, 4, [200, 200, 200]);
    let mut mask_px = TileStore::new(4, 4, PixelFormat::Gray);
    mask_px.fill_rect(Rect::new(0, 0, 2, 4), &[255]).unwrap();
    let mask = MaskOverlay::new(&mask_px, MaskChannel::Red).unwrap();
    let display = DisplayState::default().with_scale(2.0, 2.0).with_mask(mask);

    let mut r = ScaledRenderer::default();
    let frame = render(&mut r, &proj, &display, Rect::new(0, 0, 10, 8));
    assert_eq!(frame.pixel(3, 0), Some([200, 200, 200]));
    assert_eq!(frame.pixel(4, 0), Some([200, 50, 50]));
    assert_eq!(frame.pixel(7, 7), Some([200, 50, 50]));
    // Past the mask counts as unselected.
    assert_eq!(frame.pixel(9, 0).map(|p| p[1]), Some(102 >> 2));
    assert_eq!(mask_px.outstanding_refs(), 0);
}

#[test]
fn indexed_source_uses_colormap() {
    let store = TileStore::from_raw(2, 1, PixelFormat::Indexed, &[0, 1]).unwrap();
    let cmap = Colormap::new(vec![[10, 20, 30], [40, 50, 60]]);
    let mut r = ScaledRenderer::default();
    let mut frame = FrameRGB::new(2, 1);

    let source = RenderSource::new(&store).with_colormap(Some(&cmap));
    r.render_source(&source, &DisplayState::default(), Rect::new(0, 0, 2, 1), None, &mut frame)
        .unwrap();
    assert_eq!(frame.pixel(1, 0), Some([40, 50, 60]));

    let source = RenderSource::new(&store);
    r.render_source(&source, &DisplayState::default(), Rect::new(0, 0, 2, 1), None, &mut frame)
        .unwrap();
    assert_eq!(frame.pixel(1, 0), Some([1, 1, 1]));
}

#[test]
fn settings_change_rebuilds_checks() {
    let proj = Projection::new(2, 2, ImageBaseType::Rgb);
    let mut r = ScaledRenderer::default();
    r.settings_changed(RenderSettings {
        check_type: CheckType::BlackOnly,
        check_size: CheckSize::Small,
        ..RenderSettings::default()
    });
    assert_eq!(r.settings().check_size, CheckSize::Small);
    let frame = render(&mut r, &proj, &DisplayState::default(), Rect::new(0, 0, 2, 2));
    assert!(frame.data.iter().all(|&v| v == 0));
}

#[test]
fn invalid_requests_are_rejected() {
    let proj = solid_rgb(2, 2, [1, 2, 3]);
    let mut r = ScaledRenderer::default();
    let mut frame = FrameRGB::new(2, 2);
    let err = r
        .render(&proj, &DisplayState::default(), Rect::new(0, 0, 0, 2), None, &mut frame)
        .unwrap_err();
    assert!(matches!(err, MosaicError::InvalidRect(_)));

    let display = DisplayState::default().with_scale(0.0, 1.0);
    let err = r
        .render(&proj, &display, Rect::new(0, 0, 2, 2), None, &mut frame)
        .unwrap_err();
    assert!(matches!(err, MosaicError::Render(_)));

    assert!(RenderSource::from_projection(&proj, 5).is_err());
}

#[test]
fn render_span_records_display_scale() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
    let proj = solid_rgb(130, 70, [30, 60, 90]);
    let mut r = ScaledRenderer::default();
    let view = DisplayState::default().with_scale(0.5, 0.5);
    let frame = render(&mut r, &proj, &view, Rect::new(0, 0, 65, 35));
    assert!(frame.data.chunks_exact(3).all(|p| p == [30, 60, 90]));
}
