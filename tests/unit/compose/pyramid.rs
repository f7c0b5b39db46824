use super::*;

#[test]
fn levels_stop_at_single_tile() {
    let levels = build_levels(300, 100, PixelFormat::Rgba);
    let sizes: Vec<_> = levels.iter().map(|l| (l.width(), l.height())).collect();
    assert_eq!(sizes, [(300, 100), (150, 50), (75, 25), (38, 13)]);

    assert_eq!(build_levels(64, 64, PixelFormat::GrayA).len(), 1);
}

#[test]
fn level_selection_halves_until_scale_exceeds_half() {
    assert_eq!(level_for_scale(4, 1.0, 1.0), (0, 1.0, 1.0));
    assert_eq!(level_for_scale(4, 0.5, 0.5), (1, 1.0, 1.0));
    assert_eq!(level_for_scale(4, 0.2, 0.25), (2, 0.8, 1.0));
    assert_eq!(level_for_scale(2, 0.1, 0.1), (1, 0.2, 0.2));
    assert_eq!(level_for_scale(4, 0.25, 0.75), (0, 0.25, 0.75));
}

#[test]
fn reduction_weights_colors_by_alpha() {
    let mut levels = build_levels(130, 2, PixelFormat::Rgba);
    levels[0]
        .write_rect(
            Rect::new(0, 0, 2, 2),
            &[
                255, 0, 0, 255, //
                0, 0, 255, 0, //
                0, 0, 255, 0, //
                0, 0, 255, 0,
            ],
        )
        .unwrap();
    update_levels(&mut levels, Rect::new(0, 0, 2, 2)).unwrap();
    assert_eq!(levels[1].pixel(0, 0), Some(vec![255, 0, 0, 64]));
}

#[test]
fn odd_edges_average_only_existing_samples() {
    let mut levels = build_levels(129, 1, PixelFormat::Gray);
    levels[0].fill(&[200]).unwrap();
    let full = levels[0].bounds();
    update_levels(&mut levels, full).unwrap();
    assert_eq!(levels[1].width(), 65);
    assert_eq!(levels[1].pixel(64, 0), Some(vec![200]));
    assert_eq!(levels[2].pixel(32, 0), Some(vec![200]));
}
