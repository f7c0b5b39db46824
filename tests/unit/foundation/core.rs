use super::*;

#[test]
fn rect_intersect_clips_and_rejects_empty() {
    let a = Rect::new(0, 0, 10, 10);
    let b = Rect::new(5, -3, 10, 6);
    assert_eq!(a.intersect(b), Some(Rect::new(5, 0, 5, 3)));

    let c = Rect::new(10, 0, 4, 4);
    assert_eq!(a.intersect(c), None);
    assert_eq!(a.intersect(Rect::new(2, 2, 0, 5)), None);
}

#[test]
fn rect_contains_rect_boundaries() {
    let outer = Rect::new(-2, -2, 8, 8);
    assert!(outer.contains_rect(Rect::new(-2, -2, 8, 8)));
    assert!(outer.contains_rect(Rect::new(0, 0, 2, 2)));
    assert!(!outer.contains_rect(Rect::new(0, 0, 7, 2)));
}

#[test]
fn negative_rect_fails_validation() {
    assert!(Rect::new(0, 0, -1, 4).validate_non_negative("r").is_err());
    assert!(Rect::new(0, 0, 0, 0).validate_non_negative("r").is_ok());
}

#[test]
fn pixel_format_layout() {
    let expected = [
        (PixelFormat::Rgb, 3, false),
        (PixelFormat::Rgba, 4, true),
        (PixelFormat::Gray, 1, false),
        (PixelFormat::GrayA, 2, true),
        (PixelFormat::Indexed, 1, false),
        (PixelFormat::IndexedA, 2, true),
    ];
    for (format, bytes, alpha) in expected {
        assert_eq!(format.bytes(), bytes, "{format:?}");
        assert_eq!(format.has_alpha(), alpha, "{format:?}");
        assert_eq!(format.with_alpha().base_type(), format.base_type());
    }
    assert_eq!(PixelFormat::Rgba.alpha_index(), Some(3));
    assert_eq!(PixelFormat::Gray.alpha_index(), None);
}

#[test]
fn projection_format_follows_base_type() {
    assert_eq!(ImageBaseType::Rgb.projection_format(), PixelFormat::Rgba);
    assert_eq!(ImageBaseType::Indexed.projection_format(), PixelFormat::Rgba);
    assert_eq!(ImageBaseType::Gray.projection_format(), PixelFormat::GrayA);
}
