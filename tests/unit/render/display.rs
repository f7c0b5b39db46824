use super::*;

#[test]
fn dim_keeps_the_mask_channel() {
    let mut px = [200u8, 100, 40];
    MaskChannel::Green.dim(&mut px);
    assert_eq!(px, [50, 100, 10]);

    let mut px = [200u8, 100, 40];
    MaskChannel::default().dim(&mut px);
    assert_eq!(px, [200, 25, 10]);
}

#[test]
fn mask_overlay_requires_gray() {
    let rgb = TileStore::new(2, 2, PixelFormat::Rgb);
    assert!(MaskOverlay::new(&rgb, MaskChannel::Blue).is_err());
    let gray = TileStore::new(2, 2, PixelFormat::Gray);
    let mask = MaskOverlay::new(&gray, MaskChannel::Blue).unwrap();
    assert_eq!(mask.tiles().width(), 2);
}

#[test]
fn scales_must_be_positive() {
    assert!(DisplayState::default().validate().is_ok());
    for (sx, sy) in [(0.0, 1.0), (1.0, -2.0), (f64::NAN, 1.0), (1.0, f64::INFINITY)] {
        let err = DisplayState::default().with_scale(sx, sy).validate().unwrap_err();
        assert!(matches!(err, MosaicError::Render(_)));
    }
}
