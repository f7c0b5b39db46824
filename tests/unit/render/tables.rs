use super::*;

#[test]
fn check_sizes_are_powers_of_two() {
    for size in [CheckSize::Small, CheckSize::Medium, CheckSize::Large] {
        let (mask, shift) = size.mask_shift();
        assert_eq!(mask + 1, 1 << shift, "{size:?}");
    }
    assert_eq!(CheckSize::parse(" Large "), Some(CheckSize::Large));
    assert_eq!(CheckSize::parse("huge"), None);
}

#[test]
fn table_endpoints() {
    let t = CheckTables::new(CheckType::GrayChecks, true);
    for sample in [0u8, 10, 200, 255] {
        assert_eq!(t.blend(false, 255, sample), sample);
        assert_eq!(t.blend(true, 255, sample), sample);
    }
    assert_eq!(t.blend(false, 0, 77), 153);
    assert_eq!(t.blend(true, 0, 77), 102);
    assert_eq!(t.blend(false, 128, 255), ((255 * 128 + 153 * 127) / 255) as u8);
}

#[test]
fn disabled_indicator_uses_light_for_both_phases() {
    let t = CheckTables::new(CheckType::LightChecks, false);
    assert_eq!(t.blend(true, 0, 0), 255);
    assert_eq!(t.blend(false, 0, 0), 255);
}

#[test]
fn alpha_table_scales_and_rebuilds_lazily() {
    let mut a = AlphaTable::new(255);
    assert_eq!(a.apply(200), 200);
    assert_eq!(a.key(200), 200 << 8);
    assert!(!a.update(255));
    assert!(a.update(128));
    assert_eq!(a.apply(255), 128);
    assert_eq!(a.apply(100), (128 * 100 / 255) as u8);
    assert_eq!(a.scale(), 128);
}
