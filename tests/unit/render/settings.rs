use std::collections::HashMap;

use super::*;

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |k: &str| map.get(k).cloned()
}

#[test]
fn defaults() {
    let s = RenderSettings::default();
    assert_eq!(s.check_size, CheckSize::Medium);
    assert_eq!(s.check_type, CheckType::GrayChecks);
    assert!(s.transparency_indicator);
    assert!(s.row_reuse);
}

#[test]
fn overlay_reads_known_vars() {
    let s = RenderSettings::default().overlay_vars(vars(&[
        ("MOSAIC_CHECK_SIZE", "small"),
        ("MOSAIC_CHECK_TYPE", "gray-only"),
        ("MOSAIC_TRANSPARENCY_INDICATOR", "0"),
        ("MOSAIC_ROW_REUSE", "false"),
    ]));
    assert_eq!(s.check_size, CheckSize::Small);
    assert_eq!(s.check_type, CheckType::GrayOnly);
    assert!(!s.transparency_indicator);
    assert!(!s.row_reuse);
}

#[test]
fn overlay_ignores_garbage() {
    let s = RenderSettings::default().overlay_vars(vars(&[
        ("MOSAIC_CHECK_SIZE", "enormous"),
        ("MOSAIC_ROW_REUSE", "maybe"),
    ]));
    assert_eq!(s, RenderSettings::default());
}

#[test]
fn json_round_trip_with_partial_document() {
    let s = RenderSettings::from_json_str(r#"{"check_type":"dark_checks"}"#).unwrap();
    assert_eq!(s.check_type, CheckType::DarkChecks);
    assert_eq!(s.check_size, CheckSize::Medium);

    let text = s.to_json_string().unwrap();
    assert_eq!(RenderSettings::from_json_str(&text).unwrap(), s);

    let err = RenderSettings::from_json_str("{").unwrap_err();
    assert!(matches!(err, MosaicError::Settings(_)));
}
