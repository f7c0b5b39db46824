use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        MosaicError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        MosaicError::invalid_rect("x")
            .to_string()
            .contains("invalid rectangle:")
    );
    assert!(
        MosaicError::composite("x")
            .to_string()
            .contains("composite error:")
    );
    assert!(
        MosaicError::render("x")
            .to_string()
            .contains("render error:")
    );
    assert!(
        MosaicError::settings("x")
            .to_string()
            .contains("settings error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = MosaicError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
