use super::*;

#[test]
fn constructors_map_to_expected_variants() {
    assert!(matches!(
        FlurryError::validation("x"),
        FlurryError::Validation(_)
    ));
    assert!(matches!(
        FlurryError::evaluation("x"),
        FlurryError::Evaluation(_)
    ));
    assert!(matches!(FlurryError::render("x"), FlurryError::Render(_)));
    assert!(matches!(
        FlurryError::unavailable("x"),
        FlurryError::Unavailable(_)
    ));
    assert!(matches!(FlurryError::serde("x"), FlurryError::Serde(_)));
}

#[test]
fn display_messages_are_prefixed() {
    assert_eq!(
        FlurryError::validation("bad lifetime").to_string(),
        "validation error: bad lifetime"
    );
    assert_eq!(
        FlurryError::Disposed("render target").to_string(),
        "render target used after dispose"
    );
}

#[test]
fn json_errors_convert_to_serde_variant() {
    let err = serde_json::from_str::<u32>("nope").unwrap_err();
    let err: FlurryError = err.into();
    assert!(matches!(err, FlurryError::Serde(_)));
}

#[test]
fn anyhow_errors_are_transparent() {
    let err: FlurryError = anyhow::anyhow!("disk on fire").into();
    assert_eq!(err.to_string(), "disk on fire");
}
