use garden_tools::ToolError;
use garden_tools::tag::{
    DecodePolicy, TagStyle, decode_location_tag, decode_name_tag, encode_location_tag,
    encode_name_tag,
};

#[test]
fn name_tag_with_variety_is_split() {
    let (name, variety) =
        decode_name_tag("#Rose 'Climbing Iceberg'", TagStyle::VARIETY).expect("decoded");
    assert_eq!(name, "Rose");
    assert_eq!(variety, "Climbing Iceberg");
}

#[test]
fn name_tag_without_variety_keeps_whole_name() {
    let (name, variety) = decode_name_tag("#Lamb's Ear", TagStyle::VARIETY).expect("decoded");
    assert_eq!(name, "Lamb's Ear");
    assert_eq!(variety, "");
}

#[test]
fn location_tag_drops_marker() {
    let label = decode_location_tag("#Bed A", TagStyle::VARIETY).expect("decoded");
    assert_eq!(label, "Bed A");
}

#[test]
fn catalogue_style_uses_double_quotes() {
    let tag = "#Solanum lycopersicum \"Tomato\"";
    assert!(TagStyle::COMMON_NAME.is_qualified(tag));
    assert!(!TagStyle::VARIETY.is_qualified(tag));
    let (name, common) = decode_name_tag(tag, TagStyle::COMMON_NAME).expect("decoded");
    assert_eq!(name, "Solanum lycopersicum");
    assert_eq!(common, "Tomato");
}

#[test]
fn encoded_tags_decode_to_the_same_parts() {
    let samples = [
        ("Rose", "Climbing"),
        ("Tomato", "Sungold F1"),
        ("Apple", "Cox's Orange Pippin"),
        ("Basil", ""),
        ("Lamb's Ear", ""),
    ];
    for (name, variety) in samples {
        let tag = encode_name_tag(name, variety, TagStyle::VARIETY);
        let decoded = decode_name_tag(&tag, TagStyle::VARIETY).expect("decoded");
        assert_eq!(decoded, (name.to_string(), variety.to_string()), "tag {tag}");
    }

    let location = encode_location_tag("Greenhouse", TagStyle::VARIETY);
    assert_eq!(
        decode_location_tag(&location, TagStyle::VARIETY).expect("decoded"),
        "Greenhouse"
    );
}

#[test]
fn malformed_tags_name_the_offending_tag() {
    let cases = [
        "Rose 'Climbing'",
        "# 'Climbing'",
        "#Rose ''",
        "#Rose 'Climbing",
        "#",
    ];
    for raw in cases {
        match decode_name_tag(raw, TagStyle::VARIETY) {
            Err(ToolError::Decode { tag, .. }) => assert_eq!(tag, raw),
            other => panic!("expected decode error for {raw:?}, got {other:?}"),
        }
    }

    assert!(matches!(
        decode_location_tag("Bed A", TagStyle::VARIETY),
        Err(ToolError::Decode { .. })
    ));
    assert!(matches!(
        decode_location_tag("#", TagStyle::VARIETY),
        Err(ToolError::Decode { .. })
    ));
}

#[test]
fn decode_policy_skips_or_aborts() {
    let failure = || decode_name_tag("Rose", TagStyle::VARIETY);

    assert_eq!(DecodePolicy::default(), DecodePolicy::Abort);
    assert!(DecodePolicy::Abort.resolve(failure()).is_err());
    assert!(
        DecodePolicy::Skip
            .resolve(failure())
            .expect("skipped")
            .is_none()
    );

    let other = DecodePolicy::Skip.resolve::<()>(Err(ToolError::Config("boom".to_string())));
    assert!(matches!(other, Err(ToolError::Config(_))));
}
