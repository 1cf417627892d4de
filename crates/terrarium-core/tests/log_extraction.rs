mod support;

use terrarium_core::chain::log::{
    CODE_ID_ATTR, CONTRACT_ADDRESS_ATTR, INSTANTIATE_EVENTS, STORE_CODE_EVENTS,
};
use terrarium_core::chain::{LogError, extract_attribute};

#[test]
fn reads_code_id_from_store_code_event() {
    let raw = support::store_code_log("42");
    let code_id = extract_attribute(&raw, STORE_CODE_EVENTS, CODE_ID_ATTR).unwrap();
    assert_eq!(code_id, "42");
}

#[test]
fn reads_address_from_either_instantiate_event_name() {
    for event in ["instantiate_contract", "instantiate"] {
        let raw = support::instantiate_log(event, "terra1abc");
        let address = extract_attribute(&raw, INSTANTIATE_EVENTS, CONTRACT_ADDRESS_ATTR).unwrap();
        assert_eq!(address, "terra1abc", "event {event}");
    }
}

#[test]
fn missing_event_lists_what_was_found() {
    let raw = support::store_code_log("42");

    let err = extract_attribute(&raw, INSTANTIATE_EVENTS, CONTRACT_ADDRESS_ATTR).unwrap_err();
    match err {
        LogError::EventNotFound { expected, found } => {
            assert_eq!(expected, vec!["instantiate_contract", "instantiate"]);
            assert_eq!(found, vec!["message", "store_code"]);
        }
        other => panic!("expected EventNotFound, got {other:?}"),
    }
}

#[test]
fn error_text_is_malformed_and_kept() {
    let raw = "out of gas in location: wasm contract; gasWanted: 100";

    let err = extract_attribute(raw, STORE_CODE_EVENTS, CODE_ID_ATTR).unwrap_err();
    match err {
        LogError::Malformed { raw_log, .. } => assert_eq!(raw_log, raw),
        other => panic!("expected Malformed, got {other:?}"),
    }
}

#[test]
fn missing_attribute_names_event_and_key() {
    let raw = r#"[{"events": [{"type": "store_code", "attributes": [{"key": "sender", "value": "terra1"}]}]}]"#;

    let err = extract_attribute(raw, STORE_CODE_EVENTS, CODE_ID_ATTR).unwrap_err();
    assert!(matches!(
        err,
        LogError::AttributeNotFound { event, key } if event == "store_code" && key == "code_id"
    ));
}
