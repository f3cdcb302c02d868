// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn payload_round_trips_arbitrary_json() {
    let mut kwargs = Map::new();
    kwargs.insert("depth".to_string(), json!(3));
    kwargs.insert("tags".to_string(), json!(["a", "b"]));
    let payload = TaskPayload::new(vec![json!("x"), json!(null)], kwargs);

    let encoded = serde_json::to_string(&payload).unwrap();
    let back: TaskPayload = serde_json::from_str(&encoded).unwrap();
    assert_eq!(back, payload);
}

#[test]
fn payload_defaults_to_empty() {
    let payload: TaskPayload = serde_json::from_str("{}").unwrap();
    assert!(payload.args.is_empty());
    assert!(payload.kwargs.is_empty());
}

#[test]
fn failure_encodes_type_tag_verbatim() {
    let failure = Failure::new(FailureKind::ProcessingException, "device busy");
    let encoded = serde_json::to_string(&failure).unwrap();
    assert_eq!(
        encoded,
        "{\"type\":\"ProcessingException\",\"message\":\"device busy\"}"
    );
}

#[test]
fn failure_decodes_all_kinds() {
    for tag in ["UnknownProcessor", "ProcessingException", "InitException", "Exception"] {
        let json = format!("{{\"type\":\"{tag}\",\"message\":\"m\"}}");
        let failure: Failure = serde_json::from_str(&json).unwrap();
        assert_eq!(failure.kind.to_string(), tag);
    }
}

#[test]
fn only_processing_exceptions_are_requeueable() {
    assert!(FailureKind::ProcessingException.requeueable());
    assert!(!FailureKind::UnknownProcessor.requeueable());
    assert!(!FailureKind::InitException.requeueable());
    assert!(!FailureKind::Exception.requeueable());
}
