// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    readable = { FileKind::Readable, "r", true, false },
    writable = { FileKind::Writable, "w", false, true },
    locked = { FileKind::Locked, "l", true, false },
)]
fn kind_codes_and_access(kind: FileKind, code: &str, readable: bool, writable: bool) {
    assert_eq!(kind.code(), code);
    assert_eq!(FileKind::from_code(code), Some(kind));
    assert_eq!(kind.readable(), readable);
    assert_eq!(kind.writable(), writable);
}

#[test]
fn unknown_code_is_rejected() {
    assert_eq!(FileKind::from_code("x"), None);
    assert_eq!(FileKind::from_code(""), None);
}

#[test]
fn kind_serializes_as_wire_code() {
    let json = serde_json::to_string(&FileKind::Locked).unwrap();
    assert_eq!(json, "\"l\"");
}

#[test]
fn record_round_trips_through_json() {
    let record = FileRecord::new(FileId::new(3), "a.bin", "/srv/files/a.bin", FileKind::Readable);
    let json = serde_json::to_string(&record).unwrap();
    let back: FileRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
    // The persisted form uses the original `type` field name.
    assert!(json.contains("\"type\":\"r\""));
}

#[test]
fn registry_fields_omit_location() {
    let record = FileRecord::new(FileId::new(9), "out.dat", "/tmp/out.dat", FileKind::Writable);
    let fields = record.registry_fields();
    assert_eq!(
        fields,
        vec![
            ("id".to_string(), "9".to_string()),
            ("name".to_string(), "out.dat".to_string()),
            ("type".to_string(), "w".to_string()),
        ]
    );
}
