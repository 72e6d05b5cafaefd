//! Tests the non-redacted encode/decode round trip.

use talos_core::{Password, SecretRecord, decode, encode};

#[test]
fn record_round_trip_tests_preserve_every_field() {
    let records = [
        SecretRecord::new(Password::literal("s3cr3t!"))
            .with_username("alice")
            .with_url("https://mail.example.com")
            .with_note("recovery codes in drawer\nsecond line"),
        SecretRecord::new(Password::literal("")),
        SecretRecord::new(Password::literal("only-password")),
        SecretRecord::new(Password::literal("pw")).with_note("note without metadata"),
        SecretRecord::new(Password::literal("User: not-metadata")).with_username("bob"),
    ];

    for record in &records {
        let decoded = decode(&encode(record, false, true));
        assert_eq!(&decoded, record);
    }
}

#[test]
fn record_round_trip_tests_trim_note_whitespace() {
    let record = SecretRecord::new(Password::literal("pw")).with_note("\n  padded note  \n");
    let decoded = decode(&encode(&record, false, true));
    assert_eq!(decoded.note, "padded note");
}

#[test]
fn record_round_trip_tests_emit_canonical_order() {
    let record = SecretRecord::new(Password::literal("pw"))
        .with_username("bob")
        .with_url("https://example.com")
        .with_note("note");

    assert_eq!(
        encode(&record, false, true),
        "pw\nURL: https://example.com\nUser: bob\nnote"
    );
}

#[test]
fn record_round_trip_tests_empty_blob_decodes_to_empty_record() {
    let record = decode("");
    assert_eq!(record.password, Password::literal(""));
    assert!(record.username.is_empty());
    assert!(record.url.is_empty());
    assert!(record.note.is_empty());
}
