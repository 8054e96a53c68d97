//! Tests for cursor module

use super::*;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn raw(value: &Value) -> String {
    STANDARD.encode(serde_json::to_vec(value).unwrap())
}

fn wire_json(encoded: &str) -> Value {
    serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap()
}

fn composite(collection_id: &str, collection_offset: usize, offset: usize) -> CompositeCursor {
    CompositeCursor {
        collection_id: Some(collection_id.to_string()),
        collection_cursor: Some("p2".to_string()),
        collection_offset,
        cursor: Some("m1".to_string()),
        offset,
    }
}

// ============================================================================
// Start state
// ============================================================================

#[test]
fn test_empty_string_is_start() {
    let cursor = decode("").unwrap();
    assert_eq!(cursor, Cursor::start());
    assert!(cursor.is_start());
    assert_eq!(cursor.version, CURSOR_VERSION);
}

#[test]
fn test_empty_object_is_start() {
    let cursor = decode(&raw(&json!({}))).unwrap();
    assert!(cursor.is_start());
}

#[test]
fn test_start_round_trip() {
    let encoded = encode(&Cursor::start()).unwrap();
    assert!(!encoded.is_empty());
    assert_eq!(decode(&encoded).unwrap(), Cursor::start());
}

// ============================================================================
// Shapes
// ============================================================================

#[test]
fn test_page_round_trip() {
    let cursor = Cursor::new(
        2,
        Some(FrameCursor::Page(PageCursor {
            cursor: Some("abc".to_string()),
            offset: 7,
        })),
    );

    let encoded = encode(&cursor).unwrap();
    assert_eq!(
        wire_json(&encoded),
        json!({"version": 1, "accountIndex": 2, "cursor": "abc", "offset": 7})
    );
    assert_eq!(decode(&encoded).unwrap(), cursor);
}

#[test]
fn test_default_page_is_not_start() {
    let cursor = Cursor::new(0, Some(FrameCursor::Page(PageCursor::default())));
    let decoded = decode(&encode(&cursor).unwrap()).unwrap();
    assert_eq!(decoded, cursor);
    assert!(!decoded.is_start());
}

#[test]
fn test_composite_round_trip() {
    let cursor = Cursor::new(0, Some(FrameCursor::Composite(composite("g1", 3, 4))));

    let encoded = encode(&cursor).unwrap();
    assert_eq!(
        wire_json(&encoded),
        json!({
            "version": 1,
            "collectionId": "g1",
            "collectionCursor": "p2",
            "collectionOffset": 3,
            "cursor": "m1",
            "offset": 4
        })
    );
    assert_eq!(decode(&encoded).unwrap(), cursor);
}

#[test]
fn test_default_composite_round_trip() {
    let cursor = Cursor::new(1, Some(FrameCursor::Composite(CompositeCursor::default())));
    assert_eq!(decode(&encode(&cursor).unwrap()).unwrap(), cursor);
}

#[test]
fn test_implicit_filter_round_trip() {
    let cursor = Cursor::new(
        0,
        Some(FrameCursor::ImplicitFilter(ImplicitFilterCursor {
            entity_filter_index: 1,
            member_filter_index: 2,
            cursor: composite("admins", 0, 1),
        })),
    );

    let encoded = encode(&cursor).unwrap();
    let wire = wire_json(&encoded);
    assert_eq!(wire["implicitFilterCursor"]["entityFilterIndex"], json!(1));
    assert_eq!(wire["implicitFilterCursor"]["cursor"]["collectionId"], json!("admins"));
    assert!(wire.get("offset").is_none());
    assert_eq!(decode(&encoded).unwrap(), cursor);
}

#[test]
fn test_related_filter_round_trip() {
    let cursor = Cursor::new(
        3,
        Some(FrameCursor::RelatedFilter(RelatedFilterCursor {
            entity_filter_index: 0,
            member_filter_index: 1,
            entity_index: 2,
            entity_cursor: composite("admins", 1, 0),
            member_id: Some("u1".to_string()),
            related_entity_cursor: PageCursor {
                cursor: None,
                offset: 5,
            },
        })),
    );

    let encoded = encode(&cursor).unwrap();
    assert_eq!(
        wire_json(&encoded)["relatedFilterCursor"]["memberId"],
        json!("u1")
    );
    assert_eq!(decode(&encoded).unwrap(), cursor);
}

// ============================================================================
// Discrimination
// ============================================================================

#[test]
fn test_collection_key_means_composite() {
    let cursor = decode(&raw(&json!({"collectionId": "g1"}))).unwrap();
    match cursor.frame {
        Some(FrameCursor::Composite(c)) => {
            assert_eq!(c.collection_id.as_deref(), Some("g1"));
            assert_eq!(c.offset, 0);
        }
        other => panic!("Expected composite, got {other:?}"),
    }
}

#[test]
fn test_page_keys_mean_page() {
    let cursor = decode(&raw(&json!({"cursor": "t1"}))).unwrap();
    assert_eq!(
        cursor.frame,
        Some(FrameCursor::Page(PageCursor {
            cursor: Some("t1".to_string()),
            offset: 0,
        }))
    );
}

#[test]
fn test_missing_version_defaults() {
    let cursor = decode(&raw(&json!({"offset": 3}))).unwrap();
    assert_eq!(cursor.version, CURSOR_VERSION);
}

#[test]
fn test_unknown_keys_ignored() {
    let cursor = decode(&raw(&json!({"offset": 1, "extra": true}))).unwrap();
    assert!(matches!(cursor.frame, Some(FrameCursor::Page(_))));
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_garbage_base64() {
    let err = decode("!!not base64!!").unwrap_err();
    assert!(matches!(err, crate::Error::MalformedCursor { .. }));
}

#[test]
fn test_non_json_payload() {
    let err = decode(&STANDARD.encode("hello")).unwrap_err();
    assert!(matches!(err, crate::Error::MalformedCursor { .. }));
}

#[test]
fn test_non_object_payload() {
    let err = decode(&raw(&json!([1, 2, 3]))).unwrap_err();
    assert!(matches!(err, crate::Error::MalformedCursor { .. }));
}

#[test]
fn test_wrong_field_type() {
    let err = decode(&raw(&json!({"offset": "seven"}))).unwrap_err();
    assert!(matches!(err, crate::Error::MalformedCursor { .. }));
}

#[test]
fn test_future_version_rejected() {
    let err = decode(&raw(&json!({"version": 2, "offset": 0}))).unwrap_err();
    assert!(err.to_string().contains("version"));
}

#[test]
fn test_both_filter_cursors_rejected() {
    let err = decode(&raw(&json!({
        "implicitFilterCursor": {},
        "relatedFilterCursor": {}
    })))
    .unwrap_err();
    assert!(matches!(err, crate::Error::MalformedCursor { .. }));
}

#[test]
fn test_filter_mixed_with_page_keys_rejected() {
    let err = decode(&raw(&json!({
        "offset": 1,
        "implicitFilterCursor": {"entityFilterIndex": 0}
    })))
    .unwrap_err();
    assert!(matches!(err, crate::Error::MalformedCursor { .. }));
}

#[test]
fn test_oversized_cursor_rejected() {
    let input = "A".repeat(MAX_CURSOR_LEN + 4);
    let err = decode(&input).unwrap_err();
    assert!(matches!(err, crate::Error::MalformedCursor { .. }));
}

#[test]
fn test_frame_kind() {
    assert_eq!(FrameCursor::Page(PageCursor::default()).kind(), "page");
    assert_eq!(
        FrameCursor::Composite(CompositeCursor::default()).kind(),
        "composite"
    );
}

#[test]
fn test_to_json_matches_transport() {
    let cursor = Cursor::new(1, Some(FrameCursor::Composite(composite("g1", 0, 4))));
    let encoded = encode(&cursor).unwrap();
    assert_eq!(to_json(&cursor).unwrap(), wire_json(&encoded));
}
