use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::services::room;
use crate::state::test_helpers::{self, element};

// =============================================================================
// validate
// =============================================================================

#[test]
fn validate_accepts_minimal_element() {
    assert_eq!(validate(&json!({"id": "e1", "type": "rect"})).unwrap(), "e1");
}

#[test]
fn validate_rejects_malformed_envelopes() {
    for body in [
        json!(["not", "an", "object"]),
        json!({"type": "rect"}),
        json!({"id": "", "type": "rect"}),
        json!({"id": 7, "type": "rect"}),
        json!({"id": "e1"}),
        json!({"id": "e1", "type": ""}),
    ] {
        let err = validate(&body).unwrap_err();
        assert_eq!(frames::ErrorCode::error_code(&err), "E_INVALID_ELEMENT", "{body}");
    }
}

#[test]
fn validate_accepts_every_drawable_kind() {
    for kind in KINDS {
        assert_eq!(validate(&json!({"id": "e1", "type": kind})).unwrap(), "e1", "{kind}");
    }
}

#[test]
fn validate_rejects_unknown_kind() {
    for kind in ["note", "Rect", "rectangle", "ellipse"] {
        let err = validate(&json!({"id": "e1", "type": kind})).unwrap_err();
        assert!(matches!(err, ElementError::Invalid("unknown type")), "{kind}");
    }
}

#[tokio::test]
async fn unknown_kind_never_reaches_live_room_or_store() {
    let state = test_helpers::test_app_state();
    let _rx = test_helpers::seed_client(&state, "r", Uuid::new_v4(), "alice").await;
    let err = upsert_element(&state, "r", Some("alice"), json!({"id": "e1", "type": "note"}))
        .await
        .unwrap_err();
    assert_eq!(frames::ErrorCode::error_code(&err), "E_INVALID_ELEMENT");
    assert!(state.rooms.read().await["r"].elements.is_empty());

    let err = upsert_element(&state, "cold", None, json!({"id": "e1", "type": "note"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ElementError::Invalid(_)));
    assert!(state.store.load_room("cold").await.unwrap().elements.is_empty());
}

// =============================================================================
// upsert
// =============================================================================

#[tokio::test]
async fn upsert_into_live_room_marks_dirty_without_store_write() {
    let state = test_helpers::test_app_state();
    let _rx = test_helpers::seed_client(&state, "r", Uuid::new_v4(), "alice").await;

    let id = upsert_element(&state, "r", Some("alice"), element("e1", "pen")).await.unwrap();

    assert_eq!(id, "e1");
    assert!(state.rooms.read().await["r"].dirty.contains("e1"));
    assert!(state.store.load_room("r").await.unwrap().elements.is_empty());
}

#[tokio::test]
async fn same_upsert_twice_converges_to_one_element() {
    let state = test_helpers::test_app_state();
    let _rx = test_helpers::seed_client(&state, "r", Uuid::new_v4(), "alice").await;
    let pen = json!({"id": "p1", "type": "pen", "points": [{"x": 0, "y": 0}, {"x": 10, "y": 10}]});

    upsert_element(&state, "r", Some("alice"), pen.clone()).await.unwrap();
    upsert_element(&state, "r", Some("alice"), pen.clone()).await.unwrap();

    assert_eq!(room::snapshot(&state, "r").await.unwrap(), vec![pen]);
}

#[tokio::test]
async fn upsert_into_stored_room_appends_after_existing() {
    let state = test_helpers::test_app_state();
    upsert_element(&state, "r", None, element("a", "rect")).await.unwrap();
    upsert_element(&state, "r", None, element("b", "rect")).await.unwrap();
    upsert_element(&state, "r", None, json!({"id": "a", "type": "star"})).await.unwrap();

    let stored = state.store.load_room("r").await.unwrap();
    let ids: Vec<&str> = stored.elements.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    assert_eq!(stored.elements[0].body["type"], "star");
    assert!(state.rooms.read().await.is_empty());
}

#[tokio::test]
async fn upsert_rejected_for_non_editor() {
    let state = test_helpers::test_app_state();
    state.store.set_editors("r", Some(&["alice".to_owned()])).await.unwrap();

    let err = upsert_element(&state, "r", Some("mallory"), element("e1", "rect")).await.unwrap_err();
    assert_eq!(frames::ErrorCode::error_code(&err), "E_FORBIDDEN");

    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    room::join_room(&state, "r", Uuid::new_v4(), "mallory", tx).await.unwrap();
    let err = upsert_element(&state, "r", Some("mallory"), element("e1", "rect")).await.unwrap_err();
    assert_eq!(frames::ErrorCode::error_code(&err), "E_FORBIDDEN");

    upsert_element(&state, "r", Some("alice"), element("e1", "rect")).await.unwrap();
    assert_eq!(room::snapshot(&state, "r").await.unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_upsert_leaves_room_untouched() {
    let state = test_helpers::test_app_state();
    let _rx = test_helpers::seed_client(&state, "r", Uuid::new_v4(), "alice").await;
    assert!(upsert_element(&state, "r", Some("alice"), json!({"type": "rect"})).await.is_err());
    assert!(state.rooms.read().await["r"].elements.is_empty());
}

// =============================================================================
// delete
// =============================================================================

#[tokio::test]
async fn delete_removes_from_memory_and_store() {
    let state = test_helpers::test_app_state();
    upsert_element(&state, "r", None, element("a", "rect")).await.unwrap();
    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    room::join_room(&state, "r", Uuid::new_v4(), "alice", tx).await.unwrap();
    upsert_element(&state, "r", Some("alice"), element("b", "rect")).await.unwrap();

    assert!(delete_element(&state, "r", Some("alice"), "a").await.unwrap());
    assert!(delete_element(&state, "r", Some("alice"), "b").await.unwrap());
    assert!(!delete_element(&state, "r", Some("alice"), "b").await.unwrap());

    assert!(room::snapshot(&state, "r").await.unwrap().is_empty());
    assert!(state.store.load_room("r").await.unwrap().elements.is_empty());
    assert!(state.rooms.read().await["r"].dirty.is_empty());
}

#[tokio::test]
async fn delete_store_failure_is_retryable() {
    let (state, store) = test_helpers::flaky_app_state();
    store.set_failing(true);
    let err = delete_element(&state, "r", None, "a").await.unwrap_err();
    assert_eq!(frames::ErrorCode::error_code(&err), "E_STORE");
    assert!(frames::ErrorCode::retryable(&err));
}
