use serde_json::json;
use tokio::time::{Duration, timeout};
use uuid::Uuid;

use super::*;
use crate::state::test_helpers::{self, element};

async fn recv(rx: &mut tokio::sync::mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("broadcast receive timed out")
        .expect("broadcast channel closed")
}

async fn put(state: &AppState, room_id: &str, element_id: &str, body: Value) -> Result<StatusCode, StatusCode> {
    put_element(State(state.clone()), Path((room_id.to_owned(), element_id.to_owned())), Json(body)).await
}

#[tokio::test]
async fn put_then_list_returns_elements_in_order() {
    let state = test_helpers::test_app_state();
    assert_eq!(put(&state, "r", "a", element("a", "rect")).await, Ok(StatusCode::NO_CONTENT));
    assert_eq!(put(&state, "r", "b", element("b", "line")).await, Ok(StatusCode::NO_CONTENT));

    let Json(listed) = list_elements(State(state.clone()), Path("r".to_owned())).await.unwrap();
    let ids: Vec<&str> = listed.iter().filter_map(|e| e["id"].as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
}

#[tokio::test]
async fn put_fills_missing_id_from_path() {
    let state = test_helpers::test_app_state();
    put(&state, "r", "t1", json!({"type": "text", "text": "hi"})).await.unwrap();
    let Json(listed) = list_elements(State(state.clone()), Path("r".to_owned())).await.unwrap();
    assert_eq!(listed[0]["id"], "t1");
}

#[tokio::test]
async fn put_rejects_mismatched_or_invalid_bodies() {
    let state = test_helpers::test_app_state();
    assert_eq!(put(&state, "r", "a", element("b", "rect")).await, Err(StatusCode::BAD_REQUEST));
    assert_eq!(put(&state, "r", "a", json!([1, 2])).await, Err(StatusCode::BAD_REQUEST));
    assert_eq!(put(&state, "r", "a", json!({"x": 1})).await, Err(StatusCode::UNPROCESSABLE_ENTITY));
}

#[tokio::test]
async fn put_relays_to_live_clients() {
    let state = test_helpers::test_app_state();
    let mut rx = test_helpers::seed_client(&state, "r", Uuid::new_v4(), "alice").await;

    put(&state, "r", "a", element("a", "star")).await.unwrap();

    let notice = recv(&mut rx).await;
    assert_eq!(notice.syscall, syscall::ELEMENT_UPSERT);
    assert_eq!(notice.status, frames::Status::Request);
    assert_eq!(notice.room_id.as_deref(), Some("r"));
    assert_eq!(notice.data["element"]["type"], "star");
}

#[tokio::test]
async fn delete_element_reports_missing() {
    let state = test_helpers::test_app_state();
    put(&state, "r", "a", element("a", "rect")).await.unwrap();
    let path = || Path(("r".to_owned(), "a".to_owned()));

    assert_eq!(delete_element(State(state.clone()), path()).await, Ok(StatusCode::NO_CONTENT));
    assert_eq!(delete_element(State(state.clone()), path()).await, Err(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn clear_truncates_and_relays() {
    let state = test_helpers::test_app_state();
    put(&state, "r", "a", element("a", "rect")).await.unwrap();
    let mut rx = test_helpers::seed_client(&state, "r", Uuid::new_v4(), "alice").await;

    assert_eq!(clear_elements(State(state.clone()), Path("r".to_owned())).await, Ok(StatusCode::NO_CONTENT));

    assert_eq!(recv(&mut rx).await.syscall, syscall::ROOM_CLEAR);
    let Json(listed) = list_elements(State(state.clone()), Path("r".to_owned())).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn store_failure_maps_to_internal_error() {
    let (state, store) = test_helpers::flaky_app_state();
    store.set_failing(true);
    assert_eq!(
        list_elements(State(state.clone()), Path("r".to_owned())).await.err(),
        Some(StatusCode::INTERNAL_SERVER_ERROR)
    );
}

#[tokio::test]
async fn editors_restrict_live_clients_and_can_be_lifted() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    room::join_room(&state, "r", Uuid::new_v4(), "mallory", tx).await.unwrap();

    let body = EditorsBody { editors: Some(vec!["alice".into()]) };
    assert_eq!(put_editors(State(state.clone()), Path("r".to_owned()), Json(body)).await, Ok(StatusCode::NO_CONTENT));
    let err = element::upsert_element(&state, "r", Some("mallory"), element("a", "rect")).await.unwrap_err();
    assert_eq!(element_error_to_status(err), StatusCode::FORBIDDEN);
    assert_eq!(state.store.load_room("r").await.unwrap().editors, Some(vec!["alice".to_owned()]));

    let body = EditorsBody { editors: None };
    put_editors(State(state.clone()), Path("r".to_owned()), Json(body)).await.unwrap();
    element::upsert_element(&state, "r", Some("mallory"), element("a", "rect")).await.unwrap();
}

#[test]
fn forbidden_maps_to_403() {
    assert_eq!(room_error_to_status(RoomError::Forbidden("x".into())), StatusCode::FORBIDDEN);
    assert_eq!(element_error_to_status(ElementError::Forbidden("x".into())), StatusCode::FORBIDDEN);
}
