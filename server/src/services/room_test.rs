use super::*;
use crate::state::test_helpers::{self, element};
use crate::store::ElementRecord;
use frames::Data;
use tokio::time::{Duration, timeout};

async fn assert_channel_has_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("frame receive timed out")
        .expect("channel closed")
}

async fn assert_channel_empty(rx: &mut mpsc::Receiver<Frame>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected channel to remain empty"
    );
}

async fn seed_store(state: &AppState, room_id: &str, ids: &[&str]) {
    let records: Vec<ElementRecord> = ids
        .iter()
        .zip(1..)
        .map(|(id, seq)| ElementRecord { id: (*id).to_owned(), seq, body: element(id, "rect") })
        .collect();
    state.store.upsert_elements(room_id, &records).await.unwrap();
}

fn ids(bodies: &[Value]) -> Vec<&str> {
    bodies.iter().filter_map(|b| b["id"].as_str()).collect()
}

// =============================================================================
// join / part
// =============================================================================

#[tokio::test]
async fn first_join_hydrates_from_store_in_order() {
    let state = test_helpers::test_app_state();
    seed_store(&state, "r", &["a", "b", "c"]).await;

    let (tx, _rx) = mpsc::channel(8);
    let snapshot = join_room(&state, "r", Uuid::new_v4(), "alice", tx).await.unwrap();

    assert_eq!(ids(&snapshot.elements), ["a", "b", "c"]);
    let rooms = state.rooms.read().await;
    assert_eq!(rooms["r"].next_seq, 4);
    assert_eq!(rooms["r"].clients.len(), 1);
}

#[tokio::test]
async fn attach_client_never_creates_an_unhydrated_room() {
    let state = test_helpers::test_app_state();
    seed_store(&state, "r", &["a"]).await;

    let (tx, _rx) = mpsc::channel(8);
    assert!(attach_client(&state, "r", Uuid::new_v4(), "alice", tx).await.is_none());
    assert!(state.rooms.read().await.get("r").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn join_racing_last_part_always_sees_stored_elements() {
    let state = test_helpers::test_app_state();
    seed_store(&state, "r", &["a"]).await;

    for _ in 0..200 {
        let leaving = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(8);
        join_room(&state, "r", leaving, "alice", tx).await.unwrap();

        let parting = tokio::spawn({
            let state = state.clone();
            async move { part_room(&state, "r", leaving).await }
        });
        let joining = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(8);
        let snapshot = join_room(&state, "r", joining, "bob", tx).await.unwrap();
        parting.await.unwrap();

        assert_eq!(ids(&snapshot.elements), ["a"]);
        assert_eq!(state.rooms.read().await["r"].next_seq, 2);
        part_room(&state, "r", joining).await;
    }
}

#[tokio::test]
async fn second_join_sees_live_edits_not_store() {
    let state = test_helpers::test_app_state();
    let (tx_a, _rx_a) = mpsc::channel(8);
    join_room(&state, "r", Uuid::new_v4(), "alice", tx_a).await.unwrap();
    state.rooms.write().await.get_mut("r").unwrap().apply_upsert("live", element("live", "pen"));

    let (tx_b, _rx_b) = mpsc::channel(8);
    let snapshot = join_room(&state, "r", Uuid::new_v4(), "bob", tx_b).await.unwrap();
    assert_eq!(ids(&snapshot.elements), ["live"]);
}

#[tokio::test]
async fn join_fails_when_store_unavailable() {
    let (state, store) = test_helpers::flaky_app_state();
    store.set_failing(true);
    let (tx, _rx) = mpsc::channel(8);
    let err = join_room(&state, "r", Uuid::new_v4(), "alice", tx).await.unwrap_err();
    assert_eq!(frames::ErrorCode::error_code(&err), "E_STORE");
    assert!(frames::ErrorCode::retryable(&err));
    assert!(state.rooms.read().await.is_empty());
}

#[tokio::test]
async fn part_keeps_room_while_other_clients_remain() {
    let state = test_helpers::test_app_state();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let _rx_a = test_helpers::seed_client(&state, "r", a, "alice").await;
    let _rx_b = test_helpers::seed_client(&state, "r", b, "bob").await;

    part_room(&state, "r", a).await;

    let rooms = state.rooms.read().await;
    assert_eq!(rooms["r"].clients.len(), 1);
    assert!(rooms["r"].clients.contains_key(&b));
}

#[tokio::test]
async fn last_part_flushes_and_evicts() {
    let state = test_helpers::test_app_state();
    let a = Uuid::new_v4();
    let _rx = test_helpers::seed_client(&state, "r", a, "alice").await;
    state.rooms.write().await.get_mut("r").unwrap().apply_upsert("x", element("x", "line"));

    part_room(&state, "r", a).await;

    assert!(state.rooms.read().await.is_empty());
    let stored = state.store.load_room("r").await.unwrap();
    assert_eq!(stored.elements.len(), 1);
    assert_eq!(stored.elements[0].body["type"], "line");
}

#[tokio::test]
async fn failed_final_flush_retains_room_for_retry() {
    let (state, store) = test_helpers::flaky_app_state();
    let a = Uuid::new_v4();
    let _rx = test_helpers::seed_client(&state, "r", a, "alice").await;
    state.rooms.write().await.get_mut("r").unwrap().apply_upsert("x", element("x", "rect"));

    store.set_failing(true);
    part_room(&state, "r", a).await;
    {
        let rooms = state.rooms.read().await;
        assert!(rooms["r"].dirty.contains("x"));
    }

    // A rejoin keeps the retained edits instead of rehydrating over them.
    store.set_failing(false);
    let (tx, _rx2) = mpsc::channel(8);
    let snapshot = join_room(&state, "r", Uuid::new_v4(), "alice", tx).await.unwrap();
    assert_eq!(ids(&snapshot.elements), ["x"]);
}

#[tokio::test]
async fn part_unknown_room_is_noop() {
    let state = test_helpers::test_app_state();
    part_room(&state, "missing", Uuid::new_v4()).await;
    assert!(state.rooms.read().await.is_empty());
}

// =============================================================================
// snapshot / clear
// =============================================================================

#[tokio::test]
async fn snapshot_reads_store_when_room_not_live() {
    let state = test_helpers::test_app_state();
    seed_store(&state, "r", &["a", "b"]).await;
    assert_eq!(ids(&snapshot(&state, "r").await.unwrap()), ["a", "b"]);
    assert!(state.rooms.read().await.is_empty());
}

#[tokio::test]
async fn clear_truncates_memory_and_store() {
    let state = test_helpers::test_app_state();
    seed_store(&state, "r", &["a"]).await;
    let (tx, _rx) = mpsc::channel(8);
    join_room(&state, "r", Uuid::new_v4(), "alice", tx).await.unwrap();
    state.rooms.write().await.get_mut("r").unwrap().apply_upsert("b", element("b", "rect"));

    clear_room(&state, "r", Some("alice")).await.unwrap();

    assert!(snapshot(&state, "r").await.unwrap().is_empty());
    assert!(state.rooms.read().await["r"].dirty.is_empty());
    assert!(state.store.load_room("r").await.unwrap().elements.is_empty());
}

#[tokio::test]
async fn clear_respects_editor_allow_list() {
    let state = test_helpers::test_app_state();
    seed_store(&state, "r", &["a"]).await;
    state.store.set_editors("r", Some(&["alice".to_owned()])).await.unwrap();

    let err = clear_room(&state, "r", Some("mallory")).await.unwrap_err();
    assert_eq!(frames::ErrorCode::error_code(&err), "E_FORBIDDEN");
    assert_eq!(snapshot(&state, "r").await.unwrap().len(), 1);

    clear_room(&state, "r", None).await.unwrap();
    assert!(snapshot(&state, "r").await.unwrap().is_empty());
}

// =============================================================================
// broadcast
// =============================================================================

#[tokio::test]
async fn broadcast_sends_to_all_except_excluded_client() {
    let state = test_helpers::test_app_state();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let c = Uuid::new_v4();
    let mut rx_a = test_helpers::seed_client(&state, "r", a, "alice").await;
    let mut rx_b = test_helpers::seed_client(&state, "r", b, "bob").await;
    let mut rx_c = test_helpers::seed_client(&state, "r", c, "carol").await;

    let frame = Frame::request(frames::syscall::ELEMENT_UPSERT, Data::new()).with_room_id("r");
    broadcast(&state, "r", &frame, Some(b)).await;

    assert_eq!(assert_channel_has_frame(&mut rx_a).await.id, frame.id);
    assert_eq!(assert_channel_has_frame(&mut rx_c).await.id, frame.id);
    assert_channel_empty(&mut rx_b).await;
}

#[tokio::test]
async fn broadcast_skips_full_client_queue() {
    let state = test_helpers::test_app_state();
    let (tx_slow, mut rx_slow) = mpsc::channel(1);
    let fast = Uuid::new_v4();
    let mut rx_fast = test_helpers::seed_client(&state, "r", fast, "fast").await;
    state
        .rooms
        .write()
        .await
        .get_mut("r")
        .unwrap()
        .clients
        .insert(Uuid::new_v4(), ConnectedClient { label: "slow".into(), tx: tx_slow });

    let first = Frame::request(frames::syscall::CURSOR_MOVE, Data::new());
    let second = Frame::request(frames::syscall::CURSOR_MOVE, Data::new());
    broadcast(&state, "r", &first, None).await;
    broadcast(&state, "r", &second, None).await;

    assert_eq!(assert_channel_has_frame(&mut rx_fast).await.id, first.id);
    assert_eq!(assert_channel_has_frame(&mut rx_fast).await.id, second.id);
    assert_eq!(assert_channel_has_frame(&mut rx_slow).await.id, first.id);
    assert_channel_empty(&mut rx_slow).await;
}
