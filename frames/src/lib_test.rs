use super::*;

fn sample_frame() -> Frame {
    let req = Frame::request(syscall::ELEMENT_UPSERT, Data::new()).with_room_id("lobby");
    req.done_with(Data::new())
        .with_from("client-1")
        .with_data("x", 1.25)
        .with_data("ok", true)
        .with_data("tags", serde_json::json!(["a", "b"]))
        .with_data("element", serde_json::json!({"id": "p1", "type": "pen", "points": [{"x": 0.5, "y": 1.5}]}))
        .with_data("nil", Value::Null)
}

#[derive(Debug)]
struct Denied;

impl std::fmt::Display for Denied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("edit denied")
    }
}

impl ErrorCode for Denied {
    fn error_code(&self) -> &'static str {
        "E_FORBIDDEN"
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

#[test]
fn request_sets_fields() {
    let frame = Frame::request(syscall::ROOM_JOIN, Data::new());
    assert_eq!(frame.syscall, "room:join");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.room_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let req = Frame::request(syscall::ELEMENT_UPSERT, Data::new()).with_room_id("lobby");
    let done = req.done();
    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.room_id.as_deref(), Some("lobby"));
    assert_eq!(done.syscall, req.syscall);
    assert_eq!(done.status, Status::Done);
    assert!(done.status.is_terminal());
}

#[test]
fn error_from_carries_code_and_retryable() {
    let req = Frame::request(syscall::ELEMENT_UPSERT, Data::new());
    let err = req.error_from(&Denied);
    assert_eq!(err.status, Status::Error);
    assert_eq!(err.str_field(FRAME_CODE), Some("E_FORBIDDEN"));
    assert_eq!(err.str_field(FRAME_MESSAGE), Some("edit denied"));
    assert_eq!(err.data.get(FRAME_RETRYABLE), Some(&Value::Bool(false)));
}

#[test]
fn prefix_splits_on_first_colon() {
    assert_eq!(Frame::request("cursor:move", Data::new()).prefix(), "cursor");
    assert_eq!(Frame::request("bare", Data::new()).prefix(), "bare");
}

#[test]
fn item_is_not_terminal() {
    let req = Frame::request(syscall::ROOM_JOIN, Data::new());
    assert!(!req.item(Data::new()).status.is_terminal());
}

// =============================================================================
// CODEC
// =============================================================================

#[test]
fn status_numeric_mapping_matches_wire_enum() {
    assert_eq!(Status::Request.as_i32(), 0);
    assert_eq!(Status::Done.as_i32(), 1);
    assert_eq!(Status::Error.as_i32(), 2);
    assert_eq!(Status::Item.as_i32(), 4);
}

#[test]
fn status_from_wire_rejects_out_of_range_value() {
    let err = Status::from_i32(99).expect_err("status should be invalid");
    assert!(matches!(err, CodecError::InvalidStatus(99)));
}

#[test]
fn encode_decode_preserves_frame() {
    let frame = sample_frame();
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode should succeed");
    assert_eq!(decoded, frame);
}

#[test]
fn decode_frame_rejects_malformed_bytes() {
    let err = decode_frame(&[0xff, 0x00, 0x01]).expect_err("bytes should fail");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_frame_rejects_non_uuid_id() {
    let mut wire = frame_to_wire(&sample_frame());
    wire.id = "not-a-uuid".to_owned();
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");

    let err = decode_frame(&bytes).expect_err("id should fail");
    assert!(matches!(err, CodecError::InvalidId(ref raw) if raw == "not-a-uuid"));
}

#[test]
fn decode_frame_rejects_invalid_wire_status() {
    let mut wire = frame_to_wire(&sample_frame());
    wire.status = 77;
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");

    let err = decode_frame(&bytes).expect_err("status should fail");
    assert!(matches!(err, CodecError::InvalidStatus(77)));
}

#[test]
fn decode_frame_defaults_missing_data_to_empty_map() {
    let mut wire = frame_to_wire(&sample_frame());
    wire.data = None;
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");

    let frame = decode_frame(&bytes).expect("decode");
    assert!(frame.data.is_empty());
}

#[test]
fn decode_frame_rejects_scalar_payload() {
    let mut wire = frame_to_wire(&sample_frame());
    wire.data = Some(json_to_proto_value(&serde_json::json!("scalar")));
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");

    let err = decode_frame(&bytes).expect_err("payload should fail");
    assert!(matches!(err, CodecError::InvalidData));
}

#[test]
fn nan_numbers_decode_as_null() {
    let value = prost_types::Value { kind: Some(prost_types::value::Kind::NumberValue(f64::NAN)) };
    assert_eq!(proto_to_json_value(&value), Value::Null);
}

#[test]
fn json_form_uses_lowercase_status() {
    let frame = Frame::request(syscall::ROOM_CLEAR, Data::new()).with_room_id("lobby");
    let json = serde_json::to_value(&frame).expect("serialize");
    assert_eq!(json["status"], "request");
    assert_eq!(json["room_id"], "lobby");
    let back: Frame = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, frame);
}
