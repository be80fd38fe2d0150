// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::request::Request;

#[tokio::test]
async fn read_back_what_was_written() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    write_message(&mut client, &Request::Ping).await.unwrap();
    let got: Request = read_message(&mut server, MAX_FRAME_SIZE).await.unwrap();
    assert_eq!(got, Request::Ping);
}

#[tokio::test]
async fn sequential_messages_stay_framed() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    write_message(&mut client, &Request::Ping).await.unwrap();
    write_message(&mut client, &Request::PolicyList).await.unwrap();

    let first: Request = read_message(&mut server, MAX_FRAME_SIZE).await.unwrap();
    let second: Request = read_message(&mut server, MAX_FRAME_SIZE).await.unwrap();
    assert_eq!(first, Request::Ping);
    assert_eq!(second, Request::PolicyList);
}

#[tokio::test]
async fn oversized_frame_is_rejected_before_read() {
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);
    let big = Request::PolicyPut {
        profile: serde_json::json!({ "padding": "x".repeat(4096) }),
    };
    write_message(&mut client, &big).await.unwrap();

    let err = read_message::<Request, _>(&mut server, 128).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge { limit: 128, .. }));
    assert_eq!(err.kind(), atc_core::ErrorKind::Validation);
}

#[tokio::test]
async fn closed_stream_reports_closed() {
    let (client, mut server) = tokio::io::duplex(64);
    drop(client);
    let err = read_message::<Request, _>(&mut server, MAX_FRAME_SIZE).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Closed));
}

#[test]
fn encode_decode_roundtrip() {
    let frame = encode(&Request::Ping).unwrap();
    let got: Request = decode(&frame, MAX_FRAME_SIZE).unwrap();
    assert_eq!(got, Request::Ping);
}

#[test]
fn decode_truncated_frame_is_closed() {
    let frame = encode(&Request::Ping).unwrap();
    assert!(matches!(
        decode::<Request>(&frame[..frame.len() - 1], MAX_FRAME_SIZE),
        Err(ProtocolError::Closed)
    ));
    assert!(matches!(decode::<Request>(&frame[..2], MAX_FRAME_SIZE), Err(ProtocolError::Closed)));
}

#[test]
fn decode_garbage_payload_is_malformed() {
    let mut frame = Vec::new();
    frame.extend_from_slice(&5u32.to_be_bytes());
    frame.extend_from_slice(b"nope!");
    assert!(matches!(decode::<Request>(&frame, MAX_FRAME_SIZE), Err(ProtocolError::Malformed(_))));
}
