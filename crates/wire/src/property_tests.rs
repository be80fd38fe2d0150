// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing properties over arbitrary payloads.

use crate::wire::{decode, encode, MAX_FRAME_SIZE};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    name: String,
    values: Vec<u64>,
    nested: Option<String>,
}

proptest! {
    /// encode → decode is the identity for any serializable payload.
    #[test]
    fn frame_roundtrip(
        name in ".{0,64}",
        values in prop::collection::vec(any::<u64>(), 0..32),
        nested in proptest::option::of(".{0,32}"),
    ) {
        let payload = Payload { name, values, nested };
        let frame = encode(&payload).unwrap();
        let got: Payload = decode(&frame, MAX_FRAME_SIZE).unwrap();
        prop_assert_eq!(got, payload);
    }

    /// The length prefix always matches the payload length.
    #[test]
    fn prefix_matches_payload(name in ".{0,64}") {
        let payload = Payload { name, values: vec![], nested: None };
        let frame = encode(&payload).unwrap();
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&frame[..4]);
        prop_assert_eq!(u32::from_be_bytes(len_bytes) as usize, frame.len() - 4);
    }

    /// Any frame larger than the limit is rejected, never read.
    #[test]
    fn limit_is_enforced(extra in 1usize..512) {
        let payload = Payload { name: "x".repeat(extra), values: vec![], nested: None };
        let frame = encode(&payload).unwrap();
        let limit = frame.len() - 5;
        prop_assert!(decode::<Payload>(&frame, limit).is_err());
    }
}
