//! Fuzz target for relay message decoding.
//!
//! Arbitrary bytes arriving from the host transport must never crash the decoder,
//! and whatever does decode must be safe to apply to a running round.
//!
//! # Safety Properties Tested
//! - No panics on arbitrary input
//! - Decoded messages re-encode to the bytes they came from
//! - Applying any decoded message leaves the fire engine consistent

#![no_main]

use libfuzzer_sys::fuzz_target;

use arson_mode::network::codec::{decode_message, encode_message};
use arson_mode::telemetry::InvariantChecker;
use arson_mode::{PlayerRole, RoundBuilder};

fuzz_target!(|data: &[u8]| {
    let Ok(message) = decode_message(data) else {
        return;
    };
    let encoded = encode_message(&message).expect("decoded message must re-encode");
    assert_eq!(encoded, data);

    let Ok(builder) = RoundBuilder::new()
        .with_room_edges([("Kitchen", "Lobby"), ("Lobby", "Server")])
        .add_player("p1", PlayerRole::Slacker)
    else {
        return;
    };
    let Ok(builder) = builder.add_extinguisher("hall") else {
        return;
    };
    let Ok(mut round) = builder.start_round() else {
        return;
    };
    round.apply_remote(message);
    assert!(round.engine().check_invariants().is_ok());
});
