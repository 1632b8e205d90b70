#![no_main]

use cvq_core::frame::decode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding must never panic, whatever the length fields claim.
    let Ok(frame) = decode(data) else {
        return;
    };

    // A decoded frame re-encodes to the bytes it came from.
    let encoded = frame.to_bytes().expect("decoded frame must re-encode");
    assert_eq!(encoded, data, "re-encoding changed the frame");
    assert_eq!(frame.content.len() as u64, frame.header.content_length);
});
