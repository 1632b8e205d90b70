#![no_main]

use cvq_core::content::decode_content;
use cvq_core::{Code, Role, SessionPhase, SessionStateMachine};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&code, content)) = data.split_first() else {
        return;
    };
    let Some(code) = Code::from_u8(code) else {
        return;
    };
    let Ok(content) = decode_content(content) else {
        return;
    };

    // Validation on arbitrary content must not panic, and a rejected
    // message must leave the state untouched.
    let mut server = SessionStateMachine::new(Role::Server);
    match server.check_incoming(code, content.as_ref()) {
        Ok(transition) => server.apply(transition),
        Err(_) => assert_eq!(server.phase(), SessionPhase::Identification),
    }
});
