//! Fuzz target for launch hint session values.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_launch_hint -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use ltix_core::LaunchHint;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(hint) = LaunchHint::from_session_value(s) {
            // A serialized hint always parses back to the same value
            let value = hint.to_session_value();
            let reparsed = LaunchHint::from_session_value(&value).unwrap();
            assert_eq!(reparsed.to_session_value(), value);
        }
    }
});
