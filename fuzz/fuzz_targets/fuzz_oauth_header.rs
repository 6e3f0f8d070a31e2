//! Fuzz target for OAuth `Authorization` header parsing.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_oauth_header -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use ltix_auth::parse_authorization_header;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_authorization_header(s);
    }
});
