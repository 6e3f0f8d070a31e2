//! Fuzz target for tool URL thumbprints.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_url_thumbprint -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use ltix_api::url_thumbprint;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Deterministic for the same input
        assert_eq!(url_thumbprint(s), url_thumbprint(s));
    }
});
