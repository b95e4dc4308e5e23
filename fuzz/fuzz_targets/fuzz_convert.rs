#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::Path;

// Arbitrary bytes through the whole per-file pipeline, under both dialects.
// Goal: no panics; malformed input must come back as a Failure, and
// converted output must convert again.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let options = Default::default();
        for path in [Path::new("fuzz.cy.js"), Path::new("fuzz.cy.tsx")] {
            let result = cy2pw_core::convert_source(path, text, &options);
            if let Some(out) = result.text() {
                assert!(cy2pw_core::convert_source(path, out, &options).is_success());
            }
        }
    }
});
