#![no_main]

use forkgate_consensus::sigops::count_sigops;
use libfuzzer_sys::fuzz_target;

// Arbitrary script bytes: never panics, accurate counting never charges more
// than legacy counting, and every counted opcode costs at most 20.
fuzz_target!(|data: &[u8]| {
    let legacy = count_sigops(data, false);
    let accurate = count_sigops(data, true);
    assert!(accurate <= legacy, "accurate {accurate} > legacy {legacy}");
    assert!(legacy <= 20 * data.len() as u64);

    // Deterministic.
    assert_eq!(legacy, count_sigops(data, false));
});
