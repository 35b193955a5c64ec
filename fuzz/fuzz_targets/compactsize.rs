#![no_main]

use forkgate_consensus::{compact_size_len, encode_compact_size};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut buf = [0u8; 8];
    let n = data.len().min(8);
    buf[..n].copy_from_slice(&data[..n]);
    let v = u64::from_le_bytes(buf);

    let mut out = Vec::new();
    encode_compact_size(v, &mut out);
    assert_eq!(out.len() as u64, compact_size_len(v));
});
