use crate::constants::{
    MAX_PUBKEYS_PER_MULTISIG, OP_1, OP_16, OP_CHECKMULTISIG, OP_CHECKMULTISIGVERIFY, OP_CHECKSIG,
    OP_CHECKSIGVERIFY, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4,
};

/// Counts signature-check opcodes in a raw script.
///
/// In `accurate` mode a CHECKMULTISIG preceded by OP_1..OP_16 counts as that
/// many keys; otherwise it is charged the maximum. Scanning stops at a push
/// that runs past the end of the script, counting only what came before.
pub fn count_sigops(script: &[u8], accurate: bool) -> u64 {
    let mut n: u64 = 0;
    let mut last_op: Option<u8> = None;
    let mut pc = 0usize;
    while pc < script.len() {
        let op = script[pc];
        pc += 1;

        let push_len = match op {
            0x01..=0x4b => Some(op as usize),
            OP_PUSHDATA1 => read_len(script, &mut pc, 1),
            OP_PUSHDATA2 => read_len(script, &mut pc, 2),
            OP_PUSHDATA4 => read_len(script, &mut pc, 4),
            _ => None,
        };
        if matches!(op, 0x01..=OP_PUSHDATA4) {
            let Some(len) = push_len else { break };
            match pc.checked_add(len) {
                Some(end) if end <= script.len() => pc = end,
                _ => break,
            }
            last_op = Some(op);
            continue;
        }

        match op {
            OP_CHECKSIG | OP_CHECKSIGVERIFY => n += 1,
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => match last_op {
                Some(k @ OP_1..=OP_16) if accurate => n += u64::from(k - OP_1 + 1),
                _ => n += MAX_PUBKEYS_PER_MULTISIG,
            },
            _ => {}
        }
        last_op = Some(op);
    }
    n
}

pub fn count_legacy_sigops(script: &[u8]) -> u64 {
    count_sigops(script, false)
}

fn read_len(script: &[u8], pc: &mut usize, width: usize) -> Option<usize> {
    let end = pc.checked_add(width)?;
    let bytes = script.get(*pc..end)?;
    *pc = end;
    let mut buf = [0u8; 4];
    buf[..width].copy_from_slice(bytes);
    usize::try_from(u32::from_le_bytes(buf)).ok()
}
