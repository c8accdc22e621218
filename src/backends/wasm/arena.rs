// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Scratch arena layout inside the sandbox's linear memory.
//!
//! One block is allocated per engine instance and carved into named,
//! fixed, non-overlapping slots; every fixed-arity operation reuses the
//! same offsets, which avoids per-call allocator churn in the sandbox.
//! Variable-arity operations (key combination, DER import) allocate
//! temporaries separately and free them on every exit path.
//!
//! The arena outlives every call, so slots that held a private key, a
//! tweak, a seed, or a derived shared secret are zero-filled before the
//! operation returns, on the error path too.

/// Slot sizes, per the engine ABI.
const SECKEY_SIZE: usize = 32;
const TWEAK_SIZE: usize = 32;
const SEED_SIZE: usize = 32;
const MSG_SIZE: usize = 32;
const SECRET_SIZE: usize = 32;
const PUBKEY_SIZE: usize = 65;
const SIG_SIZE: usize = 64;
const DER_SIZE: usize = 72;
const WORD_SIZE: usize = 4;

// Fixed offsets relative to the arena base. The two i32 out-parameter
// slots sit last and are 4-byte aligned.
const SECKEY_OFFSET: usize = 0;
const TWEAK_OFFSET: usize = SECKEY_OFFSET + SECKEY_SIZE;
const SEED_OFFSET: usize = TWEAK_OFFSET + TWEAK_SIZE;
const MSG_OFFSET: usize = SEED_OFFSET + SEED_SIZE;
const SECRET_OFFSET: usize = MSG_OFFSET + MSG_SIZE;
const PUBKEY_IN_OFFSET: usize = SECRET_OFFSET + SECRET_SIZE;
const PUBKEY_OUT_OFFSET: usize = PUBKEY_IN_OFFSET + PUBKEY_SIZE;
const SIG_OFFSET: usize = PUBKEY_OUT_OFFSET + PUBKEY_SIZE;
const DER_OFFSET: usize = SIG_OFFSET + SIG_SIZE;
const LEN_OFFSET: usize = (DER_OFFSET + DER_SIZE).next_multiple_of(WORD_SIZE);
const RECID_OFFSET: usize = LEN_OFFSET + WORD_SIZE;

/// Named slot pointers into the sandbox's linear memory.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScratchArena {
    pub seckey: i32,
    pub tweak: i32,
    pub seed: i32,
    pub msg32: i32,
    pub secret: i32,
    pub pubkey_in: i32,
    pub pubkey_out: i32,
    pub sig: i32,
    pub der: i32,
    pub len: i32,
    pub recid: i32,
}

impl ScratchArena {
    /// Total arena size in bytes.
    pub const SIZE: usize = RECID_OFFSET + WORD_SIZE;

    /// Carve the arena at a base pointer returned by the sandbox
    /// allocator. The base must be 4-byte aligned (sandbox allocators
    /// guarantee at least word alignment).
    pub fn at(base: i32) -> Self {
        Self {
            seckey: base + SECKEY_OFFSET as i32,
            tweak: base + TWEAK_OFFSET as i32,
            seed: base + SEED_OFFSET as i32,
            msg32: base + MSG_OFFSET as i32,
            secret: base + SECRET_OFFSET as i32,
            pubkey_in: base + PUBKEY_IN_OFFSET as i32,
            pubkey_out: base + PUBKEY_OUT_OFFSET as i32,
            sig: base + SIG_OFFSET as i32,
            der: base + DER_OFFSET as i32,
            len: base + LEN_OFFSET as i32,
            recid: base + RECID_OFFSET as i32,
        }
    }

    /// Slots that may hold secret material and must be scrubbed after
    /// every call that staged them.
    pub fn sensitive_slots(&self) -> [(i32, usize); 4] {
        [
            (self.seckey, SECKEY_SIZE),
            (self.tweak, TWEAK_SIZE),
            (self.seed, SEED_SIZE),
            (self.secret, SECRET_SIZE),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_do_not_overlap() {
        let arena = ScratchArena::at(0);
        let mut spans = vec![
            (arena.seckey, SECKEY_SIZE),
            (arena.tweak, TWEAK_SIZE),
            (arena.seed, SEED_SIZE),
            (arena.msg32, MSG_SIZE),
            (arena.secret, SECRET_SIZE),
            (arena.pubkey_in, PUBKEY_SIZE),
            (arena.pubkey_out, PUBKEY_SIZE),
            (arena.sig, SIG_SIZE),
            (arena.der, DER_SIZE),
            (arena.len, WORD_SIZE),
            (arena.recid, WORD_SIZE),
        ];
        spans.sort_by_key(|(start, _)| *start);

        for window in spans.windows(2) {
            let (start, size) = window[0];
            let (next, _) = window[1];
            assert!(start + size as i32 <= next, "overlap at offset {start}");
        }

        let (last, size) = *spans.last().unwrap();
        assert!(last as usize + size <= ScratchArena::SIZE);
    }

    #[test]
    fn test_word_slots_are_aligned() {
        let arena = ScratchArena::at(0);
        assert_eq!(arena.len % 4, 0);
        assert_eq!(arena.recid % 4, 0);
    }

    #[test]
    fn test_offsets_follow_base() {
        let arena = ScratchArena::at(1024);
        assert_eq!(arena.seckey, 1024);
        assert_eq!(arena.recid, 1024 + RECID_OFFSET as i32);
    }
}
