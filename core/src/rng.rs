//! Deterministic identity generation.
//!
//! RULE: Nothing in reconciliation may call any platform RNG.
//! Fresh item identities come from an IdRng seeded by the caller, so a
//! reconciliation is fully reproducible from (snapshots, policy, seed).
//! Two generators with different seeds draw from disjoint pools in
//! practice, and every issued id is additionally checked against the
//! graph it is written into.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::collections::HashSet;

/// Length of an item identity: 12 bytes rendered as lowercase hex.
pub const ID_LEN: usize = 24;

pub struct IdRng {
    inner: Pcg64Mcg,
    issued: HashSet<String>,
}

impl IdRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
            issued: HashSet::new(),
        }
    }

    /// Derive a generator for one session from a master seed, so sessions
    /// ending on the same process never share a stream.
    pub fn for_session(master_seed: u64, session_id: &str) -> Self {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for b in session_id.bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        Self::new(master_seed ^ h.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    /// Draw a fresh identity that is not in `taken` and was never issued
    /// or reserved by this generator.
    pub fn next_id(&mut self, taken: &HashSet<String>) -> String {
        loop {
            let hi = self.inner.next_u64();
            let lo = self.inner.next_u32();
            let id = format!("{hi:016x}{lo:08x}");
            if !taken.contains(&id) && self.issued.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Mark identities already in use elsewhere so they are never drawn.
    pub fn reserve(&mut self, ids: impl IntoIterator<Item = String>) {
        self.issued.extend(ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_deterministic_per_seed() {
        let taken = HashSet::new();
        let a: Vec<_> = {
            let mut rng = IdRng::new(7);
            (0..5).map(|_| rng.next_id(&taken)).collect()
        };
        let b: Vec<_> = {
            let mut rng = IdRng::new(7);
            (0..5).map(|_| rng.next_id(&taken)).collect()
        };
        assert_eq!(a, b, "Same seed should produce same ids");
        assert!(a.iter().all(|id| id.len() == ID_LEN));
    }

    #[test]
    fn never_returns_a_taken_id() {
        let mut scout = IdRng::new(99);
        let first = scout.next_id(&HashSet::new());

        let mut rng = IdRng::new(99);
        let taken: HashSet<String> = [first.clone()].into();
        let next = rng.next_id(&taken);
        assert_ne!(next, first);
    }

    #[test]
    fn never_returns_a_reserved_id() {
        let first = IdRng::new(5).next_id(&HashSet::new());

        let mut rng = IdRng::new(5);
        rng.reserve([first.clone()]);
        assert_ne!(rng.next_id(&HashSet::new()), first);
    }

    #[test]
    fn session_streams_differ() {
        let taken = HashSet::new();
        let a = IdRng::for_session(1, "session-a").next_id(&taken);
        let b = IdRng::for_session(1, "session-b").next_id(&taken);
        assert_ne!(a, b);
    }
}
