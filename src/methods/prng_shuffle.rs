//! PRNG IPID selection with an iterated Knuth shuffle
//!
//! OpenBSD walks a shuffled permutation of the full 16-bit space:
//! each assignment emits the value at the head, swaps it back into
//! one of the K most recently visited positions, and advances the
//! head. A just-emitted IPID therefore stays out of the candidate
//! pool for up to K assignments. Zero is skipped, never emitted.

use parking_lot::Mutex;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::methods::IpidMethod;
use crate::packet::Packet;

/// One shuffled permutation of `[0, 2^16)` plus the PRNG that drives
/// it. Also used per-bucket by the per-bucket shuffle method.
pub(crate) struct ShuffleState {
    perm: Vec<u16>,
    /// Head index. Kept as a `u16` so the swap-offset subtraction
    /// wraps within the permutation for free.
    head: u16,
    swap_dist: Uniform<u16>,
    rng: StdRng,
}

impl ShuffleState {
    /// Build a freshly shuffled permutation reserving `num_reserved`
    /// recently emitted IPIDs.
    pub(crate) fn new(num_reserved: u16) -> Self {
        let mut rng = StdRng::from_entropy();
        let mut perm: Vec<u16> = (0..=u16::MAX).collect();
        perm.shuffle(&mut rng);

        Self {
            perm,
            head: 0,
            swap_dist: Uniform::new(0, num_reserved),
            rng,
        }
    }

    /// Emit the value at the head, swap it back into the reserved
    /// window, and advance.
    pub(crate) fn next_ipid(&mut self) -> u16 {
        loop {
            let offset = self.swap_dist.sample(&mut self.rng);
            let swap_at = self.head.wrapping_sub(offset);

            let ipid = self.perm[self.head as usize];
            self.perm.swap(self.head as usize, swap_at as usize);
            self.head = self.head.wrapping_add(1);

            if ipid != 0 {
                return ipid;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn permutation(&self) -> &[u16] {
        &self.perm
    }
}

/// Single shared permutation under one mutex.
pub struct PrngShuffleIpid {
    state: Mutex<ShuffleState>,
}

impl PrngShuffleIpid {
    pub fn new(num_reserved: u32) -> Self {
        Self {
            state: Mutex::new(ShuffleState::new(num_reserved as u16)),
        }
    }
}

impl IpidMethod for PrngShuffleIpid {
    fn assign(&self, _pkt: &Packet, _thread_id: usize) -> u16 {
        self.state.lock().next_ipid()
    }
}
