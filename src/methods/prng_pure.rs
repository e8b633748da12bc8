//! Pure PRNG IPID selection
//!
//! macOS/XNU draws the IPID uniformly at random and XORs in a salt.
//! XNU derives the salt per packet; a benchmark only needs a fixed
//! one. Each worker thread owns its own generator, so there is no
//! shared mutable state and throughput scales linearly by
//! construction.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::methods::IpidMethod;
use crate::packet::Packet;

/// Fixed 64-bit salt folded to 16 bits at construction.
const SALT: u64 = 0x73616C7470657061;

pub struct PrngPureIpid {
    salt16: u16,
    /// One generator per thread, indexed by `thread_id`. Each lock is
    /// only ever taken by its owning thread.
    rngs: Vec<Mutex<StdRng>>,
}

impl PrngPureIpid {
    pub fn new(num_threads: usize) -> Self {
        Self {
            salt16: fold_salt(SALT),
            rngs: (0..num_threads)
                .map(|_| Mutex::new(StdRng::from_entropy()))
                .collect(),
        }
    }
}

/// Collapse the 64-bit salt into a 16-bit one, following XNU.
fn fold_salt(salt: u64) -> u16 {
    (((salt >> 48) ^ (salt >> 32) ^ (salt >> 16) ^ salt) & 0xFF) as u16
}

impl IpidMethod for PrngPureIpid {
    fn assign(&self, _pkt: &Packet, thread_id: usize) -> u16 {
        let mut rng = self.rngs[thread_id].lock();

        // Rejecting the salt itself guarantees the XOR below is
        // non-zero.
        let mut ipid: u16 = rng.gen();
        while ipid == self.salt16 {
            ipid = rng.gen();
        }
        ipid ^ self.salt16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::test_util::test_packet;

    #[test]
    fn test_fold_salt() {
        // ((S>>48) ^ (S>>32) ^ (S>>16) ^ S) & 0xFF for the fixed salt.
        let expected = (((SALT >> 48) ^ (SALT >> 32) ^ (SALT >> 16) ^ SALT) & 0xFF) as u16;
        assert_eq!(fold_salt(SALT), expected);
        assert!(fold_salt(SALT) <= 0xFF);
    }

    #[test]
    fn test_never_returns_zero() {
        let method = PrngPureIpid::new(2);
        let pkt = test_packet(10);

        for _ in 0..10_000 {
            assert_ne!(method.assign(&pkt, 0), 0);
            assert_ne!(method.assign(&pkt, 1), 0);
        }
    }

    #[test]
    fn test_output_distribution_is_uniform() {
        let method = PrngPureIpid::new(1);
        let pkt = test_packet(11);
        const SAMPLES: usize = 1 << 20;
        const BINS: usize = 256;

        let mut counts = [0u64; BINS];
        for _ in 0..SAMPLES {
            counts[(method.assign(&pkt, 0) >> 8) as usize] += 1;
        }

        // Chi-square against a uniform spread over 256 bins. 340 is
        // comfortably past the 255-degree critical value at the 0.1%
        // level, so a healthy generator essentially never trips this.
        let expected = (SAMPLES / BINS) as f64;
        let chi_square: f64 = counts
            .iter()
            .map(|&c| {
                let d = c as f64 - expected;
                d * d / expected
            })
            .sum();
        assert!(chi_square < 340.0, "chi_square = {chi_square}");
    }

    #[test]
    fn test_threads_have_independent_generators() {
        let method = PrngPureIpid::new(2);
        assert_eq!(method.rngs.len(), 2);

        let pkt = test_packet(12);
        // Two streams from independent generators; over this many
        // draws they cannot be identical.
        let a: Vec<u16> = (0..64).map(|_| method.assign(&pkt, 0)).collect();
        let b: Vec<u16> = (0..64).map(|_| method.assign(&pkt, 1)).collect();
        assert_ne!(a, b);
    }
}
