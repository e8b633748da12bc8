//! SipHash-2-4 over three 32-bit words
//!
//! Mirrors the Linux kernel's `siphash_3u32`: the first and second
//! words form the first 8-byte block, the third rides in the final
//! block next to the message length. Used only to shard packets into
//! buckets, never for cryptographic output.

use rand::Rng;

use crate::packet::Packet;

/// Compute SipHash-2-4 of three 32-bit words under the 128-bit key
/// `(k1, k2)`.
pub fn siphash_3u32(v1: u32, v2: u32, v3: u32, k1: u64, k2: u64) -> u64 {
    let combined = (v2 as u64) << 32 | v1 as u64;

    let mut v = [
        0x736f_6d65_7073_6575 ^ k1,
        0x646f_7261_6e64_6f6d ^ k2,
        0x6c79_6765_6e65_7261 ^ k1,
        0x7465_6462_7974_6573 ^ k2,
    ];
    // Final block carries the message length (12 = 3 words * 4 bytes)
    // in its top byte.
    let b = (12u64 << 56) | v3 as u64;

    v[3] ^= combined;
    sipround(&mut v);
    sipround(&mut v);
    v[0] ^= combined;

    v[3] ^= b;
    sipround(&mut v);
    sipround(&mut v);
    v[0] ^= b;

    v[2] ^= 0xff;
    for _ in 0..4 {
        sipround(&mut v);
    }

    (v[0] ^ v[1]) ^ (v[2] ^ v[3])
}

#[inline(always)]
fn sipround(v: &mut [u64; 4]) {
    v[0] = v[0].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(13);
    v[1] ^= v[0];
    v[0] = v[0].rotate_left(32);
    v[2] = v[2].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(16);
    v[3] ^= v[2];
    v[0] = v[0].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(21);
    v[3] ^= v[0];
    v[2] = v[2].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(17);
    v[1] ^= v[2];
    v[2] = v[2].rotate_left(32);
}

/// Pair of SipHash keys, sampled once per method instance.
#[derive(Debug, Clone, Copy)]
pub struct SipKeys {
    k1: u64,
    k2: u64,
}

impl SipKeys {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            k1: rng.gen(),
            k2: rng.gen(),
        }
    }

    /// Bucket index for a packet:
    /// `siphash(dst, src, proto) mod num_buckets`.
    #[inline]
    pub fn bucket(&self, pkt: &Packet, num_buckets: u32) -> usize {
        let hash = siphash_3u32(pkt.dst_addr, pkt.src_addr, pkt.protocol, self.k1, self.k2);
        (hash % num_buckets as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use siphasher::sip::SipHasher24;
    use std::hash::Hasher;

    /// Reference SipHash-2-4 of the three words laid out as a 12-byte
    /// little-endian message, which is exactly the block layout
    /// `siphash_3u32` uses.
    fn reference(v1: u32, v2: u32, v3: u32, k1: u64, k2: u64) -> u64 {
        let mut msg = [0u8; 12];
        msg[0..4].copy_from_slice(&v1.to_le_bytes());
        msg[4..8].copy_from_slice(&v2.to_le_bytes());
        msg[8..12].copy_from_slice(&v3.to_le_bytes());

        let mut hasher = SipHasher24::new_with_keys(k1, k2);
        hasher.write(&msg);
        hasher.finish()
    }

    #[test]
    fn test_matches_reference_on_fixed_inputs() {
        let k1 = 0x0706_0504_0302_0100;
        let k2 = 0x0f0e_0d0c_0b0a_0908;

        assert_eq!(siphash_3u32(0, 0, 0, k1, k2), reference(0, 0, 0, k1, k2));
        assert_eq!(
            siphash_3u32(0x0302_0100, 0x0706_0504, 0x0b0a_0908, k1, k2),
            reference(0x0302_0100, 0x0706_0504, 0x0b0a_0908, k1, k2)
        );
        assert_eq!(
            siphash_3u32(u32::MAX, u32::MAX, u32::MAX, k1, k2),
            reference(u32::MAX, u32::MAX, u32::MAX, k1, k2)
        );
    }

    #[test]
    fn test_matches_reference_on_fuzzed_inputs() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..1000 {
            let (v1, v2, v3) = (rng.gen(), rng.gen(), rng.gen());
            let (k1, k2) = (rng.gen(), rng.gen());
            assert_eq!(siphash_3u32(v1, v2, v3, k1, k2), reference(v1, v2, v3, k1, k2));
        }
    }

    #[test]
    fn test_deterministic() {
        let a = siphash_3u32(1, 2, 3, 0xdead_beef, 0xcafe_f00d);
        let b = siphash_3u32(1, 2, 3, 0xdead_beef, 0xcafe_f00d);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_changes_output() {
        let a = siphash_3u32(1, 2, 3, 0, 0);
        let b = siphash_3u32(1, 2, 3, 0, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_bucket_index_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let keys = SipKeys::random(&mut rng);
        for i in 0..10_000u32 {
            let pkt = Packet {
                src_addr: i.wrapping_mul(2654435761),
                dst_addr: i,
                src_port: 443,
                dst_port: i % 65536,
                protocol: 6,
            };
            assert!(keys.bucket(&pkt, 4096) < 4096);
        }
    }
}
