//! Per-bucket IPID selection, lock-free variant
//!
//! Linux's design: buckets are located by SipHashing the packet's
//! addresses and protocol under two secret keys, and each bucket's
//! counter advances by a value drawn uniformly from 1 to the number of
//! ticks (jiffies in the kernel, milliseconds here) since the bucket
//! was last touched. The counter and the last-access time are each
//! their own atomic and are never updated as one critical section, so
//! two threads hitting the same bucket may read the same last-access
//! time. That race is part of the design being measured.

use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::time::Instant;

use rand::{thread_rng, Rng};

use crate::methods::{millis_since, IpidMethod};
use crate::packet::Packet;
use crate::siphash::SipKeys;

pub struct PerBucketLockfreeIpid {
    keys: SipKeys,
    origin: Instant,
    counters: Vec<AtomicU16>,
    times: Vec<AtomicU64>,
}

impl PerBucketLockfreeIpid {
    pub fn new(num_buckets: u32) -> Self {
        // Bucket times start at the construction instant, which is
        // zero on the instance's own millisecond clock.
        Self {
            keys: SipKeys::random(&mut thread_rng()),
            origin: Instant::now(),
            counters: (0..num_buckets).map(|_| AtomicU16::new(0)).collect(),
            times: (0..num_buckets).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

impl IpidMethod for PerBucketLockfreeIpid {
    fn assign(&self, pkt: &Packet, _thread_id: usize) -> u16 {
        let idx = self.keys.bucket(pkt, self.counters.len() as u32);

        let now = millis_since(self.origin);
        let last = self.times[idx].swap(now, Ordering::Relaxed);

        let elapsed = now.saturating_sub(last).max(1).min(u16::MAX as u64) as u16;
        let inc = thread_rng().gen_range(1..=elapsed);
        self.counters[idx].fetch_add(inc, Ordering::Relaxed).wrapping_add(inc)
    }
}
