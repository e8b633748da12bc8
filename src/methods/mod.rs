//! IPID selection methods
//!
//! One module per strategy, each reproducing a real operating system's
//! IPID assignment design together with its concurrency discipline:
//!
//! - [`GlobalIpid`]: one global atomic counter
//! - [`PerConnIpid`]: per-connection counters (contention-free bound)
//! - [`PerDestIpid`]: Windows-style per-destination table with purging
//! - [`PerBucketLockfreeIpid`]: Linux-style hashed buckets, raw atomics
//! - [`PerBucketMutexIpid`]: hashed buckets, one mutex per bucket
//! - [`PrngQueueIpid`]: FreeBSD/XNU-style PRNG with searchable queue
//! - [`PrngShuffleIpid`]: OpenBSD-style PRNG with iterated Knuth shuffle
//! - [`PrngPureIpid`]: pure PRNG, one generator per thread
//! - [`PerBucketShuffleIpid`]: per-bucket iterated Knuth shuffle

pub mod global;
pub mod perbucket_lockfree;
pub mod perbucket_mutex;
pub mod perbucket_shuffle;
pub mod perconn;
pub mod perdest;
pub mod prng_pure;
pub mod prng_queue;
pub mod prng_shuffle;

pub use global::GlobalIpid;
pub use perbucket_lockfree::PerBucketLockfreeIpid;
pub use perbucket_mutex::PerBucketMutexIpid;
pub use perbucket_shuffle::PerBucketShuffleIpid;
pub use perconn::PerConnIpid;
pub use perdest::PerDestIpid;
pub use prng_pure::PrngPureIpid;
pub use prng_queue::PrngQueueIpid;
pub use prng_shuffle::PrngShuffleIpid;

use std::time::Instant;

use crate::packet::Packet;

/// Uniform interface over the IPID selection methods.
///
/// `assign` must be safe to call concurrently from distinct threads
/// with distinct `thread_id`s and arbitrary interleaving; the only
/// blocking allowed inside is acquisition of the method's own
/// mutex(es). It always returns a value; there is no failure mode.
/// `thread_id` is stable per worker within a trial and ranges over
/// `0..n`; methods that don't need it ignore it.
pub trait IpidMethod: Send + Sync {
    fn assign(&self, pkt: &Packet, thread_id: usize) -> u16;
}

/// A fully resolved method selection, including its numeric argument
/// where the method takes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodSpec {
    Global,
    PerConn,
    PerDest { purge_threshold: u32 },
    PerBucketLockfree { num_buckets: u32 },
    PerBucketMutex { num_buckets: u32 },
    PrngQueue { queue_size: u32 },
    PrngShuffle { num_reserved: u32 },
    PrngPure,
    PerBucketShuffle { num_buckets: u32 },
}

impl MethodSpec {
    /// The method's CLI name.
    pub fn name(&self) -> &'static str {
        match self {
            MethodSpec::Global => "global",
            MethodSpec::PerConn => "perconn",
            MethodSpec::PerDest { .. } => "perdest",
            MethodSpec::PerBucketLockfree { .. } => "perbucketl",
            MethodSpec::PerBucketMutex { .. } => "perbucketm",
            MethodSpec::PrngQueue { .. } => "prngqueue",
            MethodSpec::PrngShuffle { .. } => "prngshuffle",
            MethodSpec::PrngPure => "prngpure",
            MethodSpec::PerBucketShuffle { .. } => "perbucketshuffle",
        }
    }

    /// File stem `<method><arg?>` used to name result CSVs. Methods
    /// that take a numeric argument embed it so runs with different
    /// arguments don't clobber each other.
    pub fn file_stem(&self) -> String {
        match *self {
            MethodSpec::Global | MethodSpec::PerConn | MethodSpec::PrngPure => {
                self.name().to_string()
            }
            MethodSpec::PerDest { purge_threshold: arg }
            | MethodSpec::PerBucketLockfree { num_buckets: arg }
            | MethodSpec::PerBucketMutex { num_buckets: arg }
            | MethodSpec::PrngQueue { queue_size: arg }
            | MethodSpec::PrngShuffle { num_reserved: arg }
            | MethodSpec::PerBucketShuffle { num_buckets: arg } => {
                format!("{}{arg}", self.name())
            }
        }
    }
}

/// Milliseconds of a steady, monotonic clock since `origin`. Stands in
/// for the kernel's jiffies counter.
#[inline]
pub(crate) fn millis_since(origin: Instant) -> u64 {
    origin.elapsed().as_millis() as u64
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_without_arg() {
        assert_eq!(MethodSpec::Global.file_stem(), "global");
        assert_eq!(MethodSpec::PerConn.file_stem(), "perconn");
        assert_eq!(MethodSpec::PrngPure.file_stem(), "prngpure");
    }

    #[test]
    fn test_file_stem_with_arg() {
        assert_eq!(
            MethodSpec::PerDest { purge_threshold: 32768 }.file_stem(),
            "perdest32768"
        );
        assert_eq!(
            MethodSpec::PerBucketLockfree { num_buckets: 4096 }.file_stem(),
            "perbucketl4096"
        );
        assert_eq!(
            MethodSpec::PerBucketShuffle { num_buckets: 4 }.file_stem(),
            "perbucketshuffle4"
        );
    }
}
