//! Per-destination IPID selection
//!
//! Windows keeps a hash table ("PathSet") of (IPID counter, last
//! access time) pairs keyed by source/destination address pairs. Every
//! 0.5 s the table size is checked; if it exceeds its purge threshold
//! or at least 5000 entries were added since the last check, a purge
//! sequence deletes up to `max(1000, entries added since last check)`
//! stale entries. Between 1x and 2x the threshold only entries idle
//! for 60 s or more count as stale; beyond 2x the threshold every
//! entry does.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::methods::IpidMethod;
use crate::packet::Packet;

/// Interval between purge checks.
const PURGE_CHECK_INTERVAL: Duration = Duration::from_millis(500);
/// Entries last accessed at least this long ago count as stale.
const STALE_AGE: Duration = Duration::from_secs(60);
/// A purge also fires once this many entries were added between checks.
const ADDED_PURGE_TRIGGER: u32 = 5000;
/// Minimum number of deletions a purge sequence may perform.
const MIN_PURGE_BUDGET: u32 = 1000;

#[derive(Debug, Clone, Copy)]
struct DestEntry {
    counter: u16,
    last_access: Instant,
}

#[derive(Debug)]
struct PathSet {
    /// Destination counters keyed by `(src_addr << 32) | dst_addr`.
    table: HashMap<u64, DestEntry>,
    last_purge_check: Instant,
    num_added_since_check: u32,
    rng: StdRng,
}

/// Hash table of per-destination counters with periodic purging. One
/// mutex guards the whole table, purges included.
#[derive(Debug)]
pub struct PerDestIpid {
    purge_threshold: u32,
    state: Mutex<PathSet>,
}

impl PerDestIpid {
    pub fn new(purge_threshold: u32) -> Self {
        Self {
            purge_threshold,
            state: Mutex::new(PathSet {
                table: HashMap::new(),
                last_purge_check: Instant::now(),
                num_added_since_check: 0,
                rng: StdRng::from_entropy(),
            }),
        }
    }

    /// Run one purge check. Deletion visits the table in iteration
    /// order; which entries fall victim is deliberately unspecified.
    fn purge_check(&self, state: &mut PathSet, now: Instant) {
        let size = state.table.len() as u32;
        let needs_purge =
            size > self.purge_threshold || state.num_added_since_check > ADDED_PURGE_TRIGGER;

        if needs_purge {
            let mut budget = state.num_added_since_check.max(MIN_PURGE_BUDGET);
            if size > 2 * self.purge_threshold {
                // Far over threshold: every entry counts as stale.
                state.table.retain(|_, _| {
                    if budget == 0 {
                        return true;
                    }
                    budget -= 1;
                    false
                });
            } else if size > self.purge_threshold {
                state.table.retain(|_, entry| {
                    if budget == 0 || now.duration_since(entry.last_access) < STALE_AGE {
                        return true;
                    }
                    budget -= 1;
                    false
                });
            }
        }

        state.last_purge_check = now;
        state.num_added_since_check = 0;
    }
}

impl IpidMethod for PerDestIpid {
    fn assign(&self, pkt: &Packet, _thread_id: usize) -> u16 {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = Instant::now();

        if now.duration_since(state.last_purge_check) >= PURGE_CHECK_INTERVAL {
            self.purge_check(state, now);
        }

        let key = (pkt.src_addr as u64) << 32 | pkt.dst_addr as u64;
        match state.table.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.counter = entry.counter.wrapping_add(1);
                entry.last_access = now;
                entry.counter
            }
            Entry::Vacant(vacant) => {
                let counter = state.rng.gen::<u16>();
                vacant.insert(DestEntry {
                    counter,
                    last_access: now,
                });
                state.num_added_since_check += 1;
                counter
            }
        }
    }
}
