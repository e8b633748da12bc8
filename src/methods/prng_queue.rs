//! PRNG IPID selection with a searchable queue
//!
//! FreeBSD/XNU keep the last Q emitted IPIDs in a ring buffer paired
//! with a presence array over the full 16-bit space, so a freshly
//! drawn value can be rejected in O(1) if it was emitted recently.
//! Zero is never emitted. The rejection loop terminates because at
//! most Q + 1 of the 2^16 values are disallowed and Q <= 2^15.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::methods::IpidMethod;
use crate::packet::Packet;

const IPID_SPACE: usize = 1 << 16;

#[derive(Debug)]
struct QueueState {
    /// Ring of the most recently emitted IPIDs; its length is Q.
    queue: Vec<u16>,
    /// `reserved[v]` iff `v` currently occurs in the ring.
    reserved: Vec<bool>,
    head: usize,
    len: usize,
    rng: StdRng,
}

/// Searchable queue of reserved IPIDs under one mutex.
#[derive(Debug)]
pub struct PrngQueueIpid {
    state: Mutex<QueueState>,
}

impl PrngQueueIpid {
    pub fn new(queue_size: u32) -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: vec![0; queue_size as usize],
                reserved: vec![false; IPID_SPACE],
                head: 0,
                len: 0,
                rng: StdRng::from_entropy(),
            }),
        }
    }
}

impl IpidMethod for PrngQueueIpid {
    fn assign(&self, _pkt: &Packet, _thread_id: usize) -> u16 {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Draw until the value is neither zero nor recently emitted.
        let mut ipid: u16 = state.rng.gen();
        while ipid == 0 || state.reserved[ipid as usize] {
            ipid = state.rng.gen();
        }

        if state.len < state.queue.len() {
            let at = state.len;
            state.queue[at] = ipid;
            state.reserved[ipid as usize] = true;
            state.len += 1;
        } else {
            let evicted = state.queue[state.head];
            state.queue[state.head] = ipid;
            state.head = (state.head + 1) % state.queue.len();
            state.reserved[ipid as usize] = true;
            state.reserved[evicted as usize] = false;
        }

        ipid
    }
}
