//! Globally incrementing IPID selection
//!
//! All CPUs share one atomic 16-bit counter.

use std::sync::atomic::{AtomicU16, Ordering};

use crate::methods::IpidMethod;
use crate::packet::Packet;

/// Single shared counter, incremented on every assignment and wrapping
/// naturally at 2^16.
#[derive(Debug, Default)]
pub struct GlobalIpid {
    counter: AtomicU16,
}

impl GlobalIpid {
    pub fn new() -> Self {
        Self {
            counter: AtomicU16::new(0),
        }
    }
}

impl IpidMethod for GlobalIpid {
    fn assign(&self, _pkt: &Packet, _thread_id: usize) -> u16 {
        // Relaxed suffices: no other memory is ordered against the
        // counter, only its own modification order matters.
        self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}
