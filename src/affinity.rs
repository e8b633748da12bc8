//! CPU enumeration and thread pinning
//!
//! Thin wrapper over `core_affinity`. Both operations are fatal on
//! failure: an unpinned worker thread would be scheduled anywhere and
//! the per-CPU counts would no longer mean anything.

use core_affinity::CoreId;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AffinityError {
    #[error("couldn't query the CPUs available to this process")]
    QueryFailed,

    #[error("couldn't pin thread to CPU {0}")]
    PinFailed(usize),
}

/// Enumerate the CPUs this process may schedule threads onto.
pub fn available_cpus() -> Result<Vec<CoreId>, AffinityError> {
    let cpus = core_affinity::get_core_ids().ok_or(AffinityError::QueryFailed)?;
    if cpus.is_empty() {
        return Err(AffinityError::QueryFailed);
    }

    debug!(
        cpus = ?cpus.iter().map(|c| c.id).collect::<Vec<_>>(),
        "enumerated schedulable CPUs"
    );
    Ok(cpus)
}

/// Pin the calling thread to `cpu`.
pub fn pin_current_thread(cpu: CoreId) -> Result<(), AffinityError> {
    if core_affinity::set_for_current(cpu) {
        Ok(())
    } else {
        Err(AffinityError::PinFailed(cpu.id))
    }
}
