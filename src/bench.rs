//! Trial driver and harness
//!
//! A trial spawns one worker thread per CPU, each pinned to its own
//! core before any measurement work. Workers loop over the shared
//! packet vector calling `assign`: first a warmup phase whose counts
//! are discarded, then a timed measurement phase counting assignments.
//! Workers terminate only by their own monotonic clock check; there is
//! no external cancellation. The harness runs `T` such trials for
//! every CPU count in `[1, C]`, constructing a fresh method instance
//! per trial so tables, permutations, and generators start pristine.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use core_affinity::CoreId;
use rand::{thread_rng, Rng};
use thiserror::Error;
use tracing::info;

use crate::affinity::{self, AffinityError};
use crate::methods::{
    GlobalIpid, IpidMethod, MethodSpec, PerBucketLockfreeIpid, PerBucketMutexIpid,
    PerBucketShuffleIpid, PerConnIpid, PerDestIpid, PrngPureIpid, PrngQueueIpid, PrngShuffleIpid,
};
use crate::packet::Packet;
use crate::results;

/// Warmup and measurement durations of a single trial.
#[derive(Debug, Clone, Copy)]
pub struct TrialTiming {
    pub warmup: Duration,
    pub duration: Duration,
}

#[derive(Error, Debug)]
pub enum TrialError {
    #[error(transparent)]
    Affinity(#[from] AffinityError),

    #[error("worker thread {0} panicked")]
    WorkerPanicked(usize),
}

/// Everything the harness needs for one benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct BenchConfig {
    pub method: MethodSpec,
    pub num_trials: u32,
    pub timing: TrialTiming,
    pub max_cpus: usize,
}

fn worker<M: IpidMethod>(
    method: &M,
    packets: &[Packet],
    thread_id: usize,
    cpu: CoreId,
    timing: TrialTiming,
) -> Result<u64, TrialError> {
    affinity::pin_current_thread(cpu)?;

    // Start at a random packet so workers don't stride in lockstep.
    let mut idx = thread_rng().gen_range(0..packets.len());

    let warmup_start = Instant::now();
    while warmup_start.elapsed() < timing.warmup {
        method.assign(&packets[idx], thread_id);
        idx = (idx + 1) % packets.len();
    }

    let start = Instant::now();
    let mut assigned = 0u64;
    while start.elapsed() < timing.duration {
        method.assign(&packets[idx], thread_id);
        idx = (idx + 1) % packets.len();
        assigned += 1;
    }

    Ok(assigned)
}

/// Run one trial of `method` with one pinned worker per entry of
/// `cpus`. Returned counts are in thread-id order.
pub fn run_trial<M: IpidMethod>(
    method: &M,
    packets: &[Packet],
    cpus: &[CoreId],
    timing: TrialTiming,
) -> Result<Vec<u64>, TrialError> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = cpus
            .iter()
            .enumerate()
            .map(|(t, &cpu)| scope.spawn(move || worker(method, packets, t, cpu, timing)))
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(t, handle)| handle.join().map_err(|_| TrialError::WorkerPanicked(t))?)
            .collect()
    })
}

/// Construct a fresh instance of the selected method and run a single
/// trial against it. Dispatch happens once here; the worker loop then
/// calls a monomorphized `assign`.
fn dispatch_trial(
    spec: MethodSpec,
    packets: &[Packet],
    cpus: &[CoreId],
    timing: TrialTiming,
) -> Result<Vec<u64>, TrialError> {
    match spec {
        MethodSpec::Global => run_trial(&GlobalIpid::new(), packets, cpus, timing),
        MethodSpec::PerConn => run_trial(&PerConnIpid::new(), packets, cpus, timing),
        MethodSpec::PerDest { purge_threshold } => {
            run_trial(&PerDestIpid::new(purge_threshold), packets, cpus, timing)
        }
        MethodSpec::PerBucketLockfree { num_buckets } => {
            run_trial(&PerBucketLockfreeIpid::new(num_buckets), packets, cpus, timing)
        }
        MethodSpec::PerBucketMutex { num_buckets } => {
            run_trial(&PerBucketMutexIpid::new(num_buckets), packets, cpus, timing)
        }
        MethodSpec::PrngQueue { queue_size } => {
            run_trial(&PrngQueueIpid::new(queue_size), packets, cpus, timing)
        }
        MethodSpec::PrngShuffle { num_reserved } => {
            run_trial(&PrngShuffleIpid::new(num_reserved), packets, cpus, timing)
        }
        MethodSpec::PrngPure => run_trial(&PrngPureIpid::new(cpus.len()), packets, cpus, timing),
        MethodSpec::PerBucketShuffle { num_buckets } => {
            run_trial(&PerBucketShuffleIpid::new(num_buckets), packets, cpus, timing)
        }
    }
}

/// Benchmark the configured method for every CPU count in
/// `[1, max_cpus]`, writing one result CSV per CPU count into
/// `results_dir`.
pub fn run(
    config: &BenchConfig,
    packets: &[Packet],
    cpus: &[CoreId],
    results_dir: &Path,
) -> Result<()> {
    let stem = config.method.file_stem();

    for n in 1..=config.max_cpus {
        info!(method = config.method.name(), cpus = n, "running trials");

        let mut rows = Vec::with_capacity(config.num_trials as usize);
        for trial in 1..=config.num_trials {
            let counts = dispatch_trial(config.method, packets, &cpus[..n], config.timing)?;
            info!(trial, ?counts, "IPIDs assigned");
            rows.push(counts);
        }

        results::write_results(results_dir, &stem, n, &rows)?;
    }

    Ok(())
}
