//! Command-line argument parsing for ipidbench

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::bench::TrialTiming;
use crate::methods::MethodSpec;

#[derive(Parser, Debug, Clone)]
#[command(name = "ipidbench")]
#[command(version = "0.1.0")]
#[command(about = "Benchmarks the multicore throughput of IPv4 ID selection algorithms", long_about = None)]
pub struct Args {
    /// Filepath to the packet trace CSV
    #[arg(short = 'f', long, default_value = "packets.csv")]
    pub pkt_fname: PathBuf,

    /// Write results to <RESULTS_PATH>/*.csv
    #[arg(short = 'r', long, default_value = "results")]
    pub results_path: PathBuf,

    /// IPID selection method
    #[arg(short = 'm', long, value_enum, default_value_t = MethodKind::Global)]
    pub ipid_method: MethodKind,

    /// Purge threshold for per-destination, # buckets for per-bucket
    /// methods, # reserved IPIDs for PRNG-based methods
    #[arg(short = 'a', long, default_value_t = 4096)]
    pub method_arg: u32,

    /// Number of benchmark trials per # CPUs
    #[arg(short = 't', long, default_value_t = 1)]
    pub num_trials: u32,

    /// Duration of a single trial in seconds
    #[arg(short = 'd', long, default_value_t = 5)]
    pub trial_duration: u64,

    /// Duration of a trial warmup in milliseconds
    #[arg(short = 'w', long, default_value_t = 100)]
    pub warmup: u64,

    /// Maximum # CPUs to benchmark on
    #[arg(short = 'c', long, default_value_t = 4)]
    pub max_cpus: usize,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Log file path (logs go to stderr when unset)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// The selectable IPID methods, by their CLI names.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Single global atomic counter
    Global,
    /// Per-connection counters (zero-contention upper bound)
    Perconn,
    /// Windows-style per-destination table with purging
    Perdest,
    /// Linux-style per-bucket counters, raw atomics
    Perbucketl,
    /// Per-bucket counters, one mutex per bucket
    Perbucketm,
    /// FreeBSD/XNU-style PRNG with searchable queue
    Prngqueue,
    /// OpenBSD-style PRNG with iterated Knuth shuffle
    Prngshuffle,
    /// Pure PRNG, one generator per thread
    Prngpure,
    /// Per-bucket iterated Knuth shuffle
    Perbucketshuffle,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("purge threshold must be one of {{2^12, 2^15}}, got {0}")]
    PurgeThreshold(u32),

    #[error("# buckets must be in [2^11, 2^18], got {0}")]
    BucketCount(u32),

    #[error("# reserved IPIDs must be in [2^12, 2^15], got {0}")]
    ReservedIpids(u32),

    #[error("# shuffle buckets must be in [2, 16], got {0}")]
    ShuffleBucketCount(u32),

    #[error("# trials must be > 0")]
    NoTrials,

    #[error("trials must last > 0 seconds")]
    ZeroDuration,

    #[error("warmup must be in [10, {max}] ms, got {got}")]
    Warmup { got: u64, max: u64 },

    #[error("max # CPUs must be in [1, {available}], got {got}")]
    MaxCpus { got: usize, available: usize },
}

impl Args {
    /// Check the method argument and the trial/warmup/CPU bounds,
    /// reporting the first violated rule.
    pub fn validate(&self, available_cpus: usize) -> Result<(), ConfigError> {
        match self.ipid_method {
            MethodKind::Perdest
                if self.method_arg != 1 << 12 && self.method_arg != 1 << 15 =>
            {
                return Err(ConfigError::PurgeThreshold(self.method_arg));
            }
            MethodKind::Perbucketl | MethodKind::Perbucketm
                if !(1 << 11..=1 << 18).contains(&self.method_arg) =>
            {
                return Err(ConfigError::BucketCount(self.method_arg));
            }
            MethodKind::Prngqueue | MethodKind::Prngshuffle
                if !(1 << 12..=1 << 15).contains(&self.method_arg) =>
            {
                return Err(ConfigError::ReservedIpids(self.method_arg));
            }
            MethodKind::Perbucketshuffle if !(2..=16).contains(&self.method_arg) => {
                return Err(ConfigError::ShuffleBucketCount(self.method_arg));
            }
            _ => {}
        }

        if self.num_trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        if self.trial_duration == 0 {
            return Err(ConfigError::ZeroDuration);
        }

        // Cap warmups at half the trial duration.
        let warmup_max = self.trial_duration * 500;
        if self.warmup < 10 || self.warmup > warmup_max {
            return Err(ConfigError::Warmup {
                got: self.warmup,
                max: warmup_max,
            });
        }

        if self.max_cpus < 1 || self.max_cpus > available_cpus {
            return Err(ConfigError::MaxCpus {
                got: self.max_cpus,
                available: available_cpus,
            });
        }

        Ok(())
    }

    /// Resolve the selected method and its argument.
    pub fn method_spec(&self) -> MethodSpec {
        match self.ipid_method {
            MethodKind::Global => MethodSpec::Global,
            MethodKind::Perconn => MethodSpec::PerConn,
            MethodKind::Perdest => MethodSpec::PerDest {
                purge_threshold: self.method_arg,
            },
            MethodKind::Perbucketl => MethodSpec::PerBucketLockfree {
                num_buckets: self.method_arg,
            },
            MethodKind::Perbucketm => MethodSpec::PerBucketMutex {
                num_buckets: self.method_arg,
            },
            MethodKind::Prngqueue => MethodSpec::PrngQueue {
                queue_size: self.method_arg,
            },
            MethodKind::Prngshuffle => MethodSpec::PrngShuffle {
                num_reserved: self.method_arg,
            },
            MethodKind::Prngpure => MethodSpec::PrngPure,
            MethodKind::Perbucketshuffle => MethodSpec::PerBucketShuffle {
                num_buckets: self.method_arg,
            },
        }
    }

    pub fn timing(&self) -> TrialTiming {
        TrialTiming {
            warmup: Duration::from_millis(self.warmup),
            duration: Duration::from_secs(self.trial_duration),
        }
    }
}
