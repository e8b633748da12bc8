//! ipidbench - multicore throughput benchmark for IPv4 ID selection
//!
//! Loads a packet trace, then for every CPU count up to the requested
//! maximum runs timed trials of the chosen IPID selection method with
//! one pinned worker thread per CPU, writing per-thread assignment
//! counts to one CSV per CPU count.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::info;

use ipidbench::affinity;
use ipidbench::bench::{self, BenchConfig};
use ipidbench::cli::Args;
use ipidbench::logging;
use ipidbench::packet::{self, LOCAL_SERVER_ADDR};

fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            std::process::exit(1);
        }
        Err(err) => err.exit(),
    };

    logging::init_logging(args.debug, args.log_file.as_deref())?;

    let cpus = affinity::available_cpus()?;
    args.validate(cpus.len())?;

    info!(path = %args.pkt_fname.display(), "reading packets' header data");
    let packets = packet::load_packets(&args.pkt_fname, LOCAL_SERVER_ADDR)
        .with_context(|| format!("couldn't load '{}'", args.pkt_fname.display()))?;
    info!(count = packets.len(), "loaded packet trace");

    let config = BenchConfig {
        method: args.method_spec(),
        num_trials: args.num_trials,
        timing: args.timing(),
        max_cpus: args.max_cpus,
    };

    info!(method = config.method.name(), "starting trials");
    bench::run(&config, &packets, &cpus, &args.results_path)
}
