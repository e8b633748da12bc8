//! Result CSV writer
//!
//! One file per (method, CPU count): `<stem>_<n>.csv`, holding one row
//! per trial with one comma-separated count per thread, in thread-id
//! order. Files are created fresh on every run.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Write `rows` to `<dir>/<stem>_<num_cpus>.csv`, replacing any
/// previous file. The directory is created if missing.
pub fn write_results(dir: &Path, stem: &str, num_cpus: usize, rows: &[Vec<u64>]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("couldn't create results directory '{}'", dir.display()))?;

    let path = dir.join(format!("{stem}_{num_cpus}.csv"));
    let file =
        File::create(&path).with_context(|| format!("couldn't open '{}'", path.display()))?;
    let mut out = BufWriter::new(file);

    for row in rows {
        let line = row
            .iter()
            .map(|count| count.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{line}").with_context(|| format!("couldn't write '{}'", path.display()))?;
    }
    out.flush()
        .with_context(|| format!("couldn't write '{}'", path.display()))?;

    debug!(path = %path.display(), rows = rows.len(), "wrote results");
    Ok(())
}
