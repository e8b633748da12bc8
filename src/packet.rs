//! Packet trace records and CSV loading
//!
//! A trace row has seven comma-separated fields: protocol number, TCP
//! flags, IP identifier, source address, source port, destination
//! address, destination port. Only the destination address, the two
//! ports, and the protocol are kept; the source address of every
//! constructed packet is overridden with the benchmarked server's own
//! address, since all of these packets are treated as though that one
//! server is assigning their IPIDs.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::Ipv4Addr;
use std::path::Path;
use thiserror::Error;

/// Address stamped onto every packet as its source.
pub const LOCAL_SERVER_ADDR: Ipv4Addr = Ipv4Addr::new(169, 67, 224, 76);

/// Parsed header fields of one traced packet. Immutable after
/// construction; the loaded vector is shared read-only across all
/// worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub src_addr: u32,
    pub dst_addr: u32,
    pub src_port: u32,
    pub dst_port: u32,
    pub protocol: u32,
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("couldn't open '{path}'")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("row {row}: expected 7 comma-separated fields, got {fields}")]
    TooFewFields { row: usize, fields: usize },

    #[error("row {row}: invalid IPv4 address '{value}'")]
    BadAddress { row: usize, value: String },

    #[error("row {row}: invalid numeric field '{value}'")]
    BadNumber { row: usize, value: String },

    #[error("'{path}' contains no packets")]
    Empty { path: String },
}

/// Load a packet trace from `path`, stamping `src_addr` as the source
/// address of every packet.
///
/// The header row is skipped. Empty fields are read as `"0"`; in this
/// dataset that usually means a missing port number. A trailing comma
/// leaves an empty final field, which likewise becomes port 0. Rows
/// with fewer than seven fields are a fatal error.
pub fn load_packets(path: &Path, src_addr: Ipv4Addr) -> Result<Vec<Packet>, TraceError> {
    let file = File::open(path).map_err(|source| TraceError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut packets = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| TraceError::Read {
            path: path.display().to_string(),
            source,
        })?;

        // Skip the header row.
        if i == 0 {
            continue;
        }
        let row = i + 1;

        let fields: Vec<&str> = line
            .split(',')
            .map(|f| if f.is_empty() { "0" } else { f })
            .collect();
        if fields.len() < 7 {
            return Err(TraceError::TooFewFields {
                row,
                fields: fields.len(),
            });
        }

        let dst_addr: Ipv4Addr = fields[5].parse().map_err(|_| TraceError::BadAddress {
            row,
            value: fields[5].to_string(),
        })?;
        let parse_num = |value: &str| -> Result<u32, TraceError> {
            value.parse().map_err(|_| TraceError::BadNumber {
                row,
                value: value.to_string(),
            })
        };

        packets.push(Packet {
            src_addr: u32::from(src_addr),
            dst_addr: u32::from(dst_addr),
            src_port: parse_num(fields[4])?,
            dst_port: parse_num(fields[6])?,
            protocol: parse_num(fields[0])?,
        });
    }

    if packets.is_empty() {
        return Err(TraceError::Empty {
            path: path.display().to_string(),
        });
    }

    Ok(packets)
}
