//! Query sequence reading.
//!
//! Accepts FASTA or FASTQ, plain or gzip-compressed, with the container and
//! record format auto-detected: compression from the file extension plus
//! magic bytes (BGZF blocks get a multithreaded reader, plain gzip a
//! single-threaded one), record format from the first byte of the
//! decompressed stream.

use bio::io::{fasta, fastq};
use flate2::read::GzDecoder;
use noodles_bgzf as bgzf;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::seq_utils;

/// Name and length of one query, in input order.
#[derive(Debug, Clone)]
pub struct QueryMeta {
    pub name: String,
    pub len: usize,
}

const BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Detect BGZF by the `BC` subfield in the gzip extra header.
fn is_bgzf_format(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut header = [0u8; 18];

    if file.read(&mut header).unwrap_or(0) < 18 {
        return Ok(false);
    }
    if header[0] != 0x1f || header[1] != 0x8b {
        return Ok(false);
    }
    // BGZF marks its block-size subfield through the FEXTRA flag.
    if header[3] & 0x04 == 0 {
        return Ok(false);
    }
    Ok(header[12] == b'B' && header[13] == b'C')
}

fn open_decoded(path: &Path) -> io::Result<Box<dyn Read>> {
    let is_gz = path.extension().and_then(|e| e.to_str()) == Some("gz");

    let reader: Box<dyn Read> = if is_gz {
        if is_bgzf_format(path)? {
            log::debug!("detected BGZF input, using multithreaded decompression");
            let file = File::open(path)?;
            let worker_count = std::num::NonZeroUsize::new(num_cpus::get()).unwrap_or(
                std::num::NonZeroUsize::new(1).unwrap(),
            );
            Box::new(bgzf::MultithreadedReader::with_worker_count(
                worker_count,
                file,
            ))
        } else {
            log::debug!("detected gzip input");
            let file = File::open(path)?;
            Box::new(GzDecoder::new(file))
        }
    } else {
        Box::new(File::open(path)?)
    };

    Ok(reader)
}

/// Read every query into memory, upper-cased, along with its metadata.
///
/// Non-ACGT characters are kept as-is; they will never match a reference
/// character and therefore score as mismatches. An empty file yields zero
/// queries.
pub fn read_queries(path: &Path) -> io::Result<(Vec<Vec<u8>>, Vec<QueryMeta>)> {
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, open_decoded(path)?);

    let first = {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        buf[0]
    };

    let mut reads: Vec<Vec<u8>> = Vec::new();
    let mut meta: Vec<QueryMeta> = Vec::new();

    match first {
        b'>' => {
            for record in fasta::Reader::new(reader).records() {
                let record = record
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                push_read(record.id(), record.seq(), &mut reads, &mut meta);
            }
        }
        b'@' => {
            for record in fastq::Reader::new(reader).records() {
                let record = record
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                push_read(record.id(), record.seq(), &mut reads, &mut meta);
            }
        }
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "query file does not start with '>' or '@' (found byte {:#04x})",
                    other
                ),
            ));
        }
    }

    Ok((reads, meta))
}

fn push_read(id: &str, seq: &[u8], reads: &mut Vec<Vec<u8>>, meta: &mut Vec<QueryMeta>) {
    let mut seq = seq.to_vec();
    seq_utils::make_uppercase(&mut seq);
    meta.push(QueryMeta {
        name: id.to_string(),
        len: seq.len(),
    });
    reads.push(seq);
}
