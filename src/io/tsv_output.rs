//! Result serialization.
//!
//! One tab-separated line per read: name, length, query start/end rows,
//! strand, the original-graph `(id, offset)` pairs at the alignment start
//! and end columns, score, CIGAR, and the `-`-separated path of distinct
//! original vertex ids the alignment walks through.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::align::BestScoreInfo;
use crate::graph::CharGraph;
use crate::io::query_reader::QueryMeta;

pub fn write_results(
    path: &Path,
    qmeta: &[QueryMeta],
    graph: &CharGraph,
    results: &[BestScoreInfo],
) -> io::Result<()> {
    assert_eq!(qmeta.len(), results.len());

    let mut out = BufWriter::new(File::create(path)?);

    for e in results {
        let meta = &qmeta[e.qry_id];
        let (start_id, start_off) = graph.origins[e.ref_col_start];
        let (end_id, end_off) = graph.origins[e.ref_col_end];

        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t({}, {})\t({}, {})\t{}\t{}\t{}",
            meta.name,
            meta.len,
            e.qry_row_start,
            e.qry_row_end,
            e.strand,
            start_id,
            start_off,
            end_id,
            end_off,
            e.score,
            e.cigar,
            path_string(graph, e),
        )?;
    }

    out.flush()
}

/// Distinct consecutive original vertex ids along the alignment.
fn path_string(graph: &CharGraph, e: &BestScoreInfo) -> String {
    if e.cigar.is_empty() {
        return String::new();
    }

    let mut last = graph.origins[e.ref_col_start].0;
    let mut path = last.to_string();

    for &col in &e.ref_columns {
        if col >= e.ref_col_start && col <= e.ref_col_end {
            let id = graph.origins[col].0;
            if id != last {
                path.push('-');
                path.push_str(&id.to_string());
                last = id;
            }
        }
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_results() {
        // Two original vertices expanded to four characters.
        let graph = CharGraph::with_origins(
            b"ACGT".to_vec(),
            vec![(7, 0), (7, 1), (7, 2), (9, 0)],
            vec![(0, 1), (1, 2), (2, 3)],
        )
        .unwrap();

        let qmeta = vec![QueryMeta {
            name: "read1".to_string(),
            len: 4,
        }];
        let results = vec![BestScoreInfo {
            score: 4,
            ref_col_start: 0,
            ref_col_end: 3,
            qry_row_start: 0,
            qry_row_end: 3,
            strand: '+',
            qry_id: 0,
            cigar: "4=".to_string(),
            ref_columns: vec![0, 1, 2, 3],
        }];

        let file = tempfile::NamedTempFile::new().unwrap();
        write_results(file.path(), &qmeta, &graph, &results).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(
            written,
            "read1\t4\t0\t3\t+\t(7, 0)\t(9, 0)\t4\t4=\t7-9\n"
        );
    }

    #[test]
    fn test_unaligned_read_has_empty_transcript() {
        let graph = CharGraph::new(b"AC".to_vec(), vec![(0, 1)]).unwrap();
        let qmeta = vec![QueryMeta {
            name: "empty".to_string(),
            len: 0,
        }];
        let results = vec![BestScoreInfo::default()];

        let file = tempfile::NamedTempFile::new().unwrap();
        write_results(file.path(), &qmeta, &graph, &results).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "empty\t0\t0\t0\t+\t(0, 0)\t(0, 0)\t0\t\t\n");
    }
}
