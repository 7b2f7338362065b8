//! Alignment driver: runs the three DP phases over a read set.

pub mod cigar;
pub mod phase1;
pub mod traceback;
pub mod types;

pub use types::BestScoreInfo;

use std::time::Instant;

use crate::graph::CharGraph;
use crate::params::{ScoreParams, ScorePrecision};
use crate::seq_utils;

/// Align every read locally against the graph.
///
/// Phase 1 scores a doubled read vector (two orientation slots per read),
/// the better slot is kept, Phase 1-R recovers the alignment starts from
/// the reversed chosen reads, and Phase 2 recomputes the banded matrix to
/// emit transcripts. Returns one record per input read, in input order.
pub fn align_local(
    reads: &[Vec<u8>],
    graph: &CharGraph,
    params: &ScoreParams,
) -> Vec<BestScoreInfo> {
    // Orientation slots 2k and 2k+1 for read k.
    let mut read_set_p1: Vec<Vec<u8>> = Vec::with_capacity(2 * reads.len());
    let mut max_read_len = 0usize;
    for read in reads {
        read_set_p1.push(read.clone());
        // TODO: fill this slot with the reverse complement once minus-strand
        // coordinates are wired through the selector and the result writer.
        read_set_p1.push(read.clone());
        max_read_len = max_read_len.max(read.len());
    }

    let mut best_p1 = vec![BestScoreInfo::default(); read_set_p1.len()];

    let timer = Instant::now();
    match ScorePrecision::select(max_read_len, params.match_score, 0) {
        ScorePrecision::Byte => {
            phase1::phase1_forward::<i8>(&read_set_p1, graph, params, &mut best_p1)
        }
        ScorePrecision::Short => {
            phase1::phase1_forward::<i16>(&read_set_p1, graph, params, &mut best_p1)
        }
        ScorePrecision::Word => {
            phase1::phase1_forward::<i32>(&read_set_p1, graph, params, &mut best_p1)
        }
    }
    log::info!("phase 1 finished in {:.3}s", timer.elapsed().as_secs_f64());

    // Keep the better-scoring orientation of each read; slot 2k wins ties.
    let mut results: Vec<BestScoreInfo> = Vec::with_capacity(reads.len());
    let mut chosen: Vec<usize> = Vec::with_capacity(reads.len());
    let mut read_set_rev: Vec<Vec<u8>> = Vec::with_capacity(reads.len());

    for k in 0..reads.len() {
        let slot = if best_p1[2 * k].score >= best_p1[2 * k + 1].score {
            2 * k
        } else {
            2 * k + 1
        };
        chosen.push(slot);

        let mut info = best_p1[slot].clone();
        info.strand = '+';
        info.qry_id = k;
        results.push(info);

        read_set_rev.push(seq_utils::reverse(&read_set_p1[slot]));
    }

    let timer = Instant::now();
    // One extra unit of headroom for the augmented end cell.
    match ScorePrecision::select(max_read_len, params.match_score, 1) {
        ScorePrecision::Byte => {
            phase1::phase1_reverse::<i8>(&read_set_rev, graph, params, &mut results)
        }
        ScorePrecision::Short => {
            phase1::phase1_reverse::<i16>(&read_set_rev, graph, params, &mut results)
        }
        ScorePrecision::Word => {
            phase1::phase1_reverse::<i32>(&read_set_rev, graph, params, &mut results)
        }
    }
    log::info!("phase 1-R finished in {:.3}s", timer.elapsed().as_secs_f64());

    let timer = Instant::now();
    let read_set_p2: Vec<Vec<u8>> = chosen.iter().map(|&s| read_set_p1[s].clone()).collect();
    traceback::phase2(&read_set_p2, graph, params, &mut results);
    log::info!("phase 2 finished in {:.3}s", timer.elapsed().as_secs_f64());

    results
}
