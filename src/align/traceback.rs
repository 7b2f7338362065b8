//! Phase 2: banded recomputation and the backward walk that produces the
//! edit transcript.
//!
//! The forward recurrence is rerun inside the bounding box located by the
//! two Phase 1 passes. Instead of a full traceback matrix, only the
//! vertical score difference of every cell is logged (one signed byte), and
//! the walk reconstructs each row above the current one on demand from
//! those differences.

use rayon::prelude::*;

use crate::align::cigar;
use crate::align::types::BestScoreInfo;
use crate::graph::CharGraph;
use crate::params::ScoreParams;

/// Recompute the banded DP and recover the CIGAR and traversed columns for
/// every read; `best` must carry the scores and coordinates produced by
/// Phases 1 and 1-R. Reads with a zero score keep an empty transcript.
pub fn phase2(
    read_set: &[Vec<u8>],
    graph: &CharGraph,
    params: &ScoreParams,
    best: &mut [BestScoreInfo],
) {
    assert_eq!(read_set.len(), best.len());

    best.par_iter_mut()
        .zip(read_set.par_iter())
        .for_each(|(info, read)| traceback_one(read, graph, params, info));
}

fn traceback_one(read: &[u8], graph: &CharGraph, params: &ScoreParams, info: &mut BestScoreInfo) {
    if info.score == 0 {
        return;
    }

    let j0 = info.ref_col_start;
    let i0 = info.qry_row_start;
    let width = info.ref_col_end - j0 + 1;
    let height = info.qry_row_end - i0 + 1;

    // Dense log of vertical score differences, one byte per cell; the
    // per-step weights bound each difference.
    let mut delta_log = vec![0i8; height * width];
    let mut final_row = vec![0i32; width];

    {
        let mut even = vec![0i32; width];
        let mut odd = vec![0i32; width];

        for i in 0..height {
            let (cur, prev): (&mut [i32], &[i32]) = if i % 2 == 0 {
                (&mut even[..], &odd[..])
            } else {
                (&mut odd[..], &even[..])
            };

            for j in 0..width {
                let gcol = j0 + j;
                let match_score = if graph.labels[gcol] == read[i0 + i] {
                    params.match_score
                } else {
                    -params.mismatch
                };

                let from_insertion = prev[j] - params.ins;
                // Also covers a band-local in-degree of zero.
                let mut from_match = match_score;
                let mut from_deletion = -1i32;

                for &p in graph.in_neighbors(gcol) {
                    let p = p as usize;
                    // The alignment is known to start no earlier than j0;
                    // predecessors left of the band are irrelevant.
                    if p >= j0 {
                        from_match = from_match.max(prev[p - j0] + match_score);
                        from_deletion = from_deletion.max(cur[p - j0] - params.del);
                    }
                }

                let score = from_insertion.max(from_match).max(from_deletion).max(0);
                cur[j] = score;
                delta_log[i * width + j] = (score - prev[j]) as i8;
            }

            if i == height - 1 {
                final_row.copy_from_slice(cur);
            }
        }
    }

    let recomputed = *final_row.iter().max().expect("band has width >= 1");
    assert_eq!(
        recomputed, info.score,
        "recomputed band score disagrees with phase 1"
    );
    assert_eq!(
        final_row[info.ref_col_end - j0],
        info.score,
        "recomputed band optimum is not at the phase 1 end column"
    );

    let (raw_cigar, used_cols) = walk_back(read, graph, params, info, &delta_log, final_row);

    let cigar = cigar::compact(&raw_cigar);
    assert_eq!(
        cigar::score(&cigar, params),
        info.score,
        "cigar does not re-score to the alignment score"
    );

    info.cigar = cigar;
    info.ref_columns = used_cols;
}

/// Walk from the bottom-right band corner back to the alignment start,
/// re-evaluating the recurrence at each cell. Returns the raw transcript
/// and the visited graph columns, both in walk (reversed) order.
fn walk_back(
    read: &[u8],
    graph: &CharGraph,
    params: &ScoreParams,
    info: &BestScoreInfo,
    delta_log: &[i8],
    final_row: Vec<i32>,
) -> (Vec<u8>, Vec<usize>) {
    let j0 = info.ref_col_start;
    let i0 = info.qry_row_start;
    let width = final_row.len();

    let mut raw_cigar: Vec<u8> = Vec::new();
    let mut used_cols: Vec<usize> = Vec::new();

    let mut current = final_row;
    let mut above = vec![0i32; width];

    let mut col = width as isize - 1;
    let mut row = (delta_log.len() / width) as isize - 1;

    while col >= 0 && row >= 0 {
        let c = col as usize;
        let r = row as usize;

        used_cols.push(c + j0);

        // Reconstruct the row above from the logged differences.
        for k in 0..width {
            above[k] = current[k] - delta_log[r * width + k] as i32;
        }

        let gcol = j0 + c;
        let match_score = if graph.labels[gcol] == read[i0 + r] {
            params.match_score
        } else {
            -params.mismatch
        };

        let from_insertion = above[c] - params.ins;

        // Best predecessor for the match branch, first in CSR order on
        // ties. A predecessor also wins a tie against restarting at this
        // cell; restarting ends the walk, so it is chosen only when no
        // predecessor reaches the same score.
        let mut pred_match = i32::MIN;
        let mut pred_match_pos = c;
        let mut from_deletion = -1i32;
        let mut from_deletion_pos = c;

        for &p in graph.in_neighbors(gcol) {
            let p = p as usize;
            if p >= j0 {
                let from_col = p - j0;
                if pred_match < above[from_col] + match_score {
                    pred_match = above[from_col] + match_score;
                    pred_match_pos = from_col;
                }
                if from_deletion < current[from_col] - params.del {
                    from_deletion = current[from_col] - params.del;
                    from_deletion_pos = from_col;
                }
            }
        }

        let (from_match, from_match_pos) = if pred_match >= match_score {
            (pred_match, pred_match_pos)
        } else {
            (match_score, c)
        };

        if current[c] == from_match {
            raw_cigar.push(if match_score == params.match_score {
                b'='
            } else {
                b'X'
            });

            // The alignment starts at this cell.
            if from_match_pos == c {
                break;
            }

            col = from_match_pos as isize;
            row -= 1;
            std::mem::swap(&mut current, &mut above);
        } else if current[c] == from_deletion {
            // Deletions may pass through zero-scoring cells; a zero-cost
            // prefix of the optimal alignment is still part of it.
            raw_cigar.push(b'D');
            col = from_deletion_pos as isize;
        } else if current[c] == from_insertion {
            raw_cigar.push(b'I');
            row -= 1;
            std::mem::swap(&mut current, &mut above);
        } else {
            // No branch explains the cell: the walk has moved past the
            // start of the local alignment.
            assert!(
                current[c] <= 0,
                "positive traceback cell matches no recurrence branch"
            );
            break;
        }
    }

    raw_cigar.reverse();
    used_cols.reverse();
    (raw_cigar, used_cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::phase1::{phase1_forward, phase1_reverse};
    use crate::seq_utils;

    fn aligned(graph: &CharGraph, read: &[u8], params: &ScoreParams) -> BestScoreInfo {
        let reads = vec![read.to_vec()];
        let mut best = vec![BestScoreInfo::default()];
        phase1_forward::<i32>(&reads, graph, params, &mut best);
        let rev = vec![seq_utils::reverse(read)];
        phase1_reverse::<i32>(&rev, graph, params, &mut best);
        phase2(&reads, graph, params, &mut best);
        best.pop().unwrap()
    }

    fn chain(labels: &[u8]) -> CharGraph {
        let edges = (0..labels.len() as u32 - 1).map(|i| (i, i + 1)).collect();
        CharGraph::new(labels.to_vec(), edges).unwrap()
    }

    #[test]
    fn test_exact_match_transcript() {
        let params = ScoreParams::default();
        let info = aligned(&chain(b"ACGT"), b"ACGT", &params);
        assert_eq!(info.cigar, "4=");
        assert_eq!(info.ref_columns, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_mismatch_transcript() {
        let params = ScoreParams::default();
        let info = aligned(&chain(b"ACGT"), b"ACCT", &params);
        assert_eq!(info.score, 2);
        assert_eq!(info.cigar, "2=1X1=");
    }

    #[test]
    fn test_insertion_transcript() {
        let params = ScoreParams::default();
        let info = aligned(&chain(b"ACGT"), b"ACAGT", &params);
        assert_eq!(info.score, 3);
        assert_eq!(info.cigar, "2=1I2=");
    }

    #[test]
    fn test_deletion_transcript() {
        let params = ScoreParams::default();
        let info = aligned(&chain(b"ACGT"), b"AGT", &params);
        assert_eq!(info.score, 2);
        assert_eq!(info.cigar, "1=1D2=");
    }

    #[test]
    fn test_branch_path_choice() {
        // Diamond: 0=A with successors 1=C and 2=G, both into 3=T.
        let graph = CharGraph::new(
            b"ACGT".to_vec(),
            vec![(0, 1), (0, 2), (1, 3), (2, 3)],
        )
        .unwrap();
        let params = ScoreParams::default();

        let info = aligned(&graph, b"AGT", &params);
        assert_eq!(info.score, 3);
        assert_eq!(info.cigar, "3=");
        assert_eq!(info.ref_columns, vec![0, 2, 3]);

        let info = aligned(&graph, b"ACT", &params);
        assert_eq!(info.cigar, "3=");
        assert_eq!(info.ref_columns, vec![0, 1, 3]);
    }
}
