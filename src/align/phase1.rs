//! Phase 1 scoring kernels: forward DP over in-edges to locate alignment
//! ends, and reverse DP over out-edges to locate alignment starts.
//!
//! Both kernels keep only two rows of width `V`, indexed by row parity, and
//! are data-parallel over reads. Row storage is generic over the cell width
//! chosen by the precision ladder; arithmetic is always done at `i32`, so
//! scores and tie-breaks are identical across widths.

use rayon::prelude::*;

use crate::align::types::BestScoreInfo;
use crate::graph::CharGraph;
use crate::params::ScoreParams;

/// Row storage cell for the rolling DP matrices.
pub trait ScoreCell: Copy + Send + Sync {
    const ZERO: Self;
    fn from_score(v: i32) -> Self;
    fn to_score(self) -> i32;
}

macro_rules! impl_score_cell {
    ($($t:ty),*) => {
        $(impl ScoreCell for $t {
            const ZERO: Self = 0;
            #[inline(always)]
            fn from_score(v: i32) -> Self {
                debug_assert!(v >= <$t>::MIN as i32 && v <= <$t>::MAX as i32);
                v as $t
            }
            #[inline(always)]
            fn to_score(self) -> i32 {
                self as i32
            }
        })*
    };
}

impl_score_cell!(i8, i16, i32);

/// Forward DP over every read in `read_set`; writes `score`, `ref_col_end`
/// and `qry_row_end` into the matching `best` entry.
///
/// On equal scores the cell seen later in scan order (rows ascending,
/// columns ascending) wins.
pub fn phase1_forward<S: ScoreCell>(
    read_set: &[Vec<u8>],
    graph: &CharGraph,
    params: &ScoreParams,
    best: &mut [BestScoreInfo],
) {
    assert_eq!(read_set.len(), best.len());

    best.par_iter_mut()
        .zip(read_set.par_iter())
        .for_each_init(
            || {
                (
                    vec![S::ZERO; graph.num_vertices],
                    vec![S::ZERO; graph.num_vertices],
                )
            },
            |(even, odd), (info, read)| forward_one::<S>(read, graph, params, even, odd, info),
        );
}

fn forward_one<S: ScoreCell>(
    read: &[u8],
    graph: &CharGraph,
    params: &ScoreParams,
    even: &mut [S],
    odd: &mut [S],
    info: &mut BestScoreInfo,
) {
    // Row -1 maps to the odd row; it must read as all zeros. The even row
    // is fully overwritten before anything reads it.
    odd.fill(S::ZERO);

    let mut best_score = 0i32;
    let mut best_row = 0usize;
    let mut best_col = 0usize;

    for (i, &qch) in read.iter().enumerate() {
        let (cur, prev): (&mut [S], &[S]) = if i % 2 == 0 {
            (&mut even[..], &odd[..])
        } else {
            (&mut odd[..], &even[..])
        };

        for j in 0..graph.num_vertices {
            let match_score = if graph.labels[j] == qch {
                params.match_score
            } else {
                -params.mismatch
            };

            // A local alignment may restart at this cell.
            let mut current = match_score.max(0);

            for &p in graph.in_neighbors(j) {
                let p = p as usize;
                current = current.max(prev[p].to_score() + match_score);
                current = current.max(cur[p].to_score() - params.del);
            }
            current = current.max(prev[j].to_score() - params.ins);

            cur[j] = S::from_score(current);

            if current >= best_score {
                best_score = current;
                best_row = i;
                best_col = j;
            }
        }
    }

    if best_score == 0 {
        // Nothing aligned; the running max only ever saw empty cells.
        best_row = 0;
        best_col = 0;
    }

    info.score = best_score;
    info.ref_col_end = best_col;
    info.qry_row_end = best_row;
}

/// Reverse DP over the reversed reads; writes `ref_col_start` and
/// `qry_row_start` into the matching `best` entry, which must already carry
/// the forward score and end coordinates.
///
/// The cell matching the known alignment end is nudged up by one unit, so
/// the reverse optimum `forward score + 1` is reached at exactly one cell:
/// the alignment start. Reads with a zero forward score are skipped.
pub fn phase1_reverse<S: ScoreCell>(
    rev_read_set: &[Vec<u8>],
    graph: &CharGraph,
    params: &ScoreParams,
    best: &mut [BestScoreInfo],
) {
    assert_eq!(rev_read_set.len(), best.len());

    best.par_iter_mut()
        .zip(rev_read_set.par_iter())
        .for_each_init(
            || {
                (
                    vec![S::ZERO; graph.num_vertices],
                    vec![S::ZERO; graph.num_vertices],
                )
            },
            |(even, odd), (info, read)| reverse_one::<S>(read, graph, params, even, odd, info),
        );
}

fn reverse_one<S: ScoreCell>(
    read: &[u8],
    graph: &CharGraph,
    params: &ScoreParams,
    even: &mut [S],
    odd: &mut [S],
    info: &mut BestScoreInfo,
) {
    if info.score == 0 {
        // Nothing aligned; there is no start to recover.
        return;
    }

    odd.fill(S::ZERO);

    let len = read.len();
    let mut best_score = 0i32;
    let mut best_row = 0usize;
    let mut best_col = 0usize;

    for (i, &qch) in read.iter().enumerate() {
        let (cur, prev): (&mut [S], &[S]) = if i % 2 == 0 {
            (&mut even[..], &odd[..])
        } else {
            (&mut odd[..], &even[..])
        };

        // Position of this reversed-read character in the original read.
        let orig_row = len - 1 - i;

        for j in (0..graph.num_vertices).rev() {
            let match_score = if graph.labels[j] == qch {
                params.match_score
            } else {
                -params.mismatch
            };

            let mut current = match_score.max(0);

            // Edges are walked backward, so successors act as predecessors.
            for &s in graph.out_neighbors(j) {
                let s = s as usize;
                current = current.max(prev[s].to_score() + match_score);
                current = current.max(cur[s].to_score() - params.del);
            }
            current = current.max(prev[j].to_score() - params.ins);

            let mut stored = current;
            if j == info.ref_col_end && orig_row == info.qry_row_end {
                // A local alignment ends on a match; perturb the known end
                // cell so the reverse optimum is unique.
                assert_eq!(
                    current, params.match_score,
                    "alignment end cell does not hold a match"
                );
                stored = current + 1;
            }

            cur[j] = S::from_score(stored);

            if stored >= best_score {
                best_score = stored;
                best_row = orig_row;
                best_col = j;
            }
        }
    }

    assert_eq!(
        best_score,
        info.score + 1,
        "reverse DP optimum does not match the forward score"
    );

    info.ref_col_start = best_col;
    info.qry_row_start = best_row;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(labels: &[u8]) -> CharGraph {
        let edges = (0..labels.len() as u32 - 1).map(|i| (i, i + 1)).collect();
        CharGraph::new(labels.to_vec(), edges).unwrap()
    }

    #[test]
    fn test_forward_exact_match() {
        let graph = chain(b"ACGT");
        let params = ScoreParams::default();
        let reads = vec![b"ACGT".to_vec()];
        let mut best = vec![BestScoreInfo::default()];

        phase1_forward::<i32>(&reads, &graph, &params, &mut best);

        assert_eq!(best[0].score, 4);
        assert_eq!(best[0].ref_col_end, 3);
        assert_eq!(best[0].qry_row_end, 3);
    }

    #[test]
    fn test_forward_later_cell_wins_ties() {
        // "AC" ends with score 2 at columns 1 and 3; the later column wins.
        let graph = chain(b"ACAC");
        let params = ScoreParams::default();
        let reads = vec![b"AC".to_vec()];
        let mut best = vec![BestScoreInfo::default()];

        phase1_forward::<i32>(&reads, &graph, &params, &mut best);

        assert_eq!(best[0].score, 2);
        assert_eq!(best[0].ref_col_end, 3);
    }

    #[test]
    fn test_reverse_recovers_start() {
        let graph = chain(b"NNACGTNN");
        let params = ScoreParams::default();
        let reads = vec![b"ACGT".to_vec()];
        let mut best = vec![BestScoreInfo::default()];

        phase1_forward::<i32>(&reads, &graph, &params, &mut best);
        assert_eq!(best[0].score, 4);
        assert_eq!(best[0].ref_col_end, 5);

        let rev = vec![crate::seq_utils::reverse(&reads[0])];
        phase1_reverse::<i32>(&rev, &graph, &params, &mut best);

        assert_eq!(best[0].ref_col_start, 2);
        assert_eq!(best[0].qry_row_start, 0);
    }

    #[test]
    fn test_narrow_rows_match_wide_rows() {
        let graph = chain(b"ACGTACGTAC");
        let params = ScoreParams::default();
        let reads = vec![b"ACGTAC".to_vec(), b"TTACG".to_vec()];

        let mut best8 = vec![BestScoreInfo::default(); 2];
        let mut best32 = vec![BestScoreInfo::default(); 2];
        phase1_forward::<i8>(&reads, &graph, &params, &mut best8);
        phase1_forward::<i32>(&reads, &graph, &params, &mut best32);

        for (a, b) in best8.iter().zip(best32.iter()) {
            assert_eq!(a.score, b.score);
            assert_eq!(a.ref_col_end, b.ref_col_end);
            assert_eq!(a.qry_row_end, b.qry_row_end);
        }
    }

    #[test]
    fn test_zero_length_read() {
        let graph = chain(b"ACGT");
        let params = ScoreParams::default();
        let reads = vec![Vec::new()];
        let mut best = vec![BestScoreInfo::default()];

        phase1_forward::<i32>(&reads, &graph, &params, &mut best);
        assert_eq!(best[0].score, 0);

        // The reverse phase must leave zero-score reads untouched.
        phase1_reverse::<i32>(&reads, &graph, &params, &mut best);
        assert_eq!(best[0].ref_col_start, 0);
        assert_eq!(best[0].qry_row_start, 0);
    }
}
