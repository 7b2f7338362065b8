//! CIGAR transcript helpers.
//!
//! Transcripts use `=` (match), `X` (mismatch), `I` (insertion in the read)
//! and `D` (deletion from the read). The traceback emits one raw symbol per
//! edit; `compact` folds runs into the usual `<count><symbol>` form, and
//! `score` re-prices a compacted transcript for validation.

use std::fmt::Write;

use crate::params::ScoreParams;

/// Collapse a raw symbol-per-edit transcript into run-length form.
///
/// E.g. `==X==` becomes `2=1X2=`. An empty input stays empty.
pub fn compact(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut iter = raw.iter();

    let Some(&first) = iter.next() else {
        return out;
    };
    let mut run_op = first;
    let mut run_len = 1usize;

    for &op in iter {
        if op == run_op {
            run_len += 1;
        } else {
            write!(out, "{}{}", run_len, run_op as char).unwrap();
            run_op = op;
            run_len = 1;
        }
    }
    write!(out, "{}{}", run_len, run_op as char).unwrap();
    out
}

/// Score a compacted transcript under the given weights.
pub fn score(cigar: &str, params: &ScoreParams) -> i32 {
    let mut total = 0i64;
    let mut count = 0i64;

    for ch in cigar.chars() {
        if let Some(d) = ch.to_digit(10) {
            count = count * 10 + d as i64;
            continue;
        }
        let per_op = match ch {
            '=' => params.match_score as i64,
            'X' => -(params.mismatch as i64),
            'I' => -(params.ins as i64),
            'D' => -(params.del as i64),
            other => panic!("unexpected cigar symbol '{}'", other),
        };
        total += count * per_op;
        count = 0;
    }

    total as i32
}

/// Count of query characters a compacted transcript consumes (`=`, `X`, `I`).
pub fn query_span(cigar: &str) -> usize {
    span_of(cigar, |op| matches!(op, '=' | 'X' | 'I'))
}

/// Count of reference characters a compacted transcript consumes (`=`, `X`, `D`).
pub fn ref_span(cigar: &str) -> usize {
    span_of(cigar, |op| matches!(op, '=' | 'X' | 'D'))
}

fn span_of(cigar: &str, consumes: impl Fn(char) -> bool) -> usize {
    let mut total = 0usize;
    let mut count = 0usize;
    for ch in cigar.chars() {
        if let Some(d) = ch.to_digit(10) {
            count = count * 10 + d as usize;
        } else {
            if consumes(ch) {
                total += count;
            }
            count = 0;
        }
    }
    total
}
