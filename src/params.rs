//! Scoring parameters and the row-storage precision ladder.

use std::io;

/// Linear-gap scoring weights. All four are stored as magnitudes; the DP
/// kernels apply the signs.
#[derive(Debug, Clone, Copy)]
pub struct ScoreParams {
    pub match_score: i32,
    pub mismatch: i32,
    pub ins: i32,
    pub del: i32,
}

impl Default for ScoreParams {
    fn default() -> Self {
        ScoreParams {
            match_score: 1,
            mismatch: 1,
            ins: 1,
            del: 1,
        }
    }
}

impl ScoreParams {
    pub fn new(match_score: i32, mismatch: i32, ins: i32, del: i32) -> io::Result<Self> {
        let p = ScoreParams {
            match_score,
            mismatch,
            ins,
            del,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> io::Result<()> {
        if self.match_score < 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("match weight must be >= 1, got {}", self.match_score),
            ));
        }
        if self.mismatch < 0 || self.ins < 0 || self.del < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "penalty weights must be >= 0",
            ));
        }
        Ok(())
    }
}

/// Narrowest integer width whose range holds every score the DP can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorePrecision {
    Byte,
    Short,
    Word,
}

impl ScorePrecision {
    /// Pick a width for rows of a DP whose scores are bounded by
    /// `max_read_len * match`. `headroom` reserves extra units at the top of
    /// the range (the reverse DP needs one for its augmented cell).
    pub fn select(max_read_len: usize, match_score: i32, headroom: i32) -> Self {
        let bound = max_read_len as i64 * match_score as i64;
        if bound <= i8::MAX as i64 - headroom as i64 {
            ScorePrecision::Byte
        } else if bound <= i16::MAX as i64 - headroom as i64 {
            ScorePrecision::Short
        } else {
            ScorePrecision::Word
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(ScoreParams::new(1, 1, 1, 1).is_ok());
        assert!(ScoreParams::new(0, 1, 1, 1).is_err());
        assert!(ScoreParams::new(1, -1, 1, 1).is_err());
    }

    #[test]
    fn test_precision_ladder() {
        assert_eq!(ScorePrecision::select(100, 1, 0), ScorePrecision::Byte);
        assert_eq!(ScorePrecision::select(127, 1, 0), ScorePrecision::Byte);
        // One unit of headroom pushes the 127 bound over the edge.
        assert_eq!(ScorePrecision::select(127, 1, 1), ScorePrecision::Short);
        assert_eq!(ScorePrecision::select(128, 1, 0), ScorePrecision::Short);
        assert_eq!(ScorePrecision::select(10_000, 3, 0), ScorePrecision::Short);
        assert_eq!(ScorePrecision::select(40_000, 1, 0), ScorePrecision::Word);
    }
}
