//! Ranking constants and normalization options shared by indexing and querying.

use serde::{Deserialize, Serialize};

/// BM25 term-frequency saturation.
pub const BM25_K1: f64 = 1.5;
/// BM25 document-length normalization.
pub const BM25_B: f64 = 0.75;

/// Decimal places kept for stored TF and IDF values.
pub const SCORE_DECIMALS: i32 = 4;

/// Schema version of the persisted index bundle. Bump on any layout change.
pub const INDEX_FORMAT_VERSION: u32 = 1;

pub const DEFAULT_TOP_N: usize = 20;

/// Knobs of the text normalization pipeline.
///
/// Stored inside the index bundle so that queries against a loaded index are
/// normalized exactly like the documents were.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerOptions {
    /// Drop tokens of length <= 1 before stemming.
    pub drop_short_tokens: bool,
}

/// Round half away from zero to [`SCORE_DECIMALS`] places.
pub fn round_score(value: f64) -> f64 {
    let scale = 10f64.powi(SCORE_DECIMALS);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_four_places() {
        assert_eq!(round_score(0.57735026), 0.5774);
        assert_eq!(round_score(0.405465), 0.4055);
        assert_eq!(round_score(0.0), 0.0);
    }
}
