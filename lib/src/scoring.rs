//! Mini-batch scoring through a hosted endpoint.
//!
//! Rows are split into `n / batch_size + 1` contiguous chunks whose sizes
//! differ by at most one, larger chunks first. Chunks are sent strictly in
//! order and the text replies concatenated, so `output[i]` belongs to input
//! row `i`.

use crate::dataset::FeatureMatrix;
use crate::error::{ChurnError, Result};
use crate::payload::{self, CONTENT_TYPE};
use crate::remote::InferenceEndpoint;
use std::ops::Range;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Row ranges for `n` rows at nominal `batch_size`.
///
/// Empty input yields no chunks.
pub fn chunk_bounds(n: usize, batch_size: usize) -> Result<Vec<Range<usize>>> {
    if batch_size == 0 {
        return Err(ChurnError::InvalidParameter(
            "batch size must be positive".to_string(),
        ));
    }
    Ok(ChunkIter::new(n, batch_size).collect())
}

/// Iterator over contiguous chunk ranges.
///
/// Yields `k = n / batch_size + 1` ranges (none when `n == 0`); the first
/// `n % k` have `n / k + 1` rows and the rest `n / k`.
#[derive(Clone, Debug)]
pub struct ChunkIter {
    /// Total rows.
    n: usize,
    /// Number of chunks.
    k: usize,
    /// Index of the next chunk to yield.
    current: usize,
    /// Start row of the next chunk.
    start: usize,
}

impl ChunkIter {
    /// `batch_size` must be non-zero.
    pub fn new(n: usize, batch_size: usize) -> Self {
        let k = if n == 0 { 0 } else { n / batch_size.max(1) + 1 };
        Self {
            n,
            k,
            current: 0,
            start: 0,
        }
    }

    pub fn n_chunks(&self) -> usize {
        self.k
    }
}

impl Iterator for ChunkIter {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.current >= self.k {
            return None;
        }
        let len = self.n / self.k + usize::from(self.current < self.n % self.k);
        let range = self.start..self.start + len;
        self.start = range.end;
        self.current += 1;
        Some(range)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.k - self.current;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ChunkIter {}

/// Scores feature rows batch by batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchScorer {
    batch_size: usize,
}

impl Default for BatchScorer {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl BatchScorer {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(ChurnError::InvalidParameter(
                "batch size must be positive".to_string(),
            ));
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// One probability per row of `features`, in row order.
    ///
    /// `features` must not carry the label. The first failing request aborts
    /// the pass; a reply count that does not match the row count is a
    /// [`ChurnError::MalformedResponse`].
    pub fn score<E: InferenceEndpoint + ?Sized>(
        &self,
        endpoint: &E,
        features: &FeatureMatrix,
    ) -> Result<Vec<f64>> {
        if features.has_label() {
            return Err(ChurnError::InvalidParameter(
                "strip the label column before scoring".to_string(),
            ));
        }

        let chunks = ChunkIter::new(features.n_rows(), self.batch_size);
        tracing::info!(
            rows = features.n_rows(),
            chunks = chunks.n_chunks(),
            batch_size = self.batch_size,
            "scoring"
        );

        let mut joined = String::new();
        for (i, range) in chunks.enumerate() {
            let rows = range.len();
            // batch_size 1 leaves a trailing empty chunk
            if rows == 0 {
                continue;
            }
            let body = payload::to_csv_bytes(&features.slice_rows(range))?;
            let reply = endpoint.invoke(CONTENT_TYPE, &body)?;
            tracing::debug!(chunk = i, rows, bytes = body.len(), "scored chunk");
            payload::join_predictions(&mut joined, &reply);
        }

        let predictions = payload::parse_predictions(&joined)?;
        if predictions.len() != features.n_rows() {
            return Err(ChurnError::MalformedResponse(format!(
                "expected {} predictions, got {}",
                features.n_rows(),
                predictions.len()
            )));
        }
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::cell::RefCell;

    /// Echoes the first feature of every row and records request sizes.
    #[derive(Default)]
    struct EchoEndpoint {
        requests: RefCell<Vec<usize>>,
        fail_on: Option<usize>,
        drop_last: bool,
    }

    impl InferenceEndpoint for EchoEndpoint {
        fn invoke(&self, content_type: &str, body: &[u8]) -> Result<String> {
            assert_eq!(content_type, "text/csv");
            let text = std::str::from_utf8(body).unwrap();
            let mut values: Vec<&str> = text
                .lines()
                .map(|line| line.split(',').next().unwrap())
                .collect();
            let mut requests = self.requests.borrow_mut();
            if self.fail_on == Some(requests.len()) {
                return Err(ChurnError::Remote {
                    status: 500,
                    message: "boom".into(),
                });
            }
            requests.push(values.len());
            if self.drop_last {
                values.pop();
            }
            Ok(values.join("\n"))
        }
    }

    fn features(n: usize) -> FeatureMatrix {
        let data = Array2::from_shape_fn((n, 3), |(i, j)| (i * 10 + j) as f64);
        FeatureMatrix::new(data, vec!["a".into(), "b".into(), "c".into()], false).unwrap()
    }

    fn sizes(n: usize, b: usize) -> Vec<usize> {
        chunk_bounds(n, b).unwrap().iter().map(|r| r.len()).collect()
    }

    #[test]
    fn test_chunk_sizes_follow_divisor() {
        assert_eq!(sizes(333, 500), vec![333]);
        assert_eq!(sizes(1000, 500), vec![334, 333, 333]);
        assert_eq!(sizes(500, 500), vec![250, 250]);
        assert_eq!(sizes(7, 2), vec![2, 2, 2, 1]);
        assert!(sizes(0, 500).is_empty());
        assert!(chunk_bounds(10, 0).is_err());
    }

    #[test]
    fn test_chunks_cover_rows_contiguously() {
        for (n, b) in [(1, 1), (17, 4), (999, 500), (3333, 500)] {
            let bounds = chunk_bounds(n, b).unwrap();
            assert_eq!(bounds.len(), n / b + 1);
            assert_eq!(bounds.first().unwrap().start, 0);
            assert_eq!(bounds.last().unwrap().end, n);
            for pair in bounds.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
                assert!(pair[0].len() >= pair[1].len());
            }
        }
    }

    #[test]
    fn test_score_one_request_for_small_input() {
        let endpoint = EchoEndpoint::default();
        let scores = BatchScorer::default().score(&endpoint, &features(333)).unwrap();
        assert_eq!(scores.len(), 333);
        assert_eq!(*endpoint.requests.borrow(), vec![333]);
    }

    #[test]
    fn test_score_preserves_order() {
        let endpoint = EchoEndpoint::default();
        let scores = BatchScorer::new(4).unwrap().score(&endpoint, &features(17)).unwrap();
        let expected: Vec<f64> = (0..17).map(|i| (i * 10) as f64).collect();
        assert_eq!(scores, expected);
        assert_eq!(*endpoint.requests.borrow(), vec![4, 4, 3, 3, 3]);
    }

    #[test]
    fn test_score_empty_input() {
        let endpoint = EchoEndpoint::default();
        let scores = BatchScorer::default().score(&endpoint, &features(0)).unwrap();
        assert!(scores.is_empty());
        assert!(endpoint.requests.borrow().is_empty());
    }

    #[test]
    fn test_score_aborts_on_failure() {
        let endpoint = EchoEndpoint {
            fail_on: Some(1),
            ..EchoEndpoint::default()
        };
        let result = BatchScorer::new(2).unwrap().score(&endpoint, &features(6));
        assert!(matches!(result, Err(ChurnError::Remote { status: 500, .. })));
        assert_eq!(endpoint.requests.borrow().len(), 1);
    }

    #[test]
    fn test_score_detects_short_reply() {
        let endpoint = EchoEndpoint {
            drop_last: true,
            ..EchoEndpoint::default()
        };
        let result = BatchScorer::default().score(&endpoint, &features(5));
        assert!(matches!(result, Err(ChurnError::MalformedResponse(_))));
    }

    #[test]
    fn test_score_rejects_labelled_matrix() {
        let labelled =
            FeatureMatrix::new(Array2::zeros((2, 2)), vec!["y".into(), "x".into()], true).unwrap();
        let endpoint = EchoEndpoint::default();
        assert!(BatchScorer::default().score(&endpoint, &labelled).is_err());
        assert!(BatchScorer::new(0).is_err());
    }
}
