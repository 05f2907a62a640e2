use std::collections::BinaryHeap;

use tracing::debug;

use crate::embed::Embedding;
use crate::index::{Neighbor, VectorIndex};
use crate::{Error, Result};

/// Brute-force index over a contiguous row-major matrix.
///
/// Every search scans all vectors, so results are exact and independent of
/// build order beyond the position tie-break.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from all vectors at once.
    ///
    /// Zero vectors is accepted; searching the result fails with
    /// [`Error::EmptyIndex`]. All vectors must share one non-zero dimension.
    pub fn build(vectors: &[Embedding]) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Ok(Self::default());
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(Error::InvalidArgument(
                "cannot index zero-dimensional vectors".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(dimension * vectors.len());
        for vector in vectors {
            if vector.len() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        debug!(vectors = vectors.len(), dimension, "built flat index");
        Ok(Self { dimension, data })
    }

    /// The stored vector at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if self.dimension == 0 {
            return None;
        }
        self.data.chunks_exact(self.dimension).nth(position)
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".to_string()));
        }
        if self.is_empty() {
            return Err(Error::EmptyIndex);
        }
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        // Max-heap of the best k seen so far; the root is the worst of them.
        let k = k.min(self.len());
        let mut best = BinaryHeap::with_capacity(k + 1);

        for (position, vector) in self.data.chunks_exact(self.dimension).enumerate() {
            best.push(Neighbor {
                position,
                distance: squared_l2(query, vector),
            });
            if best.len() > k {
                best.pop();
            }
        }

        Ok(best.into_sorted_vec())
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Squared Euclidean distance between two vectors of equal length.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
