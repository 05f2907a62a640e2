//! Exact nearest-neighbor vector indexes
//!
//! An index is built once from the full ordered set of chunk vectors and is
//! immutable afterwards. Position `i` in the index is the `i`-th vector it was
//! built from, which is also chunk `i` of the document.
//!
//! # Usage
//!
//! ```ignore
//! use docqa_lib::index::{FlatIndex, VectorIndex};
//!
//! let index = FlatIndex::build(&embeddings)?;
//! let nearest = index.search(&query_embedding, 3)?;
//! ```

use std::cmp::Ordering;

use crate::Result;

/// A search hit: index position and its distance to the query
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    /// Position of the matched vector in build order
    pub position: usize,
    /// Squared Euclidean distance to the query (lower is closer)
    pub distance: f32,
}

/// Orders by distance, then by position, so equal distances rank the earlier
/// vector first and results are reproducible.
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.position.cmp(&other.position))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

/// Trait for exact k-nearest-neighbor indexes
pub trait VectorIndex: Send + Sync {
    /// Find the vectors closest to `query`
    ///
    /// # Arguments
    /// * `query` - The query vector, same dimension as the indexed vectors
    /// * `k` - Number of results to return; must be at least 1
    ///
    /// # Returns
    /// `min(k, len())` neighbors sorted nearest first
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Get total number of indexed vectors
    fn len(&self) -> usize;

    /// Check if index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of the indexed vectors (0 for an empty index)
    fn dimension(&self) -> usize;
}

mod flat;

pub use flat::*;
