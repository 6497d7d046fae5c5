//! Exact nearest-neighbor search over question vectors.
//!
//! A bucketed k-d tree: internal nodes split on the axis with the widest
//! spread at the median point, leaves hold up to `leaf_size` points and are
//! scanned linearly. The tree is immutable once built; the answer store
//! rebuilds it wholesale after every corpus mutation.
//!
//! # Algorithm Details
//! - Distance metric: Euclidean
//! - Build: O(n log n) average (median selection per level)
//! - Query: O(log n) average, exact
//! - Ties: the lowest insertion index wins, independent of tree shape
//! - Precision: squared distances accumulate in f64, which no finite f32
//!   input can overflow; reported distances are narrowed back to f32 and
//!   saturate to infinity only past `f32::MAX`

use crate::vector::types::{VectorDimension, VectorError};
use rayon::prelude::*;

/// Default number of points per leaf bucket.
pub const DEFAULT_LEAF_SIZE: usize = 16;

/// Result of a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Euclidean distance from the query to the stored vector.
    pub distance: f32,

    /// Position of the stored vector in the sequence the tree was built from.
    pub index: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        start: usize,
        end: usize,
    },
    Split {
        axis: usize,
        value: f32,
        left: usize,
        right: usize,
    },
}

/// Immutable k-d tree over a set of equal-width vectors.
#[derive(Debug, Clone)]
pub struct KdTree {
    /// Row-major copy of the indexed vectors, in insertion order.
    points: Vec<f32>,

    /// Permutation of point positions; leaves own contiguous ranges of it.
    order: Vec<usize>,

    nodes: Vec<Node>,
    dimension: VectorDimension,
    leaf_size: usize,
}

impl KdTree {
    /// Builds a tree over `vectors`.
    ///
    /// # Errors
    /// Returns an error if `vectors` is empty or the vectors disagree in width.
    pub fn build<V: AsRef<[f32]>>(vectors: &[V], leaf_size: usize) -> Result<Self, VectorError> {
        let first = vectors.first().ok_or(VectorError::InvalidDimension {
            dimension: 0,
            reason: "Cannot build a spatial index over zero vectors",
        })?;
        let dimension = VectorDimension::new(first.as_ref().len())?;

        let mut points = Vec::with_capacity(vectors.len() * dimension.get());
        for vector in vectors {
            dimension.validate_vector(vector.as_ref())?;
            points.extend_from_slice(vector.as_ref());
        }

        let mut tree = Self {
            points,
            order: (0..vectors.len()).collect(),
            nodes: Vec::new(),
            dimension,
            leaf_size: leaf_size.max(1),
        };
        tree.build_node(0, vectors.len());
        Ok(tree)
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always false for a built tree; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// Finds the stored vector closest to `query`.
    ///
    /// Among vectors at exactly the same distance, the one inserted first
    /// is returned.
    pub fn nearest(&self, query: &[f32]) -> Result<Neighbor, VectorError> {
        self.dimension.validate_vector(query)?;

        let mut best = Best {
            distance_sq: f64::INFINITY,
            index: usize::MAX,
        };
        self.search(0, query, &mut best);

        Ok(Neighbor {
            distance: best.distance_sq.sqrt() as f32,
            index: best.index,
        })
    }

    /// Returns the vector stored at `index`.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<&[f32]> {
        let dim = self.dimension.get();
        self.points.get(index * dim..(index + 1) * dim)
    }

    fn coord(&self, index: usize, axis: usize) -> f32 {
        self.points[index * self.dimension.get() + axis]
    }

    /// Recursively builds the subtree over `order[start..end]` and returns its node id.
    fn build_node(&mut self, start: usize, end: usize) -> usize {
        let id = self.nodes.len();
        if end - start <= self.leaf_size {
            self.nodes.push(Node::Leaf { start, end });
            return id;
        }

        let axis = self.widest_axis(start, end);
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for &i in &self.order[start..end] {
            let v = self.coord(i, axis);
            lo = lo.min(v);
            hi = hi.max(v);
        }
        // All points coincide: splitting cannot separate them.
        if hi - lo <= 0.0 {
            self.nodes.push(Node::Leaf { start, end });
            return id;
        }

        let mid = start + (end - start) / 2;
        {
            let dim = self.dimension.get();
            let points = &self.points;
            self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
                points[a * dim + axis].total_cmp(&points[b * dim + axis])
            });
        }
        let value = self.coord(self.order[mid], axis);

        // Reserve the slot, then fill it once both children exist.
        self.nodes.push(Node::Leaf { start, end });
        let left = self.build_node(start, mid);
        let right = self.build_node(mid, end);
        self.nodes[id] = Node::Split {
            axis,
            value,
            left,
            right,
        };
        id
    }

    fn widest_axis(&self, start: usize, end: usize) -> usize {
        let dim = self.dimension.get();
        let mut best_axis = 0;
        let mut best_spread = f32::NEG_INFINITY;
        for axis in 0..dim {
            let mut lo = f32::INFINITY;
            let mut hi = f32::NEG_INFINITY;
            for &i in &self.order[start..end] {
                let v = self.coord(i, axis);
                lo = lo.min(v);
                hi = hi.max(v);
            }
            if hi - lo > best_spread {
                best_spread = hi - lo;
                best_axis = axis;
            }
        }
        best_axis
    }

    fn search(&self, node: usize, query: &[f32], best: &mut Best) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for &index in &self.order[start..end] {
                    let point = &self.points
                        [index * self.dimension.get()..(index + 1) * self.dimension.get()];
                    best.offer(squared_distance(query, point), index);
                }
            }
            Node::Split {
                axis,
                value,
                left,
                right,
            } => {
                let diff = f64::from(query[axis]) - f64::from(value);
                let (near, far) = if diff < 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };
                self.search(near, query, best);
                // `<=` keeps equidistant points reachable so ties resolve by index.
                if diff * diff <= best.distance_sq {
                    self.search(far, query, best);
                }
            }
        }
    }
}

struct Best {
    distance_sq: f64,
    index: usize,
}

impl Best {
    fn offer(&mut self, distance_sq: f64, index: usize) {
        if distance_sq < self.distance_sq
            || (distance_sq == self.distance_sq && index < self.index)
        {
            self.distance_sq = distance_sq;
            self.index = index;
        }
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

/// Euclidean distance between two vectors of equal width.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    squared_distance(a, b).sqrt() as f32
}

/// Largest Euclidean distance between any two vectors in `vectors`.
///
/// Returns 0.0 for fewer than two vectors. Exact, O(n² · d), parallelised
/// over the outer loop.
pub fn max_pairwise_distance<V: AsRef<[f32]> + Sync>(vectors: &[V]) -> f32 {
    if vectors.len() < 2 {
        return 0.0;
    }

    (0..vectors.len())
        .into_par_iter()
        .map(|i| {
            let a = vectors[i].as_ref();
            vectors[i + 1..]
                .iter()
                .map(|b| squared_distance(a, b.as_ref()))
                .fold(0.0f64, f64::max)
        })
        .reduce(|| 0.0f64, f64::max)
        .sqrt() as f32
}
