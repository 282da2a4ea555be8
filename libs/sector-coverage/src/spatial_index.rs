//! # Spatial Index for Vertex Queries
//!
//! Immutable R-tree over a vertex set, used as the broad phase of the
//! intersection engine.
//!
//! ## Features
//!
//! - **Bulk loading**: The tree is packed once from the full vertex set
//! - **Box queries**: Find vertices inside an axis-aligned box
//!
//! ## Example
//!
//! ```rust
//! use geo::{coord, Rect};
//! use sector_coverage::spatial_index::SpatialIndex;
//! use sector_coverage::vertices::{Vertex, VertexId};
//!
//! let index = SpatialIndex::build([Vertex { id: VertexId(0), coord: coord! { x: 1.0, y: 1.0 } }]);
//! let hits = index.query(&Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 }));
//! assert_eq!(hits.len(), 1);
//! ```

use geo::Rect;
use rstar::{RTree, RTreeObject, AABB};

use crate::vertices::{Vertex, VertexSet};

/// Tree entry wrapping one vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedVertex(Vertex);

impl RTreeObject for IndexedVertex {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.0.coord.x, self.0.coord.y])
    }
}

/// Read-only spatial index over vertices.
///
/// There are no mutation operations; build a new index to reflect a
/// changed vertex set.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: RTree<IndexedVertex>,
}

impl SpatialIndex {
    /// Creates an index from vertices.
    ///
    /// # Arguments
    ///
    /// * `vertices` - The vertices to index
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let index = SpatialIndex::build(vertex_set.iter().copied());
    /// ```
    pub fn build(vertices: impl IntoIterator<Item = Vertex>) -> Self {
        let entries: Vec<IndexedVertex> = vertices.into_iter().map(IndexedVertex).collect();
        let tree = RTree::bulk_load(entries);
        tracing::debug!(vertices = tree.size(), "Spatial index built");
        Self { tree }
    }

    pub fn from_vertex_set(vertices: &VertexSet) -> Self {
        Self::build(vertices.iter().copied())
    }

    /// Queries vertices inside an axis-aligned box.
    ///
    /// Points on the box border are included.
    ///
    /// # Arguments
    ///
    /// * `bbox` - Query box
    ///
    /// # Returns
    ///
    /// The vertices inside the box, ordered by identifier.
    pub fn query(&self, bbox: &Rect<f64>) -> Vec<&Vertex> {
        let envelope = AABB::from_corners([bbox.min().x, bbox.min().y], [bbox.max().x, bbox.max().y]);
        let mut hits: Vec<&Vertex> = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|entry| &entry.0)
            .collect();
        hits.sort_unstable_by_key(|vertex| vertex.id);
        hits
    }

    /// Returns the number of indexed vertices.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertices::VertexId;
    use geo::coord;

    fn lattice() -> SpatialIndex {
        let mut vertices = Vec::new();
        for i in 0..5u32 {
            for j in 0..5u32 {
                vertices.push(Vertex {
                    id: VertexId(u64::from(i * 5 + j)),
                    coord: coord! { x: f64::from(i) * 100.0, y: f64::from(j) * 100.0 },
                });
            }
        }
        SpatialIndex::build(vertices)
    }

    #[test]
    fn test_index_creation() {
        let index = lattice();
        assert_eq!(index.len(), 25);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_query_box() {
        let index = lattice();
        let all = index.query(&Rect::new(coord! { x: -1.0, y: -1.0 }, coord! { x: 401.0, y: 401.0 }));
        assert_eq!(all.len(), 25);
    }

    #[test]
    fn test_query_box_partial_is_inclusive() {
        let index = lattice();
        let hits = index.query(&Rect::new(coord! { x: 100.0, y: 100.0 }, coord! { x: 200.0, y: 200.0 }));
        let ids: Vec<u64> = hits.iter().map(|v| v.id.0).collect();
        assert_eq!(ids, vec![6, 7, 11, 12]);
    }

    #[test]
    fn test_query_box_miss() {
        let index = lattice();
        let hits = index.query(&Rect::new(coord! { x: 1000.0, y: 1000.0 }, coord! { x: 1100.0, y: 1100.0 }));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::build(Vec::new());
        assert!(index.is_empty());
        let hits = index.query(&Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }));
        assert!(hits.is_empty());
    }
}
