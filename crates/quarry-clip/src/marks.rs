//! Pass-local classification marks for clipping.
//!
//! Marks never live on mesh elements. Each clip pass allocates secondary
//! tables keyed by handle and throws them away with the pass, so there is
//! no "unknown" state to reset and no stale marks after an early return.

use quarry_math::{Plane, PointStatus};
use quarry_topo::{Edge, EdgeId, Mesh, VertexId};
use slotmap::SecondaryMap;

/// How a vertex relates to the cutting plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexMark {
    /// Below the plane; survives the cut.
    Keep,
    /// Above the plane; removed by the cut.
    Drop,
    /// On the plane within epsilon; survives, side decided by its faces.
    Undecided,
    /// Created by this pass at an edge crossing.
    New,
}

/// How an edge relates to the cutting plane, reduced from its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMark {
    /// Both endpoints survive.
    Keep,
    /// No endpoint survives.
    Drop,
    /// One endpoint on each side; the edge gets a crossing vertex.
    Split,
    /// Both endpoints on the plane.
    Undecided,
    /// Created by this pass as a seam edge.
    New,
}

/// The mark tables for one clip pass.
#[derive(Debug, Default)]
pub(crate) struct MarkTables {
    pub vertices: SecondaryMap<VertexId, VertexMark>,
    pub edges: SecondaryMap<EdgeId, EdgeMark>,
}

impl MarkTables {
    /// Classify every vertex, returning `(keep, drop)` counts.
    pub fn classify_vertices(&mut self, mesh: &Mesh, plane: &Plane) -> (usize, usize) {
        let mut keep = 0;
        let mut drop = 0;
        for (id, vertex) in &mesh.vertices {
            let mark = match plane.point_status(&vertex.position) {
                PointStatus::Above => {
                    drop += 1;
                    VertexMark::Drop
                }
                PointStatus::Below => {
                    keep += 1;
                    VertexMark::Keep
                }
                PointStatus::Inside => VertexMark::Undecided,
            };
            self.vertices.insert(id, mark);
        }
        (keep, drop)
    }

    /// Reduce the endpoint marks of `edge` to an edge mark.
    pub fn reduce_edge(&self, edge: &Edge) -> EdgeMark {
        let mut keep = 0;
        let mut drop = 0;
        for v in [edge.start, edge.end] {
            match self.vertices.get(v) {
                Some(VertexMark::Keep) => keep += 1,
                Some(VertexMark::Drop) => drop += 1,
                _ => {}
            }
        }
        if keep == 1 && drop == 1 {
            EdgeMark::Split
        } else if keep > 0 {
            EdgeMark::Keep
        } else if drop > 0 {
            EdgeMark::Drop
        } else {
            EdgeMark::Undecided
        }
    }

    /// Whether the vertex carries the `Keep` mark.
    pub fn keeps(&self, vertex: VertexId) -> bool {
        matches!(self.vertices.get(vertex), Some(VertexMark::Keep))
    }
}
