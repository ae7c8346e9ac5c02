#![warn(missing_docs)]

//! Polyhedral mesh topology for the quarry brush kernel.
//!
//! A brush is a convex polyhedron stored as three arena pools — vertices,
//! edges, faces — with stable typed handles. All cross-references between
//! the pools are handles, never owning pointers, so the graph has no
//! ownership cycles and cloning a mesh is a plain deep copy that keeps
//! every handle valid.
//!
//! Invariants the mesh maintains between public operations:
//! 1. every edge has two distinct incident faces,
//! 2. each face's vertex and edge cycles agree index for index,
//! 3. every vertex lies on or behind every face plane,
//! 4. no coincident vertices, no degenerate faces, non-zero volume,
//! 5. Euler's formula `V − E + F = 2`.
//!
//! [`Mesh::check_integrity`] verifies all five; mutating passes in the
//! clipper and editor crates restore them before returning.

mod annotation;
mod mesh;

pub use annotation::{AnnotationAdapter, FaceAnnotation, PlainAdapter};
pub use mesh::{Mesh, TopologyError};

use quarry_math::{Plane, Point3};
use slotmap::new_key_type;

new_key_type! {
    /// Stable handle to a vertex within one mesh.
    pub struct VertexId;
    /// Stable handle to an edge within one mesh.
    pub struct EdgeId;
    /// Stable handle to a face within one mesh.
    pub struct FaceId;
}

/// A corner of the polyhedron.
///
/// Classification marks used during clipping are pass-local tables in the
/// clipper, not fields here, so no failed pass can leave stale state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in world space.
    pub position: Point3,
}

impl Vertex {
    /// Create a vertex at `position`.
    pub fn new(position: Point3) -> Self {
        Self { position }
    }
}

/// An oriented edge between two vertices, bordered by two faces.
///
/// The right face walks the edge from `start` to `end`; the left face
/// walks it backwards. A null face handle marks a side that a clip pass
/// has not sealed yet; closed meshes have none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// First endpoint.
    pub start: VertexId,
    /// Second endpoint.
    pub end: VertexId,
    /// Face to the left when walking `start → end`.
    pub left: FaceId,
    /// Face to the right when walking `start → end`.
    pub right: FaceId,
}

impl Edge {
    /// Create an edge between two vertices with no incident faces yet.
    pub fn new(start: VertexId, end: VertexId) -> Self {
        Self {
            start,
            end,
            left: FaceId::default(),
            right: FaceId::default(),
        }
    }

    /// The endpoint this edge starts at in `face`'s cycle order.
    #[inline]
    pub fn start_for(&self, face: FaceId) -> VertexId {
        if self.left == face {
            self.end
        } else {
            debug_assert_eq!(self.right, face);
            self.start
        }
    }

    /// The endpoint this edge ends at in `face`'s cycle order.
    #[inline]
    pub fn end_for(&self, face: FaceId) -> VertexId {
        if self.left == face {
            self.start
        } else {
            debug_assert_eq!(self.right, face);
            self.end
        }
    }

    /// The incident face other than `face`.
    #[inline]
    pub fn other_face(&self, face: FaceId) -> FaceId {
        if self.left == face {
            self.right
        } else {
            self.left
        }
    }

    /// Whether `vertex` is one of the endpoints.
    #[inline]
    pub fn touches(&self, vertex: VertexId) -> bool {
        self.start == vertex || self.end == vertex
    }

    /// Swap one incident face for another.
    pub fn replace_face(&mut self, from: FaceId, to: FaceId) {
        if self.left == from {
            self.left = to;
        } else {
            debug_assert_eq!(self.right, from);
            self.right = to;
        }
    }

    /// Swap one endpoint for another.
    pub fn replace_vertex(&mut self, from: VertexId, to: VertexId) {
        if self.start == from {
            self.start = to;
        } else {
            debug_assert_eq!(self.end, from);
            self.end = to;
        }
    }

    /// Reverse the edge in place: endpoints and incident faces swap.
    ///
    /// The surrounding cycles stay consistent because both faces'
    /// traversal directions are recomputed from the stored orientation.
    pub fn flip(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
        std::mem::swap(&mut self.left, &mut self.right);
    }
}

/// A convex polygon on the boundary of the polyhedron.
///
/// `vertices` is the corner cycle in clockwise order seen from outside;
/// `edges[i]` connects `vertices[i]` to `vertices[(i + 1) % n]`. The
/// plane's normal points out of the solid.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Corner cycle, clockwise from outside.
    pub vertices: Vec<VertexId>,
    /// Edge cycle, aligned with `vertices`.
    pub edges: Vec<EdgeId>,
    /// Supporting plane with outward normal.
    pub plane: Plane,
    /// Host-owned material data carried through geometric operations.
    pub annotation: FaceAnnotation,
}

impl Face {
    /// Create a face from aligned cycles, a plane, and an annotation.
    pub fn new(
        vertices: Vec<VertexId>,
        edges: Vec<EdgeId>,
        plane: Plane,
        annotation: FaceAnnotation,
    ) -> Self {
        debug_assert_eq!(vertices.len(), edges.len());
        Self {
            vertices,
            edges,
            plane,
            annotation,
        }
    }

    /// Number of sides.
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the face has no sides (never true for a sealed mesh).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
