#![warn(missing_docs)]

//! Direct mesh editing for the quarry brush kernel.
//!
//! The editor drags vertices, edges, and faces by a delta while keeping
//! the mesh a valid convex polyhedron. A vertex drag proceeds in clipped
//! increments:
//! 1. **Split incident faces** along the drag direction, so only
//!    triangles touch the moving vertex.
//! 2. **Clamp the step** to the nearest plane the vertex would cross.
//! 3. **Apply the step**, rejecting drags that land the vertex on a
//!    non-incident edge, and merging or rejecting vertex collisions.
//! 4. **Merge back** coplanar faces and collinear edges, then continue
//!    with the remaining delta.
//!
//! Edge and face moves decompose into vertex moves against a scratch
//! copy of the mesh and commit only when every step succeeds, so a
//! failed move leaves the input untouched. Grid snapping follows the
//! same speculative pattern.

mod merge;
mod move_vertex;
mod snap;
mod split_move;

pub use move_vertex::move_vertex;
pub use snap::{can_snap_vertices, snap_vertices};
pub use split_move::{move_edge, move_face, split_and_move_edge, split_and_move_face};

/// Outcome of a move operation.
///
/// `handle` names the element at the moved location when it still
/// exists; a vertex that merged into another or an edge that was
/// consumed by a merge reports `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResult<Id> {
    /// Whether the mesh changed.
    pub moved: bool,
    /// Surviving handle for the moved element, if any.
    pub handle: Option<Id>,
}

impl<Id> MoveResult<Id> {
    /// A rejected move that left the mesh untouched.
    pub fn unmoved(handle: Id) -> Self {
        Self {
            moved: false,
            handle: Some(handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quarry_clip::cube_mesh;
    use quarry_math::{Aabb3, Point3, Vec3};
    use quarry_topo::{Mesh, PlainAdapter};

    fn cube32() -> Mesh {
        cube_mesh(&Aabb3::new(
            Point3::new(-32.0, -32.0, -32.0),
            Point3::new(32.0, 32.0, 32.0),
        ))
    }

    fn corner(mesh: &Mesh, x: f64, y: f64, z: f64) -> quarry_topo::VertexId {
        mesh.find_vertex(&Point3::new(x, y, z)).unwrap()
    }

    #[test]
    fn test_zero_delta_is_a_no_op() {
        let mut mesh = cube32();
        let before = mesh.clone();
        let vertex = corner(&mesh, 32.0, 32.0, 32.0);
        let result = move_vertex(
            &mut mesh,
            vertex,
            Vec3::zeros(),
            false,
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(!result.moved);
        assert_eq!(mesh.vertices.len(), before.vertices.len());
        for (id, v) in &before.vertices {
            assert_eq!(mesh.vertices[id].position, v.position);
        }
    }

    #[test]
    fn test_move_vertex_within_top_plane() {
        let mut mesh = cube32();
        let vertex = corner(&mesh, 32.0, 32.0, 32.0);
        let result = move_vertex(
            &mut mesh,
            vertex,
            Vec3::new(-16.0, -16.0, 0.0),
            false,
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(result.moved);
        let moved = mesh.find_vertex(&Point3::new(16.0, 16.0, 32.0));
        assert!(moved.is_some());
        // pulling a corner inward bevels it: the two faces it left become
        // triangles and two slanted triangles take its place
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.edges.len(), 14);
        assert_eq!(mesh.faces.len(), 8);
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_vertex_collision_rejected_without_merge() {
        let mut mesh = cube32();
        let vertex = corner(&mesh, 32.0, 32.0, 32.0);
        let result = move_vertex(
            &mut mesh,
            vertex,
            Vec3::new(0.0, 0.0, -64.0),
            false,
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(!result.moved);
    }

    #[test]
    fn test_vertex_collision_merges() {
        let mut mesh = cube32();
        let vertex = corner(&mesh, 32.0, 32.0, 32.0);
        let result = move_vertex(
            &mut mesh,
            vertex,
            Vec3::new(0.0, 0.0, -64.0),
            true,
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(result.moved);
        assert_eq!(mesh.vertices.len(), 7);
        assert_eq!(mesh.edges.len(), 12);
        assert_eq!(mesh.faces.len(), 7);
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_drag_across_the_face_collapses_the_corner() {
        let mut mesh = cube32();
        let vertex = corner(&mesh, 32.0, 32.0, 32.0);
        let result = move_vertex(
            &mut mesh,
            vertex,
            Vec3::new(-64.0, -64.0, 0.0),
            true,
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(result.moved);
        // the dragged corner flattens into the beveling plane on the way;
        // the result is the cube with one corner tetrahedron sliced off
        assert_eq!(mesh.vertices.len(), 7);
        assert_eq!(mesh.edges.len(), 12);
        assert_eq!(mesh.faces.len(), 7);
        mesh.check_integrity().unwrap();
        let cube_volume = 64.0f64.powi(3);
        let tetra_volume = 64.0f64.powi(3) / 6.0;
        assert_relative_eq!(mesh.volume(), cube_volume - tetra_volume, epsilon = 1e-6);
    }

    #[test]
    fn test_move_edge_lifts_a_ridge() {
        let mut mesh = cube32();
        let edge = mesh
            .find_edge(
                &Point3::new(32.0, -32.0, 32.0),
                &Point3::new(32.0, 32.0, 32.0),
            )
            .unwrap();
        let mut dropped = Vec::new();
        let result = move_edge(
            &mut mesh,
            edge,
            Vec3::new(0.0, 0.0, 16.0),
            &PlainAdapter,
            &mut dropped,
        )
        .unwrap();
        assert!(result.moved);
        assert!(result.handle.is_some());
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.edges.len(), 12);
        assert_eq!(mesh.faces.len(), 6);
        mesh.check_integrity().unwrap();
        assert_eq!(mesh.bounds.max.z, 48.0);
    }

    #[test]
    fn test_failed_move_edge_rolls_back() {
        let mut mesh = cube32();
        let before = mesh.clone();
        let edge = mesh
            .find_edge(
                &Point3::new(-32.0, -32.0, -32.0),
                &Point3::new(32.0, -32.0, -32.0),
            )
            .unwrap();
        // dragging the bottom edge up into the opposite corners collides
        // with existing vertices, which an edge move may not merge
        let result = move_edge(
            &mut mesh,
            edge,
            Vec3::new(0.0, 0.0, 128.0),
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(!result.moved);
        assert_eq!(mesh.vertices.len(), before.vertices.len());
        for (id, v) in &before.vertices {
            assert_eq!(mesh.vertices[id].position, v.position);
        }
        for (id, f) in &before.faces {
            assert_eq!(mesh.faces[id].vertices, f.vertices);
        }
    }

    #[test]
    fn test_move_face_extrudes_the_top() {
        let mut mesh = cube32();
        let top = mesh
            .find_face(&[
                Point3::new(-32.0, -32.0, 32.0),
                Point3::new(-32.0, 32.0, 32.0),
                Point3::new(32.0, 32.0, 32.0),
                Point3::new(32.0, -32.0, 32.0),
            ])
            .unwrap();
        let result = move_face(
            &mut mesh,
            top,
            Vec3::new(0.0, 0.0, 16.0),
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(result.moved);
        assert!(result.handle.is_some());
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.edges.len(), 12);
        assert_eq!(mesh.faces.len(), 6);
        mesh.check_integrity().unwrap();
        assert_eq!(mesh.bounds.max.z, 48.0);
        assert_relative_eq!(mesh.volume(), 64.0 * 64.0 * 80.0, epsilon = 1e-6);
    }

    #[test]
    fn test_split_and_move_edge_raises_an_apex() {
        let mut mesh = cube32();
        let edge = mesh
            .find_edge(
                &Point3::new(-32.0, -32.0, 32.0),
                &Point3::new(32.0, -32.0, 32.0),
            )
            .unwrap();
        let result = split_and_move_edge(
            &mut mesh,
            edge,
            Vec3::new(0.0, -16.0, 16.0),
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(result.moved);
        assert_eq!(mesh.vertices.len(), 9);
        assert!(mesh.find_vertex(&Point3::new(0.0, -48.0, 48.0)).is_some());
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_split_and_move_edge_rejects_indent() {
        let mut mesh = cube32();
        let before_vertices = mesh.vertices.len();
        let edge = mesh
            .find_edge(
                &Point3::new(-32.0, -32.0, 32.0),
                &Point3::new(32.0, -32.0, 32.0),
            )
            .unwrap();
        let result = split_and_move_edge(
            &mut mesh,
            edge,
            Vec3::new(0.0, 0.0, -16.0),
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(!result.moved);
        assert_eq!(mesh.vertices.len(), before_vertices);
    }

    #[test]
    fn test_split_and_move_face_builds_a_pyramid() {
        let mut mesh = cube32();
        let top = mesh
            .find_face(&[
                Point3::new(-32.0, -32.0, 32.0),
                Point3::new(-32.0, 32.0, 32.0),
                Point3::new(32.0, 32.0, 32.0),
                Point3::new(32.0, -32.0, 32.0),
            ])
            .unwrap();
        let result = split_and_move_face(
            &mut mesh,
            top,
            Vec3::new(0.0, 0.0, 16.0),
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(result.moved);
        assert_eq!(mesh.vertices.len(), 9);
        assert_eq!(mesh.faces.len(), 9);
        assert!(mesh.find_vertex(&Point3::new(0.0, 0.0, 48.0)).is_some());
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_split_and_move_face_rejects_indent() {
        let mut mesh = cube32();
        let top = mesh
            .find_face(&[
                Point3::new(-32.0, -32.0, 32.0),
                Point3::new(-32.0, 32.0, 32.0),
                Point3::new(32.0, 32.0, 32.0),
                Point3::new(32.0, -32.0, 32.0),
            ])
            .unwrap();
        let result = split_and_move_face(
            &mut mesh,
            top,
            Vec3::new(0.0, 0.0, -16.0),
            &PlainAdapter,
            &mut Vec::new(),
        )
        .unwrap();
        assert!(!result.moved);
        assert_eq!(mesh.vertices.len(), 8);
    }

    #[test]
    fn test_snap_is_idempotent() {
        let mut mesh = cube32();
        // shear one corner off the lattice slightly
        let vertex = corner(&mesh, 32.0, 32.0, 32.0);
        mesh.vertices[vertex].position = Point3::new(31.6, 32.4, 31.8);
        mesh.refresh_all_planes().unwrap();
        assert!(snap_vertices(&mut mesh, 1));
        let after_first: Vec<Point3> = mesh.vertices.values().map(|v| v.position).collect();
        assert!(snap_vertices(&mut mesh, 1));
        let after_second: Vec<Point3> = mesh.vertices.values().map(|v| v.position).collect();
        assert_eq!(after_first, after_second);
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_snap_to_coarse_grid() {
        let mut mesh = cube32();
        let plane = quarry_math::Plane::new(Vec3::new(1.0, 0.0, 1.0).normalize(), 30.0 / 2f64.sqrt());
        quarry_clip::clip(&mut mesh, &plane, quarry_topo::FaceAnnotation::default());
        assert!(can_snap_vertices(&mesh, 8));
        assert!(snap_vertices(&mut mesh, 8));
        for v in mesh.vertices.values() {
            for c in [v.position.x, v.position.y, v.position.z] {
                assert_eq!(c % 8.0, 0.0);
            }
        }
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_snap_rejects_a_collapsing_slab() {
        let mut mesh = cube_mesh(&Aabb3::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(64.0, 64.0, 0.4),
        ));
        let before = mesh.clone();
        assert!(!can_snap_vertices(&mesh, 1));
        assert!(!snap_vertices(&mut mesh, 1));
        for (id, v) in &before.vertices {
            assert_eq!(mesh.vertices[id].position, v.position);
        }
    }
}
