//! Mesh construction: the canonical cube and half-space intersection.

use quarry_math::{Aabb3, Plane, Point3, Tolerance};
use quarry_topo::{
    AnnotationAdapter, Face, FaceAnnotation, Mesh, PlainAdapter, TopologyError, VertexId,
};
use thiserror::Error;

use crate::clip::{clip, CutResult};

/// Failure to build a mesh from a half-space list.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Fewer than four half-spaces can never bound a solid.
    #[error("at least four half-spaces are needed to bound a solid")]
    TooFewPlanes,

    /// A half-space removed everything built so far.
    #[error("half-space {index} removes the entire brush")]
    Empty {
        /// Index of the offending plane in the input list.
        index: usize,
    },

    /// The finished mesh fails the invariant check.
    #[error("built mesh is invalid: {0}")]
    Degenerate(#[from] TopologyError),
}

/// Corner cycles of the canonical cube, clockwise from outside.
///
/// Corners are indexed by bit pattern: bit 0 selects max x, bit 1 max y,
/// bit 2 max z.
const CUBE_CYCLES: [[usize; 4]; 6] = [
    [0, 2, 6, 4], // x = min
    [1, 5, 7, 3], // x = max
    [0, 4, 5, 1], // y = min
    [2, 3, 7, 6], // y = max
    [0, 1, 3, 2], // z = min
    [4, 6, 7, 5], // z = max
];

fn corner(bounds: &Aabb3, index: usize) -> Point3 {
    Point3::new(
        if index & 1 == 0 { bounds.min.x } else { bounds.max.x },
        if index & 2 == 0 { bounds.min.y } else { bounds.max.y },
        if index & 4 == 0 { bounds.min.z } else { bounds.max.z },
    )
}

/// Build the eight-vertex cuboid filling `bounds`.
///
/// Fixed topology: 8 vertices, 12 edges, 6 quadrilateral faces with
/// outward normals and default axis-aligned annotations.
pub fn cube_mesh(bounds: &Aabb3) -> Mesh {
    let mut mesh = Mesh::new();
    let vertices: Vec<VertexId> = (0..8).map(|i| mesh.add_vertex(corner(bounds, i))).collect();

    let adapter = PlainAdapter;
    // (start, end, edge id) of every edge created so far; a face that
    // walks an existing edge backwards claims its left side.
    let mut created = Vec::with_capacity(12);
    for cycle in &CUBE_CYCLES {
        let corners: Vec<VertexId> = cycle.iter().map(|&i| vertices[i]).collect();
        let positions: Vec<Point3> = cycle.iter().map(|&i| corner(bounds, i)).collect();
        // never None: cube corners are not collinear
        let Some(plane) = Plane::from_points(&positions[0], &positions[1], &positions[2]) else {
            continue;
        };
        let annotation = adapter.default_for(&plane);
        let placeholder_edges = vec![quarry_topo::EdgeId::default(); corners.len()];
        let face_id = mesh.add_face(Face::new(corners.clone(), placeholder_edges, plane, annotation));

        let mut edges = Vec::with_capacity(4);
        for i in 0..4 {
            let a = corners[i];
            let b = corners[(i + 1) % 4];
            if let Some(&(_, _, existing)) =
                created.iter().find(|&&(s, e, _)| s == b && e == a)
            {
                mesh.edges[existing].left = face_id;
                edges.push(existing);
            } else {
                let edge_id = mesh.add_edge(a, b);
                mesh.edges[edge_id].right = face_id;
                created.push((a, b, edge_id));
                edges.push(edge_id);
            }
        }
        mesh.faces[face_id].edges = edges;
    }

    mesh.recompute_bounds();
    mesh
}

/// Intersect a list of half-spaces into a convex mesh.
///
/// Starts from a cube filling `world_bounds` and clips once per plane.
/// Planes that duplicate an earlier plane (within tolerance) or do not
/// cut are silently skipped; a plane that removes everything is an error.
/// Faces of the world cube that no plane replaces survive with default
/// annotations.
pub fn from_planes(
    planes: &[(Plane, FaceAnnotation)],
    world_bounds: &Aabb3,
) -> Result<Mesh, BuildError> {
    if planes.len() < 4 {
        return Err(BuildError::TooFewPlanes);
    }

    let tolerance = Tolerance::DEFAULT;
    let mut mesh = cube_mesh(world_bounds);
    let mut applied: Vec<Plane> = Vec::new();

    for (index, (plane, annotation)) in planes.iter().enumerate() {
        if applied.iter().any(|p| p.eq_within(plane, &tolerance)) {
            continue;
        }
        match clip(&mut mesh, plane, annotation.clone()) {
            CutResult::Empty => return Err(BuildError::Empty { index }),
            CutResult::Redundant => {}
            CutResult::Split { .. } => applied.push(*plane),
        }
    }

    mesh.check_integrity()?;
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_math::Vec3;

    fn bounds32() -> Aabb3 {
        Aabb3::new(
            Point3::new(-32.0, -32.0, -32.0),
            Point3::new(32.0, 32.0, 32.0),
        )
    }

    #[test]
    fn test_cube_counts_and_bounds() {
        let mesh = cube_mesh(&bounds32());
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.edges.len(), 12);
        assert_eq!(mesh.faces.len(), 6);
        assert!(mesh.closed());
        mesh.check_integrity().unwrap();
        assert_eq!(mesh.bounds, bounds32());
        for vertex in mesh.vertices.values() {
            for c in [vertex.position.x, vertex.position.y, vertex.position.z] {
                assert_eq!(c.abs(), 32.0);
            }
        }
    }

    #[test]
    fn test_cube_volume_and_outward_normals() {
        let mesh = cube_mesh(&bounds32());
        assert!((mesh.volume() - 64.0 * 64.0 * 64.0).abs() < 1e-6);
        for face in mesh.faces.values() {
            // plane normal points away from the cube center
            assert!(face.plane.distance > 0.0);
        }
    }

    #[test]
    fn test_from_planes_round_trips_cube_bounds() {
        let cube = cube_mesh(&bounds32());
        let planes: Vec<(Plane, FaceAnnotation)> = cube
            .faces
            .values()
            .map(|f| (f.plane, f.annotation.clone()))
            .collect();
        let rebuilt = from_planes(&planes, &Aabb3::world(4096.0)).unwrap();
        rebuilt.check_integrity().unwrap();
        assert_eq!(rebuilt.bounds, bounds32());
        assert_eq!(rebuilt.vertices.len(), 8);
    }

    #[test]
    fn test_from_planes_skips_duplicates() {
        let cube = cube_mesh(&bounds32());
        let mut planes: Vec<(Plane, FaceAnnotation)> = cube
            .faces
            .values()
            .map(|f| (f.plane, f.annotation.clone()))
            .collect();
        // exact duplicate and a within-epsilon duplicate
        planes.push(planes[0].clone());
        let mut nudged = planes[1].clone();
        nudged.0.distance += 1e-5;
        planes.push(nudged);
        let mesh = from_planes(&planes, &Aabb3::world(4096.0)).unwrap();
        assert_eq!(mesh.faces.len(), 6);
    }

    #[test]
    fn test_from_planes_empty_result() {
        let planes = vec![
            (Plane::new(Vec3::x(), -10.0), FaceAnnotation::default()),
            (Plane::new(-Vec3::x(), -10.0), FaceAnnotation::default()),
            (Plane::new(Vec3::y(), 10.0), FaceAnnotation::default()),
            (Plane::new(Vec3::z(), 10.0), FaceAnnotation::default()),
        ];
        assert!(matches!(
            from_planes(&planes, &Aabb3::world(4096.0)),
            Err(BuildError::Empty { index: 1 })
        ));
    }

    #[test]
    fn test_from_planes_too_few() {
        let planes = vec![
            (Plane::new(Vec3::x(), 1.0), FaceAnnotation::default()),
            (Plane::new(Vec3::y(), 1.0), FaceAnnotation::default()),
        ];
        assert!(matches!(
            from_planes(&planes, &Aabb3::world(4096.0)),
            Err(BuildError::TooFewPlanes)
        ));
    }

    #[test]
    fn test_wedge_from_planes() {
        let planes = vec![
            (Plane::new(-Vec3::x(), 0.0), FaceAnnotation::default()),
            (Plane::new(-Vec3::y(), 0.0), FaceAnnotation::default()),
            (Plane::new(-Vec3::z(), 0.0), FaceAnnotation::default()),
            (
                Plane::new(Vec3::new(1.0, 1.0, 1.0).normalize(), 64.0 / 3f64.sqrt()),
                FaceAnnotation::with_material("slope"),
            ),
        ];
        let mesh = from_planes(&planes, &Aabb3::world(4096.0)).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.faces.len(), 4);
        mesh.check_integrity().unwrap();
        // tetrahedron x,y,z >= 0, x+y+z <= 64
        assert!((mesh.volume() - 64.0f64.powi(3) / 6.0).abs() < 1e-6);
    }
}
