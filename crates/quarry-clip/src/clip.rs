//! The half-space clipper.

use quarry_math::{snap_point, Plane};
use quarry_topo::{EdgeId, Face, FaceAnnotation, FaceId, Mesh, VertexId};

use crate::marks::{EdgeMark, MarkTables, VertexMark};

/// Outcome of clipping a mesh with a plane.
#[derive(Debug)]
pub enum CutResult {
    /// The plane does not cut the mesh; nothing changed.
    Redundant,
    /// The plane would remove the entire mesh; nothing changed.
    Empty,
    /// The mesh was reduced to the negative half-space and sealed.
    Split {
        /// The face created on the cutting plane.
        face: FaceId,
        /// Annotations of the faces the cut removed.
        dropped: Vec<FaceAnnotation>,
    },
}

/// What becomes of one face during a clip pass.
enum FaceFate {
    Keep,
    /// Kept, but one of its edges lies on the plane and seeds the seam.
    KeepWithSeam(EdgeId),
    Drop,
    /// Cut in two; the new seam edge is handed back.
    Split(EdgeId),
}

/// Clip `mesh` to the negative half-space of `plane`.
///
/// On a split, the new face on the plane carries `annotation` and the
/// annotations of removed faces are returned for the host to dispose of.
/// `Redundant` and `Empty` leave the mesh untouched.
///
/// The mesh must satisfy the crate-level invariants on entry; it satisfies
/// them again on return.
pub fn clip(mesh: &mut Mesh, plane: &Plane, annotation: FaceAnnotation) -> CutResult {
    let mut marks = MarkTables::default();

    // 1. mark vertices, with the two short circuits
    let (keep, drop) = marks.classify_vertices(mesh, plane);
    if drop == 0 {
        return CutResult::Redundant;
    }
    if keep == 0 {
        return CutResult::Empty;
    }

    // 2. mark edges, splitting the ones that straddle the plane
    let edge_ids: Vec<EdgeId> = mesh.edges.keys().collect();
    for edge_id in edge_ids {
        let mark = marks.reduce_edge(&mesh.edges[edge_id]);
        if mark == EdgeMark::Split {
            let new_vertex = split_edge(mesh, &marks, edge_id, plane);
            marks.vertices.insert(new_vertex, VertexMark::New);
        }
        marks.edges.insert(edge_id, mark);
    }

    // 3. keep, drop, or split every face; collect the seam
    let mut dropped = Vec::new();
    let mut seam: Vec<EdgeId> = Vec::new();
    let face_ids: Vec<FaceId> = mesh.faces.keys().collect();
    for face_id in face_ids {
        match split_face(mesh, &mut marks, face_id) {
            FaceFate::Keep => {}
            FaceFate::KeepWithSeam(edge_id) => {
                // The whole edge lies on the plane. Reorient it so the kept
                // face stays on its right; the seal pass claims the left.
                if mesh.edges[edge_id].right != face_id {
                    mesh.edges[edge_id].flip();
                }
                seam.push(edge_id);
            }
            FaceFate::Drop => {
                if let Some(face) = mesh.faces.remove(face_id) {
                    dropped.push(face.annotation);
                }
            }
            FaceFate::Split(seam_edge) => seam.push(seam_edge),
        }
    }

    // 4. sort the seam edges into a cycle and seal the mesh with a new face
    sort_seam(mesh, &mut seam);
    let new_face = mesh.add_face(Face::new(Vec::new(), Vec::new(), *plane, annotation));
    let mut cycle = Vec::with_capacity(seam.len());
    for &edge_id in &seam {
        mesh.edges[edge_id].left = new_face;
        cycle.push(mesh.edges[edge_id].end);
    }
    mesh.faces[new_face].vertices = cycle;
    mesh.faces[new_face].edges = seam;

    // 5. collect garbage and refresh the bounds
    mesh.vertices
        .retain(|id, _| !matches!(marks.vertices.get(id), Some(VertexMark::Drop)));
    mesh.edges
        .retain(|id, _| !matches!(marks.edges.get(id), Some(EdgeMark::Drop)));
    mesh.recompute_bounds();

    #[cfg(feature = "debug-integrity")]
    mesh.check_integrity()
        .expect("clip left the mesh inconsistent");

    CutResult::Split {
        face: new_face,
        dropped,
    }
}

/// Replace the dropped endpoint of a straddling edge with a new vertex
/// at the plane crossing, snapped to the integer lattice.
fn split_edge(mesh: &mut Mesh, marks: &MarkTables, edge_id: EdgeId, plane: &Plane) -> VertexId {
    let (start, end) = {
        let e = &mesh.edges[edge_id];
        (e.start, e.end)
    };
    let origin = mesh.position(start);
    let direction = mesh.position(end) - origin;
    // The endpoints straddle the plane, so the segment cannot be parallel
    // to it; 0.5 is never used.
    let t = plane.intersect_line(&origin, &direction).unwrap_or(0.5);
    let position = snap_point(&(origin + direction * t));
    let new_vertex = mesh.add_vertex(position);

    let drop_is_start = matches!(marks.vertices.get(start), Some(VertexMark::Drop));
    let e = &mut mesh.edges[edge_id];
    if drop_is_start {
        e.start = new_vertex;
    } else {
        e.end = new_vertex;
    }
    new_vertex
}

/// Decide a face's fate from its edge marks and, when it straddles the
/// plane, splice a seam edge into its cycle.
fn split_face(mesh: &mut Mesh, marks: &mut MarkTables, face_id: FaceId) -> FaceFate {
    let edges = mesh.faces[face_id].edges.clone();
    let n = edges.len();

    let mut keep = 0;
    let mut drop = 0;
    let mut undecided = 0;
    let mut undecided_edge = None;
    let mut split_index1: Option<usize> = None;
    let mut split_index2: Option<usize> = None;

    let mark_of = |marks: &MarkTables, e: EdgeId| {
        marks.edges.get(e).copied().unwrap_or(EdgeMark::New)
    };

    let mut last_mark = mark_of(marks, edges[n - 1]);
    for (i, &edge_id) in edges.iter().enumerate() {
        let current = mark_of(marks, edge_id);
        match current {
            EdgeMark::Split => {
                // Which crossing this is depends on whether the face walks
                // the edge out of its kept region or back into it.
                let walk_start = mesh.edges[edge_id].start_for(face_id);
                if marks.keeps(walk_start) {
                    split_index1 = Some(i);
                } else {
                    split_index2 = Some(i);
                }
            }
            EdgeMark::Undecided => {
                undecided += 1;
                undecided_edge = Some(edge_id);
            }
            EdgeMark::Keep => {
                if last_mark == EdgeMark::Drop {
                    split_index2 = Some(i);
                }
                keep += 1;
            }
            EdgeMark::Drop => {
                if last_mark == EdgeMark::Keep {
                    split_index1 = Some(if i > 0 { i - 1 } else { n - 1 });
                }
                drop += 1;
            }
            EdgeMark::New => {}
        }
        last_mark = current;
    }

    if keep == n {
        return FaceFate::Keep;
    }
    if undecided == 1 && keep == n - 1 {
        if let Some(edge_id) = undecided_edge {
            return FaceFate::KeepWithSeam(edge_id);
        }
    }
    if drop + undecided == n {
        return FaceFate::Drop;
    }

    let (Some(i1), Some(i2)) = (split_index1, split_index2) else {
        // A strictly convex face that straddles the plane always has both
        // crossings; leave the face alone if numerics say otherwise.
        debug_assert!(false, "straddling face without split indices");
        return FaceFate::Keep;
    };

    // The seam edge runs on the plane from the crossing on edge i1 to the
    // crossing on edge i2, with this face on its right.
    let seam_start = mesh.edges[edges[i1]].end_for(face_id);
    let seam_end = mesh.edges[edges[i2]].start_for(face_id);
    let seam = mesh.add_edge(seam_start, seam_end);
    mesh.edges[seam].right = face_id;
    marks.edges.insert(seam, EdgeMark::New);
    mesh.replace_edge_range(face_id, i1, i2, seam);
    FaceFate::Split(seam)
}

/// Order the seam edges into a polygon by matching each edge's start to
/// its successor's end. Quadratic, but a convex cut yields few seams.
fn sort_seam(mesh: &Mesh, seam: &mut [EdgeId]) {
    for i in 0..seam.len().saturating_sub(1) {
        let start = mesh.edges[seam[i]].start;
        for j in i + 2..seam.len() {
            if mesh.edges[seam[j]].end == start {
                seam.swap(i + 1, j);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::cube_mesh;
    use quarry_math::{Aabb3, Point3, Vec3};

    fn unit32() -> Mesh {
        cube_mesh(&Aabb3::new(
            Point3::new(-32.0, -32.0, -32.0),
            Point3::new(32.0, 32.0, 32.0),
        ))
    }

    #[test]
    fn test_redundant_plane() {
        let mut mesh = unit32();
        let result = clip(
            &mut mesh,
            &Plane::new(Vec3::x(), 64.0),
            FaceAnnotation::default(),
        );
        assert!(matches!(result, CutResult::Redundant));
        assert_eq!(mesh.vertices.len(), 8);
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_tangent_plane_is_redundant() {
        let mut mesh = unit32();
        // touches the face x = 32 exactly
        let result = clip(
            &mut mesh,
            &Plane::new(Vec3::x(), 32.0),
            FaceAnnotation::default(),
        );
        assert!(matches!(result, CutResult::Redundant));
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_empty_cut() {
        let mut mesh = unit32();
        let result = clip(
            &mut mesh,
            &Plane::new(Vec3::x(), -64.0),
            FaceAnnotation::default(),
        );
        assert!(matches!(result, CutResult::Empty));
        assert_eq!(mesh.vertices.len(), 8);
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_axis_cut_halves_the_cube() {
        let mut mesh = unit32();
        let result = clip(
            &mut mesh,
            &Plane::new(Vec3::x(), 0.0),
            FaceAnnotation::with_material("cut"),
        );
        let CutResult::Split { face, dropped } = result else {
            panic!("expected a split");
        };
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.edges.len(), 12);
        assert_eq!(mesh.faces.len(), 6);
        assert_eq!(mesh.faces[face].annotation.material, "cut");
        // the dropped face is the one the plane cut away entirely
        assert_eq!(dropped.len(), 1);
        mesh.check_integrity().unwrap();
        assert_eq!(mesh.bounds.max.x, 0.0);
        assert_eq!(mesh.bounds.min.x, -32.0);
    }

    #[test]
    fn test_diagonal_cut() {
        let mut mesh = unit32();
        let n = Vec3::new(1.0, 1.0, 0.0).normalize();
        // plane x + y = 32, crossing four edges away from any vertex
        let result = clip(
            &mut mesh,
            &Plane::new(n, 32.0 / 2f64.sqrt()),
            FaceAnnotation::default(),
        );
        assert!(matches!(result, CutResult::Split { .. }));
        assert_eq!(mesh.vertices.len(), 10);
        assert_eq!(mesh.edges.len(), 15);
        assert_eq!(mesh.faces.len(), 7);
        mesh.check_integrity().unwrap();
        // z extent untouched
        assert_eq!(mesh.bounds.min.z, -32.0);
        assert_eq!(mesh.bounds.max.z, 32.0);
    }

    #[test]
    fn test_diagonal_cut_through_vertices() {
        let mut mesh = unit32();
        let n = Vec3::new(1.0, 1.0, 0.0).normalize();
        // plane x + y = 0 passes exactly through four cube vertices, which
        // classify as on-plane and survive without any edge splits
        let result = clip(&mut mesh, &Plane::new(n, 0.0), FaceAnnotation::default());
        assert!(matches!(result, CutResult::Split { .. }));
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.edges.len(), 9);
        assert_eq!(mesh.faces.len(), 5);
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_corner_cut_through_three_vertices() {
        let mut mesh = unit32();
        let n = Vec3::new(1.0, 1.0, 1.0).normalize();
        let d = n.dot(&Vec3::new(32.0, 32.0, -32.0));
        let result = clip(&mut mesh, &Plane::new(n, d), FaceAnnotation::default());
        assert!(matches!(result, CutResult::Split { .. }));
        // one corner gone, no new vertices, three seam edges
        assert_eq!(mesh.vertices.len(), 7);
        assert_eq!(mesh.edges.len(), 12);
        assert_eq!(mesh.faces.len(), 7);
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_second_identical_cut_is_redundant() {
        let mut mesh = unit32();
        let plane = Plane::new(Vec3::new(1.0, 1.0, 0.0).normalize(), 10.0);
        assert!(matches!(
            clip(&mut mesh, &plane, FaceAnnotation::default()),
            CutResult::Split { .. }
        ));
        assert!(matches!(
            clip(&mut mesh, &plane, FaceAnnotation::default()),
            CutResult::Redundant
        ));
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_split_vertices_snap_to_lattice() {
        let mut mesh = unit32();
        let plane = Plane::new(Vec3::x(), 7.0);
        clip(&mut mesh, &plane, FaceAnnotation::default());
        for vertex in mesh.vertices.values() {
            let p = vertex.position;
            for c in [p.x, p.y, p.z] {
                assert_eq!(c, c.round());
            }
        }
    }
}
