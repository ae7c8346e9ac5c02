//! The mesh arena and its topology-level operations.

use quarry_math::{points_equal, Aabb3, Plane, Point3, Vec3, POSITION_EPSILON};
use slotmap::{Key, SlotMap};
use thiserror::Error;

use crate::{Edge, EdgeId, Face, FaceId, Vertex, VertexId};

/// Violation of one of the mesh invariants.
#[derive(Error, Debug)]
pub enum TopologyError {
    /// An edge is missing a face or both sides are the same face.
    #[error("mesh is not closed: {0}")]
    Open(String),

    /// A face's vertex and edge cycles disagree.
    #[error("inconsistent face cycle: {0}")]
    BadCycle(String),

    /// A face's vertices do not lie on its plane.
    #[error("face is not planar: off-plane distance {0}")]
    NonPlanar(f64),

    /// A face polygon is not strictly convex.
    #[error("face polygon is not convex")]
    ConcaveFace,

    /// A vertex lies outside another face's plane.
    #[error("vertex outside face plane by {0}")]
    NotConvex(f64),

    /// Two vertices coincide within the position epsilon.
    #[error("coincident vertices")]
    CoincidentVertices,

    /// A face has fewer than three sides or vanishing area.
    #[error("degenerate face: {0}")]
    DegenerateFace(String),

    /// The solid encloses no volume.
    #[error("solid has no volume")]
    ZeroVolume,

    /// `V − E + F` is not 2.
    #[error("euler characteristic violated: V={vertices} E={edges} F={faces}")]
    EulerMismatch {
        /// Vertex count.
        vertices: usize,
        /// Edge count.
        edges: usize,
        /// Face count.
        faces: usize,
    },
}

/// A polyhedral mesh: three handle pools plus a cached bounding box.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex pool.
    pub vertices: SlotMap<VertexId, Vertex>,
    /// Edge pool.
    pub edges: SlotMap<EdgeId, Edge>,
    /// Face pool.
    pub faces: SlotMap<FaceId, Face>,
    /// Cached axis-aligned bounds of the vertex positions.
    pub bounds: Aabb3,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            faces: SlotMap::with_key(),
            bounds: Aabb3::empty(),
        }
    }

    // =========================================================================
    // Element management
    // =========================================================================

    /// Add a vertex at `position`.
    pub fn add_vertex(&mut self, position: Point3) -> VertexId {
        self.vertices.insert(Vertex::new(position))
    }

    /// Add an edge between two vertices; faces are wired up separately.
    pub fn add_edge(&mut self, start: VertexId, end: VertexId) -> EdgeId {
        self.edges.insert(Edge::new(start, end))
    }

    /// Add a fully formed face.
    pub fn add_face(&mut self, face: Face) -> FaceId {
        self.faces.insert(face)
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, vertex: VertexId) -> Point3 {
        self.vertices[vertex].position
    }

    /// Vector from an edge's start to its end.
    pub fn edge_vector(&self, edge: EdgeId) -> Vec3 {
        let e = &self.edges[edge];
        self.position(e.end) - self.position(e.start)
    }

    /// Midpoint of an edge.
    pub fn edge_center(&self, edge: EdgeId) -> Point3 {
        let e = &self.edges[edge];
        let mid = (self.position(e.start).coords + self.position(e.end).coords) / 2.0;
        Point3::from(mid)
    }

    /// Centroid of a face's corner cycle.
    pub fn face_center(&self, face: FaceId) -> Point3 {
        let f = &self.faces[face];
        let mut sum = Vec3::zeros();
        for &v in &f.vertices {
            sum += self.position(v).coords;
        }
        Point3::from(sum / f.vertices.len() as f64)
    }

    /// Corner positions of a face in cycle order.
    pub fn face_positions(&self, face: FaceId) -> Vec<Point3> {
        self.faces[face]
            .vertices
            .iter()
            .map(|&v| self.position(v))
            .collect()
    }

    /// Recompute the cached bounds from the vertex pool.
    pub fn recompute_bounds(&mut self) {
        let mut bounds = Aabb3::empty();
        for vertex in self.vertices.values() {
            bounds.include_point(&vertex.position);
        }
        self.bounds = bounds;
    }

    /// Refit a face's plane to its first three cycle vertices.
    ///
    /// Returns `false` when those vertices are collinear and no plane
    /// exists; the face is left untouched in that case.
    pub fn refresh_face_plane(&mut self, face: FaceId) -> bool {
        let f = &self.faces[face];
        let p0 = self.position(f.vertices[0]);
        let p1 = self.position(f.vertices[1]);
        let p2 = self.position(f.vertices[2]);
        match Plane::from_points(&p0, &p1, &p2) {
            Some(plane) => {
                self.faces[face].plane = plane;
                true
            }
            None => false,
        }
    }

    /// Refit every face plane; fails on the first collinear triple.
    pub fn refresh_all_planes(&mut self) -> Result<(), TopologyError> {
        let ids: Vec<FaceId> = self.faces.keys().collect();
        for face in ids {
            if !self.refresh_face_plane(face) {
                return Err(TopologyError::DegenerateFace(
                    "collinear leading vertices".into(),
                ));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Cycle operations
    // =========================================================================

    /// Rotate a face's cycles left by `offset`, so the element previously
    /// at index `offset` lands at index 0.
    pub fn rotate_cycle(&mut self, face: FaceId, offset: usize) {
        let f = &mut self.faces[face];
        let n = f.edges.len();
        let offset = offset % n;
        if offset == 0 {
            return;
        }
        f.edges.rotate_left(offset);
        f.vertices.rotate_left(offset);
    }

    /// Splice `edge` into `face`'s cycle in place of the edges strictly
    /// between cycle indices `index1` and `index2`.
    ///
    /// The interval may wrap (`index2 < index1`). The edge must already
    /// carry `face` on one side; the vertices it introduces replace the
    /// removed ones in the cycle.
    pub fn replace_edge_range(&mut self, face: FaceId, index1: usize, index2: usize, edge: EdgeId) {
        let new_start = self.edges[edge].start_for(face);
        let new_end = self.edges[edge].end_for(face);
        let f = &mut self.faces[face];
        if index2 > index1 {
            f.vertices.drain(index1 + 1..index2 + 1);
            f.edges.drain(index1 + 1..index2);
            f.vertices.insert(index1 + 1, new_start);
            f.vertices.insert(index1 + 2, new_end);
            f.edges.insert(index1 + 1, edge);
        } else {
            f.vertices.drain(index1 + 1..);
            f.vertices.drain(..index2 + 1);
            f.edges.drain(index1 + 1..);
            f.edges.drain(..index2);
            f.vertices.push(new_start);
            f.vertices.insert(0, new_end);
            f.edges.push(edge);
        }
        debug_assert_eq!(f.vertices.len(), f.edges.len());
    }

    /// Remove a triangle that has collapsed onto one of its edges.
    ///
    /// The triangle `face` and the side of it opposite `edge`'s far corner
    /// are deleted; the neighbour across that deleted side absorbs the
    /// kept edge. The caller disposes of the face's annotation and removes
    /// any orphaned vertices.
    pub fn collapse_degenerate_triangle(
        &mut self,
        face: FaceId,
        edge: EdgeId,
    ) -> Result<(), TopologyError> {
        if self.faces[face].edges.len() != 3 {
            return Err(TopologyError::BadCycle(
                "collapse target is not a triangle".into(),
            ));
        }
        let offset = self
            .edge_index_in(face, edge)
            .ok_or_else(|| TopologyError::BadCycle("edge not on collapse target".into()))?;
        self.rotate_cycle(face, offset);

        let keep_edge = self.faces[face].edges[1];
        let drop_edge = self.faces[face].edges[2];
        let neighbour = self.edges[drop_edge].other_face(face);

        self.edges[keep_edge].replace_face(face, neighbour);

        let delete_index = self
            .edge_index_in(neighbour, drop_edge)
            .ok_or_else(|| TopologyError::Open("collapse neighbour missing shared edge".into()))?;
        let n = self.faces[neighbour].edges.len();
        let prev_index = (delete_index + n - 1) % n;
        let next_index = (delete_index + 1) % n;
        self.replace_edge_range(neighbour, prev_index, next_index, keep_edge);

        self.faces.remove(face);
        self.edges.remove(drop_edge);
        Ok(())
    }

    /// Reverse the orientation of the whole mesh.
    ///
    /// Every face cycle is reversed and every edge swaps its left and
    /// right face, which together keep each cycle aligned with its edges.
    /// Planes are not touched; callers refit them after moving positions.
    pub fn invert_orientation(&mut self) {
        for edge in self.edges.values_mut() {
            std::mem::swap(&mut edge.left, &mut edge.right);
        }
        for f in self.faces.values_mut() {
            f.vertices.reverse();
            let n = f.edges.len();
            let old = std::mem::take(&mut f.edges);
            f.edges = (0..n).map(|i| old[(2 * n - 2 - i) % n]).collect();
        }
    }

    /// Index of `edge` in `face`'s edge cycle.
    pub fn edge_index_in(&self, face: FaceId, edge: EdgeId) -> Option<usize> {
        self.faces[face].edges.iter().position(|&e| e == edge)
    }

    /// Index of `vertex` in `face`'s vertex cycle.
    pub fn vertex_index_in(&self, face: FaceId, vertex: VertexId) -> Option<usize> {
        self.faces[face].vertices.iter().position(|&v| v == vertex)
    }

    // =========================================================================
    // Vertex rings
    // =========================================================================

    /// Faces around a vertex, clockwise seen from outside the solid.
    ///
    /// Fails when the mesh is not closed.
    pub fn incident_faces(&self, vertex: VertexId) -> Result<Vec<FaceId>, TopologyError> {
        self.vertex_ring(vertex).map(|(faces, _)| faces)
    }

    /// Edges around a vertex, in the same ring order as [`Self::incident_faces`].
    pub fn incident_edges(&self, vertex: VertexId) -> Result<Vec<EdgeId>, TopologyError> {
        self.vertex_ring(vertex).map(|(_, edges)| edges)
    }

    fn vertex_ring(&self, vertex: VertexId) -> Result<(Vec<FaceId>, Vec<EdgeId>), TopologyError> {
        let mut edge_id = self
            .edges
            .iter()
            .find(|(_, e)| e.touches(vertex))
            .map(|(id, _)| id)
            .ok_or_else(|| TopologyError::Open("vertex has no incident edge".into()))?;

        let pick_face = |edge: &Edge| {
            if edge.start == vertex {
                edge.right
            } else {
                edge.left
            }
        };

        let first = pick_face(&self.edges[edge_id]);
        let mut face_id = first;
        let mut faces = Vec::new();
        let mut ring_edges = Vec::new();
        loop {
            if face_id.is_null() || faces.len() > self.faces.len() {
                return Err(TopologyError::Open("vertex ring does not close".into()));
            }
            faces.push(face_id);
            ring_edges.push(edge_id);

            let face = &self.faces[face_id];
            let i = self
                .edge_index_in(face_id, edge_id)
                .ok_or_else(|| TopologyError::BadCycle("ring edge not on its face".into()))?;
            let n = face.edges.len();
            edge_id = face.edges[(i + n - 1) % n];
            face_id = pick_face(&self.edges[edge_id]);
            if face_id == first {
                break;
            }
        }
        Ok((faces, ring_edges))
    }

    // =========================================================================
    // Handle rediscovery
    // =========================================================================

    /// Find the vertex at `position`, within the position epsilon.
    pub fn find_vertex(&self, position: &Point3) -> Option<VertexId> {
        self.vertices
            .iter()
            .find(|(_, v)| points_equal(&v.position, position))
            .map(|(id, _)| id)
    }

    /// Find the edge between two positions, in either orientation.
    pub fn find_edge(&self, p1: &Point3, p2: &Point3) -> Option<EdgeId> {
        self.edges
            .iter()
            .find(|(_, e)| {
                let s = self.position(e.start);
                let t = self.position(e.end);
                (points_equal(&s, p1) && points_equal(&t, p2))
                    || (points_equal(&s, p2) && points_equal(&t, p1))
            })
            .map(|(id, _)| id)
    }

    /// Find the face whose corner cycle matches `positions` under any
    /// rotation.
    pub fn find_face(&self, positions: &[Point3]) -> Option<FaceId> {
        let n = positions.len();
        for (id, face) in &self.faces {
            if face.vertices.len() != n {
                continue;
            }
            for start in 0..n {
                let mut k = 0;
                while k < n
                    && points_equal(
                        &self.position(face.vertices[(start + k) % n]),
                        &positions[k],
                    )
                {
                    k += 1;
                }
                if k == n {
                    return Some(id);
                }
            }
        }
        None
    }

    // =========================================================================
    // Measures
    // =========================================================================

    /// Area of a face polygon.
    pub fn face_area(&self, face: FaceId) -> f64 {
        let positions = self.face_positions(face);
        let mut sum = Vec3::zeros();
        let c = self.face_center(face);
        for i in 0..positions.len() {
            let a = positions[i] - c;
            let b = positions[(i + 1) % positions.len()] - c;
            sum += a.cross(&b);
        }
        sum.norm() / 2.0
    }

    /// Enclosed volume, by summing signed tetrahedra over face fans.
    ///
    /// Positive for a well-formed mesh (outward normals, clockwise cycles
    /// seen from outside).
    pub fn volume(&self) -> f64 {
        let mut six_v = 0.0;
        for face in self.faces.values() {
            let p0 = self.position(face.vertices[0]).coords;
            for i in 1..face.vertices.len() - 1 {
                let p1 = self.position(face.vertices[i]).coords;
                let p2 = self.position(face.vertices[i + 1]).coords;
                six_v += p0.dot(&p2.cross(&p1));
            }
        }
        six_v / 6.0
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Whether every edge is sealed by two distinct faces.
    pub fn closed(&self) -> bool {
        self.edges
            .values()
            .all(|e| !e.left.is_null() && !e.right.is_null() && e.left != e.right)
    }

    /// Verify the full invariant set; see the crate docs.
    pub fn check_integrity(&self) -> Result<(), TopologyError> {
        self.check_closed()?;
        self.check_face_cycles()?;
        self.check_face_shapes()?;
        self.check_global_convexity()?;
        self.check_degeneracy()?;
        self.check_euler()
    }

    fn check_closed(&self) -> Result<(), TopologyError> {
        for (id, edge) in &self.edges {
            if edge.left.is_null() || edge.right.is_null() {
                return Err(TopologyError::Open(format!("edge {id:?} has an open side")));
            }
            if edge.left == edge.right {
                return Err(TopologyError::Open(format!(
                    "edge {id:?} borders one face twice"
                )));
            }
            for face in [edge.left, edge.right] {
                if !self.faces.contains_key(face) || self.edge_index_in(face, id).is_none() {
                    return Err(TopologyError::Open(format!(
                        "edge {id:?} references a face that does not carry it"
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_face_cycles(&self) -> Result<(), TopologyError> {
        for (id, face) in &self.faces {
            let n = face.edges.len();
            if n < 3 || face.vertices.len() != n {
                return Err(TopologyError::BadCycle(format!(
                    "face {id:?} has {} vertices and {} edges",
                    face.vertices.len(),
                    n
                )));
            }
            for i in 0..n {
                let edge = &self.edges[face.edges[i]];
                if edge.start_for(id) != face.vertices[i]
                    || edge.end_for(id) != face.vertices[(i + 1) % n]
                {
                    return Err(TopologyError::BadCycle(format!(
                        "face {id:?} edge {i} does not connect its cycle vertices"
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_face_shapes(&self) -> Result<(), TopologyError> {
        for (id, face) in &self.faces {
            let positions: Vec<Point3> =
                face.vertices.iter().map(|&v| self.position(v)).collect();
            // lattice snapping moves a crossing vertex by up to the
            // position epsilon per axis, so allow the diagonal of that box
            for p in &positions {
                let d = face.plane.signed_distance(p);
                if d.abs() > 2.0 * POSITION_EPSILON {
                    return Err(TopologyError::NonPlanar(d));
                }
            }
            // Strict convexity: consecutive unit edge vectors must turn the
            // same way everywhere, which for clockwise-from-outside cycles
            // means their cross product points against the outward normal.
            let n = positions.len();
            for i in 0..n {
                let u = (positions[(i + 1) % n] - positions[i]).normalize();
                let v = (positions[(i + 2) % n] - positions[(i + 1) % n]).normalize();
                if u.cross(&v).dot(&face.plane.normal) > -1e-9 {
                    return Err(TopologyError::ConcaveFace);
                }
            }
            if self.face_area(id) < POSITION_EPSILON {
                return Err(TopologyError::DegenerateFace(format!(
                    "face {id:?} has vanishing area"
                )));
            }
        }
        Ok(())
    }

    fn check_global_convexity(&self) -> Result<(), TopologyError> {
        for (id, face) in &self.faces {
            for (vid, vertex) in &self.vertices {
                if face.vertices.contains(&vid) {
                    continue;
                }
                let d = face.plane.signed_distance(&vertex.position);
                if d > 2.0 * POSITION_EPSILON {
                    return Err(TopologyError::NotConvex(d));
                }
            }
        }
        Ok(())
    }

    fn check_degeneracy(&self) -> Result<(), TopologyError> {
        let ids: Vec<VertexId> = self.vertices.keys().collect();
        for i in 0..ids.len() {
            for j in i + 1..ids.len() {
                if points_equal(&self.position(ids[i]), &self.position(ids[j])) {
                    return Err(TopologyError::CoincidentVertices);
                }
            }
        }
        if self.volume() < POSITION_EPSILON {
            return Err(TopologyError::ZeroVolume);
        }
        Ok(())
    }

    fn check_euler(&self) -> Result<(), TopologyError> {
        let (v, e, f) = (self.vertices.len(), self.edges.len(), self.faces.len());
        if v + f != e + 2 {
            return Err(TopologyError::EulerMismatch {
                vertices: v,
                edges: e,
                faces: f,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FaceAnnotation;
    use approx::assert_relative_eq;

    /// Build a mesh from vertex positions and clockwise-from-outside
    /// face cycles given as position indices.
    fn build(positions: &[Point3], cycles: &[&[usize]]) -> Mesh {
        let mut mesh = Mesh::new();
        let vertex_ids: Vec<VertexId> =
            positions.iter().map(|p| mesh.add_vertex(*p)).collect();

        let mut mapped: Vec<(VertexId, VertexId, EdgeId)> = Vec::new();
        for cycle in cycles {
            let verts: Vec<VertexId> = cycle.iter().map(|&i| vertex_ids[i]).collect();
            let n = verts.len();
            let plane = Plane::from_points(
                &positions[cycle[0]],
                &positions[cycle[1]],
                &positions[cycle[2]],
            )
            .unwrap();
            let face_id = mesh.add_face(Face::new(
                verts.clone(),
                Vec::new(),
                plane,
                FaceAnnotation::default(),
            ));
            let mut edges = Vec::with_capacity(n);
            for i in 0..n {
                let a = verts[i];
                let b = verts[(i + 1) % n];
                if let Some(&(_, _, e)) = mapped.iter().find(|(s, t, _)| *s == b && *t == a) {
                    mesh.edges[e].left = face_id;
                    edges.push(e);
                } else {
                    let e = mesh.add_edge(a, b);
                    mesh.edges[e].right = face_id;
                    edges.push(e);
                    mapped.push((a, b, e));
                }
            }
            mesh.faces[face_id].edges = edges;
        }
        mesh.recompute_bounds();
        mesh
    }

    fn tetrahedron() -> Mesh {
        let positions = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        build(
            &positions,
            &[&[0, 1, 2], &[0, 2, 3], &[0, 3, 1], &[1, 3, 2]],
        )
    }

    #[test]
    fn test_tetrahedron_integrity() {
        let mesh = tetrahedron();
        assert!(mesh.closed());
        mesh.check_integrity().unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.edges.len(), 6);
        assert_eq!(mesh.faces.len(), 4);
    }

    #[test]
    fn test_volume_and_area() {
        let mesh = tetrahedron();
        assert_relative_eq!(mesh.volume(), 1.0 / 6.0, epsilon = 1e-12);
        let bottom = mesh
            .find_face(&[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ])
            .unwrap();
        assert_relative_eq!(mesh.face_area(bottom), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_vertex_ring() {
        let mesh = tetrahedron();
        let apex = mesh.find_vertex(&Point3::new(0.0, 0.0, 1.0)).unwrap();
        let ring = mesh.incident_faces(apex).unwrap();
        assert_eq!(ring.len(), 3);
        // all three faces of the ring actually contain the apex
        for face in &ring {
            assert!(mesh.faces[*face].vertices.contains(&apex));
        }
        let ring_edges = mesh.incident_edges(apex).unwrap();
        assert_eq!(ring_edges.len(), 3);
        for edge in &ring_edges {
            assert!(mesh.edges[*edge].touches(apex));
        }
    }

    #[test]
    fn test_rotate_cycle_preserves_integrity() {
        let mut mesh = tetrahedron();
        let faces: Vec<FaceId> = mesh.faces.keys().collect();
        for (i, face) in faces.into_iter().enumerate() {
            mesh.rotate_cycle(face, i + 1);
        }
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_invert_orientation_involution() {
        let mut mesh = tetrahedron();
        let before = mesh.clone();
        mesh.invert_orientation();
        mesh.invert_orientation();
        for (id, face) in &before.faces {
            assert_eq!(mesh.faces[id].vertices, face.vertices);
            assert_eq!(mesh.faces[id].edges, face.edges);
        }
        mesh.check_integrity().unwrap();
    }

    #[test]
    fn test_find_edge_either_orientation() {
        let mesh = tetrahedron();
        let a = Point3::new(1.0, 0.0, 0.0);
        let b = Point3::new(0.0, 0.0, 1.0);
        let e1 = mesh.find_edge(&a, &b);
        let e2 = mesh.find_edge(&b, &a);
        assert!(e1.is_some());
        assert_eq!(e1, e2);
        assert!(mesh
            .find_edge(&a, &Point3::new(9.0, 9.0, 9.0))
            .is_none());
    }

    #[test]
    fn test_open_mesh_detected() {
        let mut mesh = tetrahedron();
        let any_edge = mesh.edges.keys().next().unwrap();
        mesh.edges[any_edge].left = FaceId::null();
        assert!(!mesh.closed());
        assert!(mesh.check_integrity().is_err());
    }

    #[test]
    fn test_euler_mismatch_detected() {
        let mut mesh = tetrahedron();
        mesh.add_vertex(Point3::new(5.0, 5.0, 5.0));
        assert!(matches!(
            mesh.check_integrity(),
            Err(TopologyError::EulerMismatch { .. })
        ));
    }
}
