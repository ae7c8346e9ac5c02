//! The incremental vertex drag.

use quarry_math::{fneg, fpos, points_equal, snap_point, Plane, Ray, Vec3};
use quarry_topo::{
    AnnotationAdapter, Face, FaceAnnotation, FaceId, Mesh, TopologyError, VertexId,
};

use crate::merge::{merge_edges, merge_sides, merge_vertices};
use crate::MoveResult;

/// Hard cap on drag increments; a drag that has not converged by then is
/// numerically stuck.
const MAX_STEPS: usize = 1000;

/// Drag `vertex` by `delta`, keeping the mesh convex.
///
/// The drag advances in increments clipped to the nearest plane in the
/// way and merges coplanar faces and collinear edges after each step.
/// Landing on a non-incident edge rejects the move; landing on another
/// vertex merges when `merge_on_collision` is set and rejects otherwise.
///
/// A rejected move reports `moved: false` and may leave the mesh
/// partially dragged; callers run it against a scratch clone and commit
/// only on success. Annotations of faces consumed along the way are
/// pushed to `dropped`.
pub fn move_vertex(
    mesh: &mut Mesh,
    vertex: VertexId,
    delta: Vec3,
    merge_on_collision: bool,
    adapter: &dyn AnnotationAdapter,
    dropped: &mut Vec<FaceAnnotation>,
) -> Result<MoveResult<VertexId>, TopologyError> {
    if delta.norm_squared() == 0.0 {
        return Ok(MoveResult::unmoved(vertex));
    }

    let mut vertex = vertex;
    let mut remaining = delta;
    for _ in 0..MAX_STEPS {
        let move_dist = remaining.norm();
        let origin = mesh.position(vertex);
        let ray = Ray {
            origin,
            direction: remaining / move_dist,
        };

        split_incident_sides(mesh, vertex, &ray, adapter, dropped)?;

        let ring = mesh.incident_faces(vertex)?;
        let actual_dist = min_move_distance(mesh, &ring, vertex, &ray, move_dist);

        mesh.vertices[vertex].position = ray.at(actual_dist);
        let new_position = mesh.position(vertex);

        // a vertex dragged onto the interior of a non-incident edge would
        // break convexity no matter what happens next
        for edge in mesh.edges.values() {
            if edge.touches(vertex) {
                continue;
            }
            let v1 = new_position - mesh.position(edge.start);
            let v2 = new_position - mesh.position(edge.end);
            if v1.cross(&v2).norm() < quarry_math::POSITION_EPSILON {
                let along = mesh.position(edge.end) - mesh.position(edge.start);
                let dot1 = v1.dot(&along);
                let dot2 = v2.dot(&along);
                if (dot1 > 0.0 && dot2 < 0.0) || (dot1 < 0.0 && dot2 > 0.0) {
                    return Ok(MoveResult::unmoved(vertex));
                }
            }
        }

        // dragged exactly onto another vertex: merge or reject
        let collision = mesh
            .vertices
            .iter()
            .find(|(id, v)| *id != vertex && points_equal(&v.position, &new_position))
            .map(|(id, _)| id);
        if let Some(other) = collision {
            if merge_on_collision {
                merge_vertices(mesh, vertex, other, dropped)?;
            } else {
                return Ok(MoveResult::unmoved(vertex));
            }
        }

        merge_sides(mesh, dropped)?;
        merge_edges(mesh)?;
        mesh.recompute_bounds();

        // the merges may have consumed the dragged vertex entirely
        let surviving = mesh.find_vertex(&new_position);
        match surviving {
            Some(v) if actual_dist < move_dist => {
                vertex = v;
                remaining = ray.direction * (move_dist - actual_dist);
            }
            _ => {
                for v in mesh.vertices.values_mut() {
                    v.position = snap_point(&v.position);
                }
                mesh.refresh_all_planes()?;
                mesh.recompute_bounds();
                #[cfg(feature = "debug-integrity")]
                mesh.check_integrity()
                    .expect("vertex drag left the mesh inconsistent");
                return Ok(MoveResult {
                    moved: true,
                    handle: surviving,
                });
            }
        }
    }
    Err(TopologyError::BadCycle(
        "vertex drag failed to converge".into(),
    ))
}

/// Prepare the faces around a moving vertex so every one is a triangle.
///
/// A face the drag tilts away from its plane is cut along the diagonal
/// next to the vertex; a face the drag would fold across itself is fan
/// triangulated around the vertex, losing its annotation to `dropped`.
fn split_incident_sides(
    mesh: &mut Mesh,
    vertex: VertexId,
    ray: &Ray,
    adapter: &dyn AnnotationAdapter,
    dropped: &mut Vec<FaceAnnotation>,
) -> Result<(), TopologyError> {
    let ring = mesh.incident_faces(vertex)?;
    for face_id in ring {
        if mesh.faces[face_id].len() <= 3 {
            continue;
        }
        let positions = mesh.face_positions(face_id);
        let outward = (positions[2] - positions[0]).cross(&(positions[1] - positions[0]));
        if fneg(outward.dot(&ray.direction)) {
            split_side(mesh, face_id, vertex)?;
        } else {
            triangulate_side(mesh, face_id, vertex, adapter, dropped)?;
        }
    }
    Ok(())
}

/// Cut the triangle around `vertex` off `face` along the near diagonal.
///
/// The triangle keeps a copy of the face's annotation; the rest of the
/// face keeps the original.
fn split_side(mesh: &mut Mesh, face_id: FaceId, vertex: VertexId) -> Result<FaceId, TopologyError> {
    let k = mesh
        .vertex_index_in(face_id, vertex)
        .ok_or_else(|| TopologyError::BadCycle("split vertex not on face".into()))?;
    let n = mesh.faces[face_id].len();
    let e_prev = mesh.faces[face_id].edges[(k + n - 1) % n];
    let e_next = mesh.faces[face_id].edges[k];
    let w_prev = mesh.faces[face_id].vertices[(k + n - 1) % n];
    let w_next = mesh.faces[face_id].vertices[(k + 1) % n];
    let plane = mesh.faces[face_id].plane;
    let annotation = mesh.faces[face_id].annotation.clone();

    let diagonal = mesh.add_edge(w_prev, w_next);
    mesh.edges[diagonal].right = face_id;
    mesh.replace_edge_range(face_id, (k + n - 2) % n, (k + 1) % n, diagonal);

    let triangle = mesh.add_face(Face::new(
        vec![w_prev, vertex, w_next],
        vec![e_prev, e_next, diagonal],
        plane,
        annotation,
    ));
    mesh.edges[e_prev].replace_face(face_id, triangle);
    mesh.edges[e_next].replace_face(face_id, triangle);
    mesh.edges[diagonal].left = triangle;
    Ok(triangle)
}

/// Fan triangulate `face` around `vertex`.
///
/// The face's annotation is dropped and every fan triangle takes the
/// adapter default for the face's plane.
fn triangulate_side(
    mesh: &mut Mesh,
    face_id: FaceId,
    vertex: VertexId,
    adapter: &dyn AnnotationAdapter,
    dropped: &mut Vec<FaceAnnotation>,
) -> Result<(), TopologyError> {
    let k = mesh
        .vertex_index_in(face_id, vertex)
        .ok_or_else(|| TopologyError::BadCycle("fan vertex not on face".into()))?;
    mesh.rotate_cycle(face_id, k);

    let cycle_vertices = mesh.faces[face_id].vertices.clone();
    let cycle_edges = mesh.faces[face_id].edges.clone();
    let n = cycle_vertices.len();
    let plane = mesh.faces[face_id].plane;
    let default_annotation = adapter.default_for(&plane);

    // diagonals from the vertex to every non-adjacent corner
    let mut diagonals = Vec::with_capacity(n - 3);
    for j in 2..n - 1 {
        diagonals.push(mesh.add_edge(cycle_vertices[0], cycle_vertices[j]));
    }

    for j in 1..n - 1 {
        let e0 = if j == 1 { cycle_edges[0] } else { diagonals[j - 2] };
        let e1 = cycle_edges[j];
        let e2 = if j == n - 2 {
            cycle_edges[n - 1]
        } else {
            diagonals[j - 1]
        };
        let triangle = mesh.add_face(Face::new(
            vec![cycle_vertices[0], cycle_vertices[j], cycle_vertices[j + 1]],
            vec![e0, e1, e2],
            plane,
            default_annotation.clone(),
        ));
        if j == 1 {
            mesh.edges[e0].replace_face(face_id, triangle);
        } else {
            mesh.edges[e0].right = triangle;
        }
        mesh.edges[e1].replace_face(face_id, triangle);
        if j == n - 2 {
            mesh.edges[e2].replace_face(face_id, triangle);
        } else {
            mesh.edges[e2].left = triangle;
        }
    }

    if let Some(face) = mesh.faces.remove(face_id) {
        dropped.push(face.annotation);
    }
    Ok(())
}

/// How far the vertex can travel along `ray` before the mesh folds.
///
/// For each pair of consecutive ring triangles, the plane through their
/// far corners bounds the travel; so does the plane of each neighbour
/// face across the edge opposite the vertex.
fn min_move_distance(
    mesh: &mut Mesh,
    ring: &[FaceId],
    vertex: VertexId,
    ray: &Ray,
    max_dist: f64,
) -> f64 {
    let mut min_dist = max_dist;
    for i in 0..ring.len() {
        let side = ring[i];
        let succ = ring[(i + 1) % ring.len()];
        for face in [side, succ] {
            if let Some(k) = mesh.vertex_index_in(face, vertex) {
                mesh.rotate_cycle(face, k);
            }
        }
        let sv = &mesh.faces[side].vertices;
        let tv = &mesh.faces[succ].vertices;
        let (a, b, c) = (sv[1], sv[2], tv[2]);
        if let Some(plane) = Plane::from_points(
            &mesh.position(a),
            &mesh.position(b),
            &mesh.position(c),
        ) {
            if let Some(t) = plane.intersect_ray(ray) {
                if fpos(t) && t < min_dist {
                    min_dist = t;
                }
            }
        }

        let opposite = mesh.faces[side].edges[1];
        let neighbour = mesh.edges[opposite].other_face(side);
        if let Some(t) = mesh.faces[neighbour].plane.intersect_ray(ray) {
            if fpos(t) && t < min_dist {
                min_dist = t;
            }
        }
    }
    min_dist
}
