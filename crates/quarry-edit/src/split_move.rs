//! Edge and face moves, and the split-and-move variants.
//!
//! All operations here run against a scratch clone of the mesh and
//! commit only when every underlying vertex move succeeds and the
//! result passes the integrity check, so a failure is a clean no-op.

use quarry_math::{fneg, fpos, Point3, Vec3};
use quarry_topo::{AnnotationAdapter, EdgeId, Face, FaceAnnotation, FaceId, Mesh, TopologyError};

use crate::move_vertex::move_vertex;
use crate::MoveResult;

/// Move both endpoints of an edge by `delta`.
///
/// The endpoint further along the drag moves first so the edge cannot
/// fold through itself. Commits only if both moves succeed.
pub fn move_edge(
    mesh: &mut Mesh,
    edge_id: EdgeId,
    delta: Vec3,
    adapter: &dyn AnnotationAdapter,
    dropped: &mut Vec<FaceAnnotation>,
) -> Result<MoveResult<EdgeId>, TopologyError> {
    if delta.norm_squared() == 0.0 {
        return Ok(MoveResult::unmoved(edge_id));
    }

    let mut test = mesh.clone();
    let edge = test.edges[edge_id];
    let start_pos = test.position(edge.start);
    let end_pos = test.position(edge.end);
    let direction = end_pos - start_pos;

    let order = if direction.dot(&delta) > 0.0 {
        [edge.end, edge.start]
    } else {
        [edge.start, edge.end]
    };

    let mut scratch = Vec::new();
    for v in order {
        if !test.vertices.contains_key(v) {
            return Ok(MoveResult::unmoved(edge_id));
        }
        let result = move_vertex(&mut test, v, delta, false, adapter, &mut scratch)?;
        if !result.moved {
            return Ok(MoveResult::unmoved(edge_id));
        }
    }
    if test.check_integrity().is_err() {
        return Ok(MoveResult::unmoved(edge_id));
    }

    let handle = test.find_edge(&(start_pos + delta), &(end_pos + delta));
    dropped.append(&mut scratch);
    *mesh = test;
    Ok(MoveResult {
        moved: true,
        handle,
    })
}

/// Move every vertex of a face by `delta`.
///
/// Vertices move in order of their lead along the drag direction, so
/// the front of the face cannot trap the back. Commits only if every
/// move succeeds.
pub fn move_face(
    mesh: &mut Mesh,
    face_id: FaceId,
    delta: Vec3,
    adapter: &dyn AnnotationAdapter,
    dropped: &mut Vec<FaceAnnotation>,
) -> Result<MoveResult<FaceId>, TopologyError> {
    if delta.norm_squared() == 0.0 {
        return Ok(MoveResult::unmoved(face_id));
    }

    let mut test = mesh.clone();
    let center = test.face_center(face_id);
    let direction = delta.normalize();

    let mut ordered: Vec<(f64, quarry_topo::VertexId)> = test.faces[face_id]
        .vertices
        .iter()
        .map(|&v| ((test.position(v) - center).dot(&direction), v))
        .collect();
    // leading vertices first
    ordered.sort_by(|a, b| b.0.total_cmp(&a.0));

    let moved_positions: Vec<Point3> = test
        .face_positions(face_id)
        .iter()
        .map(|p| p + delta)
        .collect();

    let mut scratch = Vec::new();
    for (_, v) in ordered {
        if !test.vertices.contains_key(v) {
            return Ok(MoveResult::unmoved(face_id));
        }
        let result = move_vertex(&mut test, v, delta, false, adapter, &mut scratch)?;
        if !result.moved {
            return Ok(MoveResult::unmoved(face_id));
        }
    }
    if test.check_integrity().is_err() {
        return Ok(MoveResult::unmoved(face_id));
    }

    let handle = test.find_face(&moved_positions);
    dropped.append(&mut scratch);
    *mesh = test;
    Ok(MoveResult {
        moved: true,
        handle,
    })
}

/// Split an edge at its midpoint and drag the new vertex by `delta`.
///
/// Rejected up front when the drag points into either incident face,
/// which would indent the solid.
pub fn split_and_move_edge(
    mesh: &mut Mesh,
    edge_id: EdgeId,
    delta: Vec3,
    adapter: &dyn AnnotationAdapter,
    dropped: &mut Vec<FaceAnnotation>,
) -> Result<MoveResult<EdgeId>, TopologyError> {
    if delta.norm_squared() == 0.0 {
        return Ok(MoveResult::unmoved(edge_id));
    }
    {
        let edge = &mesh.edges[edge_id];
        let left_normal = mesh.faces[edge.left].plane.normal;
        let right_normal = mesh.faces[edge.right].plane.normal;
        if fneg(delta.dot(&left_normal)) || fneg(delta.dot(&right_normal)) {
            return Ok(MoveResult::unmoved(edge_id));
        }
    }

    let mut test = mesh.clone();
    let edge = test.edges[edge_id];
    let start_pos = test.position(edge.start);
    let end_pos = test.position(edge.end);

    let mid = split_edge_at_center(&mut test, edge_id)?;

    let mut scratch = Vec::new();
    let result = move_vertex(&mut test, mid, delta, true, adapter, &mut scratch)?;
    if !result.moved || test.check_integrity().is_err() {
        return Ok(MoveResult::unmoved(edge_id));
    }

    // when the drag ends collinear again the halves have re-merged into a
    // single translated edge
    let handle = test.find_edge(&(start_pos + delta), &(end_pos + delta));
    dropped.append(&mut scratch);
    *mesh = test;
    Ok(MoveResult {
        moved: true,
        handle,
    })
}

/// Fan a face around its centroid and drag the centroid by `delta`.
///
/// The drag must point out of the face's plane; anything else would
/// indent or shear the solid.
pub fn split_and_move_face(
    mesh: &mut Mesh,
    face_id: FaceId,
    delta: Vec3,
    adapter: &dyn AnnotationAdapter,
    dropped: &mut Vec<FaceAnnotation>,
) -> Result<MoveResult<FaceId>, TopologyError> {
    if delta.norm_squared() == 0.0 {
        return Ok(MoveResult::unmoved(face_id));
    }
    if !fpos(delta.dot(&mesh.faces[face_id].plane.normal)) {
        return Ok(MoveResult::unmoved(face_id));
    }

    let mut test = mesh.clone();
    let moved_positions: Vec<Point3> = test
        .face_positions(face_id)
        .iter()
        .map(|p| p + delta)
        .collect();

    let centroid = fan_face_around_centroid(&mut test, face_id, dropped)?;

    let mut scratch = Vec::new();
    let result = move_vertex(&mut test, centroid, delta, true, adapter, &mut scratch)?;
    if !result.moved || test.check_integrity().is_err() {
        return Ok(MoveResult::unmoved(face_id));
    }

    let handle = test.find_face(&moved_positions);
    dropped.append(&mut scratch);
    *mesh = test;
    Ok(MoveResult {
        moved: true,
        handle,
    })
}

/// Replace `edge_id` with two half-edges joined at a new midpoint
/// vertex, keeping both incident face cycles consistent.
fn split_edge_at_center(
    mesh: &mut Mesh,
    edge_id: EdgeId,
) -> Result<quarry_topo::VertexId, TopologyError> {
    let edge = mesh.edges[edge_id];
    let (left, right) = (edge.left, edge.right);

    // rotate both cycles so the edge sits at the very end
    for face in [left, right] {
        let i = mesh
            .edge_index_in(face, edge_id)
            .ok_or_else(|| TopologyError::Open("split edge missing from its face".into()))?;
        mesh.rotate_cycle(face, i + 1);
    }

    let center = mesh.edge_center(edge_id);
    let mid = mesh.add_vertex(center);
    let half1 = mesh.add_edge(edge.start, mid);
    let half2 = mesh.add_edge(mid, edge.end);
    for half in [half1, half2] {
        mesh.edges[half].left = left;
        mesh.edges[half].right = right;
    }

    let left_face = &mut mesh.faces[left];
    left_face.edges.pop();
    left_face.edges.push(half2);
    left_face.edges.push(half1);
    left_face.vertices.push(mid);

    let right_face = &mut mesh.faces[right];
    right_face.edges.pop();
    right_face.edges.push(half1);
    right_face.edges.push(half2);
    right_face.vertices.push(mid);

    mesh.edges.remove(edge_id);
    Ok(mid)
}

/// Replace `face_id` with a fan of triangles around its centroid.
///
/// Every triangle copies the face's annotation; the face itself is
/// reported dropped.
fn fan_face_around_centroid(
    mesh: &mut Mesh,
    face_id: FaceId,
    dropped: &mut Vec<FaceAnnotation>,
) -> Result<quarry_topo::VertexId, TopologyError> {
    let center = mesh.face_center(face_id);
    let centroid = mesh.add_vertex(center);

    let cycle_edges = mesh.faces[face_id].edges.clone();
    let n = cycle_edges.len();
    let plane = mesh.faces[face_id].plane;
    let annotation = mesh.faces[face_id].annotation.clone();

    let first_start = mesh.edges[cycle_edges[0]].start_for(face_id);
    let first_edge = mesh.add_edge(centroid, first_start);

    let mut last_edge = first_edge;
    for (i, &side_edge) in cycle_edges.iter().enumerate() {
        let new_edge = if i == n - 1 {
            first_edge
        } else {
            let end = mesh.edges[side_edge].end_for(face_id);
            mesh.add_edge(centroid, end)
        };

        let near = mesh.edges[last_edge].end;
        let far = mesh.edges[new_edge].end;
        let triangle = mesh.add_face(Face::new(
            vec![centroid, near, far],
            vec![last_edge, side_edge, new_edge],
            plane,
            annotation.clone(),
        ));
        mesh.edges[last_edge].right = triangle;
        mesh.edges[side_edge].replace_face(face_id, triangle);
        mesh.edges[new_edge].left = triangle;

        last_edge = new_edge;
    }

    dropped.push(annotation);
    mesh.faces.remove(face_id);
    Ok(centroid)
}
