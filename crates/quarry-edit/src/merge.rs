//! Post-move cleanup: merging vertices, collinear edges, coplanar faces.

use quarry_math::{Plane, Tolerance, POSITION_EPSILON};
use quarry_topo::{EdgeId, FaceAnnotation, FaceId, Mesh, TopologyError, VertexId};

/// Merge `drop` into `keep` after a drag landed one vertex on another.
///
/// The two vertices must be joined by an edge, and the faces flanking
/// that edge must already be triangles (the drag triangulated them).
/// Both triangles collapse; their annotations go to `dropped`.
pub(crate) fn merge_vertices(
    mesh: &mut Mesh,
    keep: VertexId,
    drop: VertexId,
    dropped: &mut Vec<FaceAnnotation>,
) -> Result<(), TopologyError> {
    let drop_edge = mesh
        .edges
        .iter()
        .find(|(_, e)| {
            (e.start == keep && e.end == drop) || (e.start == drop && e.end == keep)
        })
        .map(|(id, _)| id)
        .ok_or_else(|| {
            TopologyError::BadCycle("merged vertices are not joined by an edge".into())
        })?;

    let left = mesh.edges[drop_edge].left;
    let right = mesh.edges[drop_edge].right;
    if mesh.faces[left].len() != 3 || mesh.faces[right].len() != 3 {
        return Err(TopologyError::BadCycle(
            "vertex merge beside an untriangulated face".into(),
        ));
    }

    // reroute every other edge and face cycle from the dropped vertex
    let edge_ids: Vec<EdgeId> = mesh.edges.keys().collect();
    for edge_id in edge_ids {
        if edge_id == drop_edge || !mesh.edges[edge_id].touches(drop) {
            continue;
        }
        mesh.edges[edge_id].replace_vertex(drop, keep);
        let (l, r) = (mesh.edges[edge_id].left, mesh.edges[edge_id].right);
        for face in [l, r] {
            if let Some(i) = mesh.vertex_index_in(face, drop) {
                mesh.faces[face].vertices[i] = keep;
            }
        }
    }

    // both flanking triangles now have two coincident corners; collapse them
    for face in [left, right] {
        dropped.push(mesh.faces[face].annotation.clone());
        mesh.collapse_degenerate_triangle(face, drop_edge)?;
    }

    mesh.edges.remove(drop_edge);
    mesh.vertices.remove(drop);
    Ok(())
}

/// Merge pairs of adjacent collinear edges until none remain.
///
/// Two edges sharing an endpoint with parallel directions collapse into
/// one edge spanning both; the shared vertex disappears.
pub(crate) fn merge_edges(mesh: &mut Mesh) -> Result<(), TopologyError> {
    'restart: loop {
        let ids: Vec<EdgeId> = mesh.edges.keys().collect();
        for i in 0..ids.len() {
            for j in i + 1..ids.len() {
                let edge = ids[i];
                let candidate = ids[j];
                let v1 = mesh.edge_vector(edge);
                let v2 = mesh.edge_vector(candidate);
                if v1.cross(&v2).norm() >= POSITION_EPSILON {
                    continue;
                }

                if mesh.edges[edge].end == mesh.edges[candidate].end {
                    mesh.edges[candidate].flip();
                }
                if mesh.edges[edge].end == mesh.edges[candidate].start {
                    merge_edge_pair(mesh, edge, candidate, true)?;
                    continue 'restart;
                }

                if mesh.edges[edge].start == mesh.edges[candidate].start {
                    mesh.edges[candidate].flip();
                }
                if mesh.edges[edge].start == mesh.edges[candidate].end {
                    merge_edge_pair(mesh, edge, candidate, false)?;
                    continue 'restart;
                }
            }
        }
        return Ok(());
    }
}

/// Collapse `edge` and `candidate` into one edge.
///
/// `forward` means the candidate continues the edge (`edge.end ==
/// candidate.start`); otherwise it precedes it (`edge.start ==
/// candidate.end`).
fn merge_edge_pair(
    mesh: &mut Mesh,
    edge: EdgeId,
    candidate: EdgeId,
    forward: bool,
) -> Result<(), TopologyError> {
    let e = mesh.edges[edge];
    let c = mesh.edges[candidate];
    if forward && e.start == c.end {
        // two identical edges in opposite directions would merge to nothing
        return Err(TopologyError::BadCycle(
            "opposite duplicate edges cannot merge".into(),
        ));
    }
    if e.left != c.left || e.right != c.right || e.left == e.right {
        return Err(TopologyError::BadCycle(
            "collinear edges with different faces".into(),
        ));
    }
    let left_side = e.left;
    let right_side = e.right;

    let (new_start, new_end, shared) = if forward {
        (e.start, c.end, e.end)
    } else {
        (c.start, e.end, e.start)
    };
    let new_edge = mesh.add_edge(new_start, new_end);
    mesh.edges[new_edge].left = left_side;
    mesh.edges[new_edge].right = right_side;

    let left_index = mesh
        .edge_index_in(left_side, candidate)
        .ok_or_else(|| TopologyError::BadCycle("candidate missing from left face".into()))?;
    let left_count = mesh.faces[left_side].edges.len();
    let right_index = mesh
        .edge_index_in(right_side, candidate)
        .ok_or_else(|| TopologyError::BadCycle("candidate missing from right face".into()))?;
    let right_count = mesh.faces[right_side].edges.len();

    if forward {
        mesh.replace_edge_range(
            left_side,
            (left_index + left_count - 1) % left_count,
            (left_index + 2) % left_count,
            new_edge,
        );
        mesh.replace_edge_range(
            right_side,
            (right_index + right_count - 2) % right_count,
            (right_index + 1) % right_count,
            new_edge,
        );
    } else {
        mesh.replace_edge_range(
            left_side,
            (left_index + left_count - 2) % left_count,
            (left_index + 1) % left_count,
            new_edge,
        );
        mesh.replace_edge_range(
            right_side,
            (right_index + right_count - 1) % right_count,
            (right_index + 2) % right_count,
            new_edge,
        );
    }

    mesh.vertices.remove(shared);
    mesh.edges.remove(candidate);
    mesh.edges.remove(edge);
    Ok(())
}

/// Merge pairs of adjacent coplanar faces until none remain.
///
/// The absorbed face's annotation goes to `dropped`; the surviving face
/// keeps its own.
pub(crate) fn merge_sides(
    mesh: &mut Mesh,
    dropped: &mut Vec<FaceAnnotation>,
) -> Result<(), TopologyError> {
    let tolerance = Tolerance::DEFAULT;
    'restart: loop {
        let ids: Vec<FaceId> = mesh.faces.keys().collect();
        for face_id in ids {
            let Some(plane) = face_plane_from_points(mesh, face_id) else {
                continue;
            };
            let edge_count = mesh.faces[face_id].edges.len();
            for j in 0..edge_count {
                let edge = mesh.faces[face_id].edges[j];
                let neighbour = mesh.edges[edge].other_face(face_id);
                let Some(neighbour_plane) = face_plane_from_points(mesh, neighbour) else {
                    continue;
                };
                if plane.eq_within(&neighbour_plane, &tolerance) {
                    dropped.push(mesh.faces[neighbour].annotation.clone());
                    merge_neighbours(mesh, face_id, j)?;
                    continue 'restart;
                }
            }
        }
        return Ok(());
    }
}

/// Plane through a face's first three corner positions, from the live
/// positions rather than the cached plane.
fn face_plane_from_points(mesh: &Mesh, face: FaceId) -> Option<Plane> {
    let f = &mesh.faces[face];
    if f.len() < 3 {
        return None;
    }
    let p0 = mesh.position(f.vertices[0]);
    let p1 = mesh.position(f.vertices[1]);
    let p2 = mesh.position(f.vertices[2]);
    Plane::from_points(&p0, &p1, &p2)
}

/// Absorb the neighbour across `face`'s edge at `edge_index` into `face`.
///
/// The run of edges the two faces share disappears along with the
/// vertices strictly inside the run; the neighbour's remaining cycle is
/// appended to `face`'s.
fn merge_neighbours(
    mesh: &mut Mesh,
    face: FaceId,
    edge_index: usize,
) -> Result<(), TopologyError> {
    let edge = mesh.faces[face].edges[edge_index];
    let neighbour = mesh.edges[edge].other_face(face);

    let side_count = mesh.faces[face].edges.len();
    let nb_count = mesh.faces[neighbour].edges.len();
    let mut side_index = edge_index;
    let mut nb_index = mesh
        .edge_index_in(neighbour, edge)
        .ok_or_else(|| TopologyError::Open("neighbour does not share the merge edge".into()))?;

    // walk forward until the two cycles stop sharing edges
    loop {
        side_index = (side_index + 1) % side_count;
        nb_index = (nb_index + nb_count - 1) % nb_count;
        if mesh.faces[face].edges[side_index] != mesh.faces[neighbour].edges[nb_index] {
            break;
        }
    }
    // walk back across the run, counting the shared edges
    let mut count = 0;
    loop {
        side_index = (side_index + side_count - 1) % side_count;
        nb_index = (nb_index + 1) % nb_count;
        if mesh.faces[face].edges[side_index] != mesh.faces[neighbour].edges[nb_index] {
            break;
        }
        count += 1;
    }
    // side_index is the last edge before the run on `face`, nb_index the
    // first after it on the neighbour; rotate both cycles so the shared
    // edges sit at the end
    mesh.rotate_cycle(face, (side_index + count + 1) % side_count);
    mesh.rotate_cycle(neighbour, nb_index);

    let keep = side_count - count;
    mesh.faces[face].edges.truncate(keep);
    mesh.faces[face].vertices.truncate(keep);

    let absorbed = nb_count - count;
    for i in 0..absorbed {
        let e = mesh.faces[neighbour].edges[i];
        let v = mesh.faces[neighbour].vertices[i];
        mesh.edges[e].replace_face(neighbour, face);
        mesh.faces[face].edges.push(e);
        mesh.faces[face].vertices.push(v);
    }

    for i in absorbed..nb_count {
        let e = mesh.faces[neighbour].edges[i];
        mesh.edges.remove(e);
        if i > absorbed {
            let v = mesh.faces[neighbour].vertices[i];
            mesh.vertices.remove(v);
        }
    }
    mesh.faces.remove(neighbour);
    Ok(())
}
