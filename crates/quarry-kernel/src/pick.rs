//! Ray picking against brush faces.

use quarry_math::{fneg, fzero, project_to_dominant_plane, Point3, Ray};
use quarry_topo::{FaceId, Mesh};

/// Nearest front-face intersection of `ray` with the mesh.
///
/// Back faces are ignored so a pick from inside a brush falls through
/// to whatever lies behind it.
pub fn pick(mesh: &Mesh, ray: &Ray) -> Option<(FaceId, f64)> {
    ray.intersect_aabb(&mesh.bounds)?;

    let mut best: Option<(FaceId, f64)> = None;
    for (id, face) in &mesh.faces {
        if !fneg(face.plane.normal.dot(&ray.direction)) {
            continue;
        }
        let Some(dist) = face.plane.intersect_ray(ray) else {
            continue;
        };
        if dist < 0.0 {
            continue;
        }
        let hit = ray.at(dist);
        if point_in_face(mesh, id, &hit) && best.map_or(true, |(_, d)| dist < d) {
            best = Some((id, dist));
        }
    }
    best
}

/// Even-odd crossing test of a point known to lie on the face's plane,
/// in the projection that drops the normal's dominant component.
///
/// An edge crosses the positive X axis when its endpoints straddle Y
/// (counting zero as negative) and the crossing is at non-negative X.
/// Landing exactly on a polygon vertex counts as inside.
fn point_in_face(mesh: &Mesh, face: FaceId, hit: &Point3) -> bool {
    let normal = &mesh.faces[face].plane.normal;
    let (hx, hy) = project_to_dominant_plane(normal, hit);
    let positions = mesh.face_positions(face);

    let (lx, ly) = project_to_dominant_plane(normal, &positions[positions.len() - 1]);
    let (mut x0, mut y0) = (lx - hx, ly - hy);

    let mut crossings = 0;
    for p in &positions {
        let (px, py) = project_to_dominant_plane(normal, p);
        let (x1, y1) = (px - hx, py - hy);

        if (fzero(x0) && fzero(y0)) || (fzero(x1) && fzero(y1)) {
            crossings = 1;
            break;
        }
        if (y0 > 0.0 && y1 <= 0.0) || (y0 <= 0.0 && y1 > 0.0) {
            if x0 > 0.0 && x1 > 0.0 {
                crossings += 1;
            } else if (x0 > 0.0 && x1 <= 0.0) || (x0 <= 0.0 && x1 > 0.0) {
                let x = -y0 * (x1 - x0) / (y1 - y0) + x0;
                if x >= 0.0 {
                    crossings += 1;
                }
            }
        }
        x0 = x1;
        y0 = y1;
    }
    crossings % 2 == 1
}
