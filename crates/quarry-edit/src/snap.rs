//! Grid snapping with validation.

use quarry_math::snap_point_to_grid;
use quarry_topo::Mesh;

/// Produce the snapped mesh if it is still a valid convex polyhedron.
fn snapped(mesh: &Mesh, grid: u32) -> Option<Mesh> {
    if grid == 0 {
        return None;
    }
    let step = f64::from(grid);
    let mut test = mesh.clone();
    for vertex in test.vertices.values_mut() {
        vertex.position = snap_point_to_grid(&vertex.position, step);
    }
    if test.refresh_all_planes().is_err() {
        return None;
    }
    test.recompute_bounds();
    test.check_integrity().ok()?;
    Some(test)
}

/// Whether snapping every vertex to the grid would keep the mesh valid.
pub fn can_snap_vertices(mesh: &Mesh, grid: u32) -> bool {
    snapped(mesh, grid).is_some()
}

/// Snap every vertex to the nearest multiple of `grid`.
///
/// Commits and returns `true` only when the snapped mesh still satisfies
/// every invariant; otherwise the mesh is unchanged. Thin or oblique
/// brushes can legitimately fail to snap.
pub fn snap_vertices(mesh: &mut Mesh, grid: u32) -> bool {
    match snapped(mesh, grid) {
        Some(result) => {
            *mesh = result;
            true
        }
        None => false,
    }
}
