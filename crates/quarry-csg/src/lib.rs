#![warn(missing_docs)]

//! CSG subtraction between convex brushes.
//!
//! Subtracting one convex solid from another yields a non-convex region
//! in general, so the result is a set of convex fragments whose union is
//! the difference. The sweep walks the cutter's faces in input order:
//! the fragment for face `j` is the minuend clipped to the outside of
//! face `j` and the inside of faces `0..j`. Fragment faces keep their
//! provenance: survivors of the minuend keep its annotations, the face
//! on the flipped cutter plane takes the cutter's annotation, and seams
//! against earlier fragments take the adapter default.

use quarry_clip::{clip, CutResult};
use quarry_math::{Plane, Point3, POSITION_EPSILON};
use quarry_topo::{AnnotationAdapter, FaceAnnotation, Mesh};

/// Subtract `cutter` from `minuend`, returning convex fragments.
///
/// The union of the fragments covers exactly `minuend \ cutter`. When
/// the two do not overlap the minuend comes back whole as the only
/// fragment; when the cutter swallows the minuend the result is empty.
/// Zero-volume slivers are discarded.
pub fn subtract(
    minuend: &Mesh,
    cutter: &Mesh,
    adapter: &dyn AnnotationAdapter,
) -> Vec<Mesh> {
    if !intersects(minuend, cutter) {
        return vec![minuend.clone()];
    }

    let cutter_faces: Vec<(Plane, FaceAnnotation)> = cutter
        .faces
        .values()
        .map(|f| (f.plane, f.annotation.clone()))
        .collect();

    let mut fragments = Vec::new();
    for (j, (plane, annotation)) in cutter_faces.iter().enumerate() {
        let mut fragment = minuend.clone();

        // keep what lies outside the cutter through this face
        if let CutResult::Empty = clip(&mut fragment, &plane.flipped(), annotation.clone()) {
            continue;
        }

        // and inside the cutter through every earlier face
        let mut dead = false;
        for (earlier, _) in &cutter_faces[..j] {
            let seam = adapter.default_for(earlier);
            if let CutResult::Empty = clip(&mut fragment, earlier, seam) {
                dead = true;
                break;
            }
        }
        if dead {
            continue;
        }

        if fragment.volume() < POSITION_EPSILON || fragment.check_integrity().is_err() {
            continue;
        }
        fragments.push(fragment);
    }
    fragments
}

/// Whether two convex brushes share volume.
///
/// Touching faces or edges without overlap do not count. Cheap AABB
/// rejection first, then the minuend is clipped by every cutter plane;
/// whatever survives is the intersection volume.
pub fn intersects(a: &Mesh, b: &Mesh) -> bool {
    if !a.bounds.overlaps(&b.bounds) {
        return false;
    }
    let mut test = a.clone();
    for face in b.faces.values() {
        if let CutResult::Empty = clip(&mut test, &face.plane, FaceAnnotation::default()) {
            return false;
        }
    }
    test.volume() > POSITION_EPSILON
}

/// Whether `point` lies inside the brush (its boundary counts).
pub fn contains_point(mesh: &Mesh, point: &Point3) -> bool {
    mesh.faces
        .values()
        .all(|f| f.plane.signed_distance(point) <= POSITION_EPSILON)
}
