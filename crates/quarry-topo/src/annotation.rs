//! Face annotations and the host adapter that interprets them.
//!
//! The engine never looks inside an annotation. It clones annotations when
//! geometry is duplicated, asks the adapter to transform them under rigid
//! motions, and asks it to produce defaults for faces that have no better
//! source (seam faces from cuts and subtractions).

use quarry_math::{Plane, RigidMotion, Vec3};

/// Material name plus texture projection parameters for one face.
///
/// Opaque to the engine; the fields exist so hosts can round-trip their
/// data through geometric operations without a side table.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAnnotation {
    /// Material identifier.
    pub material: String,
    /// First projection axis.
    pub x_axis: Vec3,
    /// Second projection axis.
    pub y_axis: Vec3,
    /// Offset along `x_axis`.
    pub x_offset: f64,
    /// Offset along `y_axis`.
    pub y_offset: f64,
    /// Projection rotation in degrees.
    pub rotation: f64,
    /// Scale along `x_axis`.
    pub x_scale: f64,
    /// Scale along `y_axis`.
    pub y_scale: f64,
}

impl Default for FaceAnnotation {
    fn default() -> Self {
        Self {
            material: String::new(),
            x_axis: Vec3::x(),
            y_axis: -Vec3::y(),
            x_offset: 0.0,
            y_offset: 0.0,
            rotation: 0.0,
            x_scale: 1.0,
            y_scale: 1.0,
        }
    }
}

impl FaceAnnotation {
    /// Annotation with the given material and default projection.
    pub fn with_material(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            ..Self::default()
        }
    }
}

/// Host capability for interpreting annotations.
///
/// Implementations must be pure: same inputs, same outputs, no hidden
/// state. The engine calls them mid-operation and assumes the calls
/// cannot fail.
pub trait AnnotationAdapter {
    /// How an annotation changes when its face undergoes a rigid motion.
    fn transform(&self, annotation: &FaceAnnotation, motion: &RigidMotion) -> FaceAnnotation;

    /// Annotation for a newly created face on `plane` with no better source.
    fn default_for(&self, plane: &Plane) -> FaceAnnotation;
}

/// Adapter for hosts that do not lock textures to geometry.
///
/// Transforms are the identity; defaults use the axis-aligned projection
/// for the plane's dominant normal component.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainAdapter;

impl AnnotationAdapter for PlainAdapter {
    fn transform(&self, annotation: &FaceAnnotation, _motion: &RigidMotion) -> FaceAnnotation {
        annotation.clone()
    }

    fn default_for(&self, plane: &Plane) -> FaceAnnotation {
        let (x_axis, y_axis) = paraxial_axes(&plane.normal);
        FaceAnnotation {
            x_axis,
            y_axis,
            ..FaceAnnotation::default()
        }
    }
}

/// Axis-aligned projection axes for a face normal.
///
/// Picks the coordinate plane most parallel to the face, the way
/// Quake-family tools project textures by default.
pub fn paraxial_axes(normal: &Vec3) -> (Vec3, Vec3) {
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    if az >= ax && az >= ay {
        (Vec3::x(), -Vec3::y())
    } else if ax >= ay {
        (Vec3::y(), -Vec3::z())
    } else {
        (Vec3::x(), -Vec3::z())
    }
}
