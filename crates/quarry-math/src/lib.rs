#![warn(missing_docs)]

//! Math types for the quarry brush kernel.
//!
//! Thin wrappers around nalgebra providing the domain types the
//! polyhedral engine needs: points, planes, rays, bounding boxes,
//! grid snapping, and tolerance constants.
//!
//! All geometry is double precision. Comparisons go through the
//! epsilon helpers here; nothing downstream compares floats raw.

use nalgebra::{UnitQuaternion, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = nalgebra::Unit<Vector3<f64>>;

/// A unit quaternion rotation.
pub type Quat = UnitQuaternion<f64>;

/// Distance below which two positions are the same point, in world units.
pub const POSITION_EPSILON: f64 = 1e-3;

/// Angle below which two unit normals are the same direction, in radians.
pub const ANGULAR_EPSILON: f64 = 1e-5;

/// Half-extent of the default world cube used to seed plane intersection.
pub const WORLD_HALF_EXTENT: f64 = 4096.0;

/// `true` if `f` is zero within the position epsilon.
#[inline]
pub fn fzero(f: f64) -> bool {
    f.abs() < POSITION_EPSILON
}

/// `true` if `f` is strictly positive beyond the position epsilon.
#[inline]
pub fn fpos(f: f64) -> bool {
    f > POSITION_EPSILON
}

/// `true` if `f` is strictly negative beyond the position epsilon.
#[inline]
pub fn fneg(f: f64) -> bool {
    f < -POSITION_EPSILON
}

/// `true` if two points coincide within the position epsilon.
#[inline]
pub fn points_equal(a: &Point3, b: &Point3) -> bool {
    (a - b).norm() < POSITION_EPSILON
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in world units.
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Default editor tolerances (1e-3 units linear, 1e-5 rad angular).
    pub const DEFAULT: Self = Self {
        linear: POSITION_EPSILON,
        angular: ANGULAR_EPSILON,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }

    /// Check if two unit vectors point the same way within tolerance.
    pub fn directions_equal(&self, a: &Vec3, b: &Vec3) -> bool {
        a.dot(b) > 1.0 - self.angular
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// The X axis.
    X,
    /// The Y axis.
    Y,
    /// The Z axis.
    Z,
}

impl Axis {
    /// Unit vector along this axis.
    pub fn unit(&self) -> Vec3 {
        match self {
            Axis::X => Vec3::x(),
            Axis::Y => Vec3::y(),
            Axis::Z => Vec3::z(),
        }
    }
}

/// Classification of a point against an oriented plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointStatus {
    /// On the positive (normal) side of the plane.
    Above,
    /// On the negative side of the plane.
    Below,
    /// On the plane within the position epsilon.
    Inside,
}

/// A rigid motion applied to a whole brush.
///
/// Passed to the annotation adapter so a host can keep texture
/// projections locked to the geometry they decorate.
#[derive(Debug, Clone, Copy)]
pub enum RigidMotion {
    /// Translation by a delta.
    Translate(Vec3),
    /// Quarter rotation about a coordinate axis through `center`.
    Rotate90 {
        /// Rotation axis.
        axis: Axis,
        /// Center of rotation.
        center: Point3,
        /// Clockwise when viewed from the positive end of the axis.
        clockwise: bool,
    },
    /// Arbitrary rotation about `center`.
    Rotate {
        /// The rotation.
        rotation: Quat,
        /// Center of rotation.
        center: Point3,
    },
    /// Mirror across the plane through `center` perpendicular to `axis`.
    Flip {
        /// Mirror axis.
        axis: Axis,
        /// A point on the mirror plane.
        center: Point3,
    },
}

// =============================================================================
// Plane
// =============================================================================

/// An oriented plane `n · x = d` bounding the half-space `n · x ≤ d`.
///
/// The normal is kept unit length; the half-space on the normal side
/// is outside the solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vec3,
    /// Signed offset along the normal.
    pub distance: f64,
}

impl Plane {
    /// Create a plane from a (not necessarily unit) normal and offset.
    ///
    /// The offset is rescaled together with the normal so the described
    /// plane is unchanged.
    pub fn new(normal: Vec3, distance: f64) -> Self {
        let len = normal.norm();
        Self {
            normal: normal / len,
            distance: distance / len,
        }
    }

    /// Plane through three points of a clockwise-from-outside cycle.
    ///
    /// The outward normal is `(p2 − p0) × (p1 − p0)`. Returns `None` when
    /// the points are collinear within the position epsilon.
    pub fn from_points(p0: &Point3, p1: &Point3, p2: &Point3) -> Option<Self> {
        let normal = (p2 - p0).cross(&(p1 - p0));
        let len = normal.norm();
        if len < POSITION_EPSILON {
            return None;
        }
        let normal = normal / len;
        Some(Self {
            normal,
            distance: normal.dot(&p0.coords),
        })
    }

    /// Signed distance from `p` to the plane; positive is outside.
    #[inline]
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) - self.distance
    }

    /// Classify `p` against the plane within the position epsilon.
    pub fn point_status(&self, p: &Point3) -> PointStatus {
        let d = self.signed_distance(p);
        if d > POSITION_EPSILON {
            PointStatus::Above
        } else if d < -POSITION_EPSILON {
            PointStatus::Below
        } else {
            PointStatus::Inside
        }
    }

    /// Distance along `origin + t * direction` to the plane.
    ///
    /// `direction` need not be unit length; `t` is in multiples of it.
    /// Returns `None` when the line is parallel to the plane. The result
    /// may be negative; callers filter for the side they care about.
    pub fn intersect_line(&self, origin: &Point3, direction: &Vec3) -> Option<f64> {
        let denom = self.normal.dot(direction);
        if denom.abs() < 1e-12 {
            return None;
        }
        Some(-self.signed_distance(origin) / denom)
    }

    /// Distance along a ray to the plane, or `None` if parallel.
    #[inline]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f64> {
        self.intersect_line(&ray.origin, &ray.direction)
    }

    /// The same plane bounding the opposite half-space.
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    /// The plane translated by `delta`.
    pub fn translated(&self, delta: &Vec3) -> Self {
        Self {
            normal: self.normal,
            distance: self.distance + self.normal.dot(delta),
        }
    }

    /// Whether two planes describe the same oriented half-space boundary.
    pub fn eq_within(&self, other: &Plane, tol: &Tolerance) -> bool {
        tol.directions_equal(&self.normal, &other.normal)
            && tol.is_zero(self.distance - other.distance)
    }

    /// Index (0/1/2) of the normal's dominant component.
    pub fn dominant_axis(&self) -> usize {
        let n = &self.normal;
        if n.x.abs() >= n.y.abs() && n.x.abs() >= n.z.abs() {
            0
        } else if n.y.abs() >= n.z.abs() {
            1
        } else {
            2
        }
    }
}

/// Project a point onto the coordinate plane perpendicular to the
/// dominant axis of `normal`, dropping that component.
///
/// Orientation of the result is irrelevant to parity-based containment
/// tests, which is the only consumer.
pub fn project_to_dominant_plane(normal: &Vec3, p: &Point3) -> (f64, f64) {
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    if ax >= ay && ax >= az {
        (p.y, p.z)
    } else if ay >= az {
        (p.x, p.z)
    } else {
        (p.x, p.y)
    }
}

// =============================================================================
// Ray
// =============================================================================

/// A ray with unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray; the direction is normalized.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Evaluate the ray at parameter `t`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }

    /// Slab test against an AABB.
    ///
    /// Returns the entry and exit parameters when the ray hits the box.
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        for i in 0..3 {
            let d = self.direction[i];
            let o = self.origin[i];
            if d.abs() < 1e-12 {
                if o < aabb.min[i] || o > aabb.max[i] {
                    return None;
                }
            } else {
                let t1 = (aabb.min[i] - o) / d;
                let t2 = (aabb.max[i] - o) / d;
                t_min = t_min.max(t1.min(t2));
                t_max = t_max.min(t1.max(t2));
            }
        }
        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }
}

// =============================================================================
// Axis-aligned bounding box
// =============================================================================

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Symmetric cube around the origin with the given half-extent.
    pub fn world(half_extent: f64) -> Self {
        Self {
            min: Point3::new(-half_extent, -half_extent, -half_extent),
            max: Point3::new(half_extent, half_extent, half_extent),
        }
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Test if two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb3) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Test if a point is inside the box (boundary counts).
    pub fn contains_point(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// The box translated by `delta`.
    pub fn translated(&self, delta: &Vec3) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Center point of the box.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Edge lengths of the box.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

// =============================================================================
// Snapping and exact axis transforms
// =============================================================================

/// Snap a scalar to the nearest integer if it is within the position
/// epsilon of one; otherwise leave it unchanged.
pub fn snap_scalar(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < POSITION_EPSILON {
        r
    } else {
        v
    }
}

/// Snap each coordinate to the nearest integer where it is within the
/// position epsilon of one.
pub fn snap_point(p: &Point3) -> Point3 {
    Point3::new(snap_scalar(p.x), snap_scalar(p.y), snap_scalar(p.z))
}

/// Round a scalar to the nearest multiple of `grid`.
pub fn round_to_grid(v: f64, grid: f64) -> f64 {
    (v / grid).round() * grid
}

/// Round each coordinate to the nearest multiple of `grid`.
pub fn snap_point_to_grid(p: &Point3, grid: f64) -> Point3 {
    Point3::new(
        round_to_grid(p.x, grid),
        round_to_grid(p.y, grid),
        round_to_grid(p.z, grid),
    )
}

/// Quarter-turn a point about an axis through `center`, exactly.
///
/// Implemented with component swaps rather than a rotation matrix so
/// grid-aligned positions stay grid-aligned bit for bit. `clockwise` is
/// as seen looking down the axis from its positive end.
pub fn rotate90_point(p: &Point3, axis: Axis, center: &Point3, clockwise: bool) -> Point3 {
    let d = p - center;
    let r = match (axis, clockwise) {
        (Axis::X, false) => Vec3::new(d.x, -d.z, d.y),
        (Axis::X, true) => Vec3::new(d.x, d.z, -d.y),
        (Axis::Y, false) => Vec3::new(d.z, d.y, -d.x),
        (Axis::Y, true) => Vec3::new(-d.z, d.y, d.x),
        (Axis::Z, false) => Vec3::new(-d.y, d.x, d.z),
        (Axis::Z, true) => Vec3::new(d.y, -d.x, d.z),
    };
    center + r
}

/// Mirror a point across the plane through `center` perpendicular to `axis`.
pub fn flip_point(p: &Point3, axis: Axis, center: &Point3) -> Point3 {
    let mut q = *p;
    match axis {
        Axis::X => q.x = 2.0 * center.x - p.x,
        Axis::Y => q.y = 2.0 * center.y - p.y,
        Axis::Z => q.z = 2.0 * center.z - p.z,
    }
    q
}

/// Rotate a point about `center` by a unit quaternion.
pub fn rotate_point(p: &Point3, rotation: &Quat, center: &Point3) -> Point3 {
    center + rotation.transform_vector(&(p - center))
}

/// Apply a rigid motion to a point.
pub fn apply_motion(p: &Point3, motion: &RigidMotion) -> Point3 {
    match motion {
        RigidMotion::Translate(delta) => p + delta,
        RigidMotion::Rotate90 {
            axis,
            center,
            clockwise,
        } => rotate90_point(p, *axis, center, *clockwise),
        RigidMotion::Rotate { rotation, center } => rotate_point(p, rotation, center),
        RigidMotion::Flip { axis, center } => flip_point(p, *axis, center),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_status() {
        let plane = Plane::new(Vec3::z(), 10.0);
        assert_eq!(
            plane.point_status(&Point3::new(0.0, 0.0, 11.0)),
            PointStatus::Above
        );
        assert_eq!(
            plane.point_status(&Point3::new(5.0, -3.0, 9.0)),
            PointStatus::Below
        );
        assert_eq!(
            plane.point_status(&Point3::new(1.0, 2.0, 10.0 + 1e-4)),
            PointStatus::Inside
        );
    }

    #[test]
    fn test_from_points_outward_normal() {
        // Top face of a cube: clockwise seen from above (+Z outside).
        let p0 = Point3::new(-1.0, -1.0, 1.0);
        let p1 = Point3::new(-1.0, 1.0, 1.0);
        let p2 = Point3::new(1.0, 1.0, 1.0);
        let plane = Plane::from_points(&p0, &p1, &p2).unwrap();
        assert_relative_eq!(plane.normal.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(plane.distance, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_points_collinear() {
        let p0 = Point3::origin();
        let p1 = Point3::new(1.0, 0.0, 0.0);
        let p2 = Point3::new(2.0, 0.0, 0.0);
        assert!(Plane::from_points(&p0, &p1, &p2).is_none());
    }

    #[test]
    fn test_intersect_line() {
        let plane = Plane::new(Vec3::x(), 4.0);
        let t = plane
            .intersect_line(&Point3::origin(), &Vec3::new(2.0, 0.0, 0.0))
            .unwrap();
        assert_relative_eq!(t, 2.0, epsilon = 1e-12);
        assert!(plane
            .intersect_line(&Point3::origin(), &Vec3::y())
            .is_none());
    }

    #[test]
    fn test_plane_eq_within() {
        let tol = Tolerance::DEFAULT;
        let a = Plane::new(Vec3::new(0.0, 0.0, 2.0), 8.0);
        let b = Plane::new(Vec3::z(), 4.0 + 1e-5);
        assert!(a.eq_within(&b, &tol));
        assert!(!a.eq_within(&b.flipped(), &tol));
    }

    #[test]
    fn test_ray_aabb() {
        let aabb = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::x());
        let (t0, t1) = ray.intersect_aabb(&aabb).unwrap();
        assert_relative_eq!(t0, 5.0, epsilon = 1e-12);
        assert_relative_eq!(t1, 6.0, epsilon = 1e-12);

        let miss = Ray::new(Point3::new(-5.0, 2.0, 0.5), Vec3::x());
        assert!(miss.intersect_aabb(&aabb).is_none());
    }

    #[test]
    fn test_snap_point() {
        let p = Point3::new(3.9997, -2.0004, 5.5);
        let s = snap_point(&p);
        assert_eq!(s.x, 4.0);
        assert_eq!(s.y, -2.0);
        assert_eq!(s.z, 5.5);
    }

    #[test]
    fn test_snap_to_grid() {
        let p = Point3::new(3.4, -2.6, 5.5);
        let s = snap_point_to_grid(&p, 1.0);
        assert_eq!(s, Point3::new(3.0, -3.0, 6.0));
        let s8 = snap_point_to_grid(&p, 8.0);
        assert_eq!(s8, Point3::new(0.0, 0.0, 8.0));
    }

    #[test]
    fn test_rotate90_exact() {
        let center = Point3::new(8.0, 8.0, 0.0);
        let p = Point3::new(16.0, 8.0, 3.0);
        let q = rotate90_point(&p, Axis::Z, &center, false);
        assert_eq!(q, Point3::new(8.0, 16.0, 3.0));
        // four quarter turns are the identity, exactly
        let mut r = p;
        for _ in 0..4 {
            r = rotate90_point(&r, Axis::Z, &center, true);
        }
        assert_eq!(r, p);
    }

    #[test]
    fn test_flip_involution() {
        let center = Point3::new(1.0, 2.0, 3.0);
        let p = Point3::new(-4.0, 0.5, 7.0);
        let q = flip_point(&flip_point(&p, Axis::Y, &center), Axis::Y, &center);
        assert_eq!(q, p);
    }

    #[test]
    fn test_dominant_projection() {
        let n = Vec3::new(0.1, -0.9, 0.2);
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(project_to_dominant_plane(&n, &p), (1.0, 3.0));
    }
}
