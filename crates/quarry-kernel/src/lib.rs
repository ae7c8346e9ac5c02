#![warn(missing_docs)]

//! Convex brush geometry kernel for quarry.
//!
//! Provides the [`Brush`] type — a convex polyhedron maintained as a
//! vertex/edge/face graph under incremental cutting, direct vertex,
//! edge, and face dragging, rigid transforms, grid snapping, and CSG
//! subtraction.
//!
//! # Example
//!
//! ```
//! use quarry_kernel::{Aabb3, Brush, FaceAnnotation, Plane, Point3, Vec3};
//!
//! let bounds = Aabb3::new(Point3::new(-32.0, -32.0, -32.0), Point3::new(32.0, 32.0, 32.0));
//! let mut brush = Brush::cube(&bounds);
//! let cut = Plane::new(Vec3::new(1.0, 1.0, 0.0), 16.0);
//! brush.add_half_space(&cut, FaceAnnotation::with_material("bevel")).unwrap();
//! assert!(brush.closed());
//! ```
//!
//! Every mutation either completes and leaves the brush satisfying the
//! full invariant set, or reports failure and leaves it untouched;
//! speculative work happens on a clone.

pub use quarry_clip;
pub use quarry_csg;
pub use quarry_edit;
pub use quarry_math;
pub use quarry_topo;

pub use quarry_clip::{BuildError, CutResult};
pub use quarry_edit::MoveResult;
pub use quarry_math::{
    Aabb3, Axis, Dir3, Plane, Point3, PointStatus, Quat, Ray, RigidMotion, Tolerance, Vec3,
    POSITION_EPSILON, WORLD_HALF_EXTENT,
};
pub use quarry_topo::{
    AnnotationAdapter, Edge, EdgeId, Face, FaceAnnotation, FaceId, Mesh, PlainAdapter,
    TopologyError, Vertex, VertexId,
};

mod pick;

use quarry_math::{apply_motion, rotate90_point, rotate_point};

use thiserror::Error;

/// Failure of a brush operation. The brush is unchanged in every case.
#[derive(Error, Debug)]
pub enum GeometryError {
    /// A handle, plane list, or delta the caller supplied is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The operation would have produced an invalid brush.
    #[error("operation would degenerate the brush: {0}")]
    Degenerate(String),

    /// The operation would have removed all volume.
    #[error("operation removes the entire brush")]
    Empty,

    /// Rounding pushed a vertex onto the wrong side of a plane.
    #[error("numeric failure: {0}")]
    Numeric(String),
}

impl From<BuildError> for GeometryError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::TooFewPlanes => GeometryError::InvalidInput("too few half-spaces"),
            BuildError::Empty { .. } => GeometryError::Empty,
            BuildError::Degenerate(e) => GeometryError::Degenerate(e.to_string()),
        }
    }
}

impl From<TopologyError> for GeometryError {
    fn from(err: TopologyError) -> Self {
        GeometryError::Degenerate(err.to_string())
    }
}

/// Result type for brush operations.
pub type Result<T> = std::result::Result<T, GeometryError>;

/// A convex brush: the bounded intersection of half-spaces, maintained
/// as a polyhedral mesh with face annotations.
#[derive(Debug, Clone)]
pub struct Brush {
    mesh: Mesh,
}

impl Brush {
    // =========================================================================
    // Construction
    // =========================================================================

    /// The axis-aligned cuboid filling `bounds`.
    pub fn cube(bounds: &Aabb3) -> Self {
        Self {
            mesh: quarry_clip::cube_mesh(bounds),
        }
    }

    /// Intersect a list of annotated half-spaces within `world_bounds`.
    ///
    /// Duplicate planes are ignored; a plane that removes everything is
    /// an error, as is a list that fails to bound a solid.
    pub fn from_planes(
        planes: &[(Plane, FaceAnnotation)],
        world_bounds: &Aabb3,
    ) -> Result<Self> {
        Ok(Self {
            mesh: quarry_clip::from_planes(planes, world_bounds)?,
        })
    }

    /// Wrap an existing mesh. The mesh must satisfy the invariants.
    pub fn from_mesh(mesh: Mesh) -> Result<Self> {
        mesh.check_integrity()?;
        Ok(Self { mesh })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Read-only access to the underlying mesh.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Iterator over vertex handles.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.mesh.vertices.keys()
    }

    /// Iterator over edge handles.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.mesh.edges.keys()
    }

    /// Iterator over face handles.
    pub fn faces(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.mesh.faces.keys()
    }

    /// Position of a vertex.
    pub fn position(&self, vertex: VertexId) -> Point3 {
        self.mesh.position(vertex)
    }

    /// A face's data.
    pub fn face(&self, face: FaceId) -> &Face {
        &self.mesh.faces[face]
    }

    /// An edge's data.
    pub fn edge(&self, edge: EdgeId) -> &Edge {
        &self.mesh.edges[edge]
    }

    /// Cached axis-aligned bounds.
    pub fn bounds(&self) -> Aabb3 {
        self.mesh.bounds
    }

    /// Whether every edge has two distinct incident faces.
    pub fn closed(&self) -> bool {
        self.mesh.closed()
    }

    /// Enclosed volume.
    pub fn volume(&self) -> f64 {
        self.mesh.volume()
    }

    /// Whether `point` is inside the brush (boundary counts).
    pub fn contains_point(&self, point: &Point3) -> bool {
        quarry_csg::contains_point(&self.mesh, point)
    }

    /// Whether this brush shares volume with `other`.
    pub fn intersects(&self, other: &Brush) -> bool {
        quarry_csg::intersects(&self.mesh, &other.mesh)
    }

    /// Nearest front-face hit of `ray`, as a face handle and distance.
    pub fn pick(&self, ray: &Ray) -> Option<(FaceId, f64)> {
        pick::pick(&self.mesh, ray)
    }

    /// Find the vertex at `position`, within the position epsilon.
    pub fn find_vertex(&self, position: &Point3) -> Option<VertexId> {
        self.mesh.find_vertex(position)
    }

    /// Find the edge between two positions, in either orientation.
    pub fn find_edge(&self, p1: &Point3, p2: &Point3) -> Option<EdgeId> {
        self.mesh.find_edge(p1, p2)
    }

    /// Find the face whose corner cycle matches `positions`.
    pub fn find_face(&self, positions: &[Point3]) -> Option<FaceId> {
        self.mesh.find_face(positions)
    }

    // =========================================================================
    // Cutting
    // =========================================================================

    /// Clip the brush to the negative half-space of `plane`.
    ///
    /// On `Split` the new face carries `annotation` and the result lists
    /// the annotations of any removed faces. `Redundant` and `Empty`
    /// leave the brush untouched, as does a degenerate outcome.
    pub fn add_half_space(
        &mut self,
        plane: &Plane,
        annotation: FaceAnnotation,
    ) -> Result<CutResult> {
        let mut test = self.mesh.clone();
        match quarry_clip::clip(&mut test, plane, annotation) {
            CutResult::Redundant => Ok(CutResult::Redundant),
            CutResult::Empty => Ok(CutResult::Empty),
            split @ CutResult::Split { .. } => {
                test.check_integrity()?;
                self.mesh = test;
                Ok(split)
            }
        }
    }

    /// Apply a list of half-spaces in order, failing fast when one
    /// removes the entire brush.
    pub fn add_half_spaces(&mut self, planes: &[(Plane, FaceAnnotation)]) -> Result<()> {
        let mut test = self.mesh.clone();
        for (plane, annotation) in planes {
            if let CutResult::Empty = quarry_clip::clip(&mut test, plane, annotation.clone()) {
                return Err(GeometryError::Empty);
            }
        }
        test.check_integrity()?;
        self.mesh = test;
        Ok(())
    }

    // =========================================================================
    // Direct editing
    // =========================================================================

    /// Drag a vertex by `delta`.
    ///
    /// The drag is clipped at planes in its way and continued, so it may
    /// complete in several internal steps. A drag that would break
    /// convexity, or land on another vertex with `merge_on_collision`
    /// unset, is rejected with `moved: false` and no change.
    pub fn move_vertex(
        &mut self,
        vertex: VertexId,
        delta: Vec3,
        merge_on_collision: bool,
        adapter: &dyn AnnotationAdapter,
    ) -> Result<MoveResult<VertexId>> {
        if !self.mesh.vertices.contains_key(vertex) {
            return Err(GeometryError::InvalidInput("unknown vertex handle"));
        }
        check_delta(&delta)?;

        let mut test = self.mesh.clone();
        let mut dropped = Vec::new();
        match quarry_edit::move_vertex(
            &mut test,
            vertex,
            delta,
            merge_on_collision,
            adapter,
            &mut dropped,
        ) {
            Ok(result) if result.moved => {
                if test.check_integrity().is_err() {
                    return Ok(MoveResult::unmoved(vertex));
                }
                self.mesh = test;
                Ok(result)
            }
            Ok(result) => Ok(result),
            Err(_) => Ok(MoveResult::unmoved(vertex)),
        }
    }

    /// Drag both endpoints of an edge by `delta`. All or nothing.
    pub fn move_edge(
        &mut self,
        edge: EdgeId,
        delta: Vec3,
        adapter: &dyn AnnotationAdapter,
    ) -> Result<MoveResult<EdgeId>> {
        if !self.mesh.edges.contains_key(edge) {
            return Err(GeometryError::InvalidInput("unknown edge handle"));
        }
        check_delta(&delta)?;
        let mut dropped = Vec::new();
        Ok(
            quarry_edit::move_edge(&mut self.mesh, edge, delta, adapter, &mut dropped)
                .unwrap_or(MoveResult {
                    moved: false,
                    handle: Some(edge),
                }),
        )
    }

    /// Drag every vertex of a face by `delta`. All or nothing.
    pub fn move_face(
        &mut self,
        face: FaceId,
        delta: Vec3,
        adapter: &dyn AnnotationAdapter,
    ) -> Result<MoveResult<FaceId>> {
        if !self.mesh.faces.contains_key(face) {
            return Err(GeometryError::InvalidInput("unknown face handle"));
        }
        check_delta(&delta)?;
        let mut dropped = Vec::new();
        Ok(
            quarry_edit::move_face(&mut self.mesh, face, delta, adapter, &mut dropped)
                .unwrap_or(MoveResult {
                    moved: false,
                    handle: Some(face),
                }),
        )
    }

    /// Split an edge at its midpoint and drag the new vertex by `delta`.
    pub fn split_and_move_edge(
        &mut self,
        edge: EdgeId,
        delta: Vec3,
        adapter: &dyn AnnotationAdapter,
    ) -> Result<MoveResult<EdgeId>> {
        if !self.mesh.edges.contains_key(edge) {
            return Err(GeometryError::InvalidInput("unknown edge handle"));
        }
        check_delta(&delta)?;
        let mut dropped = Vec::new();
        Ok(
            quarry_edit::split_and_move_edge(&mut self.mesh, edge, delta, adapter, &mut dropped)
                .unwrap_or(MoveResult {
                    moved: false,
                    handle: Some(edge),
                }),
        )
    }

    /// Fan a face around its centroid and drag the centroid by `delta`.
    pub fn split_and_move_face(
        &mut self,
        face: FaceId,
        delta: Vec3,
        adapter: &dyn AnnotationAdapter,
    ) -> Result<MoveResult<FaceId>> {
        if !self.mesh.faces.contains_key(face) {
            return Err(GeometryError::InvalidInput("unknown face handle"));
        }
        check_delta(&delta)?;
        let mut dropped = Vec::new();
        Ok(
            quarry_edit::split_and_move_face(&mut self.mesh, face, delta, adapter, &mut dropped)
                .unwrap_or(MoveResult {
                    moved: false,
                    handle: Some(face),
                }),
        )
    }

    // =========================================================================
    // Rigid transforms
    // =========================================================================

    /// Translate the brush by `delta`.
    pub fn translate(&mut self, delta: Vec3, adapter: &dyn AnnotationAdapter) {
        let motion = RigidMotion::Translate(delta);
        for vertex in self.mesh.vertices.values_mut() {
            vertex.position += delta;
        }
        for face in self.mesh.faces.values_mut() {
            face.plane = face.plane.translated(&delta);
            face.annotation = adapter.transform(&face.annotation, &motion);
        }
        self.mesh.bounds = self.mesh.bounds.translated(&delta);
    }

    /// Quarter-turn the brush about an axis through `center`.
    ///
    /// Exact on lattice positions: coordinates are swapped, not
    /// multiplied through a rotation matrix.
    pub fn rotate90(
        &mut self,
        axis: Axis,
        center: Point3,
        clockwise: bool,
        adapter: &dyn AnnotationAdapter,
    ) {
        let motion = RigidMotion::Rotate90 {
            axis,
            center,
            clockwise,
        };
        self.apply_rigid_motion(&motion, adapter);
    }

    /// Rotate the brush about `center` by a unit quaternion.
    pub fn rotate(&mut self, rotation: Quat, center: Point3, adapter: &dyn AnnotationAdapter) {
        let motion = RigidMotion::Rotate { rotation, center };
        self.apply_rigid_motion(&motion, adapter);
    }

    /// Mirror the brush across the plane through `center` perpendicular
    /// to `axis`.
    ///
    /// Mirroring reverses orientation, so every face cycle is reversed
    /// and every edge swaps sides to keep normals pointing outward.
    pub fn flip(&mut self, axis: Axis, center: Point3, adapter: &dyn AnnotationAdapter) {
        let motion = RigidMotion::Flip { axis, center };
        self.apply_rigid_motion(&motion, adapter);
        self.mesh.invert_orientation();
    }

    fn apply_rigid_motion(&mut self, motion: &RigidMotion, adapter: &dyn AnnotationAdapter) {
        for vertex in self.mesh.vertices.values_mut() {
            vertex.position = apply_motion(&vertex.position, motion);
        }
        for face in self.mesh.faces.values_mut() {
            face.plane = transform_plane(&face.plane, motion);
            face.annotation = adapter.transform(&face.annotation, motion);
        }
        self.mesh.recompute_bounds();
    }

    // =========================================================================
    // Snapping and subtraction
    // =========================================================================

    /// Whether snapping to multiples of `grid` would keep the brush valid.
    pub fn can_snap_vertices(&self, grid: u32) -> bool {
        quarry_edit::can_snap_vertices(&self.mesh, grid)
    }

    /// Snap every vertex to the nearest multiple of `grid`.
    ///
    /// Returns `false` and leaves the brush unchanged when the snapped
    /// shape would violate an invariant.
    pub fn snap_vertices(&mut self, grid: u32) -> bool {
        quarry_edit::snap_vertices(&mut self.mesh, grid)
    }

    /// Subtract `other`, returning convex brushes covering the difference.
    ///
    /// Seam faces between fragments take the adapter default; faces cut
    /// on `other`'s planes inherit its annotations.
    pub fn subtract(&self, other: &Brush, adapter: &dyn AnnotationAdapter) -> Vec<Brush> {
        quarry_csg::subtract(&self.mesh, &other.mesh, adapter)
            .into_iter()
            .map(|mesh| Brush { mesh })
            .collect()
    }
}

fn check_delta(delta: &Vec3) -> Result<()> {
    if delta.x.is_finite() && delta.y.is_finite() && delta.z.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::InvalidInput("non-finite delta"))
    }
}

/// Transform a plane under a rigid motion, keeping the normal outward.
fn transform_plane(plane: &Plane, motion: &RigidMotion) -> Plane {
    let on_plane = Point3::from(plane.normal * plane.distance);
    let moved = apply_motion(&on_plane, motion);
    let normal = match motion {
        RigidMotion::Translate(_) => plane.normal,
        RigidMotion::Rotate90 {
            axis, clockwise, ..
        } => rotate90_point(
            &Point3::from(plane.normal),
            *axis,
            &Point3::origin(),
            *clockwise,
        )
        .coords,
        RigidMotion::Rotate { rotation, .. } => {
            rotate_point(&Point3::from(plane.normal), rotation, &Point3::origin()).coords
        }
        RigidMotion::Flip { axis, .. } => {
            let mut n = plane.normal;
            match axis {
                Axis::X => n.x = -n.x,
                Axis::Y => n.y = -n.y,
                Axis::Z => n.z = -n.z,
            }
            n
        }
    };
    Plane {
        normal,
        distance: normal.dot(&moved.coords),
    }
}
