#![warn(missing_docs)]

//! Half-space clipping and convex construction for the quarry brush kernel.
//!
//! The clipper reduces a closed convex mesh to its intersection with the
//! negative half-space of a plane, in five stages:
//! 1. **Mark vertices** — classify every vertex against the plane and
//!    short-circuit when the plane misses or swallows the mesh.
//! 2. **Mark and split edges** — reduce endpoint marks onto edges; edges
//!    that straddle the plane get a new snapped vertex at the crossing.
//! 3. **Update faces** — keep, drop, or split each face; splitting splices
//!    a seam edge into the cycle.
//! 4. **Seal** — sort the seam edges into a polygon on the plane and build
//!    the new face from them.
//! 5. **Collect garbage** — drop dead vertices and edges, refresh bounds.
//!
//! All classification marks live in pass-local tables keyed by handle, so
//! a pass that returns early leaves no trace on the mesh.
//!
//! The builders construct meshes from scratch: a fixed-topology cube for
//! a bounding box, and repeated clipping for an arbitrary half-space list.

mod builder;
mod clip;
mod marks;

pub use builder::{cube_mesh, from_planes, BuildError};
pub use clip::{clip, CutResult};
pub use marks::{EdgeMark, VertexMark};
