//! Mesh adaptation layer
//!
//! Turns separate attribute streams into one interleaved vertex buffer (plus
//! index buffer), expanding topologies the explicit API cannot draw.

pub mod vertex;
pub mod mesh;
pub mod expand;
pub mod mesh_cache;

pub use vertex::Vertex;
pub use mesh::{Mesh, MeshKey, MeshStore, MeshTopology};
pub use expand::{AdaptedMesh, adapt, interleave, fan_to_triangles, loop_to_lines};
pub use mesh_cache::{MeshCache, MeshCacheEntry, MeshVersion, PrepareOutcome, PRIMITIVE_RESTART_INDEX};
