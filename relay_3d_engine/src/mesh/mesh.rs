/// Generic mesh description handed over by the drawing layer

use slotmap::{new_key_type, SlotMap};
use crate::device::PrimitiveTopology;

new_key_type! {
    /// Stable, generation-counted mesh identity
    pub struct MeshKey;
}

/// Arena of meshes owned by the drawing layer
pub type MeshStore = SlotMap<MeshKey, Mesh>;

/// Topology as the immediate-mode API knows it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshTopology {
    Points,
    Lines,
    LineStrip,
    /// Closed line strip (last vertex connects back to the first)
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl MeshTopology {
    /// Topology actually drawn once fans and loops are expanded
    pub fn draw_topology(&self) -> PrimitiveTopology {
        match self {
            MeshTopology::Points => PrimitiveTopology::PointList,
            MeshTopology::Lines | MeshTopology::LineLoop => PrimitiveTopology::LineList,
            MeshTopology::LineStrip => PrimitiveTopology::LineStrip,
            MeshTopology::Triangles | MeshTopology::TriangleFan => PrimitiveTopology::TriangleList,
            MeshTopology::TriangleStrip => PrimitiveTopology::TriangleStrip,
        }
    }

    /// True for topologies the explicit API cannot draw directly
    pub fn needs_expansion(&self) -> bool {
        matches!(self, MeshTopology::LineLoop | MeshTopology::TriangleFan)
    }
}

/// Separate attribute streams plus topology and optional indices
///
/// Streams other than `positions` may be empty or shorter than `positions`;
/// missing entries take the vertex defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub texcoords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Option<Vec<u32>>,
    pub topology: MeshTopology,
}

impl Mesh {
    /// Positions-only mesh
    pub fn new(topology: MeshTopology, positions: Vec<[f32; 3]>) -> Self {
        Self {
            positions,
            colors: Vec::new(),
            texcoords: Vec::new(),
            normals: Vec::new(),
            indices: None,
            topology,
        }
    }

    pub fn with_colors(mut self, colors: Vec<[f32; 4]>) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_texcoords(mut self, texcoords: Vec<[f32; 2]>) -> Self {
        self.texcoords = texcoords;
        self
    }

    pub fn with_normals(mut self, normals: Vec<[f32; 3]>) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, |i| i.len())
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
