/// Pipeline, pipeline layout and their descriptors

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::device::{
    ShaderModule, BufferFormat, TextureFormat, BindingGroupLayoutDesc,
};

/// Primitive topology natively supported by the explicit API
///
/// Fans and closed loops are not here: the mesh layer expands them first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Strip topologies need primitive restart and a fixed index format
    pub fn is_strip(&self) -> bool {
        matches!(self, PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip)
    }
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Binding index
    pub binding: u32,
    pub format: BufferFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex binding description (per-vertex rate only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    pub binding: u32,
    /// Stride in bytes between consecutive vertices
    pub stride: u32,
}

/// Vertex input layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

// ===== FIXED-FUNCTION STATE =====

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Comparison operator for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    Always,
}

/// Blend factor for color blending equations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Rasterization state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::None,
            front_face: FrontFace::CounterClockwise,
        }
    }
}

/// Depth test state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthState {
    pub test_enable: bool,
    pub write_enable: bool,
    pub compare_op: CompareOp,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enable: true,
            write_enable: true,
            compare_op: CompareOp::LessOrEqual,
        }
    }
}

/// Color blend state (single attachment)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendState {
    pub enable: bool,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
}

impl BlendState {
    /// Standard alpha blending
    pub fn alpha() -> Self {
        Self {
            enable: true,
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
        }
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self::alpha()
    }
}

// ===== PIPELINE LAYOUT =====

/// Descriptor for a pipeline layout (one entry per binding set)
#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutDesc {
    pub set_layouts: Vec<BindingGroupLayoutDesc>,
}

/// Pipeline layout (binding-set layouts of a shader program)
pub trait PipelineLayout: Send + Sync {
    /// Description the layout was created from
    fn desc(&self) -> &PipelineLayoutDesc;
}

// ===== PIPELINE =====

/// Descriptor for creating a graphics pipeline
#[derive(Clone)]
pub struct PipelineDesc {
    pub vertex_shader: Arc<dyn ShaderModule>,
    pub fragment_shader: Arc<dyn ShaderModule>,
    pub layout: Arc<dyn PipelineLayout>,
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    /// Index format for primitive restart; required for strips, forbidden otherwise
    pub strip_index_format: Option<IndexType>,
    pub rasterization: RasterizationState,
    pub depth: DepthState,
    pub blend: BlendState,
    /// Format of the color attachment the pipeline renders into
    pub color_format: TextureFormat,
    /// Format of the depth attachment, if any
    pub depth_format: Option<TextureFormat>,
}

impl PipelineDesc {
    /// Check the topology / strip index format pairing
    pub fn validate(&self) -> Result<()> {
        match (self.topology.is_strip(), self.strip_index_format) {
            (true, None) => Err(Error::InvalidResource(format!(
                "{:?} pipeline requires a strip index format",
                self.topology
            ))),
            (false, Some(_)) => Err(Error::InvalidResource(format!(
                "{:?} pipeline must not set a strip index format",
                self.topology
            ))),
            _ => Ok(()),
        }
    }
}

/// Immutable graphics pipeline
pub trait Pipeline: Send + Sync {
    fn topology(&self) -> PrimitiveTopology;
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
