/// Interleaved vertex record shared by every built-in shader

use bytemuck::{Pod, Zeroable};
use crate::device::{VertexLayout, VertexBinding, VertexAttribute, BufferFormat};

/// One interleaved vertex, 48-byte stride
///
/// | attribute | offset | format |
/// |-----------|--------|--------|
/// | position  | 0      | 3 x f32 |
/// | color     | 12     | 4 x f32 |
/// | texcoord  | 28     | 2 x f32 |
/// | normal    | 36     | 3 x f32 |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub texcoord: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const STRIDE: u32 = 48;
    pub const POSITION_OFFSET: u32 = 0;
    pub const COLOR_OFFSET: u32 = 12;
    pub const TEXCOORD_OFFSET: u32 = 28;
    pub const NORMAL_OFFSET: u32 = 36;

    pub const DEFAULT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    pub const DEFAULT_TEXCOORD: [f32; 2] = [0.0, 0.0];
    pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

    /// Vertex at `position` with default color, texcoord and normal
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            color: Self::DEFAULT_COLOR,
            texcoord: Self::DEFAULT_TEXCOORD,
            normal: Self::DEFAULT_NORMAL,
        }
    }

    /// Pipeline vertex input for this record (binding 0, locations 0..=3)
    pub fn layout() -> VertexLayout {
        VertexLayout {
            bindings: vec![VertexBinding { binding: 0, stride: Self::STRIDE }],
            attributes: vec![
                VertexAttribute { location: 0, binding: 0, format: BufferFormat::R32G32B32_SFLOAT, offset: Self::POSITION_OFFSET },
                VertexAttribute { location: 1, binding: 0, format: BufferFormat::R32G32B32A32_SFLOAT, offset: Self::COLOR_OFFSET },
                VertexAttribute { location: 2, binding: 0, format: BufferFormat::R32G32_SFLOAT, offset: Self::TEXCOORD_OFFSET },
                VertexAttribute { location: 3, binding: 0, format: BufferFormat::R32G32B32_SFLOAT, offset: Self::NORMAL_OFFSET },
            ],
        }
    }
}
