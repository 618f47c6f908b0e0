/// Per-draw uniform block layouts and the packer that fills them
///
/// The byte layout is a contract with the built-in shaders. Offsets are pinned
/// by tests; a change here must be mirrored in the shader sources.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec4};

/// Which per-draw block a shader reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBlockKind {
    /// Matrices, tint and scalars (160 bytes)
    Default,
    /// Default block with a normal matrix inserted before the tint (224 bytes)
    Lit,
}

impl UniformBlockKind {
    /// Size in bytes of the block, before slot padding
    pub fn size(&self) -> usize {
        match self {
            UniformBlockKind::Default => std::mem::size_of::<DefaultUniformBlock>(),
            UniformBlockKind::Lit => std::mem::size_of::<LitUniformBlock>(),
        }
    }
}

/// Default-mode block
///
/// | field          | offset |
/// |----------------|--------|
/// | modelview      | 0      |
/// | projection     | 64     |
/// | tint           | 128    |
/// | point_size     | 144    |
/// | eye_separation | 148    |
/// | focal_length   | 152    |
/// | padding        | 156    |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DefaultUniformBlock {
    pub modelview: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub tint: [f32; 4],
    pub point_size: f32,
    pub eye_separation: f32,
    pub focal_length: f32,
    pub _pad: f32,
}

/// Lit-mode block: normal matrix at 128, tint at 192, scalars at 208
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LitUniformBlock {
    pub modelview: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Inverse-transpose of the modelview, padded to a mat4
    pub normal_matrix: [[f32; 4]; 4],
    pub tint: [f32; 4],
    pub point_size: f32,
    pub eye_separation: f32,
    pub focal_length: f32,
    pub _pad: f32,
}

/// Current per-draw state as set by the drawing layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawUniforms {
    pub modelview: Mat4,
    pub projection: Mat4,
    pub tint: Vec4,
    pub point_size: f32,
    pub eye_separation: f32,
    pub focal_length: f32,
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self {
            modelview: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            tint: Vec4::ONE,
            point_size: 1.0,
            eye_separation: 0.0,
            focal_length: 0.0,
        }
    }
}

impl DrawUniforms {
    pub fn default_block(&self) -> DefaultUniformBlock {
        DefaultUniformBlock {
            modelview: self.modelview.to_cols_array_2d(),
            projection: self.projection.to_cols_array_2d(),
            tint: self.tint.to_array(),
            point_size: self.point_size,
            eye_separation: self.eye_separation,
            focal_length: self.focal_length,
            _pad: 0.0,
        }
    }

    pub fn lit_block(&self) -> LitUniformBlock {
        LitUniformBlock {
            modelview: self.modelview.to_cols_array_2d(),
            projection: self.projection.to_cols_array_2d(),
            normal_matrix: self.normal_matrix().to_cols_array_2d(),
            tint: self.tint.to_array(),
            point_size: self.point_size,
            eye_separation: self.eye_separation,
            focal_length: self.focal_length,
            _pad: 0.0,
        }
    }

    /// Inverse-transpose of the upper 3x3 of the modelview
    ///
    /// A singular modelview yields the identity. Singularity is judged
    /// against the axis lengths, so uniformly tiny scales still invert.
    pub fn normal_matrix(&self) -> Mat4 {
        let upper = Mat3::from_mat4(self.modelview);
        let axis_volume = upper.x_axis.length() * upper.y_axis.length() * upper.z_axis.length();
        if upper.determinant().abs() <= f32::EPSILON * axis_volume || axis_volume == 0.0 {
            return Mat4::IDENTITY;
        }
        let inverse = upper.inverse();
        if !inverse.is_finite() {
            return Mat4::IDENTITY;
        }
        Mat4::from_mat3(inverse.transpose())
    }

    /// Replace `out` with the raw bytes of the block for `kind`
    pub fn pack_into(&self, kind: UniformBlockKind, out: &mut Vec<u8>) {
        out.clear();
        match kind {
            UniformBlockKind::Default => out.extend_from_slice(bytemuck::bytes_of(&self.default_block())),
            UniformBlockKind::Lit => out.extend_from_slice(bytemuck::bytes_of(&self.lit_block())),
        }
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
