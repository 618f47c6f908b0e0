//! Polymorphic backend interface
//!
//! The drawing layer talks to exactly one `RenderBackend`, chosen once at
//! startup and injected into it. Creation calls return a handle that is
//! invalid (id 0) on failure; the failure is logged, never raised.

use glam::{Mat4, Vec4};
use crate::error::Result;
use crate::device::{BufferUsage, TextureDesc, TextureFormat, TextureRegion, SamplerType, DeviceStats};
use crate::resource::{ResourceHandle, ShaderSource, UsageHint};
use crate::mesh::{Mesh, MeshKey};
use crate::shading::{BuiltinVariant, ShadingMode};
use crate::uniform::{Light, Material};

mod draw_state;
mod explicit_backend;

pub use draw_state::DrawState;
pub use explicit_backend::ExplicitBackend;

pub trait RenderBackend {
    // ===== RESOURCES =====

    fn create_buffer(&mut self, usage: BufferUsage, hint: UsageHint, size: u64, data: Option<&[u8]>) -> ResourceHandle;

    /// `sampler` defaults to the backend's configured sampler
    fn create_texture(&mut self, desc: TextureDesc, sampler: Option<SamplerType>) -> ResourceHandle;

    fn create_shader(&mut self, source: &ShaderSource) -> ResourceHandle;

    /// Group a color texture and optional depth texture as a render target
    ///
    /// The color texture must use `color_format()`.
    fn create_render_target(&mut self, color: ResourceHandle, depth: Option<ResourceHandle>) -> ResourceHandle;

    /// Partial overwrite; false for a stale handle or an out-of-range write
    fn update_buffer(&mut self, handle: ResourceHandle, offset: u64, data: &[u8]) -> bool;

    fn update_texture(&mut self, handle: ResourceHandle, region: TextureRegion, data: &[u8]) -> bool;

    fn destroy(&mut self, handle: ResourceHandle) -> bool;

    fn is_valid(&self, handle: ResourceHandle) -> bool;

    /// Read GPU buffer contents back to the host
    ///
    /// Not implemented: there is no completion tracking for GPU writes.
    fn read_buffer(&mut self, handle: ResourceHandle) -> Result<Vec<u8>>;

    /// Color format render-target textures must use
    fn color_format(&self) -> TextureFormat;

    // ===== FRAME =====

    /// Returns false when the frame was skipped (surface out of date)
    fn begin_frame(&mut self) -> Result<bool>;

    fn end_frame(&mut self) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// `None` resets to the full target
    fn set_viewport(&mut self, viewport: Option<(f32, f32, f32, f32)>) -> Result<()>;

    fn clear(&mut self, color: [f32; 4], depth: f32) -> Result<()>;

    /// `None` selects the default (visible) target; stale handles are ignored
    fn set_render_target(&mut self, target: Option<ResourceHandle>) -> Result<()>;

    // ===== DRAW STATE =====

    fn set_matrices(&mut self, modelview: Mat4, projection: Mat4);

    fn set_tint(&mut self, tint: Vec4);

    fn set_point_size(&mut self, size: f32);

    fn set_stereo(&mut self, eye_separation: f32, focal_length: f32);

    fn bind_texture(&mut self, texture: Option<ResourceHandle>);

    /// Request the untransformed screen-space variant for textured draws
    fn set_screen_space(&mut self, enabled: bool);

    fn bind_shader(&mut self, shader: Option<ResourceHandle>);

    /// Bind a built-in variant explicitly (takes precedence like a user shader)
    fn bind_builtin(&mut self, variant: Option<BuiltinVariant>);

    fn set_lighting_enabled(&mut self, enabled: bool);

    /// False when `index` is out of range
    fn set_light(&mut self, index: usize, light: Light) -> bool;

    fn set_global_ambient(&mut self, ambient: Vec4);

    fn set_material(&mut self, material: Material);

    /// Shader the next draw would use
    fn shading_mode(&self) -> ShadingMode;

    // ===== MESHES =====

    /// Upload or refresh the cached buffers for `key`; false if nothing is drawable
    fn prepare_mesh(&mut self, key: MeshKey, mesh: &Mesh) -> bool;

    /// Record a draw of the prepared mesh with the current state
    fn draw_mesh(&mut self, key: MeshKey) -> Result<()>;

    fn forget_mesh(&mut self, key: MeshKey) -> bool;

    // ===== LIFETIME =====

    fn stats(&self) -> DeviceStats;

    /// Close any open frame and release every resource; safe to call twice
    fn shutdown(&mut self);
}
