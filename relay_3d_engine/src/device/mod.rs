/// Explicit GPU device abstraction
///
/// Everything the backend needs from an explicit graphics API: resource
/// factories, command recording and presentation. Backends (Vulkan) provide
/// the concrete types.

use std::sync::Arc;
use crate::error::Result;

pub mod buffer;
pub mod texture;
pub mod shader;
pub mod pipeline;
pub mod binding_group;
pub mod command_list;
pub mod swapchain;
#[cfg(test)]
pub mod mock_device;

pub use buffer::*;
pub use texture::*;
pub use shader::*;
pub use pipeline::*;
pub use binding_group::*;
pub use command_list::*;
pub use swapchain::*;

// ============================================================================
// Configuration
// ============================================================================

/// Validation message severity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Device configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Which validation messages are reported
    pub debug_severity: DebugSeverity,
    /// Panic when the validation layer reports an error
    pub panic_on_error: bool,
    /// Count validation messages per severity
    pub enable_validation_stats: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Relay3D Application".to_string(),
            app_version: (1, 0, 0),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            panic_on_error: false,
            enable_validation_stats: cfg!(debug_assertions),
        }
    }
}

/// Validation message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Hardware limits the backend needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Required alignment of dynamic uniform buffer offsets
    pub min_uniform_offset_alignment: u64,
    /// Largest uniform range a single binding may expose
    pub max_uniform_range: u64,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            min_uniform_offset_alignment: 256,
            max_uniform_range: 16384,
        }
    }
}

/// Device statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub buffers_created: u64,
    pub textures_created: u64,
    pub pipelines_created: u64,
    pub binding_groups_created: u64,
    pub frames_submitted: u64,
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Explicit graphics device
///
/// Central factory for GPU resources plus the single queue used for
/// submission and presentation. One frame is in flight at a time:
/// `acquire_next_image` waits for the previous submission to finish.
pub trait GraphicsDevice: Send + Sync {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a texture, uploading `desc.data` when present
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    fn create_shader_module(&mut self, desc: ShaderDesc) -> Result<Arc<dyn ShaderModule>>;

    fn create_pipeline_layout(&mut self, desc: PipelineLayoutDesc) -> Result<Arc<dyn PipelineLayout>>;

    /// Create an immutable graphics pipeline (validates `desc` first)
    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Create a binding group for set `set_index` of `layout`
    ///
    /// `resources` are given in binding order of the set layout.
    fn create_binding_group(
        &mut self,
        layout: &Arc<dyn PipelineLayout>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>>;

    fn create_command_list(&mut self) -> Result<Box<dyn CommandList>>;

    /// Acquire the next presentable image
    ///
    /// Returns `Ok(None)` when the surface is out of date and must be resized.
    fn acquire_next_image(&mut self) -> Result<Option<Arc<dyn SwapchainImage>>>;

    /// Submit a finished command list and present `image`
    fn submit_and_present(&mut self, commands: &dyn CommandList, image: &Arc<dyn SwapchainImage>) -> Result<()>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    /// Recreate surface-sized objects after a window resize
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Format of the presentable images
    fn surface_format(&self) -> TextureFormat;

    /// Current size of the presentable images
    fn surface_extent(&self) -> (u32, u32);

    fn limits(&self) -> DeviceLimits;

    fn stats(&self) -> DeviceStats;
}
