//! Resource management module
//!
//! Handles, per-kind resource tables and the per-shader pipeline cache.

mod handle;
mod resource_table;
mod resource_manager;
pub mod buffer;
pub mod texture;
pub mod shader;
pub mod pipeline_cache;
pub mod render_target;

pub use handle::{ResourceHandle, ResourceKind, HandleAllocator};
pub use resource_table::ResourceTable;
pub use resource_manager::ResourceManager;
pub use buffer::{BufferResource, UsageHint};
pub use texture::TextureResource;
pub use shader::{
    ShaderResource, ShaderInterface, ShaderSource,
    DRAW_UNIFORM_BINDING, TEXTURE_BINDING, LIGHTING_BINDING,
};
pub use pipeline_cache::{PipelineCache, PipelineTemplate};
pub use render_target::RenderTargetResource;
