/// Central resource manager: handle allocation plus one table per resource kind
///
/// Creation goes through the injected device and returns a fresh handle.
/// Lookups with a stale or zero handle return `None`; destroy and update with
/// such a handle return `false` and do nothing else.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::device::{
    GraphicsDevice, BufferDesc, TextureDesc, TextureRegion, SamplerType, TextureFormat,
};
use crate::resource::{
    HandleAllocator, ResourceHandle, ResourceKind, ResourceTable,
    BufferResource, UsageHint, TextureResource, ShaderResource, ShaderSource,
    RenderTargetResource,
};
use crate::{engine_debug, engine_info};

pub struct ResourceManager {
    handles: HandleAllocator,
    buffers: ResourceTable<BufferResource>,
    textures: ResourceTable<TextureResource>,
    shaders: ResourceTable<ShaderResource>,
    render_targets: ResourceTable<RenderTargetResource>,
}

impl ResourceManager {
    /// Create a new empty resource manager
    pub fn new() -> Self {
        Self {
            handles: HandleAllocator::new(),
            buffers: ResourceTable::new(),
            textures: ResourceTable::new(),
            shaders: ResourceTable::new(),
            render_targets: ResourceTable::new(),
        }
    }

    // ===== CREATION =====

    /// Create a buffer, optionally filled with `data` from offset 0
    pub fn create_buffer(
        &mut self,
        device: &mut dyn GraphicsDevice,
        desc: BufferDesc,
        hint: UsageHint,
        data: Option<&[u8]>,
    ) -> Result<ResourceHandle> {
        if let Some(bytes) = data {
            if bytes.len() as u64 > desc.size {
                return Err(Error::InvalidResource(format!(
                    "initial data ({} bytes) larger than buffer ({} bytes)",
                    bytes.len(), desc.size
                )));
            }
        }
        let usage = desc.usage;
        let buffer = device.create_buffer(desc)?;
        if let Some(bytes) = data {
            buffer.update(0, bytes)?;
        }
        let handle = self.next_handle(ResourceKind::Buffer);
        self.buffers.insert(handle.id(), BufferResource::new(buffer, usage, hint));
        Ok(handle)
    }

    pub fn create_texture(
        &mut self,
        device: &mut dyn GraphicsDevice,
        desc: TextureDesc,
        sampler: SamplerType,
    ) -> Result<ResourceHandle> {
        if let Some(data) = &desc.data {
            if data.len() != desc.byte_len() {
                return Err(Error::InvalidResource(format!(
                    "{}x{} {:?} texture expects {} bytes, got {}",
                    desc.width, desc.height, desc.format, desc.byte_len(), data.len()
                )));
            }
        }
        let texture = device.create_texture(desc)?;
        let handle = self.next_handle(ResourceKind::Texture);
        self.textures.insert(handle.id(), TextureResource::new(texture, sampler));
        Ok(handle)
    }

    pub fn create_shader(
        &mut self,
        device: &mut dyn GraphicsDevice,
        source: &ShaderSource,
        color_format: TextureFormat,
        depth_format: Option<TextureFormat>,
    ) -> Result<ResourceHandle> {
        let shader = ShaderResource::create(device, source, color_format, depth_format)?;
        let handle = self.next_handle(ResourceKind::Shader);
        self.shaders.insert(handle.id(), shader);
        Ok(handle)
    }

    /// Group existing textures as a render target
    ///
    /// The color texture must be a render target; the depth texture, when
    /// given, must be a depth format of the same size.
    pub fn create_render_target(
        &mut self,
        color: ResourceHandle,
        depth: Option<ResourceHandle>,
    ) -> Result<ResourceHandle> {
        let color_info = *self
            .texture(color)
            .ok_or_else(|| Error::InvalidResource(format!("color texture {} not found", color.id())))?
            .info();
        if !color_info.usage.is_render_target() {
            return Err(Error::InvalidResource("color texture is not a render target".to_string()));
        }
        if let Some(depth) = depth {
            let depth_info = *self
                .texture(depth)
                .ok_or_else(|| Error::InvalidResource(format!("depth texture {} not found", depth.id())))?
                .info();
            if !depth_info.format.is_depth() {
                return Err(Error::InvalidResource("depth texture has a color format".to_string()));
            }
            if (depth_info.width, depth_info.height) != (color_info.width, color_info.height) {
                return Err(Error::InvalidResource("depth and color sizes differ".to_string()));
            }
        }
        let handle = self.next_handle(ResourceKind::RenderTarget);
        self.render_targets.insert(handle.id(), RenderTargetResource {
            color,
            depth,
            width: color_info.width,
            height: color_info.height,
        });
        Ok(handle)
    }

    fn next_handle(&mut self, kind: ResourceKind) -> ResourceHandle {
        ResourceHandle::new(self.handles.allocate(), kind)
    }

    // ===== UPDATES =====

    /// Partial buffer overwrite; `Ok(false)` for a stale handle
    pub fn update_buffer(&self, handle: ResourceHandle, offset: u64, data: &[u8]) -> Result<bool> {
        match self.buffer(handle) {
            Some(buffer) => buffer.update(offset, data).map(|_| true),
            None => Ok(false),
        }
    }

    /// Texture sub-region write; `Ok(false)` for a stale handle
    pub fn update_texture(&self, handle: ResourceHandle, region: TextureRegion, data: &[u8]) -> Result<bool> {
        match self.texture(handle) {
            Some(texture) => texture.update_region(region, data).map(|_| true),
            None => Ok(false),
        }
    }

    // ===== LOOKUPS =====

    fn lookup<'a, T>(table: &'a ResourceTable<T>, handle: ResourceHandle, kind: ResourceKind) -> Option<&'a T> {
        if handle.is_null() || handle.kind() != kind {
            return None;
        }
        table.get(handle.id())
    }

    pub fn buffer(&self, handle: ResourceHandle) -> Option<&BufferResource> {
        Self::lookup(&self.buffers, handle, ResourceKind::Buffer)
    }

    pub fn texture(&self, handle: ResourceHandle) -> Option<&TextureResource> {
        Self::lookup(&self.textures, handle, ResourceKind::Texture)
    }

    pub fn shader(&self, handle: ResourceHandle) -> Option<&ShaderResource> {
        Self::lookup(&self.shaders, handle, ResourceKind::Shader)
    }

    pub fn shader_mut(&mut self, handle: ResourceHandle) -> Option<&mut ShaderResource> {
        if handle.is_null() || handle.kind() != ResourceKind::Shader {
            return None;
        }
        self.shaders.get_mut(handle.id())
    }

    pub fn render_target(&self, handle: ResourceHandle) -> Option<&RenderTargetResource> {
        Self::lookup(&self.render_targets, handle, ResourceKind::RenderTarget)
    }

    /// Non-zero and still present in its table
    pub fn is_valid(&self, handle: ResourceHandle) -> bool {
        match handle.kind() {
            ResourceKind::Buffer => self.buffer(handle).is_some(),
            ResourceKind::Texture => self.texture(handle).is_some(),
            ResourceKind::Shader => self.shader(handle).is_some(),
            ResourceKind::RenderTarget => self.render_target(handle).is_some(),
        }
    }

    // ===== DESTRUCTION =====

    /// Remove the entry and release its GPU objects; false for a stale handle
    ///
    /// Render targets only drop their grouping, never the textures.
    pub fn destroy(&mut self, handle: ResourceHandle) -> bool {
        if handle.is_null() {
            return false;
        }
        let removed = match handle.kind() {
            ResourceKind::Buffer => self.buffers.remove(handle.id()).is_some(),
            ResourceKind::Texture => self.textures.remove(handle.id()).is_some(),
            ResourceKind::Shader => self.shaders.remove(handle.id()).is_some(),
            ResourceKind::RenderTarget => self.render_targets.remove(handle.id()).is_some(),
        };
        if removed {
            engine_debug!("relay3d::resource", "Destroyed {:?} {}", handle.kind(), handle.id());
        }
        removed
    }

    /// Release every resource and reset the id counter; returns the number released
    ///
    /// A second call releases nothing.
    pub fn shutdown(&mut self) -> usize {
        // Render targets first: they only reference textures
        let released = self.render_targets.clear()
            + self.shaders.clear()
            + self.textures.clear()
            + self.buffers.clear();
        self.handles.reset();
        if released > 0 {
            engine_info!("relay3d::resource", "Released {} resources", released);
        }
        released
    }

    // ===== STATS =====

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn render_target_count(&self) -> usize {
        self.render_targets.len()
    }

    /// Id the next created resource will receive
    pub fn next_id(&self) -> u64 {
        self.handles.peek()
    }

    /// Shared texture object behind a handle
    pub fn texture_object(&self, handle: ResourceHandle) -> Option<Arc<dyn crate::device::Texture>> {
        self.texture(handle).map(|t| Arc::clone(t.texture()))
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
