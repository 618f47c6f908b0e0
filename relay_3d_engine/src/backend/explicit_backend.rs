/// `RenderBackend` over an explicit `GraphicsDevice`
///
/// Resolves the immediate-mode state into what the explicit API needs before
/// each draw: a pipeline for (shader, topology), a binding group for
/// (shader, texture), a uniform-ring slot holding the packed per-draw block,
/// and an open render pass on the current target.

use std::sync::Arc;
use glam::{Mat4, Vec4};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::config::BackendConfig;
use crate::device::{
    GraphicsDevice, Buffer, BufferDesc, BufferUsage, BindingGroup, BindingResource,
    Texture, TextureDesc, TextureFormat, TextureRegion, TextureUsage, SamplerType, IndexType,
    Viewport, DeviceStats,
};
use crate::resource::{ResourceManager, ResourceHandle, ResourceKind, ShaderSource, UsageHint};
use crate::mesh::{Mesh, MeshCache, MeshKey, PrepareOutcome};
use crate::uniform::{UniformRing, UniformBlockKind, LightingBlock, Light, Material};
use crate::shading::{
    BuiltinShaderSet, BuiltinShaderSources, BuiltinVariant, ShadingMode, select_shading_mode,
};
use crate::frame::{FrameRecorder, FrameState, PassTarget, DepthPool, DepthSlot};
use crate::backend::{RenderBackend, DrawState};
use crate::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};

const SOURCE: &str = "relay3d::backend";

/// Depth format of every pass and pipeline
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::D32_FLOAT;

/// Binding groups are cached per (shader, texture) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BindingKey {
    shader: u64,
    /// 0 when the shader samples nothing
    texture: u64,
}

pub struct ExplicitBackend {
    config: BackendConfig,
    resources: ResourceManager,
    meshes: MeshCache,
    ring: Option<UniformRing>,
    lighting_buffer: Option<Arc<dyn Buffer>>,
    builtins: BuiltinShaderSet,
    white_texture: ResourceHandle,
    binding_groups: FxHashMap<BindingKey, Arc<dyn BindingGroup>>,
    depth_pool: DepthPool,
    recorder: FrameRecorder,
    state: DrawState,
    staging: Vec<u8>,
    color_format: TextureFormat,
    shut_down: bool,
    /// Declared last so every GPU object above is dropped before it
    device: Box<dyn GraphicsDevice>,
}

impl ExplicitBackend {
    /// Create the ring, lighting buffer, fallback texture and built-in shaders
    pub fn new(
        mut device: Box<dyn GraphicsDevice>,
        config: BackendConfig,
        shaders: &BuiltinShaderSources,
    ) -> Result<Self> {
        let largest_block = UniformBlockKind::Lit.size() as u32;
        if config.uniform_slot_size < largest_block {
            return Err(Error::InitializationFailed(format!(
                "uniform slot size {} is smaller than the {}-byte lit block",
                config.uniform_slot_size, largest_block
            )));
        }

        let limits = device.limits();
        let ring = UniformRing::new(
            device.as_mut(),
            config.uniform_slot_size,
            config.uniform_ring_slots,
            limits.min_uniform_offset_alignment,
        )?;
        let lighting_buffer = device.create_buffer(BufferDesc {
            size: std::mem::size_of::<LightingBlock>() as u64,
            usage: BufferUsage::Uniform,
        })?;

        let color_format = device.surface_format();
        let mut resources = ResourceManager::new();
        let builtins = BuiltinShaderSet::create(
            &mut resources,
            device.as_mut(),
            shaders,
            color_format,
            Some(DEPTH_FORMAT),
        )?;
        let white_texture = resources.create_texture(
            device.as_mut(),
            TextureDesc {
                width: 1,
                height: 1,
                format: TextureFormat::R8G8B8A8_UNORM,
                usage: TextureUsage::Sampled,
                data: Some(vec![255; 4]),
            },
            SamplerType::NearestRepeat,
        )?;

        engine_info!(
            SOURCE,
            "Backend ready: {} built-in shaders, uniform ring {} x {} bytes",
            builtins.len(), config.uniform_ring_slots, ring.stride()
        );

        let recorder = FrameRecorder::new(config.clear_color, config.clear_depth);
        Ok(Self {
            config,
            resources,
            meshes: MeshCache::new(),
            ring: Some(ring),
            lighting_buffer: Some(lighting_buffer),
            builtins,
            white_texture,
            binding_groups: FxHashMap::default(),
            depth_pool: DepthPool::new(DEPTH_FORMAT),
            recorder,
            state: DrawState::default(),
            staging: Vec::with_capacity(UniformBlockKind::Lit.size()),
            color_format,
            shut_down: false,
            device,
        })
    }

    // ===== QUERIES =====

    /// Shader the next draw would use, given the current state
    pub fn shading_mode(&self) -> ShadingMode {
        let inputs = self.state.shading_inputs(
            |h| self.resources.is_valid(h),
            self.builtins.contains(BuiltinVariant::Lit),
        );
        select_shading_mode(&inputs)
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn mesh_cache(&self) -> &MeshCache {
        &self.meshes
    }

    pub fn ring(&self) -> Option<&UniformRing> {
        self.ring.as_ref()
    }

    pub fn builtins(&self) -> &BuiltinShaderSet {
        &self.builtins
    }

    pub fn frame_state(&self) -> FrameState {
        self.recorder.state()
    }

    pub fn draw_state(&self) -> &DrawState {
        &self.state
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn binding_group_count(&self) -> usize {
        self.binding_groups.len()
    }

    /// Scratch depth currently pooled for `target` (`None` is the default target)
    pub fn scratch_depth(&self, target: Option<ResourceHandle>) -> Option<Arc<dyn Texture>> {
        let slot = target.map_or(DepthSlot::Default, |t| DepthSlot::Target(t.id()));
        self.depth_pool.get(slot).cloned()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // ===== INTERNALS =====

    fn ensure_running(&self, what: &str) -> Result<()> {
        if self.shut_down {
            return Err(Error::InvalidState(format!("{} after shutdown", what)));
        }
        Ok(())
    }

    fn handle_or_invalid(&self, result: Result<ResourceHandle>, kind: ResourceKind) -> ResourceHandle {
        if self.shut_down {
            engine_warn!(SOURCE, "{:?} creation after shutdown ignored", kind);
            return ResourceHandle::invalid(kind);
        }
        match result {
            Ok(handle) => handle,
            Err(e) => {
                engine_error!(SOURCE, "{:?} creation failed: {}", kind, e);
                ResourceHandle::invalid(kind)
            }
        }
    }

    fn resolve_shader(&self) -> Result<ResourceHandle> {
        match self.shading_mode() {
            ShadingMode::User(handle) => Ok(handle),
            ShadingMode::Builtin(variant) => self
                .builtins
                .get(variant)
                .or_else(|| {
                    engine_debug!(SOURCE, "Built-in {:?} not available, using default", variant);
                    self.builtins.get(BuiltinVariant::Default)
                })
                .ok_or_else(|| Error::InvalidState("no default shader available".to_string())),
        }
    }

    fn binding_group(&mut self, shader: ResourceHandle, texture: Option<ResourceHandle>) -> Result<Arc<dyn BindingGroup>> {
        let key = BindingKey {
            shader: shader.id(),
            texture: texture.map_or(0, |t| t.id()),
        };
        if let Some(group) = self.binding_groups.get(&key) {
            return Ok(Arc::clone(group));
        }

        let shader_resource = self
            .resources
            .shader(shader)
            .ok_or_else(|| Error::InvalidResource(format!("shader {} not found", shader.id())))?;
        let interface = *shader_resource.interface();
        let layout = Arc::clone(shader_resource.layout());
        let ring = self
            .ring
            .as_ref()
            .ok_or_else(|| Error::InvalidState("uniform ring released".to_string()))?;

        let mut bindings = vec![BindingResource::UniformBufferDynamic {
            buffer: &**ring.buffer(),
            range: interface.uniform_block.size() as u64,
        }];
        if interface.uses_texture {
            let texture = texture
                .and_then(|t| self.resources.texture(t))
                .ok_or_else(|| Error::InvalidResource("no texture for a textured shader".to_string()))?;
            bindings.push(BindingResource::SampledTexture(&**texture.texture(), texture.sampler()));
        }
        if interface.uses_lighting {
            let buffer = self
                .lighting_buffer
                .as_ref()
                .ok_or_else(|| Error::InvalidState("lighting buffer released".to_string()))?;
            bindings.push(BindingResource::UniformBuffer(&**buffer));
        }

        let group = self.device.create_binding_group(&layout, 0, &bindings)?;
        engine_trace!(SOURCE, "Binding group for shader {} / texture {}", key.shader, key.texture);
        self.binding_groups.insert(key, Arc::clone(&group));
        Ok(group)
    }

    fn ensure_pass(&mut self) -> Result<()> {
        if self.recorder.is_pass_open() {
            return Ok(());
        }
        let target = self.resolve_pass_target()?;
        self.recorder.open_pass(target)
    }

    fn resolve_pass_target(&mut self) -> Result<PassTarget> {
        if let Some(handle) = self.recorder.target() {
            match self.offscreen_target(handle)? {
                Some(target) => return Ok(target),
                None => engine_warn!(
                    SOURCE,
                    "Render target {} no longer valid, drawing to the default target",
                    handle.id()
                ),
            }
        }
        self.default_pass_target()
    }

    fn offscreen_target(&mut self, handle: ResourceHandle) -> Result<Option<PassTarget>> {
        let Some(target) = self.resources.render_target(handle).copied() else {
            return Ok(None);
        };
        let Some(color) = self.resources.texture_object(target.color) else {
            return Ok(None);
        };
        let extent = (target.width, target.height);
        let depth = match target.depth.and_then(|d| self.resources.texture_object(d)) {
            Some(depth) => depth,
            None => self.depth_pool.get_or_create(self.device.as_mut(), DepthSlot::Target(handle.id()), extent)?,
        };
        Ok(Some(PassTarget { color: Some(color), depth: Some(depth), extent }))
    }

    fn default_pass_target(&mut self) -> Result<PassTarget> {
        let extent = self
            .recorder
            .image()
            .map(|image| image.extent())
            .unwrap_or_else(|| self.device.surface_extent());
        let depth = self.depth_pool.get_or_create(self.device.as_mut(), DepthSlot::Default, extent)?;
        Ok(PassTarget { color: None, depth: Some(depth), extent })
    }

    fn record_draw(&mut self, key: MeshKey) -> Result<()> {
        let Some(entry) = self.meshes.get(key) else {
            engine_trace!(SOURCE, "Mesh {:?} not prepared, draw skipped", key);
            return Ok(());
        };
        let topology = entry.topology;
        let draw_count = entry.draw_count;
        let vertex_buffer = Arc::clone(&entry.vertex_buffer);
        let index_buffer = entry.index_buffer.clone();

        let shader = self.resolve_shader()?;
        let interface = *self
            .resources
            .shader(shader)
            .ok_or_else(|| Error::InvalidResource(format!("shader {} not found", shader.id())))?
            .interface();

        // One lighting block per backend: a change mid-frame also reaches
        // lit draws already recorded in this frame
        if interface.uses_lighting {
            if let Some(buffer) = &self.lighting_buffer {
                if let Some(block) = self.state.lighting.take_update() {
                    buffer.update(0, bytemuck::bytes_of(&block))?;
                }
            }
        }

        self.state.uniforms.pack_into(interface.uniform_block, &mut self.staging);
        let ring = self
            .ring
            .as_mut()
            .ok_or_else(|| Error::InvalidState("uniform ring released".to_string()))?;
        let offset = ring.allocate(&self.staging)?;

        let pipeline = self
            .resources
            .shader_mut(shader)
            .ok_or_else(|| Error::InvalidResource(format!("shader {} not found", shader.id())))?
            .get_pipeline_for_topology(self.device.as_mut(), topology)?;

        let texture = if interface.uses_texture {
            let bound = self.state.texture.filter(|&t| self.resources.texture(t).is_some());
            Some(bound.unwrap_or(self.white_texture))
        } else {
            None
        };
        let group = self.binding_group(shader, texture)?;

        self.ensure_pass()?;
        let commands = self.recorder.pass_commands()?;
        commands.bind_pipeline(&pipeline)?;
        commands.bind_binding_group(&pipeline, 0, &group, &[offset])?;
        commands.bind_vertex_buffer(&vertex_buffer, 0)?;
        match index_buffer {
            Some(index_buffer) => {
                commands.bind_index_buffer(&index_buffer, 0, IndexType::U32)?;
                commands.draw_indexed(draw_count, 0, 0)?;
            }
            None => commands.draw(draw_count, 0)?,
        }
        Ok(())
    }
}

impl RenderBackend for ExplicitBackend {
    // ===== RESOURCES =====

    fn create_buffer(&mut self, usage: BufferUsage, hint: UsageHint, size: u64, data: Option<&[u8]>) -> ResourceHandle {
        let result = if self.shut_down {
            Err(Error::InvalidState("backend shut down".to_string()))
        } else {
            self.resources.create_buffer(self.device.as_mut(), BufferDesc { size, usage }, hint, data)
        };
        self.handle_or_invalid(result, ResourceKind::Buffer)
    }

    fn create_texture(&mut self, desc: TextureDesc, sampler: Option<SamplerType>) -> ResourceHandle {
        let sampler = sampler.unwrap_or(self.config.default_sampler);
        let result = if self.shut_down {
            Err(Error::InvalidState("backend shut down".to_string()))
        } else {
            self.resources.create_texture(self.device.as_mut(), desc, sampler)
        };
        self.handle_or_invalid(result, ResourceKind::Texture)
    }

    fn create_shader(&mut self, source: &ShaderSource) -> ResourceHandle {
        let result = if self.shut_down {
            Err(Error::InvalidState("backend shut down".to_string()))
        } else {
            self.resources.create_shader(self.device.as_mut(), source, self.color_format, Some(DEPTH_FORMAT))
        };
        self.handle_or_invalid(result, ResourceKind::Shader)
    }

    fn create_render_target(&mut self, color: ResourceHandle, depth: Option<ResourceHandle>) -> ResourceHandle {
        let format_ok = self
            .resources
            .texture(color)
            .is_none_or(|t| t.format() == self.color_format);
        let result = if !format_ok {
            Err(Error::InvalidResource(format!(
                "render target color must use the surface format {:?}",
                self.color_format
            )))
        } else {
            self.resources.create_render_target(color, depth)
        };
        self.handle_or_invalid(result, ResourceKind::RenderTarget)
    }

    fn update_buffer(&mut self, handle: ResourceHandle, offset: u64, data: &[u8]) -> bool {
        match self.resources.update_buffer(handle, offset, data) {
            Ok(updated) => updated,
            Err(e) => {
                engine_error!(SOURCE, "Buffer {} update failed: {}", handle.id(), e);
                false
            }
        }
    }

    fn update_texture(&mut self, handle: ResourceHandle, region: TextureRegion, data: &[u8]) -> bool {
        match self.resources.update_texture(handle, region, data) {
            Ok(updated) => updated,
            Err(e) => {
                engine_error!(SOURCE, "Texture {} update failed: {}", handle.id(), e);
                false
            }
        }
    }

    fn destroy(&mut self, handle: ResourceHandle) -> bool {
        if handle == self.white_texture {
            engine_warn!(SOURCE, "Refusing to destroy the fallback texture");
            return false;
        }
        if BuiltinVariant::ALL.iter().any(|&v| self.builtins.get(v) == Some(handle)) {
            engine_warn!(SOURCE, "Refusing to destroy built-in shader {}", handle.id());
            return false;
        }
        if matches!(handle.kind(), ResourceKind::Texture | ResourceKind::Shader) {
            let id = handle.id();
            self.binding_groups.retain(|key, _| key.shader != id && key.texture != id);
        }
        let destroyed = self.resources.destroy(handle);
        if destroyed && handle.kind() == ResourceKind::RenderTarget {
            self.depth_pool.remove(DepthSlot::Target(handle.id()));
        }
        destroyed
    }

    fn is_valid(&self, handle: ResourceHandle) -> bool {
        self.resources.is_valid(handle)
    }

    fn read_buffer(&mut self, handle: ResourceHandle) -> Result<Vec<u8>> {
        engine_warn!(SOURCE, "read_buffer({}) requested; read-back is not implemented", handle.id());
        Err(Error::Unsupported(
            "buffer read-back needs GPU completion tracking, which this backend does not provide".to_string(),
        ))
    }

    fn color_format(&self) -> TextureFormat {
        self.color_format
    }

    // ===== FRAME =====

    fn begin_frame(&mut self) -> Result<bool> {
        self.ensure_running("begin_frame")?;
        let began = self.recorder.begin_frame(self.device.as_mut())?;
        if began {
            if let Some(ring) = self.ring.as_mut() {
                ring.reset();
            }
        }
        Ok(began)
    }

    fn end_frame(&mut self) -> Result<()> {
        self.ensure_running("end_frame")?;
        if !self.recorder.in_frame() {
            return Err(Error::InvalidState("end_frame called without begin_frame".to_string()));
        }
        // A clear with no draw after it still has to reach its target
        if self.recorder.clear_pending() {
            self.ensure_pass()?;
        }
        // The presented image must have been written this frame
        if !self.recorder.swapchain_touched() {
            self.recorder.close_pass()?;
            let target = self.default_pass_target()?;
            self.recorder.open_pass(target)?;
        }
        self.recorder.end_frame(self.device.as_mut())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.ensure_running("resize")?;
        if self.recorder.in_frame() {
            return Err(Error::InvalidState("resize called during a frame".to_string()));
        }
        let old_extent = self.device.surface_extent();
        self.device.wait_idle()?;
        self.device.resize(width, height)?;
        self.depth_pool.remove(DepthSlot::Default);
        engine_info!(SOURCE, "Resized {}x{} -> {}x{}", old_extent.0, old_extent.1, width, height);
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Option<(f32, f32, f32, f32)>) -> Result<()> {
        let viewport = viewport.map(|(x, y, width, height)| Viewport {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        self.recorder.set_viewport(viewport)
    }

    fn clear(&mut self, color: [f32; 4], depth: f32) -> Result<()> {
        self.recorder.request_clear(color, depth)
    }

    fn set_render_target(&mut self, target: Option<ResourceHandle>) -> Result<()> {
        if let Some(handle) = target {
            if self.resources.render_target(handle).is_none() {
                engine_warn!(SOURCE, "set_render_target: {} is not a live render target", handle.id());
                return Ok(());
            }
        }
        if target == self.recorder.target() {
            return Ok(());
        }
        if self.recorder.in_frame() && self.recorder.clear_pending() {
            self.ensure_pass()?;
        }
        self.recorder.set_target(target)?;
        Ok(())
    }

    // ===== DRAW STATE =====

    fn set_matrices(&mut self, modelview: Mat4, projection: Mat4) {
        self.state.uniforms.modelview = modelview;
        self.state.uniforms.projection = projection;
    }

    fn set_tint(&mut self, tint: Vec4) {
        self.state.uniforms.tint = tint;
    }

    fn set_point_size(&mut self, size: f32) {
        self.state.uniforms.point_size = size;
    }

    fn set_stereo(&mut self, eye_separation: f32, focal_length: f32) {
        self.state.uniforms.eye_separation = eye_separation;
        self.state.uniforms.focal_length = focal_length;
    }

    fn bind_texture(&mut self, texture: Option<ResourceHandle>) {
        self.state.texture = texture;
    }

    fn set_screen_space(&mut self, enabled: bool) {
        self.state.screen_space = enabled;
    }

    fn bind_shader(&mut self, shader: Option<ResourceHandle>) {
        self.state.user_shader = shader;
    }

    fn bind_builtin(&mut self, variant: Option<BuiltinVariant>) {
        self.state.builtin = variant;
    }

    fn set_lighting_enabled(&mut self, enabled: bool) {
        self.state.lighting.set_enabled(enabled);
    }

    fn set_light(&mut self, index: usize, light: Light) -> bool {
        let stored = self.state.lighting.set_light(index, light);
        if !stored {
            engine_warn!(SOURCE, "Light index {} out of range", index);
        }
        stored
    }

    fn set_global_ambient(&mut self, ambient: Vec4) {
        self.state.lighting.set_global_ambient(ambient);
    }

    fn set_material(&mut self, material: Material) {
        self.state.lighting.set_material(material);
    }

    fn shading_mode(&self) -> ShadingMode {
        ExplicitBackend::shading_mode(self)
    }

    // ===== MESHES =====

    fn prepare_mesh(&mut self, key: MeshKey, mesh: &Mesh) -> bool {
        if self.shut_down {
            return false;
        }
        match self.meshes.prepare(self.device.as_mut(), key, mesh) {
            Ok(PrepareOutcome::Empty) => false,
            Ok(PrepareOutcome::Hit) | Ok(PrepareOutcome::Uploaded) => true,
            Err(e) => {
                engine_error!(SOURCE, "Mesh {:?} upload failed: {}", key, e);
                false
            }
        }
    }

    fn draw_mesh(&mut self, key: MeshKey) -> Result<()> {
        self.ensure_running("draw_mesh")?;
        if !self.recorder.in_frame() {
            return Err(Error::InvalidState("draw_mesh called outside a frame".to_string()));
        }
        self.record_draw(key).inspect_err(|e| {
            engine_error!(SOURCE, "Draw of mesh {:?} failed: {}", key, e);
        })
    }

    fn forget_mesh(&mut self, key: MeshKey) -> bool {
        self.meshes.remove(key)
    }

    // ===== LIFETIME =====

    fn stats(&self) -> DeviceStats {
        self.device.stats()
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.recorder.abort();
        if let Err(e) = self.device.wait_idle() {
            engine_error!(SOURCE, "wait_idle during shutdown failed: {}", e);
        }

        self.binding_groups.clear();
        let meshes = self.meshes.clear();
        self.depth_pool.clear();
        self.builtins.clear();
        let released = self.resources.shutdown();
        self.ring = None;
        self.lighting_buffer = None;
        self.state.reset();
        self.white_texture = ResourceHandle::invalid(ResourceKind::Texture);
        self.shut_down = true;

        engine_info!(SOURCE, "Backend shut down ({} resources, {} meshes released)", released, meshes);
    }
}

impl Drop for ExplicitBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "explicit_backend_tests.rs"]
mod tests;
