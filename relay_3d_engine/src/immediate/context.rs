/// Legacy drawing layer over an injected backend
///
/// Callers speak in numeric texture / framebuffer ids and mesh keys; the
/// context resolves them through its bridges and forwards to the backend it
/// was given. Without a backend every call is a no-op.

use glam::{Mat4, Vec4};
use crate::error::Result;
use crate::device::{TextureDesc, TextureFormat, TextureRegion, TextureUsage, SamplerType};
use crate::resource::ResourceHandle;
use crate::mesh::{Mesh, MeshKey, MeshStore};
use crate::bridge::{TextureBridge, FramebufferBridge, FramebufferEntry, DEFAULT_FRAMEBUFFER};
use crate::backend::RenderBackend;
use crate::shading::BuiltinVariant;
use crate::uniform::{Light, Material};
use crate::{engine_debug, engine_warn};

const SOURCE: &str = "relay3d::immediate";

pub struct ImmediateContext {
    backend: Option<Box<dyn RenderBackend>>,
    textures: TextureBridge,
    framebuffers: FramebufferBridge,
    meshes: MeshStore,
    next_texture_id: u32,
    next_framebuffer_id: u32,
    /// Legacy id, kept so redefined storage stays bound
    bound_texture: u32,
    bound_framebuffer: u32,
}

impl ImmediateContext {
    pub fn new(backend: Option<Box<dyn RenderBackend>>) -> Self {
        Self {
            backend,
            textures: TextureBridge::new(),
            framebuffers: FramebufferBridge::new(),
            meshes: MeshStore::with_key(),
            next_texture_id: 1,
            next_framebuffer_id: 1,
            bound_texture: 0,
            bound_framebuffer: DEFAULT_FRAMEBUFFER,
        }
    }

    /// Swap the backend, returning the previous one
    ///
    /// Bridged ids refer to the old backend's handles and are forgotten.
    pub fn set_backend(&mut self, backend: Option<Box<dyn RenderBackend>>) -> Option<Box<dyn RenderBackend>> {
        self.textures.clear();
        self.framebuffers.clear();
        self.bound_texture = 0;
        self.bound_framebuffer = DEFAULT_FRAMEBUFFER;
        std::mem::replace(&mut self.backend, backend)
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&dyn RenderBackend> {
        self.backend.as_deref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut (dyn RenderBackend + 'static)> {
        self.backend.as_deref_mut()
    }

    fn with_backend<R>(&mut self, otherwise: R, f: impl FnOnce(&mut dyn RenderBackend) -> R) -> R {
        match self.backend.as_deref_mut() {
            Some(backend) => f(backend),
            None => otherwise,
        }
    }

    // ===== MESHES =====

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshKey {
        self.meshes.insert(mesh)
    }

    pub fn mesh(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    pub fn mesh_mut(&mut self, key: MeshKey) -> Option<&mut Mesh> {
        self.meshes.get_mut(key)
    }

    /// Remove the mesh and drop its GPU copy
    pub fn remove_mesh(&mut self, key: MeshKey) -> Option<Mesh> {
        let mesh = self.meshes.remove(key)?;
        if let Some(backend) = self.backend.as_deref_mut() {
            backend.forget_mesh(key);
        }
        Some(mesh)
    }

    /// Make the GPU copy of `key` current; false without a backend or for an empty mesh
    pub fn prepare_mesh(&mut self, key: MeshKey) -> bool {
        let (Some(backend), Some(mesh)) = (self.backend.as_deref_mut(), self.meshes.get(key)) else {
            return false;
        };
        backend.prepare_mesh(key, mesh)
    }

    /// Prepare then draw `key` with the current state
    pub fn draw_mesh(&mut self, key: MeshKey) -> Result<()> {
        if !self.prepare_mesh(key) {
            return Ok(());
        }
        self.with_backend(Ok(()), |backend| backend.draw_mesh(key))
    }

    // ===== TEXTURES =====

    /// Reserve a texture id; storage comes with `tex_image`
    pub fn gen_texture(&mut self) -> u32 {
        let id = self.next_texture_id;
        self.next_texture_id += 1;
        id
    }

    /// (Re)define the storage of texture `id`
    ///
    /// Same size and format with data overwrites in place; anything else
    /// replaces the GPU texture. A bound `id` stays bound to the new storage.
    pub fn tex_image(&mut self, id: u32, width: u32, height: u32, format: TextureFormat, data: Option<&[u8]>) -> bool {
        let Some(backend) = self.backend.as_deref_mut() else {
            return false;
        };

        if let Some(entry) = self.textures.lookup(id).copied() {
            if (entry.width, entry.height, entry.format) == (width, height, format) {
                if let Some(bytes) = data {
                    let region = TextureRegion { x: 0, y: 0, width, height };
                    if backend.update_texture(entry.handle, region, bytes) {
                        self.textures.bump_version(id);
                        return true;
                    }
                }
            }
            backend.destroy(entry.handle);
            self.textures.erase(id);
        }

        let handle = backend.create_texture(
            TextureDesc {
                width,
                height,
                format,
                usage: TextureUsage::Sampled,
                data: data.map(|d| d.to_vec()),
            },
            None,
        );
        if handle.is_null() {
            return false;
        }
        self.textures.insert(id, handle, width, height, format);
        self.textures.bump_version(id);
        if id != 0 && self.bound_texture == id {
            backend.bind_texture(Some(handle));
        }
        engine_debug!(SOURCE, "Texture {} -> handle {} ({}x{})", id, handle.id(), width, height);
        true
    }

    pub fn tex_sub_image(&mut self, id: u32, region: TextureRegion, data: &[u8]) -> bool {
        let Some(entry) = self.textures.lookup(id).copied() else {
            return false;
        };
        let updated = self.with_backend(false, |backend| backend.update_texture(entry.handle, region, data));
        if updated {
            self.textures.bump_version(id);
        }
        updated
    }

    pub fn delete_texture(&mut self, id: u32) -> bool {
        let Some(entry) = self.textures.erase(id) else {
            return false;
        };
        if self.bound_texture == id {
            self.bind_texture(0);
        }
        self.with_backend(false, |backend| backend.destroy(entry.handle))
    }

    /// Bind texture `id` for subsequent draws; 0 unbinds
    ///
    /// An id without storage yet draws untextured until `tex_image` defines it.
    pub fn bind_texture(&mut self, id: u32) {
        self.bound_texture = id;
        let handle = self.textures.lookup(id).map(|e| e.handle);
        if handle.is_none() && id != 0 {
            engine_debug!(SOURCE, "bind_texture({}): no storage yet", id);
        }
        self.with_backend((), |backend| backend.bind_texture(handle));
    }

    pub fn bound_texture(&self) -> u32 {
        self.bound_texture
    }

    /// Size and upload version of texture `id`
    pub fn texture_info(&self, id: u32) -> Option<(u32, u32, u64)> {
        self.textures.lookup(id).map(|e| (e.width, e.height, e.version))
    }

    pub fn texture_handle(&self, id: u32) -> Option<ResourceHandle> {
        self.textures.lookup(id).map(|e| e.handle)
    }

    // ===== FRAMEBUFFERS =====

    /// Create an offscreen framebuffer with a sampled color texture
    ///
    /// Returns `(framebuffer id, texture id)`; the texture id can be bound like
    /// any other texture.
    pub fn gen_framebuffer(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        let backend = self.backend.as_deref_mut()?;
        let format = backend.color_format();
        let color = backend.create_texture(
            TextureDesc {
                width,
                height,
                format,
                usage: TextureUsage::SampledAndRenderTarget,
                data: None,
            },
            Some(SamplerType::LinearClamp),
        );
        if color.is_null() {
            return None;
        }
        let target = backend.create_render_target(color, None);
        if target.is_null() {
            backend.destroy(color);
            return None;
        }

        let texture_id = self.gen_texture();
        self.textures.insert(texture_id, color, width, height, format);
        let framebuffer_id = self.next_framebuffer_id;
        self.next_framebuffer_id += 1;
        self.framebuffers.insert(framebuffer_id, FramebufferEntry { target, width, height });
        Some((framebuffer_id, texture_id))
    }

    /// Render into framebuffer `id`; 0 is the visible target
    pub fn bind_framebuffer(&mut self, id: u32) -> Result<()> {
        let target = if id == DEFAULT_FRAMEBUFFER {
            None
        } else {
            match self.framebuffers.lookup(id) {
                Some(entry) => Some(entry.target),
                None => {
                    engine_warn!(SOURCE, "bind_framebuffer({}): unknown framebuffer", id);
                    return Ok(());
                }
            }
        };
        self.bound_framebuffer = id;
        self.with_backend(Ok(()), |backend| backend.set_render_target(target))
    }

    /// Drop framebuffer `id`; its color texture stays under its texture id
    pub fn delete_framebuffer(&mut self, id: u32) -> Result<bool> {
        let Some(entry) = self.framebuffers.erase(id) else {
            return Ok(false);
        };
        if self.bound_framebuffer == id {
            self.bind_framebuffer(DEFAULT_FRAMEBUFFER)?;
        }
        Ok(self.with_backend(false, |backend| backend.destroy(entry.target)))
    }

    pub fn bound_framebuffer(&self) -> u32 {
        self.bound_framebuffer
    }

    pub fn framebuffer_size(&self, id: u32) -> Option<(u32, u32)> {
        self.framebuffers.lookup(id).map(|e| (e.width, e.height))
    }

    // ===== FRAME =====

    /// False without a backend or when the frame was skipped
    pub fn begin_frame(&mut self) -> Result<bool> {
        self.with_backend(Ok(false), |backend| backend.begin_frame())
    }

    pub fn end_frame(&mut self) -> Result<()> {
        self.with_backend(Ok(()), |backend| backend.end_frame())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.with_backend(Ok(()), |backend| backend.resize(width, height))
    }

    pub fn viewport(&mut self, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        self.with_backend(Ok(()), |backend| backend.set_viewport(Some((x, y, width, height))))
    }

    pub fn clear(&mut self, color: [f32; 4], depth: f32) -> Result<()> {
        self.with_backend(Ok(()), |backend| backend.clear(color, depth))
    }

    // ===== STATE =====

    pub fn set_matrices(&mut self, modelview: Mat4, projection: Mat4) {
        self.with_backend((), |backend| backend.set_matrices(modelview, projection));
    }

    pub fn set_tint(&mut self, tint: Vec4) {
        self.with_backend((), |backend| backend.set_tint(tint));
    }

    pub fn set_point_size(&mut self, size: f32) {
        self.with_backend((), |backend| backend.set_point_size(size));
    }

    pub fn set_stereo(&mut self, eye_separation: f32, focal_length: f32) {
        self.with_backend((), |backend| backend.set_stereo(eye_separation, focal_length));
    }

    pub fn set_screen_space(&mut self, enabled: bool) {
        self.with_backend((), |backend| backend.set_screen_space(enabled));
    }

    pub fn use_shader(&mut self, shader: Option<ResourceHandle>) {
        self.with_backend((), |backend| backend.bind_shader(shader));
    }

    pub fn use_builtin(&mut self, variant: Option<BuiltinVariant>) {
        self.with_backend((), |backend| backend.bind_builtin(variant));
    }

    pub fn set_lighting_enabled(&mut self, enabled: bool) {
        self.with_backend((), |backend| backend.set_lighting_enabled(enabled));
    }

    pub fn set_light(&mut self, index: usize, light: Light) -> bool {
        self.with_backend(false, |backend| backend.set_light(index, light))
    }

    pub fn set_global_ambient(&mut self, ambient: Vec4) {
        self.with_backend((), |backend| backend.set_global_ambient(ambient));
    }

    pub fn set_material(&mut self, material: Material) {
        self.with_backend((), |backend| backend.set_material(material));
    }

    // ===== LIFETIME =====

    /// Shut the backend down and forget every bridged id; meshes stay on the CPU side
    pub fn shutdown(&mut self) {
        self.with_backend((), |backend| backend.shutdown());
        self.textures.clear();
        self.framebuffers.clear();
        self.bound_texture = 0;
        self.bound_framebuffer = DEFAULT_FRAMEBUFFER;
    }
}

impl Default for ImmediateContext {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
