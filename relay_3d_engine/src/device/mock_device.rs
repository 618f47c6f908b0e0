/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Every object created through the mock reports into a shared `MockLog`:
/// creation and drop counters, buffer contents, and the textual command
/// stream recorded by command lists.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::device::{
    GraphicsDevice, Buffer, Texture, ShaderModule, Pipeline, PipelineLayout,
    BindingGroup, CommandList, SwapchainImage,
    BufferDesc, BufferUsage, TextureDesc, TextureInfo, TextureRegion, TextureFormat,
    ShaderDesc, ShaderStage, PipelineDesc, PipelineLayoutDesc, PrimitiveTopology,
    BindingResource, RenderingDesc, ColorAttachment, LoadOp, Viewport, Rect2D,
    IndexType, DeviceLimits, DeviceStats,
};

// ============================================================================
// Shared log
// ============================================================================

/// Snapshot of one buffer created through the mock
#[derive(Clone)]
pub struct MockBufferRecord {
    pub usage: BufferUsage,
    pub size: u64,
    pub contents: Arc<Mutex<Vec<u8>>>,
}

#[derive(Default)]
pub struct MockLog {
    pub commands: Mutex<Vec<String>>,
    pub buffers: Mutex<Vec<MockBufferRecord>>,
    pub buffers_created: AtomicU64,
    pub buffers_dropped: AtomicU64,
    pub textures_created: AtomicU64,
    pub textures_dropped: AtomicU64,
    pub pipelines_created: AtomicU64,
    pub pipelines_dropped: AtomicU64,
    pub binding_groups_created: AtomicU64,
    pub frames_submitted: AtomicU64,
    pub fail_buffer_creation: AtomicBool,
    pub fail_texture_creation: AtomicBool,
    pub surface_out_of_date: AtomicBool,
}

impl MockLog {
    fn push(&self, command: String) {
        self.commands.lock().unwrap().push(command);
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.lock().unwrap().clear();
    }

    pub fn count(&self, counter: &AtomicU64) -> u64 {
        counter.load(Ordering::SeqCst)
    }

    /// Live buffers of a given usage, in creation order
    pub fn buffers_with_usage(&self, usage: BufferUsage) -> Vec<MockBufferRecord> {
        self.buffers
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.usage == usage)
            .cloned()
            .collect()
    }
}

// ============================================================================
// Mock resources
// ============================================================================

pub struct MockBuffer {
    pub size: u64,
    pub contents: Arc<Mutex<Vec<u8>>>,
    log: Arc<MockLog>,
}

impl Buffer for MockBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u64;
        if end > self.size {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} overflows buffer of {} bytes",
                data.len(), offset, self.size
            )));
        }
        let mut contents = self.contents.lock().unwrap();
        contents[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        self.log.buffers_dropped.fetch_add(1, Ordering::SeqCst);
        let mut buffers = self.log.buffers.lock().unwrap();
        buffers.retain(|b| !Arc::ptr_eq(&b.contents, &self.contents));
    }
}

pub struct MockTexture {
    pub info: TextureInfo,
    pub pixels: Mutex<Vec<u8>>,
    log: Arc<MockLog>,
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn update_region(&self, region: TextureRegion, data: &[u8]) -> Result<()> {
        if !region.fits(self.info.width, self.info.height) {
            return Err(Error::InvalidResource("region outside texture".to_string()));
        }
        let bpp = self.info.format.bytes_per_pixel() as usize;
        if data.len() != region.width as usize * region.height as usize * bpp {
            return Err(Error::InvalidResource("region data size mismatch".to_string()));
        }
        let mut pixels = self.pixels.lock().unwrap();
        let row = region.width as usize * bpp;
        for y in 0..region.height as usize {
            let dst = ((region.y as usize + y) * self.info.width as usize + region.x as usize) * bpp;
            pixels[dst..dst + row].copy_from_slice(&data[y * row..(y + 1) * row]);
        }
        Ok(())
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        self.log.textures_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockShaderModule {
    pub stage: ShaderStage,
    pub code_len: usize,
}

impl ShaderModule for MockShaderModule {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

pub struct MockPipelineLayout {
    pub desc: PipelineLayoutDesc,
}

impl PipelineLayout for MockPipelineLayout {
    fn desc(&self) -> &PipelineLayoutDesc {
        &self.desc
    }
}

pub struct MockPipeline {
    pub topology: PrimitiveTopology,
    pub strip_index_format: Option<IndexType>,
    log: Arc<MockLog>,
}

impl Pipeline for MockPipeline {
    fn topology(&self) -> PrimitiveTopology {
        self.topology
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        self.log.pipelines_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockBindingGroup {
    pub set_index: u32,
    pub resource_count: usize,
}

impl BindingGroup for MockBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

pub struct MockSwapchainImage {
    pub index: u32,
    pub extent: (u32, u32),
}

impl SwapchainImage for MockSwapchainImage {
    fn index(&self) -> u32 {
        self.index
    }

    fn extent(&self) -> (u32, u32) {
        self.extent
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

pub struct MockCommandList {
    is_recording: bool,
    in_rendering: bool,
    log: Arc<MockLog>,
}

impl MockCommandList {
    fn require_recording(&self, what: &str) -> Result<()> {
        if !self.is_recording {
            return Err(Error::InvalidState(format!("{} outside begin/end", what)));
        }
        Ok(())
    }

    fn require_rendering(&self, what: &str) -> Result<()> {
        self.require_recording(what)?;
        if !self.in_rendering {
            return Err(Error::InvalidState(format!("{} outside rendering", what)));
        }
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::InvalidState("command list already recording".to_string()));
        }
        self.is_recording = true;
        self.log.push("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.require_recording("end")?;
        if self.in_rendering {
            return Err(Error::InvalidState("end while rendering".to_string()));
        }
        self.is_recording = false;
        self.log.push("end".to_string());
        Ok(())
    }

    fn begin_rendering(&mut self, desc: &RenderingDesc) -> Result<()> {
        self.require_recording("begin_rendering")?;
        if self.in_rendering {
            return Err(Error::InvalidState("rendering already open".to_string()));
        }
        self.in_rendering = true;
        let target = match &desc.color {
            ColorAttachment::Swapchain(_) => "swapchain",
            ColorAttachment::Texture(_) => "texture",
        };
        let load = match desc.color_load {
            LoadOp::Clear => "clear",
            LoadOp::Load => "load",
        };
        self.log.push(format!(
            "begin_rendering {} {} {}x{} depth={}",
            target, load, desc.extent.0, desc.extent.1, desc.depth.is_some()
        ));
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.require_rendering("end_rendering")?;
        self.in_rendering = false;
        self.log.push("end_rendering".to_string());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_rendering("set_viewport")?;
        self.log.push(format!("set_viewport {}x{}", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.require_rendering("set_scissor")?;
        self.log.push(format!("set_scissor {}x{}", scissor.width, scissor.height));
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.require_rendering("bind_pipeline")?;
        self.log.push(format!("bind_pipeline {:?}", pipeline.topology()));
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        _binding_group: &Arc<dyn BindingGroup>,
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        self.require_rendering("bind_binding_group")?;
        self.log.push(format!("bind_binding_group {} {:?}", set_index, dynamic_offsets));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.require_rendering("bind_vertex_buffer")?;
        self.log.push(format!("bind_vertex_buffer {} {}", buffer.size(), offset));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.require_rendering("bind_index_buffer")?;
        self.log.push(format!("bind_index_buffer {} {} {:?}", buffer.size(), offset, index_type));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.require_rendering("draw")?;
        self.log.push(format!("draw {} {}", vertex_count, first_vertex));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.require_rendering("draw_indexed")?;
        self.log.push(format!("draw_indexed {} {} {}", index_count, first_index, vertex_offset));
        Ok(())
    }

    fn prepare_present(&mut self, image: &Arc<dyn SwapchainImage>) -> Result<()> {
        self.require_recording("prepare_present")?;
        if self.in_rendering {
            return Err(Error::InvalidState("prepare_present while rendering".to_string()));
        }
        self.log.push(format!("prepare_present {}", image.index()));
        Ok(())
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockDevice {
    pub log: Arc<MockLog>,
    pub limits: DeviceLimits,
    extent: (u32, u32),
    next_image: u32,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            log: Arc::new(MockLog::default()),
            limits: DeviceLimits::default(),
            extent: (800, 600),
            next_image: 0,
        }
    }

    pub fn with_alignment(alignment: u64) -> Self {
        let mut device = Self::new();
        device.limits.min_uniform_offset_alignment = alignment;
        device
    }
}

impl GraphicsDevice for MockDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        if self.log.fail_buffer_creation.load(Ordering::SeqCst) {
            return Err(Error::OutOfMemory);
        }
        if desc.size == 0 {
            return Err(Error::InvalidResource("zero-sized buffer".to_string()));
        }
        let contents = Arc::new(Mutex::new(vec![0u8; desc.size as usize]));
        self.log.buffers.lock().unwrap().push(MockBufferRecord {
            usage: desc.usage,
            size: desc.size,
            contents: contents.clone(),
        });
        self.log.buffers_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockBuffer { size: desc.size, contents, log: self.log.clone() }))
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if self.log.fail_texture_creation.load(Ordering::SeqCst) {
            return Err(Error::OutOfMemory);
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource("zero-sized texture".to_string()));
        }
        let pixels = match &desc.data {
            Some(data) if data.len() != desc.byte_len() => {
                return Err(Error::InvalidResource("texture data size mismatch".to_string()));
            }
            Some(data) => data.clone(),
            None => vec![0u8; desc.byte_len()],
        };
        self.log.textures_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockTexture {
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
            },
            pixels: Mutex::new(pixels),
            log: self.log.clone(),
        }))
    }

    fn create_shader_module(&mut self, desc: ShaderDesc) -> Result<Arc<dyn ShaderModule>> {
        if desc.code.is_empty() || desc.code.len() % 4 != 0 {
            return Err(Error::InvalidResource("SPIR-V length must be a non-zero multiple of 4".to_string()));
        }
        Ok(Arc::new(MockShaderModule { stage: desc.stage, code_len: desc.code.len() }))
    }

    fn create_pipeline_layout(&mut self, desc: PipelineLayoutDesc) -> Result<Arc<dyn PipelineLayout>> {
        Ok(Arc::new(MockPipelineLayout { desc }))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        desc.validate()?;
        self.log.pipelines_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockPipeline {
            topology: desc.topology,
            strip_index_format: desc.strip_index_format,
            log: self.log.clone(),
        }))
    }

    fn create_binding_group(
        &mut self,
        layout: &Arc<dyn PipelineLayout>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        let set = layout.desc().set_layouts.get(set_index as usize).ok_or_else(|| {
            Error::InvalidResource(format!("layout has no set {}", set_index))
        })?;
        if set.entries.len() != resources.len() {
            return Err(Error::InvalidResource(format!(
                "set {} expects {} resources, got {}",
                set_index, set.entries.len(), resources.len()
            )));
        }
        self.log.binding_groups_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockBindingGroup { set_index, resource_count: resources.len() }))
    }

    fn create_command_list(&mut self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList {
            is_recording: false,
            in_rendering: false,
            log: self.log.clone(),
        }))
    }

    fn acquire_next_image(&mut self) -> Result<Option<Arc<dyn SwapchainImage>>> {
        if self.log.surface_out_of_date.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let index = self.next_image;
        self.next_image = (self.next_image + 1) % 3;
        self.log.push(format!("acquire {}", index));
        Ok(Some(Arc::new(MockSwapchainImage { index, extent: self.extent })))
    }

    fn submit_and_present(&mut self, _commands: &dyn CommandList, image: &Arc<dyn SwapchainImage>) -> Result<()> {
        self.log.frames_submitted.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("submit_and_present {}", image.index()));
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.log.push("wait_idle".to_string());
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.extent = (width, height);
        self.log.surface_out_of_date.store(false, Ordering::SeqCst);
        self.log.push(format!("resize {}x{}", width, height));
        Ok(())
    }

    fn surface_format(&self) -> TextureFormat {
        TextureFormat::B8G8R8A8_SRGB
    }

    fn surface_extent(&self) -> (u32, u32) {
        self.extent
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats {
            buffers_created: self.log.count(&self.log.buffers_created),
            textures_created: self.log.count(&self.log.textures_created),
            pipelines_created: self.log.count(&self.log.pipelines_created),
            binding_groups_created: self.log.count(&self.log.binding_groups_created),
            frames_submitted: self.log.count(&self.log.frames_submitted),
        }
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
