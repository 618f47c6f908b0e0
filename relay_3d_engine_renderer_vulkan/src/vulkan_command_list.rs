/// CommandList - Vulkan implementation of the device CommandList trait
///
/// Records into a single primary command buffer with dynamic rendering.
/// Attachment layout transitions are recorded around each rendering scope.

use relay_3d_engine::relay3d::{
    Result,
    device::{
        BindingGroup as DeviceBindingGroup, Buffer as DeviceBuffer, ColorAttachment,
        CommandList as DeviceCommandList, IndexType, LoadOp, Pipeline as DevicePipeline,
        Rect2D, RenderingDesc, SwapchainImage as DeviceSwapchainImage, Texture as DeviceTexture,
        Viewport,
    },
};
use relay_3d_engine::{engine_bail, engine_err, engine_warn};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::{GpuContext, Retired};
use crate::vulkan_format::{index_type_to_vk, load_op_to_vk};
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_swapchain::SwapchainImage;
use crate::vulkan_texture::{resting_layout, transition_image, Texture};

const SOURCE: &str = "relay3d::vulkan";

/// Offscreen color target of the open rendering scope
#[derive(Debug, Clone, Copy)]
struct ActiveTarget {
    image: vk::Image,
    resting: vk::ImageLayout,
}

/// Vulkan command list
pub struct CommandList {
    ctx: Arc<GpuContext>,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    is_recording: bool,
    in_rendering: bool,
    active_target: Option<ActiveTarget>,
    /// Layout of the acquired image as recorded so far (`None` = untouched)
    swapchain_layout: Option<vk::ImageLayout>,
}

impl CommandList {
    pub(crate) fn new(ctx: &Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = ctx.device.create_command_pool(&pool_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create command pool: {:?}", e))?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = match ctx.device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    engine_bail!(SOURCE, "Failed to allocate command buffer: {:?}", e);
                }
            };

            Ok(Self {
                ctx: Arc::clone(ctx),
                command_pool,
                command_buffer: command_buffers[0],
                is_recording: false,
                in_rendering: false,
                active_target: None,
                swapchain_layout: None,
            })
        }
    }

    pub(crate) fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    fn require_recording(&self, operation: &str) -> Result<()> {
        if !self.is_recording {
            engine_bail!(SOURCE, "{}: command list is not recording", operation);
        }
        Ok(())
    }

    fn require_rendering(&self, operation: &str) -> Result<()> {
        if !self.in_rendering {
            engine_bail!(SOURCE, "{}: no rendering scope is open", operation);
        }
        Ok(())
    }
}

impl DeviceCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        if self.in_rendering {
            engine_bail!(SOURCE, "begin: a rendering scope is still open");
        }
        unsafe {
            self.ctx.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!(SOURCE, "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!(SOURCE, "Failed to begin command buffer: {:?}", e))?;
        }
        self.is_recording = true;
        self.active_target = None;
        self.swapchain_layout = None;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.require_recording("end")?;
        if self.in_rendering {
            engine_bail!(SOURCE, "end: a rendering scope is still open");
        }
        unsafe {
            self.ctx.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!(SOURCE, "Failed to end command buffer: {:?}", e))?;
        }
        self.is_recording = false;
        Ok(())
    }

    fn begin_rendering(&mut self, desc: &RenderingDesc) -> Result<()> {
        self.require_recording("begin_rendering")?;
        if self.in_rendering {
            engine_bail!(SOURCE, "begin_rendering: a rendering scope is already open");
        }

        let device = &self.ctx.device;
        let cb = self.command_buffer;
        let clear_color = desc.color_load == LoadOp::Clear;

        // ----- Color attachment -----
        let color_view = match &desc.color {
            ColorAttachment::Swapchain(image) => {
                let vk_image = unsafe { &*(Arc::as_ptr(image) as *const SwapchainImage) };
                let old_layout = match (clear_color, self.swapchain_layout) {
                    (false, Some(layout)) => layout,
                    _ => vk::ImageLayout::UNDEFINED,
                };
                transition_image(device, cb, vk_image.image, vk::ImageAspectFlags::COLOR,
                    old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
                self.swapchain_layout = Some(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
                vk_image.view
            }
            ColorAttachment::Texture(texture) => {
                let info = texture.info();
                if !info.usage.is_render_target() {
                    engine_bail!(SOURCE, "Texture with usage {:?} is not a render target", info.usage);
                }
                let vk_texture = unsafe { &*(Arc::as_ptr(texture) as *const Texture) };
                let resting = resting_layout(info.usage);
                let old_layout = if clear_color { vk::ImageLayout::UNDEFINED } else { resting };
                transition_image(device, cb, vk_texture.image, vk_texture.aspect,
                    old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
                self.active_target = Some(ActiveTarget { image: vk_texture.image, resting });
                vk_texture.view
            }
        };

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(color_view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(load_op_to_vk(desc.color_load))
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue { float32: desc.clear_color },
            });

        // ----- Depth attachment -----
        let depth_attachment = match &desc.depth {
            Some(depth) => {
                if !depth.info().format.is_depth() {
                    engine_bail!(SOURCE, "Depth attachment has color format {:?}", depth.info().format);
                }
                let vk_depth = unsafe { &*(Arc::as_ptr(depth) as *const Texture) };
                let old_layout = if desc.depth_load == LoadOp::Clear {
                    vk::ImageLayout::UNDEFINED
                } else {
                    vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
                };
                transition_image(device, cb, vk_depth.image, vk_depth.aspect,
                    old_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

                Some(
                    vk::RenderingAttachmentInfo::default()
                        .image_view(vk_depth.view)
                        .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                        .load_op(load_op_to_vk(desc.depth_load))
                        .store_op(vk::AttachmentStoreOp::STORE)
                        .clear_value(vk::ClearValue {
                            depth_stencil: vk::ClearDepthStencilValue { depth: desc.clear_depth, stencil: 0 },
                        }),
                )
            }
            None => None,
        };

        let (width, height) = desc.extent;
        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width, height },
            })
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment));
        if let Some(depth_attachment) = &depth_attachment {
            rendering_info = rendering_info.depth_attachment(depth_attachment);
        }

        unsafe { device.cmd_begin_rendering(cb, &rendering_info) };
        self.in_rendering = true;
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.require_rendering("end_rendering")?;
        unsafe { self.ctx.device.cmd_end_rendering(self.command_buffer) };
        self.in_rendering = false;

        if let Some(target) = self.active_target.take() {
            transition_image(&self.ctx.device, self.command_buffer, target.image,
                vk::ImageAspectFlags::COLOR, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL, target.resting);
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_recording("set_viewport")?;
        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe { self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]) };
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.require_recording("set_scissor")?;
        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };
        unsafe { self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]) };
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn DevicePipeline>) -> Result<()> {
        self.require_rendering("bind_pipeline")?;
        let vk_pipeline = unsafe { &*(Arc::as_ptr(pipeline) as *const Pipeline) };
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        pipeline: &Arc<dyn DevicePipeline>,
        set_index: u32,
        binding_group: &Arc<dyn DeviceBindingGroup>,
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        self.require_rendering("bind_binding_group")?;
        if binding_group.set_index() != set_index {
            engine_bail!(SOURCE,
                "Binding group created for set {} bound at set {}",
                binding_group.set_index(), set_index);
        }
        let vk_pipeline = unsafe { &*(Arc::as_ptr(pipeline) as *const Pipeline) };
        let vk_group = unsafe { &*(Arc::as_ptr(binding_group) as *const BindingGroup) };
        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.vk_layout,
                set_index,
                &[vk_group.descriptor_set],
                dynamic_offsets,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn DeviceBuffer>, offset: u64) -> Result<()> {
        self.require_rendering("bind_vertex_buffer")?;
        let vk_buffer = unsafe { &*(Arc::as_ptr(buffer) as *const Buffer) };
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[vk_buffer.buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn DeviceBuffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.require_rendering("bind_index_buffer")?;
        let vk_buffer = unsafe { &*(Arc::as_ptr(buffer) as *const Buffer) };
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.require_rendering("draw")?;
        unsafe { self.ctx.device.cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0) };
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.require_rendering("draw_indexed")?;
        unsafe {
            self.ctx.device.cmd_draw_indexed(self.command_buffer, index_count, 1, first_index, vertex_offset, 0);
        }
        Ok(())
    }

    fn prepare_present(&mut self, image: &Arc<dyn DeviceSwapchainImage>) -> Result<()> {
        self.require_recording("prepare_present")?;
        if self.in_rendering {
            engine_bail!(SOURCE, "prepare_present: a rendering scope is still open");
        }
        let vk_image = unsafe { &*(Arc::as_ptr(image) as *const SwapchainImage) };
        // A frame that never drew to the image presents undefined contents
        let old_layout = self.swapchain_layout.unwrap_or(vk::ImageLayout::UNDEFINED);
        transition_image(&self.ctx.device, self.command_buffer, vk_image.image,
            vk::ImageAspectFlags::COLOR, old_layout, vk::ImageLayout::PRESENT_SRC_KHR);
        self.swapchain_layout = Some(vk::ImageLayout::PRESENT_SRC_KHR);
        Ok(())
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        if self.in_rendering || self.is_recording {
            engine_warn!(SOURCE, "Command list dropped while still recording");
        }
        // Destroying the pool frees its command buffer
        self.ctx.retire(Retired::CommandPool(self.command_pool));
    }
}
