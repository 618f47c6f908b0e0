/// Texture - Vulkan implementation of the device Texture trait
///
/// Between uses a texture always sits in its resting layout (see
/// [`resting_layout`]). Command lists move render targets out of it for a
/// rendering scope and back when the scope ends, so sampling never needs to
/// know where the image was last written.

use relay_3d_engine::relay3d::{
    Result,
    device::{Texture as DeviceTexture, TextureDesc, TextureInfo, TextureRegion, TextureUsage},
};
use relay_3d_engine::{engine_bail, engine_err};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, Retired};
use crate::vulkan_format::{aspect_mask, texture_format_to_vk, texture_usage_to_vk};

const SOURCE: &str = "relay3d::vulkan";

// ============================================================================
// Layouts and barriers
// ============================================================================

/// Layout a texture of `usage` is kept in outside rendering scopes and uploads
pub(crate) fn resting_layout(usage: TextureUsage) -> vk::ImageLayout {
    match usage {
        TextureUsage::Sampled | TextureUsage::SampledAndRenderTarget => {
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        }
        TextureUsage::RenderTarget => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        TextureUsage::DepthStencil => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    }
}

/// Accesses and stages that touch an image while it is in `layout`
pub(crate) fn layout_scope(layout: vk::ImageLayout) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match layout {
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        vk::ImageLayout::PRESENT_SRC_KHR => (
            vk::AccessFlags::empty(),
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        ),
        // UNDEFINED and anything unexpected: wait for everything before
        _ => (
            vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
    }
}

/// Record a layout transition of the whole image
pub(crate) fn transition_image(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    aspect: vk::ImageAspectFlags,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (src_access, src_stage) = layout_scope(old_layout);
    let (dst_access, dst_stage) = layout_scope(new_layout);

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: aspect,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access);

    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

// ============================================================================
// Texture
// ============================================================================

/// Vulkan texture: image, view and memory
pub struct Texture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    pub(crate) aspect: vk::ImageAspectFlags,
    info: TextureInfo,
}

impl Texture {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!(SOURCE, "Cannot create a {}x{} texture", desc.width, desc.height);
        }
        if desc.usage == TextureUsage::DepthStencil && !desc.format.is_depth() {
            engine_bail!(SOURCE, "Depth/stencil texture needs a depth format, got {:?}", desc.format);
        }
        if let Some(data) = &desc.data {
            if desc.usage == TextureUsage::DepthStencil {
                engine_bail!(SOURCE, "Depth textures cannot be created with initial data");
            }
            if data.len() != desc.byte_len() {
                engine_bail!(SOURCE,
                    "Texture data size mismatch: {} bytes for a {}x{} {:?} texture (expected {})",
                    data.len(), desc.width, desc.height, desc.format, desc.byte_len());
            }
        }

        let format = texture_format_to_vk(desc.format);
        let aspect = aspect_mask(desc.format);

        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(texture_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create texture image: {:?}", e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = match ctx.allocate("texture", requirements, MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            // From here on a failure retires what was built so far
            let mut texture = Self {
                ctx: Arc::clone(ctx),
                image,
                view: vk::ImageView::null(),
                allocation: None,
                aspect,
                info: TextureInfo {
                    width: desc.width,
                    height: desc.height,
                    format: desc.format,
                    usage: desc.usage,
                },
            };

            let (memory, offset) = (allocation.memory(), allocation.offset());
            texture.allocation = Some(allocation);
            ctx.device.bind_image_memory(image, memory, offset)
                .map_err(|e| engine_err!(SOURCE, "Failed to bind texture image memory: {:?}", e))?;

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: aspect,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            texture.view = ctx.device.create_image_view(&view_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create texture image view: {:?}", e))?;

            match &desc.data {
                Some(data) => {
                    let full = TextureRegion { x: 0, y: 0, width: desc.width, height: desc.height };
                    texture.upload(full, data, vk::ImageLayout::UNDEFINED)?;
                }
                None => {
                    let resting = resting_layout(desc.usage);
                    ctx.one_shot(|device, cmd| {
                        transition_image(device, cmd, image, aspect, vk::ImageLayout::UNDEFINED, resting);
                    })?;
                }
            }

            Ok(texture)
        }
    }

    /// Copy `data` into `region` through a staging buffer, ending in the resting layout
    fn upload(&self, region: TextureRegion, data: &[u8], old_layout: vk::ImageLayout) -> Result<()> {
        let (staging, staging_allocation) = self.ctx.create_staging_buffer(data)?;

        let image = self.image;
        let aspect = self.aspect;
        let resting = resting_layout(self.info.usage);

        let result = self.ctx.one_shot(|device, cmd| {
            transition_image(device, cmd, image, aspect, old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);

            let copy = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: aspect,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: region.x as i32, y: region.y as i32, z: 0 })
                .image_extent(vk::Extent3D { width: region.width, height: region.height, depth: 1 });

            unsafe {
                device.cmd_copy_buffer_to_image(
                    cmd,
                    staging,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[copy],
                );
            }

            transition_image(device, cmd, image, aspect, vk::ImageLayout::TRANSFER_DST_OPTIMAL, resting);
        });

        // one_shot waited for the queue, the staging copy is done either way
        self.ctx.destroy_staging_buffer(staging, staging_allocation);
        result
    }
}

impl DeviceTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn update_region(&self, region: TextureRegion, data: &[u8]) -> Result<()> {
        if self.info.format.is_depth() {
            engine_bail!(SOURCE, "Depth textures cannot be updated from the CPU");
        }
        if !region.fits(self.info.width, self.info.height) {
            engine_bail!(SOURCE,
                "Texture region {:?} outside {}x{} texture",
                region, self.info.width, self.info.height);
        }
        let expected = region.width as usize
            * region.height as usize
            * self.info.format.bytes_per_pixel() as usize;
        if data.len() != expected {
            engine_bail!(SOURCE,
                "Texture update size mismatch: {} bytes for region {}x{} (expected {})",
                data.len(), region.width, region.height, expected);
        }

        // The frame in flight may still sample this image
        self.ctx.wait_queue_idle()?;
        self.upload(region, data, resting_layout(self.info.usage))
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.ctx.retire(Retired::Image {
            image: self.image,
            view: self.view,
            allocation: self.allocation.take(),
        });
    }
}

#[cfg(test)]
#[path = "vulkan_texture_tests.rs"]
mod tests;
