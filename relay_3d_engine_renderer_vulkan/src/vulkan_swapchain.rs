/// Swapchain - presentation images, acquire/present and recreation on resize

use relay_3d_engine::relay3d::{
    Error, Result,
    device::{SwapchainImage as DeviceSwapchainImage, TextureFormat},
};
use relay_3d_engine::{engine_debug, engine_err, engine_error, engine_warn};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::vk_to_texture_format;

const SOURCE: &str = "relay3d::vulkan";

// ============================================================================
// Surface negotiation
// ============================================================================

/// Pick the presentation format: sRGB BGRA/RGBA first, then any format the engine can name
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    let preferred = formats.iter().find(|f| {
        (f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB)
            && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    });
    preferred
        .or_else(|| formats.iter().find(|f| vk_to_texture_format(f.format).is_some()))
        .copied()
}

/// Surface extent: the current one when the platform fixes it, else the clamped window size
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more image than the minimum, within the maximum (0 means unbounded)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

// ============================================================================
// SwapchainImage
// ============================================================================

/// Image acquired for one frame
pub struct SwapchainImage {
    pub(crate) index: u32,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    extent: vk::Extent2D,
}

impl DeviceSwapchainImage for SwapchainImage {
    fn index(&self) -> u32 {
        self.index
    }

    fn extent(&self) -> (u32, u32) {
        (self.extent.width, self.extent.height)
    }
}

// ============================================================================
// Swapchain
// ============================================================================

/// Vulkan swapchain with its surface
///
/// One frame is in flight at a time, so a single image-available semaphore
/// suffices; render-finished semaphores are per image because presentation
/// of an image may still wait on its semaphore when the next frame starts.
pub(crate) struct Swapchain {
    ctx: Arc<GpuContext>,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    image_available: vk::Semaphore,
    render_finished: Vec<vk::Semaphore>,
}

impl Swapchain {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: ash::khr::surface::Instance,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)
        }
        .map_err(|e| {
            engine_error!(SOURCE, "Failed to query surface formats: {:?}", e);
            Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
        })?;

        let format = choose_surface_format(&formats).ok_or_else(|| {
            engine_error!(SOURCE, "No supported surface format among {:?}", formats);
            Error::InitializationFailed("No supported surface format".to_string())
        })?;

        let image_available = unsafe {
            ctx.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
        }
        .map_err(|e| {
            engine_error!(SOURCE, "Failed to create image-available semaphore: {:?}", e);
            Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
        })?;

        let swapchain_loader = ash::khr::swapchain::Device::new(instance, &ctx.device);

        let mut swapchain = Self {
            ctx,
            physical_device,
            surface,
            surface_loader,
            swapchain: vk::SwapchainKHR::null(),
            swapchain_loader,
            images: Vec::new(),
            views: Vec::new(),
            format,
            extent: vk::Extent2D { width, height },
            image_available,
            render_finished: Vec::new(),
        };
        swapchain.build(width, height)?;
        Ok(swapchain)
    }

    /// (Re)create the swapchain, its views and per-image semaphores
    ///
    /// The device must be idle.
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        let ctx = Arc::clone(&self.ctx);
        let device = &ctx.device;

        let capabilities = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
        }
        .map_err(|e| {
            engine_error!(SOURCE, "Failed to get surface capabilities: {:?}", e);
            Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
        })?;

        let extent = choose_extent(&capabilities, width, height);
        let old_swapchain = self.swapchain;

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(choose_image_count(&capabilities))
            .image_format(self.format.format)
            .image_color_space(self.format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create swapchain: {:?}", e);
                Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
            })?;

        self.destroy_image_resources();
        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe { self.swapchain_loader.destroy_swapchain(old_swapchain, None) };
        }
        self.swapchain = swapchain;
        self.extent = extent;

        self.images = unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
            .map_err(|e| engine_err!(SOURCE, "Failed to get swapchain images: {:?}", e))?;

        for &image in &self.images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.format.format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe { device.create_image_view(&view_info, None) }
                .map_err(|e| engine_err!(SOURCE, "Failed to create swapchain image view: {:?}", e))?;
            self.views.push(view);

            let semaphore = unsafe { device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
                .map_err(|e| engine_err!(SOURCE, "Failed to create render-finished semaphore: {:?}", e))?;
            self.render_finished.push(semaphore);
        }

        engine_debug!(SOURCE,
            "Swapchain ready: {} images, {}x{}, {:?}",
            self.images.len(), extent.width, extent.height, self.format.format);
        Ok(())
    }

    fn destroy_image_resources(&mut self) {
        let device = &self.ctx.device;
        for view in self.views.drain(..) {
            unsafe { device.destroy_image_view(view, None) };
        }
        for semaphore in self.render_finished.drain(..) {
            unsafe { device.destroy_semaphore(semaphore, None) };
        }
        self.images.clear();
    }

    /// Rebuild for a new window size (the device must be idle)
    pub(crate) fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.build(width, height)
    }

    /// Acquire the next image, signalling `image_available`
    ///
    /// `Ok(None)` means the swapchain no longer matches the surface.
    pub(crate) fn acquire(&mut self) -> Result<Option<Arc<SwapchainImage>>> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                self.image_available,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, _suboptimal)) => {
                let image = self.images[index as usize];
                let view = self.views[index as usize];
                Ok(Some(Arc::new(SwapchainImage {
                    index,
                    image,
                    view,
                    extent: self.extent,
                })))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!(SOURCE, "Swapchain out of date during acquire");
                Ok(None)
            }
            Err(e) => Err(engine_err!(SOURCE, "Failed to acquire next swapchain image: {:?}", e)),
        }
    }

    /// Present `index`, waiting on its render-finished semaphore
    ///
    /// Returns `false` when the swapchain is out of date or suboptimal.
    pub(crate) fn present(&mut self, index: u32) -> Result<bool> {
        let swapchains = [self.swapchain];
        let image_indices = [index];
        let wait_semaphores = [self.render_finished(index)];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.swapchain_loader.queue_present(self.ctx.graphics_queue, &present_info) } {
            Ok(false) => Ok(true),
            Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_warn!(SOURCE, "Swapchain out of date during present");
                Ok(false)
            }
            Err(e) => Err(engine_err!(SOURCE, "Failed to present swapchain image: {:?}", e)),
        }
    }

    pub(crate) fn image_available(&self) -> vk::Semaphore {
        self.image_available
    }

    pub(crate) fn render_finished(&self, index: u32) -> vk::Semaphore {
        self.render_finished[index as usize]
    }

    pub(crate) fn format(&self) -> TextureFormat {
        // choose_surface_format only accepts formats the engine can name
        vk_to_texture_format(self.format.format).unwrap_or(TextureFormat::B8G8R8A8_SRGB)
    }

    pub(crate) fn extent(&self) -> (u32, u32) {
        (self.extent.width, self.extent.height)
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe { self.ctx.device.device_wait_idle().ok() };
        self.destroy_image_resources();
        unsafe {
            self.ctx.device.destroy_semaphore(self.image_available, None);
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
