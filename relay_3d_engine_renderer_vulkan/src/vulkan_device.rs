/// VulkanDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns the instance, the logical device, the swapchain and the objects shared
/// by every resource (descriptor pools, sampler cache). One frame is in flight
/// at a time: `acquire_next_image` waits for the previous submission, then
/// destroys whatever resources were dropped since.

use relay_3d_engine::relay3d::{
    Error, Result,
    device::{
        BindingGroup as DeviceBindingGroup, BindingResource, Buffer as DeviceBuffer, BufferDesc,
        CommandList as DeviceCommandList, DeviceConfig, DeviceLimits, DeviceStats,
        GraphicsDevice, Pipeline as DevicePipeline, PipelineDesc,
        PipelineLayout as DevicePipelineLayout, PipelineLayoutDesc, ShaderDesc,
        ShaderModule as DeviceShaderModule, SwapchainImage as DeviceSwapchainImage,
        Texture as DeviceTexture, TextureDesc, TextureFormat,
    },
};
use relay_3d_engine::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CString;
use std::sync::{Arc, Mutex};

use crate::vulkan_binding_group::{BindingGroup, DescriptorPools};
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_debug::cleanup_debug_config;
use crate::vulkan_pipeline::{Pipeline, PipelineLayout};
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_shader::Shader;
use crate::vulkan_swapchain::{Swapchain, SwapchainImage};
use crate::vulkan_texture::Texture;

const SOURCE: &str = "relay3d::vulkan";

/// Anisotropy cap for linear samplers
const MAX_ANISOTROPY: f32 = 16.0;

/// Preference order when several GPUs qualify
pub(crate) fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 3,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1,
        _ => 0,
    }
}

pub(crate) fn device_limits(limits: &vk::PhysicalDeviceLimits) -> DeviceLimits {
    DeviceLimits {
        min_uniform_offset_alignment: limits.min_uniform_buffer_offset_alignment.max(1),
        max_uniform_range: u64::from(limits.max_uniform_buffer_range),
    }
}

fn init_failed(what: &str, detail: impl std::fmt::Debug) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, detail);
    Error::InitializationFailed(format!("{}: {:?}", what, detail))
}

/// Physical device chosen for rendering
struct SelectedGpu {
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
    properties: vk::PhysicalDeviceProperties,
    sampler_anisotropy: bool,
}

/// Vulkan graphics device
pub struct VulkanDevice {
    _entry: ash::Entry,
    instance: ash::Instance,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,

    /// Shared state handed to every resource
    ctx: Arc<GpuContext>,
    /// `None` only during drop
    swapchain: Option<Swapchain>,
    descriptor_pools: DescriptorPools,
    sampler_cache: Mutex<SamplerCache>,

    /// Signaled when the last submission has finished
    frame_fence: vk::Fence,
    /// A submission signalling `frame_fence` has not been waited for yet
    fence_pending: bool,
    /// Image acquired but not yet submitted (its semaphore is signaled)
    pending_image: Option<Arc<SwapchainImage>>,
    /// Last size requested by the window
    requested_extent: (u32, u32),
    swapchain_out_of_date: bool,

    limits: DeviceLimits,
    stats: DeviceStats,
}

impl VulkanDevice {
    /// Create a device presenting to `window`
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        width: u32,
        height: u32,
        config: DeviceConfig,
    ) -> Result<Self> {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| init_failed("Failed to load Vulkan library", e))?;

        let display_handle = window.display_handle()
            .map_err(|e| init_failed("Failed to get display handle", e))?;
        let window_handle = window.window_handle()
            .map_err(|e| init_failed("Failed to get window handle", e))?;

        let validation = Self::validation_available(&entry, &config);

        // ----- Instance -----
        let app_name = CString::new(config.app_name.as_str())
            .map_err(|e| init_failed("Invalid application name", e))?;
        let (major, minor, patch) = config.app_version;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(c"Relay3D")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| init_failed("Failed to get required instance extensions", e))?
            .to_vec();
        let layer_names = if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
        } else {
            vec![]
        };

        let instance_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        let instance = unsafe { entry.create_instance(&instance_info, None) }
            .map_err(|e| init_failed("Failed to create Vulkan instance", e))?;

        #[cfg(feature = "vulkan-validation")]
        let debug_messenger = if validation {
            Some(Self::create_debug_messenger(&entry, &instance, &config)?)
        } else {
            None
        };

        // ----- Surface and GPU -----
        let surface = unsafe {
            ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| init_failed("Failed to create surface", e))?;
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let gpu = Self::pick_gpu(&instance, &surface_loader, surface)?;
        let device_name = gpu.properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        engine_info!(SOURCE, "Using GPU '{}' (queue family {})", device_name, gpu.queue_family);

        // ----- Logical device -----
        let queue_priorities = [1.0];
        let queue_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(gpu.queue_family)
            .queue_priorities(&queue_priorities)];
        let device_extensions = [ash::khr::swapchain::NAME.as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(gpu.sampler_anisotropy);
        let mut features13 = vk::PhysicalDeviceVulkan13Features::default()
            .dynamic_rendering(true);

        let device_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&device_extensions)
            .enabled_features(&features)
            .push_next(&mut features13);

        let device = unsafe { instance.create_device(gpu.physical_device, &device_info, None) }
            .map_err(|e| init_failed("Failed to create logical device", e))?;
        let graphics_queue = unsafe { device.get_device_queue(gpu.queue_family, 0) };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device: gpu.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| init_failed("Failed to create GPU allocator", e))?;

        let ctx = Arc::new(GpuContext::new(device, allocator, graphics_queue, gpu.queue_family)?);

        // ----- Shared objects -----
        let descriptor_pools = DescriptorPools::new(&ctx.device)?;
        let max_anisotropy = if gpu.sampler_anisotropy {
            gpu.properties.limits.max_sampler_anisotropy.min(MAX_ANISOTROPY)
        } else {
            1.0
        };
        let sampler_cache = Mutex::new(SamplerCache::new(Arc::clone(&ctx), max_anisotropy));

        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
        let frame_fence = unsafe { ctx.device.create_fence(&fence_info, None) }
            .map_err(|e| init_failed("Failed to create frame fence", e))?;

        let swapchain = Swapchain::new(
            Arc::clone(&ctx),
            &instance,
            gpu.physical_device,
            surface,
            surface_loader,
            width,
            height,
        )?;

        let limits = device_limits(&gpu.properties.limits);
        engine_debug!(SOURCE,
            "Device limits: uniform offset alignment {}, max uniform range {}, anisotropy {}",
            limits.min_uniform_offset_alignment, limits.max_uniform_range, max_anisotropy);

        Ok(Self {
            _entry: entry,
            instance,
            #[cfg(feature = "vulkan-validation")]
            debug_messenger,
            ctx,
            swapchain: Some(swapchain),
            descriptor_pools,
            sampler_cache,
            frame_fence,
            fence_pending: false,
            pending_image: None,
            requested_extent: (width, height),
            swapchain_out_of_date: false,
            limits,
            stats: DeviceStats::default(),
        })
    }

    /// Create a device for a winit window, sized to its inner size
    pub fn from_window(window: &winit::window::Window, config: DeviceConfig) -> Result<Self> {
        let size = window.inner_size();
        Self::new(window, size.width, size.height, config)
    }

    /// Whether validation layers will actually be enabled
    fn validation_available(entry: &ash::Entry, config: &DeviceConfig) -> bool {
        if !config.enable_validation {
            return false;
        }
        if !cfg!(feature = "vulkan-validation") {
            engine_warn!(SOURCE,
                "Validation requested but the crate was built without the 'vulkan-validation' feature");
            return false;
        }

        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let found = layers.iter().any(|layer| {
            layer.layer_name_as_c_str()
                .map(|name| name == c"VK_LAYER_KHRONOS_validation")
                .unwrap_or(false)
        });
        if !found {
            engine_warn!(SOURCE, "VK_LAYER_KHRONOS_validation is not installed, validation disabled");
        }
        found
    }

    #[cfg(feature = "vulkan-validation")]
    fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &DeviceConfig,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        use crate::vulkan_debug::{init_debug_config, severity_mask, vulkan_debug_callback, DebugConfig};

        init_debug_config(DebugConfig::from(config));

        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
        let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(severity_mask(config.debug_severity))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&info, None) }
            .map_err(|e| init_failed("Failed to create debug messenger", e))?;
        engine_debug!(SOURCE, "Validation layers enabled ({:?})", config.debug_severity);
        Ok((debug_utils, messenger))
    }

    /// Best Vulkan 1.3 GPU with dynamic rendering and a queue that can draw and present
    fn pick_gpu(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<SelectedGpu> {
        let physical_devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(|e| init_failed("Failed to enumerate physical devices", e))?;

        let mut best: Option<(u32, SelectedGpu)> = None;
        for physical_device in physical_devices {
            let properties = unsafe { instance.get_physical_device_properties(physical_device) };
            if properties.api_version < vk::API_VERSION_1_3 {
                continue;
            }

            let mut features13 = vk::PhysicalDeviceVulkan13Features::default();
            let sampler_anisotropy = {
                let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut features13);
                unsafe { instance.get_physical_device_features2(physical_device, &mut features2) };
                features2.features.sampler_anisotropy == vk::TRUE
            };
            if features13.dynamic_rendering != vk::TRUE {
                continue;
            }

            let families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
            let queue_family = (0..families.len() as u32).find(|&index| {
                families[index as usize].queue_flags.contains(vk::QueueFlags::GRAPHICS)
                    && unsafe {
                        surface_loader
                            .get_physical_device_surface_support(physical_device, index, surface)
                            .unwrap_or(false)
                    }
            });
            let Some(queue_family) = queue_family else {
                continue;
            };

            let score = device_type_score(properties.device_type);
            if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                best = Some((score, SelectedGpu {
                    physical_device,
                    queue_family,
                    properties,
                    sampler_anisotropy,
                }));
            }
        }

        best.map(|(_, gpu)| gpu).ok_or_else(|| {
            engine_error!(SOURCE, "No GPU supports Vulkan 1.3 dynamic rendering with presentation");
            Error::InitializationFailed("No suitable Vulkan GPU found".to_string())
        })
    }

    fn swapchain_mut(&mut self) -> Result<&mut Swapchain> {
        self.swapchain
            .as_mut()
            .ok_or_else(|| Error::InvalidState("Swapchain is not available".to_string()))
    }

    /// Wait for the last submission, then destroy resources dropped since
    fn wait_frame_fence(&mut self) -> Result<()> {
        if self.fence_pending {
            unsafe {
                self.ctx.device
                    .wait_for_fences(&[self.frame_fence], true, u64::MAX)
                    .map_err(|e| engine_err!(SOURCE, "Failed to wait for frame fence: {:?}", e))?;
            }
            self.fence_pending = false;
        }
        self.ctx.collect_retired();
        Ok(())
    }

    /// Unsignal the semaphore of an image acquired but never submitted
    fn release_pending_image(&mut self) -> Result<()> {
        let Some(_image) = self.pending_image.take() else {
            return Ok(());
        };
        let Some(swapchain) = self.swapchain.as_ref() else {
            return Ok(());
        };

        let wait_semaphores = [swapchain.image_available()];
        let wait_stages = [vk::PipelineStageFlags::BOTTOM_OF_PIPE];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages);
        unsafe {
            self.ctx.device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!(SOURCE, "Failed to release acquired image: {:?}", e))?;
        }
        self.ctx.wait_queue_idle()
    }

    fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        self.wait_idle()?;
        self.release_pending_image()?;
        self.swapchain_mut()?.recreate(width, height)?;
        self.swapchain_out_of_date = false;
        Ok(())
    }
}

impl GraphicsDevice for VulkanDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn DeviceBuffer>> {
        let buffer = Buffer::create(&self.ctx, &desc)?;
        self.stats.buffers_created += 1;
        Ok(Arc::new(buffer))
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn DeviceTexture>> {
        let texture = Texture::create(&self.ctx, &desc)?;
        self.stats.textures_created += 1;
        Ok(Arc::new(texture))
    }

    fn create_shader_module(&mut self, desc: ShaderDesc) -> Result<Arc<dyn DeviceShaderModule>> {
        Ok(Arc::new(Shader::create(&self.ctx, &desc)?))
    }

    fn create_pipeline_layout(&mut self, desc: PipelineLayoutDesc) -> Result<Arc<dyn DevicePipelineLayout>> {
        Ok(Arc::new(PipelineLayout::create(&self.ctx, desc)?))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn DevicePipeline>> {
        let pipeline = Pipeline::create(&self.ctx, &desc)?;
        self.stats.pipelines_created += 1;
        Ok(Arc::new(pipeline))
    }

    fn create_binding_group(
        &mut self,
        layout: &Arc<dyn DevicePipelineLayout>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn DeviceBindingGroup>> {
        let group = BindingGroup::create(
            &self.ctx,
            &self.descriptor_pools,
            &self.sampler_cache,
            layout,
            set_index,
            resources,
        )?;
        self.stats.binding_groups_created += 1;
        Ok(Arc::new(group))
    }

    fn create_command_list(&mut self) -> Result<Box<dyn DeviceCommandList>> {
        Ok(Box::new(CommandList::new(&self.ctx)?))
    }

    fn acquire_next_image(&mut self) -> Result<Option<Arc<dyn DeviceSwapchainImage>>> {
        self.wait_frame_fence()?;

        // An aborted frame left its image acquired: hand it out again
        if let Some(image) = &self.pending_image {
            return Ok(Some(Arc::clone(image) as Arc<dyn DeviceSwapchainImage>));
        }

        if self.swapchain_out_of_date {
            let (width, height) = self.requested_extent;
            if width == 0 || height == 0 {
                return Ok(None);
            }
            self.recreate_swapchain(width, height)?;
        }

        match self.swapchain_mut()?.acquire()? {
            Some(image) => {
                self.pending_image = Some(Arc::clone(&image));
                Ok(Some(image as Arc<dyn DeviceSwapchainImage>))
            }
            None => {
                self.swapchain_out_of_date = true;
                Ok(None)
            }
        }
    }

    fn submit_and_present(&mut self, commands: &dyn DeviceCommandList, image: &Arc<dyn DeviceSwapchainImage>) -> Result<()> {
        let vk_commands = unsafe { &*(commands as *const dyn DeviceCommandList as *const CommandList) };
        let vk_image = unsafe { &*(Arc::as_ptr(image) as *const SwapchainImage) };

        match &self.pending_image {
            Some(pending) if pending.index == vk_image.index => {}
            _ => engine_bail!(SOURCE, "submit_and_present: image {} was not acquired", vk_image.index),
        }

        let swapchain = self.swapchain
            .as_ref()
            .ok_or_else(|| Error::InvalidState("Swapchain is not available".to_string()))?;
        let wait_semaphores = [swapchain.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [swapchain.render_finished(vk_image.index)];
        let command_buffers = [vk_commands.command_buffer()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx.device
                .reset_fences(&[self.frame_fence])
                .map_err(|e| engine_err!(SOURCE, "Failed to reset frame fence: {:?}", e))?;
            self.ctx.device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], self.frame_fence)
                .map_err(|e| engine_err!(SOURCE, "Failed to submit commands to GPU queue: {:?}", e))?;
        }
        self.fence_pending = true;
        self.pending_image = None;
        self.stats.frames_submitted += 1;

        if !self.swapchain_mut()?.present(vk_image.index)? {
            self.swapchain_out_of_date = true;
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx.device
                .device_wait_idle()
                .map_err(|e| engine_err!(SOURCE, "Failed to wait idle: {:?}", e))
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.requested_extent = (width, height);
        if width == 0 || height == 0 {
            // Minimized: recreate once the window has a size again
            engine_debug!(SOURCE, "Zero-sized surface, swapchain recreation deferred");
            self.swapchain_out_of_date = true;
            return Ok(());
        }
        self.recreate_swapchain(width, height)
    }

    fn surface_format(&self) -> TextureFormat {
        self.swapchain
            .as_ref()
            .map(|swapchain| swapchain.format())
            .unwrap_or(TextureFormat::B8G8R8A8_SRGB)
    }

    fn surface_extent(&self) -> (u32, u32) {
        self.swapchain
            .as_ref()
            .map(|swapchain| swapchain.extent())
            .unwrap_or(self.requested_extent)
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn stats(&self) -> DeviceStats {
        self.stats
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe { self.ctx.device.device_wait_idle().ok() };
        engine_debug!(SOURCE,
            "Shutting down device ({} descriptor pools, {} retired objects pending)",
            self.descriptor_pools.pool_count(), self.ctx.retired_count());

        // 1. Objects holding an Arc<GpuContext>
        if let Ok(cache) = self.sampler_cache.get_mut() {
            cache.shutdown();
        }
        self.pending_image = None;
        self.swapchain = None;

        // 2. Retired resources, upload pool and allocator
        self.ctx.shutdown();

        // 3. Device-owned objects
        self.descriptor_pools.destroy_all(&self.ctx.device);
        unsafe { self.ctx.device.destroy_fence(self.frame_fence, None) };

        // 4. Stop routing validation messages, then tear down the messenger
        cleanup_debug_config();
        #[cfg(feature = "vulkan-validation")]
        if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
            unsafe { debug_utils.destroy_debug_utils_messenger(messenger, None) };
        }

        // 5. Device and instance
        unsafe {
            self.ctx.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
