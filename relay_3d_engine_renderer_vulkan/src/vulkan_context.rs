/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Every resource (buffers, textures, pipelines, binding groups, command
/// lists) holds an `Arc<GpuContext>`. Dropping a resource does not destroy its
/// Vulkan objects right away: they are handed back to the context as
/// [`Retired`] entries and destroyed by [`GpuContext::collect_retired`] once the
/// device knows the GPU is done with the frame that may still reference them.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use relay_3d_engine::relay3d::{Error, Result};
use relay_3d_engine::{engine_bail, engine_err, engine_error, engine_trace};

const SOURCE: &str = "relay3d::vulkan";

/// Vulkan objects waiting for the GPU to release them
pub(crate) enum Retired {
    Buffer {
        buffer: vk::Buffer,
        allocation: Option<Allocation>,
    },
    Image {
        image: vk::Image,
        view: vk::ImageView,
        allocation: Option<Allocation>,
    },
    ShaderModule(vk::ShaderModule),
    PipelineLayout {
        layout: vk::PipelineLayout,
        set_layouts: Vec<vk::DescriptorSetLayout>,
    },
    Pipeline(vk::Pipeline),
    DescriptorSet {
        pool: vk::DescriptorPool,
        set: vk::DescriptorSet,
    },
    CommandPool(vk::CommandPool),
}

/// Shared GPU context for all Vulkan resources.
///
/// The logical device itself is destroyed by `VulkanDevice::drop`, after
/// [`GpuContext::shutdown`] has released everything allocated through it.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,
    /// GPU memory allocator (`None` once shut down)
    allocator: Mutex<Option<Allocator>>,
    /// Graphics queue (also used for uploads)
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,
    /// Reusable pool for one-shot upload command buffers
    upload_command_pool: Mutex<vk::CommandPool>,
    /// Objects dropped since the last collection
    retired: Mutex<Vec<Retired>>,
    alive: AtomicBool,
}

impl GpuContext {
    pub(crate) fn new(
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
    ) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(graphics_queue_family)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let upload_command_pool = unsafe { device.create_command_pool(&pool_info, None) }
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create upload command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e))
            })?;

        Ok(Self {
            device,
            allocator: Mutex::new(Some(allocator)),
            graphics_queue,
            graphics_queue_family,
            upload_command_pool: Mutex::new(upload_command_pool),
            retired: Mutex::new(Vec::new()),
            alive: AtomicBool::new(true),
        })
    }

    // ===== MEMORY =====

    /// Allocate device memory for a buffer or image
    pub(crate) fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut guard = self
            .allocator
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Allocator lock poisoned"))?;
        let allocator = guard
            .as_mut()
            .ok_or_else(|| engine_err!(SOURCE, "Allocation of '{}' after device shutdown", name))?;

        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                engine_error!(SOURCE, "Out of GPU memory for '{}' ({:.2} MB): {:?}", name, size_mb, e);
                Error::OutOfMemory
            })
    }

    fn free(&self, allocation: Allocation) {
        if let Ok(mut guard) = self.allocator.lock() {
            if let Some(allocator) = guard.as_mut() {
                allocator.free(allocation).ok();
            }
        }
    }

    /// Create a mapped, host-visible buffer filled with `data`
    pub(crate) fn create_staging_buffer(&self, data: &[u8]) -> Result<(vk::Buffer, Allocation)> {
        unsafe {
            let info = vk::BufferCreateInfo::default()
                .size(data.len() as u64)
                .usage(vk::BufferUsageFlags::TRANSFER_SRC)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self.device.create_buffer(&info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create staging buffer: {:?}", e))?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let allocation = match self.allocate("staging_buffer", requirements, MemoryLocation::CpuToGpu, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = self.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.free(allocation);
                self.device.destroy_buffer(buffer, None);
                engine_bail!(SOURCE, "Failed to bind staging buffer memory: {:?}", e);
            }

            let Some(mapped) = allocation.mapped_ptr() else {
                self.free(allocation);
                self.device.destroy_buffer(buffer, None);
                engine_bail!(SOURCE, "Staging buffer is not host-mapped");
            };
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.as_ptr() as *mut u8, data.len());

            Ok((buffer, allocation))
        }
    }

    /// Destroy a staging buffer whose copy has completed
    pub(crate) fn destroy_staging_buffer(&self, buffer: vk::Buffer, allocation: Allocation) {
        self.free(allocation);
        unsafe { self.device.destroy_buffer(buffer, None) };
    }

    // ===== ONE-SHOT SUBMISSION =====

    /// Record commands into a temporary command buffer, submit, and wait
    pub(crate) fn one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        // Held for the whole submission: command pools are externally synchronized
        let pool_guard = self
            .upload_command_pool
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Upload pool lock poisoned"))?;
        let pool = *pool_guard;
        if pool == vk::CommandPool::null() {
            engine_bail!(SOURCE, "one_shot called after device shutdown");
        }

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!(SOURCE, "Failed to allocate upload command buffer: {:?}", e))?[0];

            let result = (|| {
                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                self.device.begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| engine_err!(SOURCE, "Failed to begin upload command buffer: {:?}", e))?;

                record(&self.device, command_buffer);

                self.device.end_command_buffer(command_buffer)
                    .map_err(|e| engine_err!(SOURCE, "Failed to end upload command buffer: {:?}", e))?;

                let command_buffers = [command_buffer];
                let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
                self.device.queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                    .map_err(|e| engine_err!(SOURCE, "Failed to submit upload: {:?}", e))?;
                self.device.queue_wait_idle(self.graphics_queue)
                    .map_err(|e| engine_err!(SOURCE, "Failed to wait for upload: {:?}", e))
            })();

            self.device.free_command_buffers(pool, &[command_buffer]);
            result
        }
    }

    /// Block until the graphics queue is idle
    pub(crate) fn wait_queue_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .queue_wait_idle(self.graphics_queue)
                .map_err(|e| engine_err!(SOURCE, "Failed to wait for queue idle: {:?}", e))
        }
    }

    // ===== DEFERRED DESTRUCTION =====

    /// Hand back objects of a dropped resource
    pub(crate) fn retire(&self, item: Retired) {
        if !self.alive.load(Ordering::Acquire) {
            // The device is gone; nothing left to destroy them with
            return;
        }
        if let Ok(mut retired) = self.retired.lock() {
            retired.push(item);
        }
    }

    pub(crate) fn retired_count(&self) -> usize {
        self.retired.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Destroy everything retired so far
    ///
    /// Only call once the GPU has finished every submission that could
    /// reference the retired objects.
    pub(crate) fn collect_retired(&self) {
        let drained: Vec<Retired> = match self.retired.lock() {
            Ok(mut retired) => retired.drain(..).collect(),
            Err(_) => return,
        };
        if drained.is_empty() {
            return;
        }
        engine_trace!(SOURCE, "Destroying {} retired objects", drained.len());

        for item in drained {
            unsafe { self.destroy(item) };
        }
    }

    unsafe fn destroy(&self, item: Retired) {
        match item {
            Retired::Buffer { buffer, allocation } => {
                if let Some(allocation) = allocation {
                    self.free(allocation);
                }
                self.device.destroy_buffer(buffer, None);
            }
            Retired::Image { image, view, allocation } => {
                self.device.destroy_image_view(view, None);
                if let Some(allocation) = allocation {
                    self.free(allocation);
                }
                self.device.destroy_image(image, None);
            }
            Retired::ShaderModule(module) => {
                self.device.destroy_shader_module(module, None);
            }
            Retired::PipelineLayout { layout, set_layouts } => {
                self.device.destroy_pipeline_layout(layout, None);
                for set_layout in set_layouts {
                    self.device.destroy_descriptor_set_layout(set_layout, None);
                }
            }
            Retired::Pipeline(pipeline) => {
                self.device.destroy_pipeline(pipeline, None);
            }
            Retired::DescriptorSet { pool, set } => {
                self.device.free_descriptor_sets(pool, &[set]).ok();
            }
            Retired::CommandPool(pool) => {
                self.device.destroy_command_pool(pool, None);
            }
        }
    }

    /// Release everything owned by the context (the device must be idle)
    ///
    /// Afterwards resources that are still alive leak their Vulkan objects
    /// instead of touching a destroyed device.
    pub(crate) fn shutdown(&self) {
        self.collect_retired();
        self.alive.store(false, Ordering::Release);

        if let Ok(mut pool) = self.upload_command_pool.lock() {
            if *pool != vk::CommandPool::null() {
                unsafe { self.device.destroy_command_pool(*pool, None) };
                *pool = vk::CommandPool::null();
            }
        }

        // Free VkDeviceMemory pages before the device goes away
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.take();
        }
    }
}
