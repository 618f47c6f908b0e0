/// Buffer - Vulkan implementation of the device Buffer trait

use relay_3d_engine::relay3d::{
    Result,
    device::{Buffer as DeviceBuffer, BufferDesc},
};
use relay_3d_engine::{engine_bail, engine_err};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, Retired};
use crate::vulkan_format::buffer_usage_to_vk;

const SOURCE: &str = "relay3d::vulkan";

/// Host-visible Vulkan buffer
///
/// Every buffer lives in `CpuToGpu` memory so `update` is a plain memcpy.
/// Vertex, index and uniform data all change from the CPU every frame or so.
pub struct Buffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
}

impl Buffer {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            engine_bail!(SOURCE, "Cannot create an empty {:?} buffer", desc.usage);
        }

        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage) | vk::BufferUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create buffer of size {} bytes: {:?}", desc.size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = match ctx.allocate("buffer", requirements, MemoryLocation::CpuToGpu, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.retire(Retired::Buffer { buffer, allocation: Some(allocation) });
                engine_bail!(SOURCE, "Failed to bind buffer memory: {:?}", e);
            }

            Ok(Self {
                ctx: Arc::clone(ctx),
                buffer,
                allocation: Some(allocation),
                size: desc.size,
            })
        }
    }
}

impl DeviceBuffer for Buffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            engine_bail!(SOURCE,
                "Buffer update out of range: offset {} + {} bytes exceeds size {}",
                offset, data.len(), self.size);
        }

        let Some(allocation) = &self.allocation else {
            engine_bail!(SOURCE, "Buffer update failed: no GPU allocation");
        };
        let mapped = allocation
            .mapped_ptr()
            .ok_or_else(|| engine_err!(SOURCE, "Buffer is not CPU-accessible"))?;

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                (mapped.as_ptr() as *mut u8).add(offset as usize),
                data.len(),
            );
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.ctx.retire(Retired::Buffer {
            buffer: self.buffer,
            allocation: self.allocation.take(),
        });
    }
}
