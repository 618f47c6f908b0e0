/// BindingGroup - Vulkan descriptor sets and the pools they come from

use relay_3d_engine::relay3d::{
    Result,
    device::{
        BindingGroup as DeviceBindingGroup, BindingResource, BindingType,
        Buffer as DeviceBuffer, PipelineLayout as DevicePipelineLayout,
        Texture as DeviceTexture,
    },
};
use relay_3d_engine::{engine_bail, engine_err, engine_info};
use ash::vk;
use std::sync::{Arc, Mutex};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::{GpuContext, Retired};
use crate::vulkan_format::binding_type_to_vk;
use crate::vulkan_pipeline::PipelineLayout;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_texture::Texture;

const SOURCE: &str = "relay3d::vulkan";

/// Sets per descriptor pool
const SETS_PER_POOL: u32 = 1024;

// ============================================================================
// Descriptor pools
// ============================================================================

/// Growable list of descriptor pools
///
/// Sets are allocated from the newest pool; a new pool is added when it runs
/// out. Pools allow freeing individual sets, which is what retiring a
/// binding group does.
pub(crate) struct DescriptorPools {
    pools: Mutex<Vec<vk::DescriptorPool>>,
}

impl DescriptorPools {
    pub(crate) fn new(device: &ash::Device) -> Result<Self> {
        let pool = Self::create_pool(device)?;
        Ok(Self { pools: Mutex::new(vec![pool]) })
    }

    fn create_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                descriptor_count: SETS_PER_POOL,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: SETS_PER_POOL,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: SETS_PER_POOL,
            },
        ];
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(SETS_PER_POOL);

        unsafe { device.create_descriptor_pool(&info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create descriptor pool: {:?}", e))
    }

    /// Allocate one set of `layout`, growing the pool list when exhausted
    fn allocate(
        &self,
        device: &ash::Device,
        layout: vk::DescriptorSetLayout,
    ) -> Result<(vk::DescriptorPool, vk::DescriptorSet)> {
        let mut pools = self.pools
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Descriptor pool lock poisoned"))?;
        let layouts = [layout];

        if let Some(&current) = pools.last() {
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(current)
                .set_layouts(&layouts);

            match unsafe { device.allocate_descriptor_sets(&allocate_info) } {
                Ok(sets) => return Ok((current, sets[0])),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {}
                Err(e) => engine_bail!(SOURCE, "Failed to allocate descriptor set: {:?}", e),
            }
        }

        let new_pool = Self::create_pool(device)?;
        pools.push(new_pool);
        engine_info!(SOURCE, "Descriptor pool exhausted, created new pool (total: {})", pools.len());

        let retry_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(new_pool)
            .set_layouts(&layouts);
        let sets = unsafe { device.allocate_descriptor_sets(&retry_info) }
            .map_err(|e| engine_err!(SOURCE, "Failed to allocate descriptor set after pool growth: {:?}", e))?;
        Ok((new_pool, sets[0]))
    }

    pub(crate) fn pool_count(&self) -> usize {
        self.pools.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Destroy every pool (and implicitly every set still allocated from them)
    pub(crate) fn destroy_all(&self, device: &ash::Device) {
        if let Ok(mut pools) = self.pools.lock() {
            for pool in pools.drain(..) {
                unsafe { device.destroy_descriptor_pool(pool, None) };
            }
        }
    }
}

// ============================================================================
// BindingGroup
// ============================================================================

/// Vulkan binding group (one descriptor set)
///
/// Immutable after creation: create a new group to change resources.
pub struct BindingGroup {
    ctx: Arc<GpuContext>,
    pool: vk::DescriptorPool,
    pub(crate) descriptor_set: vk::DescriptorSet,
    set_index: u32,
}

impl BindingGroup {
    pub(crate) fn create(
        ctx: &Arc<GpuContext>,
        pools: &DescriptorPools,
        samplers: &Mutex<SamplerCache>,
        layout: &Arc<dyn DevicePipelineLayout>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Self> {
        let vk_layout = unsafe { &*(Arc::as_ptr(layout) as *const PipelineLayout) };

        let Some(set_desc) = layout.desc().set_layouts.get(set_index as usize) else {
            engine_bail!(SOURCE,
                "create_binding_group: set_index {} out of range (layout has {} sets)",
                set_index, layout.desc().set_layouts.len());
        };
        if resources.len() != set_desc.entries.len() {
            engine_bail!(SOURCE,
                "create_binding_group: {} resources for a set with {} bindings",
                resources.len(), set_desc.entries.len());
        }

        // Resolve every resource before allocating, so a mismatch wastes nothing
        let mut buffer_infos: Vec<vk::DescriptorBufferInfo> = Vec::new();
        let mut image_infos: Vec<vk::DescriptorImageInfo> = Vec::new();
        for (entry, resource) in set_desc.entries.iter().zip(resources) {
            match (entry.binding_type, resource) {
                (BindingType::UniformBuffer, BindingResource::UniformBuffer(buffer)) => {
                    let vk_buffer = unsafe { &*(*buffer as *const dyn DeviceBuffer as *const Buffer) };
                    buffer_infos.push(
                        vk::DescriptorBufferInfo::default()
                            .buffer(vk_buffer.buffer)
                            .offset(0)
                            .range(vk::WHOLE_SIZE),
                    );
                }
                (BindingType::UniformBufferDynamic, BindingResource::UniformBufferDynamic { buffer, range }) => {
                    if *range == 0 || *range > buffer.size() {
                        engine_bail!(SOURCE,
                            "Dynamic uniform range {} invalid for a {} byte buffer",
                            range, buffer.size());
                    }
                    let vk_buffer = unsafe { &*(*buffer as *const dyn DeviceBuffer as *const Buffer) };
                    buffer_infos.push(
                        vk::DescriptorBufferInfo::default()
                            .buffer(vk_buffer.buffer)
                            .offset(0)
                            .range(*range),
                    );
                }
                (BindingType::CombinedImageSampler, BindingResource::SampledTexture(texture, sampler_type)) => {
                    if !texture.info().usage.is_sampled() {
                        engine_bail!(SOURCE,
                            "Texture with usage {:?} cannot be sampled", texture.info().usage);
                    }
                    let vk_texture = unsafe { &*(*texture as *const dyn DeviceTexture as *const Texture) };
                    let sampler = samplers
                        .lock()
                        .map_err(|_| engine_err!(SOURCE, "Sampler cache lock poisoned"))?
                        .get(*sampler_type)?;
                    image_infos.push(
                        vk::DescriptorImageInfo::default()
                            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                            .image_view(vk_texture.view)
                            .sampler(sampler),
                    );
                }
                (expected, _) => {
                    engine_bail!(SOURCE,
                        "Binding {} expects {:?}, got a different resource kind",
                        entry.binding, expected);
                }
            }
        }

        let Some(&set_layout) = vk_layout.set_layouts.get(set_index as usize) else {
            engine_bail!(SOURCE, "Pipeline layout has no VkDescriptorSetLayout for set {}", set_index);
        };
        let (pool, descriptor_set) = pools.allocate(&ctx.device, set_layout)?;

        // Second pass: the info vectors are final, slices into them stay valid
        let mut writes: Vec<vk::WriteDescriptorSet> = Vec::with_capacity(resources.len());
        let (mut buffer_idx, mut image_idx) = (0usize, 0usize);
        for entry in &set_desc.entries {
            let write = vk::WriteDescriptorSet::default()
                .dst_set(descriptor_set)
                .dst_binding(entry.binding)
                .dst_array_element(0)
                .descriptor_type(binding_type_to_vk(entry.binding_type));
            let write = match entry.binding_type {
                BindingType::CombinedImageSampler => {
                    image_idx += 1;
                    write.image_info(std::slice::from_ref(&image_infos[image_idx - 1]))
                }
                BindingType::UniformBuffer | BindingType::UniformBufferDynamic => {
                    buffer_idx += 1;
                    write.buffer_info(std::slice::from_ref(&buffer_infos[buffer_idx - 1]))
                }
            };
            writes.push(write);
        }

        unsafe { ctx.device.update_descriptor_sets(&writes, &[]) };

        Ok(Self {
            ctx: Arc::clone(ctx),
            pool,
            descriptor_set,
            set_index,
        })
    }
}

impl DeviceBindingGroup for BindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for BindingGroup {
    fn drop(&mut self) {
        self.ctx.retire(Retired::DescriptorSet {
            pool: self.pool,
            set: self.descriptor_set,
        });
    }
}
