/// SamplerCache - VkSampler objects created on first use, one per preset

use relay_3d_engine::relay3d::{Result, device::SamplerType};
use relay_3d_engine::engine_err;
use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Filter, mip mode and address mode of a preset
pub(crate) fn sampler_params(
    sampler_type: SamplerType,
) -> (vk::Filter, vk::SamplerMipmapMode, vk::SamplerAddressMode) {
    match sampler_type {
        SamplerType::LinearRepeat => (
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::LINEAR,
            vk::SamplerAddressMode::REPEAT,
        ),
        SamplerType::LinearClamp => (
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::LINEAR,
            vk::SamplerAddressMode::CLAMP_TO_EDGE,
        ),
        SamplerType::NearestRepeat => (
            vk::Filter::NEAREST,
            vk::SamplerMipmapMode::NEAREST,
            vk::SamplerAddressMode::REPEAT,
        ),
        SamplerType::NearestClamp => (
            vk::Filter::NEAREST,
            vk::SamplerMipmapMode::NEAREST,
            vk::SamplerAddressMode::CLAMP_TO_EDGE,
        ),
    }
}

/// Creates VkSamplers on first use, destroys them on shutdown
pub(crate) struct SamplerCache {
    ctx: Option<Arc<GpuContext>>,
    cache: FxHashMap<SamplerType, vk::Sampler>,
    max_anisotropy: f32,
}

impl SamplerCache {
    /// `max_anisotropy` of 1.0 disables anisotropic filtering
    pub(crate) fn new(ctx: Arc<GpuContext>, max_anisotropy: f32) -> Self {
        Self {
            ctx: Some(ctx),
            cache: FxHashMap::default(),
            max_anisotropy,
        }
    }

    /// Get or create the VkSampler for `sampler_type`
    pub(crate) fn get(&mut self, sampler_type: SamplerType) -> Result<vk::Sampler> {
        if let Some(&sampler) = self.cache.get(&sampler_type) {
            return Ok(sampler);
        }

        let ctx = self.ctx
            .as_ref()
            .ok_or_else(|| engine_err!("relay3d::vulkan", "Sampler requested after device shutdown"))?;

        let (filter, mipmap, address) = sampler_params(sampler_type);
        // Anisotropy only helps filtered samplers
        let anisotropy = filter == vk::Filter::LINEAR && self.max_anisotropy > 1.0;

        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(mipmap)
            .address_mode_u(address)
            .address_mode_v(address)
            .address_mode_w(address)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .anisotropy_enable(anisotropy)
            .max_anisotropy(if anisotropy { self.max_anisotropy } else { 1.0 });

        let sampler = unsafe { ctx.device.create_sampler(&create_info, None) }
            .map_err(|e| engine_err!("relay3d::vulkan", "Failed to create {:?} sampler: {:?}", sampler_type, e))?;

        self.cache.insert(sampler_type, sampler);
        Ok(sampler)
    }

    /// Destroy all cached samplers and release the context
    ///
    /// Must run while the logical device is still alive.
    pub(crate) fn shutdown(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            for (_, sampler) in self.cache.drain() {
                unsafe { ctx.device.destroy_sampler(sampler, None) };
            }
        }
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "vulkan_sampler_tests.rs"]
mod tests;
