/// Backend configuration

use crate::device::SamplerType;

/// Configuration for an `ExplicitBackend`
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Number of per-draw slots in the uniform ring (draws per frame)
    pub uniform_ring_slots: u32,
    /// Bytes reserved per draw slot, rounded up to the device alignment
    pub uniform_slot_size: u32,
    /// Clear color used by `begin_frame` until `clear` is called
    pub clear_color: [f32; 4],
    /// Clear depth used by `begin_frame` until `clear` is called
    pub clear_depth: f32,
    /// Sampler given to textures created without an explicit one
    pub default_sampler: SamplerType,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            uniform_ring_slots: 4096,
            uniform_slot_size: 256,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
            default_sampler: SamplerType::LinearRepeat,
        }
    }
}

impl BackendConfig {
    /// Total ring size in bytes for a given slot stride
    pub fn ring_capacity(&self, stride: u64) -> u64 {
        stride * self.uniform_ring_slots as u64
    }
}
