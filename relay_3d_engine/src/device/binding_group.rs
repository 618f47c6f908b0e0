/// BindingGroup trait and binding layout description
///
/// A BindingGroup is an immutable set of GPU resource bindings (uniform
/// buffers, sampled textures). It is the engine's view of a descriptor set.
/// Dynamic uniform bindings take their byte offset at bind time, which is how
/// one binding group serves every uniform-ring slot of a frame.

use bitflags::bitflags;
use crate::device::{Buffer, Texture};

// ============================================================================
// Binding types and layout description
// ============================================================================

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    /// Uniform buffer bound at a fixed offset
    UniformBuffer,
    /// Uniform buffer whose offset is supplied when the group is bound
    UniformBufferDynamic,
    /// Combined image sampler (texture + sampler in one binding)
    CombinedImageSampler,
}

bitflags! {
    /// Shader stage visibility flags
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX   = 1 << 0;
        const FRAGMENT = 1 << 1;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

/// Description of a single binding slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingSlotDesc {
    /// Binding number (`layout(binding = N)` in GLSL)
    pub binding: u32,
    pub binding_type: BindingType,
    pub stage_flags: ShaderStageFlags,
}

/// Layout of one binding set
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingGroupLayoutDesc {
    pub entries: Vec<BindingSlotDesc>,
}

impl BindingGroupLayoutDesc {
    /// Number of dynamic-offset bindings (one offset each when binding)
    pub fn dynamic_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.binding_type == BindingType::UniformBufferDynamic)
            .count()
    }
}

// ============================================================================
// Samplers
// ============================================================================

/// Sampler presets (the backend caches one sampler per preset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerType {
    LinearRepeat,
    LinearClamp,
    NearestRepeat,
    NearestClamp,
}

// ============================================================================
// Binding resources (concrete data passed at creation time)
// ============================================================================

/// A concrete resource to bind into a BindingGroup, in binding order
pub enum BindingResource<'a> {
    /// Whole-buffer uniform binding
    UniformBuffer(&'a dyn Buffer),
    /// Window of `range` bytes, offset supplied at bind time
    UniformBufferDynamic { buffer: &'a dyn Buffer, range: u64 },
    /// Sampled texture (the backend resolves the actual GPU sampler from the type)
    SampledTexture(&'a dyn Texture, SamplerType),
}

// ============================================================================
// BindingGroup trait
// ============================================================================

/// An immutable set of GPU resource bindings
pub trait BindingGroup: Send + Sync {
    /// Returns the set index this BindingGroup was created for
    fn set_index(&self) -> u32;
}
