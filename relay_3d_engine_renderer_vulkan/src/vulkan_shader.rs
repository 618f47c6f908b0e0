/// Shader - Vulkan implementation of the device ShaderModule trait

use relay_3d_engine::relay3d::{
    Result,
    device::{ShaderDesc, ShaderModule as DeviceShaderModule, ShaderStage},
};
use relay_3d_engine::{engine_bail_warn, engine_err};
use ash::vk;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, Retired};

const SOURCE: &str = "relay3d::vulkan";

/// Descriptor binding a shader actually declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReflectedBinding {
    pub name: String,
    pub set: u32,
    pub binding: u32,
}

/// Vulkan shader module plus the bindings found in its SPIR-V
pub struct Shader {
    ctx: Arc<GpuContext>,
    pub(crate) module: vk::ShaderModule,
    stage: ShaderStage,
    pub(crate) entry_point: CString,
    pub(crate) reflected_bindings: Vec<ReflectedBinding>,
}

impl Shader {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &ShaderDesc) -> Result<Self> {
        if desc.code.is_empty() || desc.code.len() % 4 != 0 {
            engine_bail_warn!(SOURCE,
                "Shader code must be a non-empty multiple of 4 bytes (size: {} bytes)",
                desc.code.len());
        }

        let entry_point = CString::new(desc.entry_point.as_str())
            .map_err(|_| engine_err!(SOURCE, "Shader entry point '{}' contains a NUL byte", desc.entry_point))?;

        // SPIR-V words; the byte slice may not be 4-byte aligned
        let words: Vec<u32> = desc.code
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();

        let reflected_bindings = reflect_bindings(&words)?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let module = unsafe { ctx.device.create_shader_module(&create_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create {:?} shader module: {:?}", desc.stage, e))?;

        Ok(Self {
            ctx: Arc::clone(ctx),
            module,
            stage: desc.stage,
            entry_point,
            reflected_bindings,
        })
    }
}

/// Collect the descriptor bindings declared by every entry point
fn reflect_bindings(words: &[u32]) -> Result<Vec<ReflectedBinding>> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!(SOURCE, "SPIR-V reflection failed: {:?}", e))?;

    let mut bindings: Vec<ReflectedBinding> = Vec::new();
    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            if let spirq::var::Variable::Descriptor { name, desc_bind, .. } = var {
                let binding = ReflectedBinding {
                    name: name.clone().unwrap_or_default(),
                    set: desc_bind.set(),
                    binding: desc_bind.bind(),
                };
                if !bindings.iter().any(|b| b.set == binding.set && b.binding == binding.binding) {
                    bindings.push(binding);
                }
            }
        }
    }
    Ok(bindings)
}

impl DeviceShaderModule for Shader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.ctx.retire(Retired::ShaderModule(self.module));
    }
}
