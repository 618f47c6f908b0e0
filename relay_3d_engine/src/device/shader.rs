/// Shader module trait and descriptor

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Descriptor for creating a shader module from precompiled SPIR-V
#[derive(Debug, Clone)]
pub struct ShaderDesc<'a> {
    /// SPIR-V bytes (length must be a multiple of 4)
    pub code: &'a [u8],
    /// Stage this module is compiled for
    pub stage: ShaderStage,
    /// Entry point name
    pub entry_point: String,
}

/// Compiled shader module
pub trait ShaderModule: Send + Sync {
    fn stage(&self) -> ShaderStage;
}
