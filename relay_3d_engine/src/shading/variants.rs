/// Built-in shader variants and their interfaces

use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::device::{GraphicsDevice, TextureFormat, DepthState, CompareOp, BlendState};
use crate::resource::{ResourceManager, ResourceHandle, ShaderInterface, ShaderSource};
use crate::uniform::UniformBlockKind;
use crate::{engine_debug, engine_warn};

/// Built-in shading variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinVariant {
    /// Vertex color times tint
    Default,
    /// Default plus a sampled texture
    Textured,
    /// Textured, positions already in clip space, no depth test
    ScreenSpace,
    /// Per-vertex lighting with material and up to eight lights
    Lit,
    /// Cube-ish background: depth test on, depth write off
    Skybox,
    /// Physically based shading over the lighting block
    Pbr,
}

impl BuiltinVariant {
    pub const ALL: [BuiltinVariant; 6] = [
        BuiltinVariant::Default,
        BuiltinVariant::Textured,
        BuiltinVariant::ScreenSpace,
        BuiltinVariant::Lit,
        BuiltinVariant::Skybox,
        BuiltinVariant::Pbr,
    ];

    /// Resources and fixed-function state the variant's shaders expect
    pub fn interface(&self) -> ShaderInterface {
        let base = ShaderInterface::default();
        match self {
            BuiltinVariant::Default => base,
            BuiltinVariant::Textured => ShaderInterface { uses_texture: true, ..base },
            BuiltinVariant::ScreenSpace => ShaderInterface {
                uses_texture: true,
                depth: DepthState {
                    test_enable: false,
                    write_enable: false,
                    compare_op: CompareOp::Always,
                },
                ..base
            },
            BuiltinVariant::Lit | BuiltinVariant::Pbr => ShaderInterface {
                uniform_block: UniformBlockKind::Lit,
                uses_texture: true,
                uses_lighting: true,
                ..base
            },
            BuiltinVariant::Skybox => ShaderInterface {
                uses_texture: true,
                depth: DepthState {
                    test_enable: true,
                    write_enable: false,
                    compare_op: CompareOp::LessOrEqual,
                },
                blend: BlendState { enable: false, ..BlendState::alpha() },
                ..base
            },
        }
    }
}

/// Precompiled SPIR-V for one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpirvPair {
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

/// SPIR-V supplied by the host for the built-in variants
///
/// Only `Default` is mandatory. Missing variants are simply never selected.
#[derive(Debug, Clone, Default)]
pub struct BuiltinShaderSources {
    pairs: FxHashMap<BuiltinVariant, SpirvPair>,
}

impl BuiltinShaderSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, variant: BuiltinVariant, vertex: Vec<u8>, fragment: Vec<u8>) -> Self {
        self.pairs.insert(variant, SpirvPair { vertex, fragment });
        self
    }

    pub fn get(&self, variant: BuiltinVariant) -> Option<&SpirvPair> {
        self.pairs.get(&variant)
    }

    pub fn contains(&self, variant: BuiltinVariant) -> bool {
        self.pairs.contains_key(&variant)
    }
}

/// Handles of the built-in shaders created at startup
#[derive(Debug, Clone, Default)]
pub struct BuiltinShaderSet {
    handles: FxHashMap<BuiltinVariant, ResourceHandle>,
}

impl BuiltinShaderSet {
    /// Create a shader resource for every supplied variant
    ///
    /// Fails when the default variant is missing or any supplied variant fails
    /// to build.
    pub fn create(
        resources: &mut ResourceManager,
        device: &mut dyn GraphicsDevice,
        sources: &BuiltinShaderSources,
        color_format: TextureFormat,
        depth_format: Option<TextureFormat>,
    ) -> Result<Self> {
        if !sources.contains(BuiltinVariant::Default) {
            return Err(Error::InitializationFailed(
                "built-in shader sources lack the default variant".to_string(),
            ));
        }

        let mut handles = FxHashMap::default();
        for variant in BuiltinVariant::ALL {
            let Some(pair) = sources.get(variant) else {
                engine_warn!("relay3d::shading", "No SPIR-V for built-in {:?}, variant disabled", variant);
                continue;
            };
            let source = ShaderSource {
                vertex_spirv: &pair.vertex,
                fragment_spirv: &pair.fragment,
                interface: variant.interface(),
            };
            let handle = resources.create_shader(device, &source, color_format, depth_format)?;
            engine_debug!("relay3d::shading", "Built-in {:?} -> shader {}", variant, handle.id());
            handles.insert(variant, handle);
        }
        Ok(Self { handles })
    }

    pub fn get(&self, variant: BuiltinVariant) -> Option<ResourceHandle> {
        self.handles.get(&variant).copied()
    }

    pub fn contains(&self, variant: BuiltinVariant) -> bool {
        self.handles.contains_key(&variant)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Forget every handle (after the resource manager was shut down)
    pub fn clear(&mut self) {
        self.handles.clear();
    }
}
