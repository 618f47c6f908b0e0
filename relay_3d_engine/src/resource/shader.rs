/// Shader resource: compiled stages, binding layout, pipeline layout and pipeline cache

use std::sync::Arc;
use crate::error::Result;
use crate::device::{
    GraphicsDevice, ShaderModule, PipelineLayout, Pipeline, PipelineLayoutDesc,
    BindingGroupLayoutDesc, BindingSlotDesc, BindingType, ShaderStageFlags, ShaderDesc,
    ShaderStage, PrimitiveTopology, TextureFormat, DepthState, BlendState,
    RasterizationState,
};
use crate::mesh::Vertex;
use crate::resource::pipeline_cache::{PipelineCache, PipelineTemplate};
use crate::uniform::UniformBlockKind;

/// Binding of the per-draw dynamic uniform block
pub const DRAW_UNIFORM_BINDING: u32 = 0;
/// Binding of the combined image sampler
pub const TEXTURE_BINDING: u32 = 1;
/// Binding of the lighting / material uniform block
pub const LIGHTING_BINDING: u32 = 2;

/// What a shader program reads, which fixes its binding layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderInterface {
    /// Layout of the per-draw uniform block
    pub uniform_block: UniformBlockKind,
    /// Samples a texture at `TEXTURE_BINDING`
    pub uses_texture: bool,
    /// Reads the lighting block at `LIGHTING_BINDING`
    pub uses_lighting: bool,
    pub depth: DepthState,
    pub blend: BlendState,
}

impl Default for ShaderInterface {
    fn default() -> Self {
        Self {
            uniform_block: UniformBlockKind::Default,
            uses_texture: false,
            uses_lighting: false,
            depth: DepthState::default(),
            blend: BlendState::default(),
        }
    }
}

impl ShaderInterface {
    /// Binding-set layout (set 0) for this interface
    pub fn set_layout(&self) -> BindingGroupLayoutDesc {
        let mut entries = vec![BindingSlotDesc {
            binding: DRAW_UNIFORM_BINDING,
            binding_type: BindingType::UniformBufferDynamic,
            stage_flags: ShaderStageFlags::VERTEX_FRAGMENT,
        }];
        if self.uses_texture {
            entries.push(BindingSlotDesc {
                binding: TEXTURE_BINDING,
                binding_type: BindingType::CombinedImageSampler,
                stage_flags: ShaderStageFlags::FRAGMENT,
            });
        }
        if self.uses_lighting {
            entries.push(BindingSlotDesc {
                binding: LIGHTING_BINDING,
                binding_type: BindingType::UniformBuffer,
                stage_flags: ShaderStageFlags::VERTEX_FRAGMENT,
            });
        }
        BindingGroupLayoutDesc { entries }
    }
}

/// Precompiled SPIR-V pair plus its interface
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource<'a> {
    pub vertex_spirv: &'a [u8],
    pub fragment_spirv: &'a [u8],
    pub interface: ShaderInterface,
}

pub struct ShaderResource {
    vertex: Arc<dyn ShaderModule>,
    fragment: Arc<dyn ShaderModule>,
    layout: Arc<dyn PipelineLayout>,
    interface: ShaderInterface,
    pipelines: PipelineCache,
}

impl ShaderResource {
    /// Compile both stages, create the layouts and the default pipeline
    pub fn create(
        device: &mut dyn GraphicsDevice,
        source: &ShaderSource,
        color_format: TextureFormat,
        depth_format: Option<TextureFormat>,
    ) -> Result<Self> {
        let vertex = device.create_shader_module(ShaderDesc {
            code: source.vertex_spirv,
            stage: ShaderStage::Vertex,
            entry_point: "main".to_string(),
        })?;
        let fragment = device.create_shader_module(ShaderDesc {
            code: source.fragment_spirv,
            stage: ShaderStage::Fragment,
            entry_point: "main".to_string(),
        })?;
        let layout = device.create_pipeline_layout(PipelineLayoutDesc {
            set_layouts: vec![source.interface.set_layout()],
        })?;

        let template = PipelineTemplate {
            vertex_shader: Arc::clone(&vertex),
            fragment_shader: Arc::clone(&fragment),
            layout: Arc::clone(&layout),
            vertex_layout: Vertex::layout(),
            rasterization: RasterizationState::default(),
            depth: source.interface.depth,
            blend: source.interface.blend,
            color_format,
            depth_format,
        };
        let pipelines = PipelineCache::new(device, template)?;

        Ok(Self {
            vertex,
            fragment,
            layout,
            interface: source.interface,
            pipelines,
        })
    }

    /// Cached pipeline for `topology`, built on first use
    pub fn get_pipeline_for_topology(
        &mut self,
        device: &mut dyn GraphicsDevice,
        topology: PrimitiveTopology,
    ) -> Result<Arc<dyn Pipeline>> {
        self.pipelines.get_or_create(device, topology)
    }

    pub fn interface(&self) -> &ShaderInterface {
        &self.interface
    }

    pub fn layout(&self) -> &Arc<dyn PipelineLayout> {
        &self.layout
    }

    pub fn vertex_module(&self) -> &Arc<dyn ShaderModule> {
        &self.vertex
    }

    pub fn fragment_module(&self) -> &Arc<dyn ShaderModule> {
        &self.fragment
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }
}
