/// Per-shader pipeline cache keyed by primitive topology
///
/// Pipelines are immutable: a draw with a different topology selects (or
/// builds) another cached pipeline, it never patches the existing one.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::device::{
    GraphicsDevice, Pipeline, PipelineDesc, PipelineLayout, ShaderModule,
    PrimitiveTopology, IndexType, VertexLayout, RasterizationState, DepthState,
    BlendState, TextureFormat,
};
use crate::engine_debug;

/// Everything a pipeline needs except the topology
#[derive(Clone)]
pub struct PipelineTemplate {
    pub vertex_shader: Arc<dyn ShaderModule>,
    pub fragment_shader: Arc<dyn ShaderModule>,
    pub layout: Arc<dyn PipelineLayout>,
    pub vertex_layout: VertexLayout,
    pub rasterization: RasterizationState,
    pub depth: DepthState,
    pub blend: BlendState,
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
}

impl PipelineTemplate {
    /// Pipeline descriptor for `topology`; strips get a 32-bit restart index format
    pub fn describe(&self, topology: PrimitiveTopology) -> PipelineDesc {
        PipelineDesc {
            vertex_shader: Arc::clone(&self.vertex_shader),
            fragment_shader: Arc::clone(&self.fragment_shader),
            layout: Arc::clone(&self.layout),
            vertex_layout: self.vertex_layout.clone(),
            topology,
            strip_index_format: topology.is_strip().then_some(IndexType::U32),
            rasterization: self.rasterization,
            depth: self.depth,
            blend: self.blend,
            color_format: self.color_format,
            depth_format: self.depth_format,
        }
    }
}

pub struct PipelineCache {
    template: PipelineTemplate,
    pipelines: FxHashMap<PrimitiveTopology, Arc<dyn Pipeline>>,
}

impl PipelineCache {
    /// Topology built eagerly when a shader is created
    pub const DEFAULT_TOPOLOGY: PrimitiveTopology = PrimitiveTopology::TriangleList;

    /// Create the cache and build the default triangle pipeline
    pub fn new(device: &mut dyn GraphicsDevice, template: PipelineTemplate) -> Result<Self> {
        let mut cache = Self {
            template,
            pipelines: FxHashMap::default(),
        };
        cache.get_or_create(device, Self::DEFAULT_TOPOLOGY)?;
        Ok(cache)
    }

    /// Cached pipeline for `topology`, building it on a miss
    pub fn get_or_create(
        &mut self,
        device: &mut dyn GraphicsDevice,
        topology: PrimitiveTopology,
    ) -> Result<Arc<dyn Pipeline>> {
        if let Some(pipeline) = self.pipelines.get(&topology) {
            return Ok(Arc::clone(pipeline));
        }
        let pipeline = device.create_pipeline(self.template.describe(topology))?;
        engine_debug!("relay3d::pipeline", "Built {:?} pipeline", topology);
        self.pipelines.insert(topology, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    /// Cached pipeline without building
    pub fn get(&self, topology: PrimitiveTopology) -> Option<&Arc<dyn Pipeline>> {
        self.pipelines.get(&topology)
    }

    pub fn template(&self) -> &PipelineTemplate {
        &self.template
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

#[cfg(test)]
#[path = "pipeline_cache_tests.rs"]
mod tests;
