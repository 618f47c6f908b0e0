/// Pipeline layout and graphics pipeline (dynamic rendering, no render pass)

use relay_3d_engine::relay3d::{
    Result,
    device::{
        Pipeline as DevicePipeline, PipelineDesc, PipelineLayout as DevicePipelineLayout,
        PipelineLayoutDesc, PrimitiveTopology,
    },
};
use relay_3d_engine::{engine_err, engine_warn};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, Retired};
use crate::vulkan_format::{
    binding_type_to_vk, blend_factor_to_vk, buffer_format_to_vk, compare_op_to_vk,
    cull_mode_to_vk, front_face_to_vk, shader_stage_to_vk, stage_flags_to_vk,
    texture_format_to_vk, topology_to_vk,
};
use crate::vulkan_shader::Shader;

const SOURCE: &str = "relay3d::vulkan";

// ============================================================================
// PipelineLayout
// ============================================================================

/// Descriptor set layouts plus the VkPipelineLayout built from them
pub struct PipelineLayout {
    ctx: Arc<GpuContext>,
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) set_layouts: Vec<vk::DescriptorSetLayout>,
    desc: PipelineLayoutDesc,
}

impl PipelineLayout {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: PipelineLayoutDesc) -> Result<Self> {
        // Filled in as we go so a failure part-way retires what exists
        let mut layout = Self {
            ctx: Arc::clone(ctx),
            layout: vk::PipelineLayout::null(),
            set_layouts: Vec::with_capacity(desc.set_layouts.len()),
            desc: PipelineLayoutDesc::default(),
        };

        for set in &desc.set_layouts {
            let bindings: Vec<vk::DescriptorSetLayoutBinding> = set.entries
                .iter()
                .map(|entry| {
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(entry.binding)
                        .descriptor_type(binding_type_to_vk(entry.binding_type))
                        .descriptor_count(1)
                        .stage_flags(stage_flags_to_vk(entry.stage_flags))
                })
                .collect();

            let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            let set_layout = unsafe { ctx.device.create_descriptor_set_layout(&create_info, None) }
                .map_err(|e| engine_err!(SOURCE, "Failed to create descriptor set layout: {:?}", e))?;
            layout.set_layouts.push(set_layout);
        }

        let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&layout.set_layouts);
        layout.layout = unsafe { ctx.device.create_pipeline_layout(&create_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create pipeline layout: {:?}", e))?;
        layout.desc = desc;

        Ok(layout)
    }
}

impl DevicePipelineLayout for PipelineLayout {
    fn desc(&self) -> &PipelineLayoutDesc {
        &self.desc
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        self.ctx.retire(Retired::PipelineLayout {
            layout: self.layout,
            set_layouts: std::mem::take(&mut self.set_layouts),
        });
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Immutable graphics pipeline
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    /// Keeps the layout alive as long as the pipeline can be bound
    _layout: Arc<dyn DevicePipelineLayout>,
    pub(crate) vk_layout: vk::PipelineLayout,
    topology: PrimitiveTopology,
}

impl Pipeline {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &PipelineDesc) -> Result<Self> {
        desc.validate()?;

        let vertex_shader = unsafe { &*(Arc::as_ptr(&desc.vertex_shader) as *const Shader) };
        let fragment_shader = unsafe { &*(Arc::as_ptr(&desc.fragment_shader) as *const Shader) };
        let vk_layout = unsafe { &*(Arc::as_ptr(&desc.layout) as *const PipelineLayout) };

        check_reflected_bindings(vertex_shader, desc.layout.desc());
        check_reflected_bindings(fragment_shader, desc.layout.desc());

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(shader_stage_to_vk(desc.vertex_shader.stage()))
                .module(vertex_shader.module)
                .name(&vertex_shader.entry_point),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(shader_stage_to_vk(desc.fragment_shader.stage()))
                .module(fragment_shader.module)
                .name(&fragment_shader.entry_point),
        ];

        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc.vertex_layout.bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: vk::VertexInputRate::VERTEX,
            })
            .collect();

        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc.vertex_layout.attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: buffer_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        // Strips are drawn through restart-separated index lists
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology))
            .primitive_restart_enable(desc.strip_index_format.is_some());

        // Viewport and scissor are dynamic, only the counts matter here
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(desc.rasterization.cull_mode))
            .front_face(front_face_to_vk(desc.rasterization.front_face))
            .depth_bias_enable(false);

        let has_depth = desc.depth_format.is_some();
        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(has_depth && desc.depth.test_enable)
            .depth_write_enable(has_depth && desc.depth.write_enable)
            .depth_compare_op(compare_op_to_vk(desc.depth.compare_op))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = {
            let mut attachment = vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(desc.blend.enable);
            if desc.blend.enable {
                attachment = attachment
                    .src_color_blend_factor(blend_factor_to_vk(desc.blend.src_factor))
                    .dst_color_blend_factor(blend_factor_to_vk(desc.blend.dst_factor))
                    .color_blend_op(vk::BlendOp::ADD)
                    .src_alpha_blend_factor(vk::BlendFactor::ONE)
                    .dst_alpha_blend_factor(blend_factor_to_vk(desc.blend.dst_factor))
                    .alpha_blend_op(vk::BlendOp::ADD);
            }
            attachment
        };

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&color_blend_attachment));

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        // Dynamic rendering: attachment formats instead of a render pass
        let color_formats = [texture_format_to_vk(desc.color_format)];
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&color_formats);
        if let Some(depth_format) = desc.depth_format {
            rendering_info = rendering_info.depth_attachment_format(texture_format_to_vk(depth_format));
        }

        let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .push_next(&mut rendering_info)
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .depth_stencil_state(&depth_stencil_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(vk_layout.layout)
            .render_pass(vk::RenderPass::null());

        let pipelines = unsafe {
            ctx.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_create_info],
                None,
            )
        }
        .map_err(|(_, e)| engine_err!(SOURCE, "Failed to create {:?} graphics pipeline: {:?}", desc.topology, e))?;

        Ok(Self {
            ctx: Arc::clone(ctx),
            pipeline: pipelines[0],
            _layout: Arc::clone(&desc.layout),
            vk_layout: vk_layout.layout,
            topology: desc.topology,
        })
    }
}

/// Warn about shader bindings the layout does not provide
fn check_reflected_bindings(shader: &Shader, layout: &PipelineLayoutDesc) {
    for reflected in &shader.reflected_bindings {
        let declared = layout.set_layouts
            .get(reflected.set as usize)
            .is_some_and(|set| set.entries.iter().any(|e| e.binding == reflected.binding));
        if !declared {
            engine_warn!(SOURCE,
                "Shader binding '{}' (set={}, binding={}) is missing from the pipeline layout",
                reflected.name, reflected.set, reflected.binding);
        }
    }
}

impl DevicePipeline for Pipeline {
    fn topology(&self) -> PrimitiveTopology {
        self.topology
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.ctx.retire(Retired::Pipeline(self.pipeline));
    }
}
