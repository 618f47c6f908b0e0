//! Unit tests for vulkan_format.rs
//!
//! Pure enum conversions, no GPU required.

use ash::vk;
use relay_3d_engine::relay3d::device::{
    BindingType, BufferFormat, BufferUsage, CompareOp, IndexType, LoadOp, PrimitiveTopology,
    ShaderStageFlags, TextureFormat, TextureUsage,
};
use super::*;

// ============================================================================
// TEXTURE FORMATS
// ============================================================================

#[test]
fn test_texture_format_color_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::R8_UNORM), vk::Format::R8_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_SRGB), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::B8G8R8A8_SRGB), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(texture_format_to_vk(TextureFormat::B8G8R8A8_UNORM), vk::Format::B8G8R8A8_UNORM);
}

#[test]
fn test_texture_format_depth_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::D32_FLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(texture_format_to_vk(TextureFormat::D24_UNORM_S8_UINT), vk::Format::D24_UNORM_S8_UINT);
}

#[test]
fn test_surface_formats_map_back() {
    for format in [
        TextureFormat::R8_UNORM,
        TextureFormat::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM,
        TextureFormat::D32_FLOAT,
        TextureFormat::D24_UNORM_S8_UINT,
    ] {
        assert_eq!(vk_to_texture_format(texture_format_to_vk(format)), Some(format));
    }
}

#[test]
fn test_unknown_surface_format_is_none() {
    assert_eq!(vk_to_texture_format(vk::Format::A2B10G10R10_UNORM_PACK32), None);
    assert_eq!(vk_to_texture_format(vk::Format::UNDEFINED), None);
}

#[test]
fn test_aspect_mask() {
    assert_eq!(aspect_mask(TextureFormat::B8G8R8A8_SRGB), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_mask(TextureFormat::D32_FLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_mask(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

// ============================================================================
// USAGES
// ============================================================================

#[test]
fn test_texture_usage_flags() {
    let sampled = texture_usage_to_vk(TextureUsage::Sampled);
    assert!(sampled.contains(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST));
    assert!(!sampled.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));

    let both = texture_usage_to_vk(TextureUsage::SampledAndRenderTarget);
    assert!(both.contains(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::COLOR_ATTACHMENT));

    assert_eq!(
        texture_usage_to_vk(TextureUsage::DepthStencil),
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
    );
}

#[test]
fn test_buffer_usage_flags() {
    assert_eq!(buffer_usage_to_vk(BufferUsage::Vertex), vk::BufferUsageFlags::VERTEX_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Index), vk::BufferUsageFlags::INDEX_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Uniform), vk::BufferUsageFlags::UNIFORM_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Storage), vk::BufferUsageFlags::STORAGE_BUFFER);
}

// ============================================================================
// VERTEX INPUT / PIPELINE STATE
// ============================================================================

#[test]
fn test_buffer_format_float_formats() {
    assert_eq!(buffer_format_to_vk(BufferFormat::R32_SFLOAT), vk::Format::R32_SFLOAT);
    assert_eq!(buffer_format_to_vk(BufferFormat::R32G32_SFLOAT), vk::Format::R32G32_SFLOAT);
    assert_eq!(buffer_format_to_vk(BufferFormat::R32G32B32_SFLOAT), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(buffer_format_to_vk(BufferFormat::R32G32B32A32_SFLOAT), vk::Format::R32G32B32A32_SFLOAT);
}

#[test]
fn test_index_type() {
    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
    assert_eq!(index_type_to_vk(IndexType::U32), vk::IndexType::UINT32);
}

#[test]
fn test_topologies_include_strips() {
    assert_eq!(topology_to_vk(PrimitiveTopology::PointList), vk::PrimitiveTopology::POINT_LIST);
    assert_eq!(topology_to_vk(PrimitiveTopology::LineList), vk::PrimitiveTopology::LINE_LIST);
    assert_eq!(topology_to_vk(PrimitiveTopology::LineStrip), vk::PrimitiveTopology::LINE_STRIP);
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleList), vk::PrimitiveTopology::TRIANGLE_LIST);
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleStrip), vk::PrimitiveTopology::TRIANGLE_STRIP);
}

#[test]
fn test_compare_op() {
    assert_eq!(compare_op_to_vk(CompareOp::LessOrEqual), vk::CompareOp::LESS_OR_EQUAL);
    assert_eq!(compare_op_to_vk(CompareOp::Always), vk::CompareOp::ALWAYS);
}

#[test]
fn test_load_op() {
    assert_eq!(load_op_to_vk(LoadOp::Clear), vk::AttachmentLoadOp::CLEAR);
    assert_eq!(load_op_to_vk(LoadOp::Load), vk::AttachmentLoadOp::LOAD);
}

// ============================================================================
// BINDINGS
// ============================================================================

#[test]
fn test_dynamic_uniform_binding_type() {
    assert_eq!(binding_type_to_vk(BindingType::UniformBuffer), vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(
        binding_type_to_vk(BindingType::UniformBufferDynamic),
        vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
    );
    assert_eq!(
        binding_type_to_vk(BindingType::CombinedImageSampler),
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER
    );
}

#[test]
fn test_stage_flags() {
    assert_eq!(stage_flags_to_vk(ShaderStageFlags::VERTEX), vk::ShaderStageFlags::VERTEX);
    assert_eq!(stage_flags_to_vk(ShaderStageFlags::FRAGMENT), vk::ShaderStageFlags::FRAGMENT);
    assert_eq!(
        stage_flags_to_vk(ShaderStageFlags::VERTEX_FRAGMENT),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(stage_flags_to_vk(ShaderStageFlags::empty()), vk::ShaderStageFlags::empty());
}
