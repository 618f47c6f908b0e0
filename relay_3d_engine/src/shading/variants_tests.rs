//! Unit tests for the built-in variant set

use crate::device::mock_device::MockDevice;
use crate::device::{GraphicsDevice, TextureFormat, BindingType};
use crate::resource::ResourceManager;
use crate::shading::{BuiltinShaderSet, BuiltinShaderSources, BuiltinVariant};
use crate::uniform::UniformBlockKind;

fn spirv() -> Vec<u8> {
    vec![0x03, 0x02, 0x23, 0x07, 0, 0, 0, 0]
}

#[test]
fn test_interfaces_match_expected_bindings() {
    let lit = BuiltinVariant::Lit.interface();
    assert_eq!(lit.uniform_block, UniformBlockKind::Lit);
    let types: Vec<BindingType> = lit.set_layout().entries.iter().map(|e| e.binding_type).collect();
    assert_eq!(types, vec![
        BindingType::UniformBufferDynamic,
        BindingType::CombinedImageSampler,
        BindingType::UniformBuffer,
    ]);

    assert_eq!(BuiltinVariant::Default.interface().set_layout().entries.len(), 1);
    assert!(!BuiltinVariant::ScreenSpace.interface().depth.test_enable);
    assert!(!BuiltinVariant::Skybox.interface().depth.write_enable);
}

#[test]
fn test_create_builds_supplied_variants_only() {
    let mut device = MockDevice::new();
    let mut resources = ResourceManager::new();
    let sources = BuiltinShaderSources::new()
        .with(BuiltinVariant::Default, spirv(), spirv())
        .with(BuiltinVariant::Lit, spirv(), spirv());

    let set = BuiltinShaderSet::create(
        &mut resources, &mut device, &sources, TextureFormat::B8G8R8A8_SRGB, Some(TextureFormat::D32_FLOAT),
    ).unwrap();

    assert_eq!(set.len(), 2);
    assert!(set.contains(BuiltinVariant::Lit));
    assert!(set.get(BuiltinVariant::Pbr).is_none());
    assert_eq!(resources.shader_count(), 2);
    // One eager triangle-list pipeline per shader
    assert_eq!(device.stats().pipelines_created, 2);
}

#[test]
fn test_missing_default_fails() {
    let mut device = MockDevice::new();
    let mut resources = ResourceManager::new();
    let sources = BuiltinShaderSources::new().with(BuiltinVariant::Textured, spirv(), spirv());

    assert!(BuiltinShaderSet::create(
        &mut resources, &mut device, &sources, TextureFormat::B8G8R8A8_SRGB, None,
    ).is_err());
}
