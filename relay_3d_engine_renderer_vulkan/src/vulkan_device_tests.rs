//! Unit tests for vulkan_device.rs
//!
//! GPU selection and limit translation (no Vulkan driver needed).

use ash::vk;
use super::*;

#[test]
fn test_discrete_gpu_preferred() {
    let discrete = device_type_score(vk::PhysicalDeviceType::DISCRETE_GPU);
    let integrated = device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU);
    let virtual_gpu = device_type_score(vk::PhysicalDeviceType::VIRTUAL_GPU);
    let cpu = device_type_score(vk::PhysicalDeviceType::CPU);

    assert!(discrete > integrated);
    assert!(integrated > virtual_gpu);
    assert!(virtual_gpu > cpu);
    assert_eq!(device_type_score(vk::PhysicalDeviceType::OTHER), cpu);
}

#[test]
fn test_device_limits_from_vulkan() {
    let limits = vk::PhysicalDeviceLimits {
        min_uniform_buffer_offset_alignment: 64,
        max_uniform_buffer_range: 65536,
        ..Default::default()
    };
    let converted = device_limits(&limits);
    assert_eq!(converted.min_uniform_offset_alignment, 64);
    assert_eq!(converted.max_uniform_range, 65536);
}

#[test]
fn test_zero_alignment_treated_as_one() {
    let limits = vk::PhysicalDeviceLimits {
        min_uniform_buffer_offset_alignment: 0,
        max_uniform_buffer_range: 16384,
        ..Default::default()
    };
    assert_eq!(device_limits(&limits).min_uniform_offset_alignment, 1);
}
