//! Unit tests for lighting.rs

use std::mem::{offset_of, size_of};
use glam::{Vec3, Vec4};
use crate::uniform::{LightBlock, LightingBlock, LightingState, Light, Material, MaterialBlock, MAX_LIGHTS};

// ============================================================================
// LAYOUT
// ============================================================================

#[test]
fn test_light_block_layout() {
    assert_eq!(size_of::<LightBlock>(), 80);
    assert_eq!(offset_of!(LightBlock, position), 0);
    assert_eq!(offset_of!(LightBlock, ambient), 16);
    assert_eq!(offset_of!(LightBlock, diffuse), 32);
    assert_eq!(offset_of!(LightBlock, specular), 48);
    assert_eq!(offset_of!(LightBlock, attenuation), 64);
}

#[test]
fn test_material_block_layout() {
    assert_eq!(size_of::<MaterialBlock>(), 80);
    assert_eq!(offset_of!(MaterialBlock, emission), 48);
    assert_eq!(offset_of!(MaterialBlock, shininess), 64);
}

#[test]
fn test_lighting_block_layout() {
    assert_eq!(size_of::<LightingBlock>(), 752);
    assert_eq!(offset_of!(LightingBlock, global_ambient), 0);
    assert_eq!(offset_of!(LightingBlock, light_count), 16);
    assert_eq!(offset_of!(LightingBlock, lights), 32);
    assert_eq!(offset_of!(LightingBlock, material), 32 + MAX_LIGHTS * 80);
}

// ============================================================================
// PACKING
// ============================================================================

#[test]
fn test_packed_light_bytes_at_expected_offsets() {
    let mut state = LightingState::new();
    state.set_light(2, Light {
        position: Vec4::new(1.0, 2.0, 3.0, 1.0),
        attenuation: Vec3::new(1.0, 0.5, 0.25),
        enabled: true,
        ..Default::default()
    });
    let block = state.pack();
    let bytes = bytemuck::bytes_of(&block);

    let light2 = 32 + 2 * 80;
    assert_eq!(&bytes[light2..light2 + 4], &1.0f32.to_ne_bytes());
    assert_eq!(&bytes[light2 + 68..light2 + 72], &0.5f32.to_ne_bytes());
    // enabled flag
    assert_eq!(&bytes[light2 + 76..light2 + 80], &1.0f32.to_ne_bytes());
    assert_eq!(&bytes[16..20], &3u32.to_ne_bytes());
}

#[test]
fn test_material_shininess_offset() {
    let mut state = LightingState::new();
    state.set_material(Material { shininess: 32.0, ..Default::default() });
    let block = state.pack();
    let bytes = bytemuck::bytes_of(&block);
    assert_eq!(&bytes[672 + 64..672 + 68], &32.0f32.to_ne_bytes());
}

#[test]
fn test_light_count_tracks_highest_enabled() {
    let mut state = LightingState::new();
    assert_eq!(state.light_count(), 0);
    state.set_light(0, Light { enabled: true, ..Default::default() });
    state.set_light(4, Light { enabled: true, ..Default::default() });
    assert_eq!(state.light_count(), 5);
}

#[test]
fn test_out_of_range_light_is_rejected() {
    let mut state = LightingState::new();
    assert!(!state.set_light(MAX_LIGHTS, Light::default()));
}

// ============================================================================
// DIRTY TRACKING
// ============================================================================

#[test]
fn test_update_is_taken_once_per_change() {
    let mut state = LightingState::new();
    assert!(state.is_dirty());
    assert!(state.take_update().is_some());
    assert!(state.take_update().is_none());

    state.set_global_ambient(Vec4::ONE);
    let block = state.take_update().unwrap();
    assert_eq!(block.global_ambient, [1.0; 4]);
    assert!(!state.is_dirty());
}

#[test]
fn test_toggling_lighting_does_not_dirty() {
    let mut state = LightingState::new();
    state.take_update();
    state.set_enabled(true);
    assert!(state.is_enabled());
    assert!(!state.is_dirty());
}

#[test]
fn test_unchanged_value_does_not_dirty() {
    let mut state = LightingState::new();
    state.take_update();

    state.set_material(Material::default());
    state.set_light(0, Light::default());
    assert!(!state.is_dirty());

    state.set_material(Material { shininess: 5.0, ..Default::default() });
    assert!(state.is_dirty());
}
