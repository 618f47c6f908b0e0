//! Unit tests for explicit_backend.rs
//!
//! Every test runs the backend over `MockDevice` and inspects the recorded
//! command stream and object counters.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use glam::{Mat4, Vec4};
use slotmap::SlotMap;

use crate::error::Error;
use crate::config::BackendConfig;
use crate::device::mock_device::{MockDevice, MockLog};
use crate::device::{BufferUsage, TextureDesc, TextureFormat, TextureRegion, TextureUsage};
use crate::resource::{ResourceKind, UsageHint};
use crate::mesh::{Mesh, MeshKey, MeshTopology};
use crate::shading::{BuiltinShaderSources, BuiltinVariant, ShadingMode};
use crate::uniform::Light;
use crate::frame::FrameState;
use crate::backend::{ExplicitBackend, RenderBackend};

fn spirv() -> Vec<u8> {
    vec![0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00]
}

fn sources() -> BuiltinShaderSources {
    BuiltinShaderSources::new()
        .with(BuiltinVariant::Default, spirv(), spirv())
        .with(BuiltinVariant::Textured, spirv(), spirv())
        .with(BuiltinVariant::ScreenSpace, spirv(), spirv())
        .with(BuiltinVariant::Lit, spirv(), spirv())
}

fn backend_with(config: BackendConfig) -> (ExplicitBackend, Arc<MockLog>) {
    let device = MockDevice::new();
    let log = Arc::clone(&device.log);
    let backend = ExplicitBackend::new(Box::new(device), config, &sources()).unwrap();
    (backend, log)
}

fn backend() -> (ExplicitBackend, Arc<MockLog>) {
    backend_with(BackendConfig::default())
}

fn triangle() -> Mesh {
    Mesh::new(MeshTopology::Triangles, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
}

fn commands_starting_with(log: &MockLog, prefix: &str) -> Vec<String> {
    log.commands().into_iter().filter(|c| c.starts_with(prefix)).collect()
}

fn rgba_texture_desc(width: u32, height: u32) -> TextureDesc {
    TextureDesc {
        width,
        height,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::Sampled,
        data: Some(vec![128; (width * height * 4) as usize]),
    }
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[test]
fn test_new_creates_builtins_and_fallback_texture() {
    let (backend, log) = backend();

    assert_eq!(backend.builtins().len(), 4);
    assert_eq!(backend.resources().shader_count(), 4);
    assert_eq!(backend.resources().texture_count(), 1);
    // Ring + lighting block
    assert_eq!(log.buffers_with_usage(BufferUsage::Uniform).len(), 2);
    assert_eq!(log.buffers_with_usage(BufferUsage::Uniform)[1].size, 752);
    assert_eq!(backend.ring().unwrap().stride(), 256);
}

#[test]
fn test_slot_smaller_than_lit_block_is_rejected() {
    let config = BackendConfig { uniform_slot_size: 160, ..Default::default() };
    let result = ExplicitBackend::new(Box::new(MockDevice::new()), config, &sources());
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

// ============================================================================
// FRAMES AND PASSES
// ============================================================================

#[test]
fn test_pass_opens_lazily_on_first_draw() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    assert!(backend.prepare_mesh(key, &triangle()));

    assert!(backend.begin_frame().unwrap());
    assert!(commands_starting_with(&log, "begin_rendering").is_empty());

    backend.draw_mesh(key).unwrap();
    assert_eq!(backend.frame_state(), FrameState::PassOpen);
    assert_eq!(
        commands_starting_with(&log, "begin_rendering"),
        vec!["begin_rendering swapchain clear 800x600 depth=true"]
    );
    assert!(log.commands().contains(&"bind_pipeline TriangleList".to_string()));
    assert!(log.commands().contains(&"draw 3 0".to_string()));

    backend.end_frame().unwrap();
    assert_eq!(backend.frame_state(), FrameState::Idle);
    assert_eq!(log.frames_submitted.load(Ordering::SeqCst), 1);
}

#[test]
fn test_draw_outside_frame_is_rejected() {
    let (mut backend, _log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());

    assert!(matches!(backend.draw_mesh(key), Err(Error::InvalidState(_))));
}

#[test]
fn test_nested_begin_frame_is_rejected() {
    let (mut backend, _log) = backend();
    backend.begin_frame().unwrap();
    assert!(matches!(backend.begin_frame(), Err(Error::InvalidState(_))));
}

#[test]
fn test_frame_without_draws_still_clears_and_presents() {
    let (mut backend, log) = backend();
    backend.begin_frame().unwrap();
    backend.end_frame().unwrap();

    assert_eq!(
        commands_starting_with(&log, "begin_rendering"),
        vec!["begin_rendering swapchain clear 800x600 depth=true"]
    );
    assert!(log.commands().contains(&"submit_and_present 0".to_string()));
}

#[test]
fn test_clear_mid_frame_splits_passes() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());

    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    backend.draw_mesh(key).unwrap();
    backend.clear([0.2, 0.2, 0.2, 1.0], 1.0).unwrap();
    backend.draw_mesh(key).unwrap();
    backend.end_frame().unwrap();

    assert_eq!(commands_starting_with(&log, "begin_rendering").len(), 2);
    assert_eq!(commands_starting_with(&log, "end_rendering").len(), 2);
    assert_eq!(commands_starting_with(&log, "draw ").len(), 3);
}

#[test]
fn test_out_of_date_surface_skips_frame() {
    let (mut backend, log) = backend();
    log.surface_out_of_date.store(true, Ordering::SeqCst);
    assert!(!backend.begin_frame().unwrap());

    backend.resize(1024, 768).unwrap();
    assert!(backend.begin_frame().unwrap());
    backend.end_frame().unwrap();
    assert_eq!(
        commands_starting_with(&log, "begin_rendering"),
        vec!["begin_rendering swapchain clear 1024x768 depth=true"]
    );
}

#[test]
fn test_resize_waits_idle_and_is_rejected_mid_frame() {
    let (mut backend, log) = backend();
    backend.begin_frame().unwrap();
    assert!(matches!(backend.resize(640, 480), Err(Error::InvalidState(_))));
    backend.end_frame().unwrap();

    log.clear_commands();
    backend.resize(640, 480).unwrap();
    assert_eq!(log.commands(), vec!["wait_idle", "resize 640x480"]);
}

// ============================================================================
// UNIFORM RING
// ============================================================================

#[test]
fn test_each_draw_gets_its_own_aligned_offset() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());

    for _ in 0..2 {
        backend.begin_frame().unwrap();
        for _ in 0..3 {
            backend.draw_mesh(key).unwrap();
        }
        backend.end_frame().unwrap();
    }

    let binds = commands_starting_with(&log, "bind_binding_group");
    assert_eq!(binds, vec![
        "bind_binding_group 0 [0]",
        "bind_binding_group 0 [256]",
        "bind_binding_group 0 [512]",
        "bind_binding_group 0 [0]",
        "bind_binding_group 0 [256]",
        "bind_binding_group 0 [512]",
    ]);
}

#[test]
fn test_uniform_bytes_reach_the_ring() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());

    let modelview = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
    backend.set_matrices(modelview, Mat4::IDENTITY);
    backend.set_tint(Vec4::new(0.25, 0.5, 0.75, 1.0));
    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();

    let ring = &log.buffers_with_usage(BufferUsage::Uniform)[0];
    let contents = ring.contents.lock().unwrap();
    assert_eq!(&contents[0..64], bytemuck::cast_slice::<f32, u8>(&modelview.to_cols_array()));
    assert_eq!(&contents[128..132], &0.25f32.to_ne_bytes());
}

#[test]
fn test_ring_exhaustion_is_reported() {
    let config = BackendConfig { uniform_ring_slots: 2, ..Default::default() };
    let (mut backend, _log) = backend_with(config);
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());

    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    backend.draw_mesh(key).unwrap();
    assert!(matches!(backend.draw_mesh(key), Err(Error::UniformRingExhausted { .. })));
}

// ============================================================================
// SHADING SELECTION
// ============================================================================

#[test]
fn test_lighting_with_texture_selects_lit_variant() {
    let (mut backend, _log) = backend();
    let texture = backend.create_texture(rgba_texture_desc(2, 2), None);

    backend.bind_texture(Some(texture));
    backend.set_lighting_enabled(true);
    assert_eq!(backend.shading_mode(), ShadingMode::Builtin(BuiltinVariant::Lit));

    backend.set_lighting_enabled(false);
    assert_eq!(backend.shading_mode(), ShadingMode::Builtin(BuiltinVariant::Textured));
}

#[test]
fn test_stale_texture_counts_as_unbound() {
    let (mut backend, _log) = backend();
    let texture = backend.create_texture(rgba_texture_desc(2, 2), None);
    backend.bind_texture(Some(texture));
    assert!(backend.destroy(texture));

    assert_eq!(backend.shading_mode(), ShadingMode::Builtin(BuiltinVariant::Default));
}

#[test]
fn test_user_shader_wins_and_draws() {
    let (mut backend, log) = backend();
    let source = crate::resource::ShaderSource {
        vertex_spirv: &spirv(),
        fragment_spirv: &spirv(),
        interface: Default::default(),
    };
    let shader = backend.create_shader(&source);
    assert!(!shader.is_null());

    backend.bind_shader(Some(shader));
    backend.set_lighting_enabled(true);
    assert_eq!(backend.shading_mode(), ShadingMode::User(shader));

    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());
    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    assert!(log.commands().contains(&"draw 3 0".to_string()));
}

#[test]
fn test_missing_builtin_falls_back_to_default_shader() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());

    backend.bind_builtin(Some(BuiltinVariant::Skybox));
    assert_eq!(backend.shading_mode(), ShadingMode::Builtin(BuiltinVariant::Skybox));
    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    assert!(log.commands().contains(&"draw 3 0".to_string()));
}

#[test]
fn test_lit_draw_uploads_lighting_block() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());

    backend.set_global_ambient(Vec4::new(0.5, 0.5, 0.5, 1.0));
    assert!(backend.set_light(0, Light { enabled: true, ..Default::default() }));
    assert!(!backend.set_light(8, Light::default()));

    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    let lighting = log.buffers_with_usage(BufferUsage::Uniform)[1].clone();
    assert!(lighting.contents.lock().unwrap().iter().all(|&b| b == 0));

    backend.set_lighting_enabled(true);
    backend.draw_mesh(key).unwrap();
    let contents = lighting.contents.lock().unwrap();
    assert_eq!(&contents[0..4], &0.5f32.to_ne_bytes());
    assert_eq!(&contents[16..20], &1u32.to_ne_bytes());
}

#[test]
fn test_lights_changed_mid_frame_share_one_lighting_block() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());
    backend.set_lighting_enabled(true);

    backend.begin_frame().unwrap();
    backend.set_global_ambient(Vec4::splat(0.25));
    backend.draw_mesh(key).unwrap();
    backend.set_global_ambient(Vec4::splat(0.75));
    backend.draw_mesh(key).unwrap();
    backend.end_frame().unwrap();

    // Both lit draws read the single block, which holds the last ambient
    let uniforms = log.buffers_with_usage(BufferUsage::Uniform);
    assert_eq!(uniforms.len(), 2);
    let contents = uniforms[1].contents.lock().unwrap();
    assert_eq!(&contents[0..4], &0.75f32.to_ne_bytes());
}

#[test]
fn test_binding_groups_are_cached_per_shader_and_texture() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());
    let a = backend.create_texture(rgba_texture_desc(2, 2), None);
    let b = backend.create_texture(rgba_texture_desc(2, 2), None);

    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    backend.bind_texture(Some(a));
    backend.draw_mesh(key).unwrap();
    backend.draw_mesh(key).unwrap();
    backend.bind_texture(Some(b));
    backend.draw_mesh(key).unwrap();

    assert_eq!(backend.binding_group_count(), 3);
    assert_eq!(log.binding_groups_created.load(Ordering::SeqCst), 3);

    backend.destroy(a);
    assert_eq!(backend.binding_group_count(), 2);
}

// ============================================================================
// PIPELINES AND MESHES
// ============================================================================

#[test]
fn test_strip_pipeline_built_once() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    let strip = Mesh::new(MeshTopology::LineStrip, vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]);
    backend.prepare_mesh(key, &strip);

    let before = log.pipelines_created.load(Ordering::SeqCst);
    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    backend.draw_mesh(key).unwrap();

    assert_eq!(log.pipelines_created.load(Ordering::SeqCst), before + 1);
    assert!(log.commands().contains(&"bind_pipeline LineStrip".to_string()));
}

#[test]
fn test_indexed_fan_draws_expanded_indices() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    let fan = Mesh::new(MeshTopology::TriangleFan, vec![[0.0; 3]; 5]).with_indices(vec![0, 1, 2, 3, 4]);
    assert!(backend.prepare_mesh(key, &fan));

    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    assert!(log.commands().contains(&"bind_index_buffer 36 0 U32".to_string()));
    assert!(log.commands().contains(&"draw_indexed 9 0 0".to_string()));
}

#[test]
fn test_empty_mesh_is_not_prepared_and_unprepared_draw_is_a_no_op() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    assert!(!backend.prepare_mesh(key, &Mesh::new(MeshTopology::Triangles, Vec::new())));

    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    assert!(commands_starting_with(&log, "draw").is_empty());
}

#[test]
fn test_forget_mesh_releases_buffers() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());
    let dropped = log.buffers_dropped.load(Ordering::SeqCst);

    assert!(backend.forget_mesh(key));
    assert!(!backend.forget_mesh(key));
    assert_eq!(log.buffers_dropped.load(Ordering::SeqCst), dropped + 1);
}

// ============================================================================
// RENDER TARGETS
// ============================================================================

#[test]
fn test_offscreen_target_gets_pooled_depth_and_swapchain_still_presented() {
    let (mut backend, log) = backend();
    let color = backend.create_texture(TextureDesc {
        width: 128,
        height: 64,
        format: TextureFormat::B8G8R8A8_SRGB,
        usage: TextureUsage::SampledAndRenderTarget,
        data: None,
    }, None);
    let target = backend.create_render_target(color, None);
    assert!(!target.is_null());

    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());

    backend.set_render_target(Some(target)).unwrap();
    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    backend.end_frame().unwrap();

    assert_eq!(commands_starting_with(&log, "begin_rendering"), vec![
        "begin_rendering texture clear 128x64 depth=true",
        "begin_rendering swapchain clear 800x600 depth=true",
    ]);
}

#[test]
fn test_same_size_target_keeps_its_own_depth() {
    let (mut backend, log) = backend();
    let color = backend.create_texture(TextureDesc {
        width: 800,
        height: 600,
        format: TextureFormat::B8G8R8A8_SRGB,
        usage: TextureUsage::SampledAndRenderTarget,
        data: None,
    }, None);
    let target = backend.create_render_target(color, None);

    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());

    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();
    backend.set_render_target(Some(target)).unwrap();
    backend.clear([0.0, 0.0, 0.0, 1.0], 1.0).unwrap();
    backend.draw_mesh(key).unwrap();
    backend.set_render_target(None).unwrap();
    backend.draw_mesh(key).unwrap();
    backend.end_frame().unwrap();

    assert_eq!(commands_starting_with(&log, "begin_rendering"), vec![
        "begin_rendering swapchain clear 800x600 depth=true",
        "begin_rendering texture clear 800x600 depth=true",
        "begin_rendering swapchain load 800x600 depth=true",
    ]);
    let screen_depth = backend.scratch_depth(None).unwrap();
    let target_depth = backend.scratch_depth(Some(target)).unwrap();
    assert!(!Arc::ptr_eq(&screen_depth, &target_depth));
}

#[test]
fn test_destroying_target_releases_its_depth() {
    let (mut backend, _log) = backend();
    let color = backend.create_texture(TextureDesc {
        width: 64,
        height: 64,
        format: TextureFormat::B8G8R8A8_SRGB,
        usage: TextureUsage::SampledAndRenderTarget,
        data: None,
    }, None);
    let target = backend.create_render_target(color, None);

    backend.set_render_target(Some(target)).unwrap();
    backend.begin_frame().unwrap();
    backend.clear([0.0; 4], 1.0).unwrap();
    backend.set_render_target(None).unwrap();
    backend.end_frame().unwrap();
    assert!(backend.scratch_depth(Some(target)).is_some());

    assert!(backend.destroy(target));
    assert!(backend.scratch_depth(Some(target)).is_none());
    assert!(backend.scratch_depth(None).is_some());
}

#[test]
fn test_pending_clear_is_flushed_before_target_switch() {
    let (mut backend, log) = backend();
    let color = backend.create_texture(TextureDesc {
        width: 32,
        height: 32,
        format: TextureFormat::B8G8R8A8_SRGB,
        usage: TextureUsage::SampledAndRenderTarget,
        data: None,
    }, None);
    let target = backend.create_render_target(color, None);

    backend.begin_frame().unwrap();
    backend.clear([1.0, 0.0, 0.0, 1.0], 1.0).unwrap();
    backend.set_render_target(Some(target)).unwrap();
    backend.set_render_target(None).unwrap();
    backend.end_frame().unwrap();

    assert_eq!(commands_starting_with(&log, "begin_rendering"), vec![
        "begin_rendering swapchain clear 800x600 depth=true",
    ]);
}

#[test]
fn test_render_target_with_wrong_color_format_is_invalid() {
    let (mut backend, _log) = backend();
    let color = backend.create_texture(TextureDesc {
        width: 16,
        height: 16,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::SampledAndRenderTarget,
        data: None,
    }, None);
    assert!(backend.create_render_target(color, None).is_null());
}

#[test]
fn test_stale_render_target_is_ignored() {
    let (mut backend, log) = backend();
    let stale = crate::resource::ResourceHandle::new(999, ResourceKind::RenderTarget);
    backend.set_render_target(Some(stale)).unwrap();

    backend.begin_frame().unwrap();
    backend.end_frame().unwrap();
    assert_eq!(commands_starting_with(&log, "begin_rendering").len(), 1);
}

// ============================================================================
// HANDLES
// ============================================================================

#[test]
fn test_creation_failure_yields_invalid_handle() {
    let (mut backend, log) = backend();
    log.fail_buffer_creation.store(true, Ordering::SeqCst);

    let handle = backend.create_buffer(BufferUsage::Vertex, UsageHint::Static, 64, None);
    assert!(handle.is_null());
    assert!(!backend.is_valid(handle));
}

#[test]
fn test_stale_handle_operations_are_no_ops() {
    let (mut backend, _log) = backend();
    let buffer = backend.create_buffer(BufferUsage::Vertex, UsageHint::Dynamic, 64, None);
    let texture = backend.create_texture(rgba_texture_desc(4, 4), None);
    assert!(backend.update_buffer(buffer, 0, &[1, 2, 3, 4]));

    assert!(backend.destroy(buffer));
    assert!(!backend.destroy(buffer));
    assert!(!backend.update_buffer(buffer, 0, &[1, 2, 3, 4]));

    assert!(backend.update_texture(texture, TextureRegion { x: 0, y: 0, width: 1, height: 1 }, &[0; 4]));
    assert!(!backend.update_texture(texture, TextureRegion { x: 4, y: 4, width: 1, height: 1 }, &[0; 4]));
}

#[test]
fn test_builtin_shaders_cannot_be_destroyed() {
    let (mut backend, _log) = backend();
    let default = backend.builtins().get(BuiltinVariant::Default).unwrap();
    assert!(!backend.destroy(default));
    assert!(backend.is_valid(default));
}

#[test]
fn test_read_buffer_is_unsupported() {
    let (mut backend, _log) = backend();
    let buffer = backend.create_buffer(BufferUsage::Storage, UsageHint::Static, 16, None);
    assert!(matches!(backend.read_buffer(buffer), Err(Error::Unsupported(_))));
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_shutdown_twice_releases_once_and_resets_ids() {
    let (mut backend, log) = backend();
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    let key = meshes.insert(());
    backend.prepare_mesh(key, &triangle());
    backend.create_texture(rgba_texture_desc(2, 2), None);
    backend.begin_frame().unwrap();
    backend.draw_mesh(key).unwrap();

    backend.shutdown();
    let buffers_dropped = log.buffers_dropped.load(Ordering::SeqCst);
    let textures_dropped = log.textures_dropped.load(Ordering::SeqCst);
    let pipelines_dropped = log.pipelines_dropped.load(Ordering::SeqCst);

    assert_eq!(buffers_dropped, log.buffers_created.load(Ordering::SeqCst));
    assert_eq!(textures_dropped, log.textures_created.load(Ordering::SeqCst));
    assert_eq!(pipelines_dropped, log.pipelines_created.load(Ordering::SeqCst));
    assert_eq!(backend.resources().next_id(), 1);
    assert_eq!(backend.frame_state(), FrameState::Idle);

    backend.shutdown();
    assert_eq!(log.buffers_dropped.load(Ordering::SeqCst), buffers_dropped);
    assert_eq!(log.textures_dropped.load(Ordering::SeqCst), textures_dropped);
    assert_eq!(backend.resources().next_id(), 1);
    assert_eq!(log.frames_submitted.load(Ordering::SeqCst), 0);
}

#[test]
fn test_backend_refuses_work_after_shutdown() {
    let (mut backend, _log) = backend();
    backend.shutdown();

    assert!(backend.is_shut_down());
    assert!(matches!(backend.begin_frame(), Err(Error::InvalidState(_))));
    assert!(backend.create_texture(rgba_texture_desc(1, 1), None).is_null());
    let mut meshes: SlotMap<MeshKey, ()> = SlotMap::with_key();
    assert!(!backend.prepare_mesh(meshes.insert(()), &triangle()));
}
