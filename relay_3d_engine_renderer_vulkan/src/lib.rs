/*!
# Relay 3D Engine - Vulkan Device

Vulkan implementation of the relay_3d_engine `GraphicsDevice` trait.

Built on Ash for Vulkan bindings, gpu-allocator for memory management and
spirq for shader reflection. Requires Vulkan 1.3 (dynamic rendering).

```no_run
use relay_3d_engine::relay3d::device::DeviceConfig;
use relay_3d_engine_renderer_vulkan::VulkanDevice;
# fn run(window: &winit::window::Window) -> relay_3d_engine::relay3d::Result<()> {
let device = VulkanDevice::from_window(window, DeviceConfig::default())?;
# Ok(())
# }
```
*/

mod vulkan_context;
mod vulkan_format;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_sampler;
mod vulkan_binding_group;
mod vulkan_swapchain;
mod vulkan_command_list;
#[cfg_attr(not(feature = "vulkan-validation"), allow(dead_code))]
mod vulkan_debug;
mod vulkan_device;

pub use vulkan_device::VulkanDevice;

// Validation reporting
pub use vulkan_debug::{get_validation_stats, print_validation_stats_report};
