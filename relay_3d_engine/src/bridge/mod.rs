//! Lookup tables from legacy numeric ids to GPU handles

pub mod texture_bridge;
pub mod framebuffer_bridge;

pub use texture_bridge::{TextureBridge, TextureBridgeEntry};
pub use framebuffer_bridge::{FramebufferBridge, FramebufferEntry, DEFAULT_FRAMEBUFFER};

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
