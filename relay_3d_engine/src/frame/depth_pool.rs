/// Scratch depth attachments, one per render target
///
/// Targets never share depth: a clear on one must not wipe what another
/// already wrote earlier in the frame.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::device::{GraphicsDevice, Texture, TextureDesc, TextureFormat, TextureUsage};
use crate::engine_debug;

/// Owner of a scratch depth attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthSlot {
    /// The acquired swapchain image
    Default,
    /// Render target id
    Target(u64),
}

struct PooledDepth {
    extent: (u32, u32),
    texture: Arc<dyn Texture>,
}

pub struct DepthPool {
    format: TextureFormat,
    slots: FxHashMap<DepthSlot, PooledDepth>,
}

impl DepthPool {
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            slots: FxHashMap::default(),
        }
    }

    /// Depth texture of `slot`, (re)created when missing or of another extent
    pub fn get_or_create(
        &mut self,
        device: &mut dyn GraphicsDevice,
        slot: DepthSlot,
        extent: (u32, u32),
    ) -> Result<Arc<dyn Texture>> {
        if let Some(pooled) = self.slots.get(&slot) {
            if pooled.extent == extent {
                return Ok(Arc::clone(&pooled.texture));
            }
        }
        let texture = device.create_texture(TextureDesc {
            width: extent.0,
            height: extent.1,
            format: self.format,
            usage: TextureUsage::DepthStencil,
            data: None,
        })?;
        engine_debug!("relay3d::frame", "Pooled depth attachment {}x{} for {:?}", extent.0, extent.1, slot);
        self.slots.insert(slot, PooledDepth { extent, texture: Arc::clone(&texture) });
        Ok(texture)
    }

    pub fn get(&self, slot: DepthSlot) -> Option<&Arc<dyn Texture>> {
        self.slots.get(&slot).map(|pooled| &pooled.texture)
    }

    /// Drop the attachment of `slot`; false if there was none
    pub fn remove(&mut self, slot: DepthSlot) -> bool {
        self.slots.remove(&slot).is_some()
    }

    pub fn clear(&mut self) -> usize {
        let count = self.slots.len();
        self.slots.clear();
        count
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
