/// Legacy framebuffer ids -> GPU render-target handles
///
/// Id 0 is the default (visible) target and is never registered.

use rustc_hash::FxHashMap;
use crate::resource::ResourceHandle;

pub const DEFAULT_FRAMEBUFFER: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferEntry {
    pub target: ResourceHandle,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default)]
pub struct FramebufferBridge {
    entries: FxHashMap<u32, FramebufferEntry>,
}

impl FramebufferBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id`; false for the reserved id 0
    pub fn insert(&mut self, id: u32, entry: FramebufferEntry) -> bool {
        if id == DEFAULT_FRAMEBUFFER {
            return false;
        }
        self.entries.insert(id, entry);
        true
    }

    pub fn lookup(&self, id: u32) -> Option<&FramebufferEntry> {
        self.entries.get(&id)
    }

    pub fn erase(&mut self, id: u32) -> Option<FramebufferEntry> {
        self.entries.remove(&id)
    }

    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
