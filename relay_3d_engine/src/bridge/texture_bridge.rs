/// Legacy texture ids -> GPU texture handles

use rustc_hash::FxHashMap;
use crate::device::TextureFormat;
use crate::resource::ResourceHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBridgeEntry {
    pub handle: ResourceHandle,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Bumped on every upload through the legacy path
    pub version: u64,
}

#[derive(Debug, Default)]
pub struct TextureBridge {
    entries: FxHashMap<u32, TextureBridgeEntry>,
}

impl TextureBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id`, returning the entry it replaced
    pub fn insert(
        &mut self,
        id: u32,
        handle: ResourceHandle,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Option<TextureBridgeEntry> {
        self.entries.insert(id, TextureBridgeEntry {
            handle,
            width,
            height,
            format,
            version: 0,
        })
    }

    pub fn lookup(&self, id: u32) -> Option<&TextureBridgeEntry> {
        self.entries.get(&id)
    }

    /// Record an upload into `id`; returns the new version
    pub fn bump_version(&mut self, id: u32) -> Option<u64> {
        self.entries.get_mut(&id).map(|entry| {
            entry.version += 1;
            entry.version
        })
    }

    pub fn erase(&mut self, id: u32) -> Option<TextureBridgeEntry> {
        self.entries.remove(&id)
    }

    /// Forget every mapping, returning how many there were
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
