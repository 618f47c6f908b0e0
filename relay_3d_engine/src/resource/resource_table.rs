/// Id-keyed storage for live resources of one kind

use rustc_hash::FxHashMap;

pub struct ResourceTable<T> {
    entries: FxHashMap<u64, T>,
}

impl<T> ResourceTable<T> {
    pub fn new() -> Self {
        Self { entries: FxHashMap::default() }
    }

    pub fn insert(&mut self, id: u64, value: T) {
        self.entries.insert(id, value);
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn remove(&mut self, id: u64) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u64, &T)> {
        self.entries.iter()
    }

    /// Remove every entry, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
