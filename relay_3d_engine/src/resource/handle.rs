/// Opaque resource handles and the monotonic id allocator

/// Table a handle points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Shader,
    RenderTarget,
}

/// Weak, copyable reference to a backend-owned resource
///
/// Valid while `id != 0` and the resource table still holds the id. A handle
/// that outlived its resource is "stale": every operation taking it becomes a
/// no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: u64,
    kind: ResourceKind,
}

impl ResourceHandle {
    /// Reserved id meaning "no resource" (and "default target" for render targets)
    pub const INVALID_ID: u64 = 0;

    pub(crate) fn new(id: u64, kind: ResourceKind) -> Self {
        Self { id, kind }
    }

    /// The zero handle of a given kind, returned when creation fails
    pub const fn invalid(kind: ResourceKind) -> Self {
        Self { id: Self::INVALID_ID, kind }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// False for the zero handle; says nothing about whether the resource still exists
    pub fn is_null(&self) -> bool {
        self.id == Self::INVALID_ID
    }
}

/// Monotonic 64-bit id source starting at 1
///
/// Ids are never reused while the allocator lives; `reset` (full shutdown)
/// is the only way back to 1.
#[derive(Debug)]
pub struct HandleAllocator {
    next_id: u64,
}

impl HandleAllocator {
    pub const FIRST_ID: u64 = 1;

    pub fn new() -> Self {
        Self { next_id: Self::FIRST_ID }
    }

    /// Allocate the next id
    pub fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Id the next call to `allocate` will return
    pub fn peek(&self) -> u64 {
        self.next_id
    }

    pub fn reset(&mut self) {
        self.next_id = Self::FIRST_ID;
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}
