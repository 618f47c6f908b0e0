/// Buffer resource: one GPU buffer plus its declared role

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::device::{Buffer, BufferUsage};

/// How often the caller expects to rewrite the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageHint {
    /// Written once
    Static,
    /// Rewritten occasionally
    Dynamic,
    /// Rewritten every frame
    Stream,
}

pub struct BufferResource {
    buffer: Arc<dyn Buffer>,
    usage: BufferUsage,
    hint: UsageHint,
}

impl BufferResource {
    pub(crate) fn new(buffer: Arc<dyn Buffer>, usage: BufferUsage, hint: UsageHint) -> Self {
        Self { buffer, usage, hint }
    }

    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn hint(&self) -> UsageHint {
        self.hint
    }

    pub fn size(&self) -> u64 {
        self.buffer.size()
    }

    /// Partial overwrite; the write must stay inside the buffer
    pub fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64).ok_or_else(|| {
            Error::InvalidResource("buffer update range overflows".to_string())
        })?;
        if end > self.size() {
            return Err(Error::InvalidResource(format!(
                "buffer update [{}..{}) exceeds size {}",
                offset, end, self.size()
            )));
        }
        self.buffer.update(offset, data)
    }
}
