/// Dynamic uniform ring: one shared buffer, one padded slot per draw
///
/// The cursor restarts at zero every frame. Running past the end within a
/// frame is reported as `Error::UniformRingExhausted`; slots are never reused
/// inside a frame.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::device::{GraphicsDevice, Buffer, BufferDesc, BufferUsage};
use crate::engine_trace;

/// Round `value` up to a multiple of `alignment` (0 or 1 leaves it unchanged)
pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

pub struct UniformRing {
    buffer: Arc<dyn Buffer>,
    /// Slot size after alignment padding
    stride: u64,
    capacity: u64,
    cursor: u64,
    last_offset: Option<u32>,
    staging: Vec<u8>,
}

impl UniformRing {
    /// Allocate a ring of `slots` slots of at least `slot_size` bytes each
    pub fn new(
        device: &mut dyn GraphicsDevice,
        slot_size: u32,
        slots: u32,
        alignment: u64,
    ) -> Result<Self> {
        if slot_size == 0 || slots == 0 {
            return Err(Error::InitializationFailed(
                "uniform ring needs a non-zero slot size and slot count".to_string(),
            ));
        }
        let stride = align_up(slot_size as u64, alignment);
        let capacity = stride * slots as u64;
        let buffer = device.create_buffer(BufferDesc {
            size: capacity,
            usage: BufferUsage::Uniform,
        })?;
        Ok(Self {
            buffer,
            stride,
            capacity,
            cursor: 0,
            last_offset: None,
            staging: vec![0u8; stride as usize],
        })
    }

    /// Start a new frame: the next allocation lands at offset 0
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.last_offset = None;
    }

    /// Copy one draw's payload into the next slot and return its byte offset
    pub fn allocate(&mut self, payload: &[u8]) -> Result<u32> {
        if payload.len() as u64 > self.stride {
            return Err(Error::InvalidResource(format!(
                "uniform payload of {} bytes exceeds slot size {}",
                payload.len(), self.stride
            )));
        }
        let end = self.cursor + self.stride;
        if end > self.capacity {
            return Err(Error::UniformRingExhausted {
                capacity: self.capacity,
                requested: end,
            });
        }

        // Zero the tail so stale bytes from a bigger block never leak through
        self.staging[..payload.len()].copy_from_slice(payload);
        self.staging[payload.len()..].fill(0);
        self.buffer.update(self.cursor, &self.staging)?;

        let offset = self.cursor as u32;
        self.cursor = end;
        self.last_offset = Some(offset);
        engine_trace!("relay3d::uniform", "Uniform slot at offset {}", offset);
        Ok(offset)
    }

    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes handed out so far this frame
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Offset returned by the most recent `allocate` this frame
    pub fn last_offset(&self) -> Option<u32> {
        self.last_offset
    }

    /// Slots still free this frame
    pub fn remaining_slots(&self) -> u64 {
        (self.capacity - self.cursor) / self.stride
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
