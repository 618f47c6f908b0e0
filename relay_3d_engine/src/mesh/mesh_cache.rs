/// GPU-side cache of adapted meshes, one entry per mesh identity

use std::sync::Arc;
use slotmap::SecondaryMap;
use crate::error::{Error, Result};
use crate::device::{
    GraphicsDevice, Buffer, BufferDesc, BufferUsage, PrimitiveTopology, VertexLayout,
};
use crate::mesh::{Mesh, MeshKey, MeshTopology, Vertex, expand};
use crate::engine_trace;

/// Primitive-restart marker, only accepted in strip index lists
pub const PRIMITIVE_RESTART_INDEX: u32 = u32::MAX;

/// Cheap content version: (topology, vertex count, index count)
///
/// Edits that keep all three unchanged are not detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshVersion {
    pub topology: MeshTopology,
    pub vertex_count: usize,
    pub index_count: usize,
}

impl MeshVersion {
    pub fn of(mesh: &Mesh) -> Self {
        Self {
            topology: mesh.topology,
            vertex_count: mesh.vertex_count(),
            index_count: mesh.index_count(),
        }
    }
}

pub struct MeshCacheEntry {
    pub version: MeshVersion,
    pub layout: VertexLayout,
    /// Topology after fan/loop expansion
    pub topology: PrimitiveTopology,
    pub vertex_buffer: Arc<dyn Buffer>,
    pub index_buffer: Option<Arc<dyn Buffer>>,
    /// Vertices (non-indexed) or indices (indexed) per draw
    pub draw_count: u32,
}

impl MeshCacheEntry {
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }
}

/// What `prepare` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// Entry existed with a matching version
    Hit,
    /// Buffers were (re)built
    Uploaded,
    /// Nothing drawable (no vertices)
    Empty,
}

pub struct MeshCache {
    entries: SecondaryMap<MeshKey, MeshCacheEntry>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self { entries: SecondaryMap::new() }
    }

    /// Make sure the entry for `key` reflects `mesh`
    ///
    /// A version match is a hit and touches nothing. A mismatch drops the old
    /// buffers and uploads fresh ones. An empty mesh drops any entry.
    pub fn prepare(
        &mut self,
        device: &mut dyn GraphicsDevice,
        key: MeshKey,
        mesh: &Mesh,
    ) -> Result<PrepareOutcome> {
        if mesh.is_empty() {
            self.entries.remove(key);
            return Ok(PrepareOutcome::Empty);
        }

        let version = MeshVersion::of(mesh);
        if self.entries.get(key).is_some_and(|entry| entry.version == version) {
            return Ok(PrepareOutcome::Hit);
        }

        // Old buffers go before the new ones are created
        self.entries.remove(key);

        if let Some(indices) = &mesh.indices {
            let count = mesh.vertex_count() as u32;
            // Restart is only enabled on strip pipelines; fans and loops are expanded to lists
            let restart_allowed = mesh.topology.draw_topology().is_strip();
            if let Some(bad) = indices
                .iter()
                .find(|&&i| i >= count && !(restart_allowed && i == PRIMITIVE_RESTART_INDEX))
            {
                return Err(Error::InvalidResource(format!(
                    "index {} out of range for {} vertices",
                    bad, count
                )));
            }
        }

        let adapted = expand::adapt(mesh);
        if adapted.draw_count() == 0 {
            return Ok(PrepareOutcome::Empty);
        }

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&adapted.vertices);
        let vertex_buffer = device.create_buffer(BufferDesc {
            size: vertex_bytes.len() as u64,
            usage: BufferUsage::Vertex,
        })?;
        vertex_buffer.update(0, vertex_bytes)?;

        let index_buffer = match &adapted.indices {
            Some(indices) if !indices.is_empty() => {
                let index_bytes: &[u8] = bytemuck::cast_slice(indices);
                let buffer = device.create_buffer(BufferDesc {
                    size: index_bytes.len() as u64,
                    usage: BufferUsage::Index,
                })?;
                buffer.update(0, index_bytes)?;
                Some(buffer)
            }
            _ => None,
        };

        engine_trace!(
            "relay3d::mesh",
            "Uploaded mesh {:?}: {} vertices, {} indices, {:?}",
            key, adapted.vertices.len(), adapted.indices.as_ref().map_or(0, |i| i.len()), adapted.topology
        );

        self.entries.insert(key, MeshCacheEntry {
            version,
            layout: Vertex::layout(),
            topology: adapted.topology,
            vertex_buffer,
            index_buffer,
            draw_count: adapted.draw_count(),
        });
        Ok(PrepareOutcome::Uploaded)
    }

    pub fn get(&self, key: MeshKey) -> Option<&MeshCacheEntry> {
        self.entries.get(key)
    }

    /// Drop the entry and its buffers; false if there was none
    pub fn remove(&mut self, key: MeshKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry, returning how many were removed
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

impl Default for MeshCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "mesh_cache_tests.rs"]
mod tests;
