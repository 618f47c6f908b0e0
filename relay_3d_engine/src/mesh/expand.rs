/// Interleaving and topology expansion
///
/// Fans become triangle lists and closed loops become line lists. Indexed
/// meshes get an expanded index list over the original vertices; non-indexed
/// meshes get an expanded vertex list.

use crate::device::PrimitiveTopology;
use crate::mesh::{Mesh, MeshTopology, Vertex};

/// Mesh data ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Option<Vec<u32>>,
    pub topology: PrimitiveTopology,
}

impl AdaptedMesh {
    /// Vertices (non-indexed) or indices (indexed) to draw
    pub fn draw_count(&self) -> u32 {
        match &self.indices {
            Some(indices) => indices.len() as u32,
            None => self.vertices.len() as u32,
        }
    }
}

/// Interleave the attribute streams, filling gaps with vertex defaults
pub fn interleave(mesh: &Mesh) -> Vec<Vertex> {
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, &position)| Vertex {
            position,
            color: mesh.colors.get(i).copied().unwrap_or(Vertex::DEFAULT_COLOR),
            texcoord: mesh.texcoords.get(i).copied().unwrap_or(Vertex::DEFAULT_TEXCOORD),
            normal: mesh.normals.get(i).copied().unwrap_or(Vertex::DEFAULT_NORMAL),
        })
        .collect()
}

/// Fan sequence -> triangle list, vertex 0 first in every triangle
pub fn fan_to_triangles(sequence: &[u32]) -> Vec<u32> {
    if sequence.len() < 3 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity((sequence.len() - 2) * 3);
    for pair in sequence[1..].windows(2) {
        out.extend_from_slice(&[sequence[0], pair[0], pair[1]]);
    }
    out
}

/// Closed loop sequence -> line list, each entry paired with its cyclic successor
pub fn loop_to_lines(sequence: &[u32]) -> Vec<u32> {
    if sequence.len() < 2 {
        return Vec::new();
    }
    let n = sequence.len();
    let mut out = Vec::with_capacity(n * 2);
    for i in 0..n {
        out.extend_from_slice(&[sequence[i], sequence[(i + 1) % n]]);
    }
    out
}

fn expand_sequence(topology: MeshTopology, sequence: &[u32]) -> Vec<u32> {
    match topology {
        MeshTopology::TriangleFan => fan_to_triangles(sequence),
        MeshTopology::LineLoop => loop_to_lines(sequence),
        _ => sequence.to_vec(),
    }
}

/// Interleave and, for fans and loops, expand
pub fn adapt(mesh: &Mesh) -> AdaptedMesh {
    let interleaved = interleave(mesh);
    let topology = mesh.topology.draw_topology();

    if !mesh.topology.needs_expansion() {
        return AdaptedMesh {
            vertices: interleaved,
            indices: mesh.indices.clone(),
            topology,
        };
    }

    match &mesh.indices {
        Some(indices) => AdaptedMesh {
            vertices: interleaved,
            indices: Some(expand_sequence(mesh.topology, indices)),
            topology,
        },
        None => {
            let sequence: Vec<u32> = (0..interleaved.len() as u32).collect();
            let vertices = expand_sequence(mesh.topology, &sequence)
                .into_iter()
                .map(|i| interleaved[i as usize])
                .collect();
            AdaptedMesh { vertices, indices: None, topology }
        }
    }
}

#[cfg(test)]
#[path = "expand_tests.rs"]
mod tests;
