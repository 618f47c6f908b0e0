/// Lighting and material state, packed into the secondary uniform buffer
///
/// The packed block is rebuilt only when something changed and lighting is
/// on. Layout (752 bytes):
///
/// | field          | offset | size      |
/// |----------------|--------|-----------|
/// | global_ambient | 0      | 16        |
/// | light_count    | 16     | 16 (pad)  |
/// | lights[8]      | 32     | 8 x 80    |
/// | material       | 672    | 80        |

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Lights the packed block has room for
pub const MAX_LIGHTS: usize = 8;

/// One packed light (80 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightBlock {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// constant, linear, quadratic, enabled (0.0 / 1.0)
    pub attenuation: [f32; 4],
}

/// Packed material (80 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialBlock {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emission: [f32; 4],
    /// shininess, then padding
    pub shininess: [f32; 4],
}

/// Whole lighting uniform block (752 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightingBlock {
    pub global_ambient: [f32; 4],
    pub light_count: u32,
    pub _pad: [u32; 3],
    pub lights: [LightBlock; MAX_LIGHTS],
    pub material: MaterialBlock,
}

/// A light as set by the drawing layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Eye-space position; w = 0 makes it directional
    pub position: Vec4,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    /// constant, linear, quadratic
    pub attenuation: Vec3,
    pub enabled: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec4::new(0.0, 0.0, 1.0, 0.0),
            ambient: Vec4::new(0.0, 0.0, 0.0, 1.0),
            diffuse: Vec4::ONE,
            specular: Vec4::ONE,
            attenuation: Vec3::new(1.0, 0.0, 0.0),
            enabled: false,
        }
    }
}

impl Light {
    fn pack(&self) -> LightBlock {
        LightBlock {
            position: self.position.to_array(),
            ambient: self.ambient.to_array(),
            diffuse: self.diffuse.to_array(),
            specular: self.specular.to_array(),
            attenuation: [
                self.attenuation.x,
                self.attenuation.y,
                self.attenuation.z,
                if self.enabled { 1.0 } else { 0.0 },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub emission: Vec4,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emission: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 0.0,
        }
    }
}

impl Material {
    fn pack(&self) -> MaterialBlock {
        MaterialBlock {
            ambient: self.ambient.to_array(),
            diffuse: self.diffuse.to_array(),
            specular: self.specular.to_array(),
            emission: self.emission.to_array(),
            shininess: [self.shininess, 0.0, 0.0, 0.0],
        }
    }
}

/// Lighting toggle, lights, global ambient and material, with a dirty flag
#[derive(Debug, Clone)]
pub struct LightingState {
    enabled: bool,
    global_ambient: Vec4,
    lights: [Light; MAX_LIGHTS],
    material: Material,
    dirty: bool,
}

impl Default for LightingState {
    fn default() -> Self {
        Self {
            enabled: false,
            global_ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            lights: [Light::default(); MAX_LIGHTS],
            material: Material::default(),
            dirty: true,
        }
    }
}

impl LightingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Replace light `index`; false when `index >= MAX_LIGHTS`
    pub fn set_light(&mut self, index: usize, light: Light) -> bool {
        match self.lights.get_mut(index) {
            Some(slot) => {
                if *slot != light {
                    *slot = light;
                    self.dirty = true;
                }
                true
            }
            None => false,
        }
    }

    pub fn light(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    pub fn set_global_ambient(&mut self, ambient: Vec4) {
        if self.global_ambient != ambient {
            self.global_ambient = ambient;
            self.dirty = true;
        }
    }

    pub fn set_material(&mut self, material: Material) {
        if self.material != material {
            self.material = material;
            self.dirty = true;
        }
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force a rebuild on the next `take_update` (e.g. after the buffer was recreated)
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// One past the highest enabled light
    pub fn light_count(&self) -> u32 {
        self.lights
            .iter()
            .rposition(|l| l.enabled)
            .map_or(0, |i| i as u32 + 1)
    }

    pub fn pack(&self) -> LightingBlock {
        let mut lights = [LightBlock::zeroed(); MAX_LIGHTS];
        for (dst, src) in lights.iter_mut().zip(self.lights.iter()) {
            *dst = src.pack();
        }
        LightingBlock {
            global_ambient: self.global_ambient.to_array(),
            light_count: self.light_count(),
            _pad: [0; 3],
            lights,
            material: self.material.pack(),
        }
    }

    /// Packed block if something changed since the last call
    ///
    /// Only called for draws whose shader reads the lighting block, so the
    /// dirty flag survives frames that never use it.
    pub fn take_update(&mut self) -> Option<LightingBlock> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.pack())
    }
}

#[cfg(test)]
#[path = "lighting_tests.rs"]
mod tests;
