/// Mutable per-draw state set by the drawing layer

use crate::resource::ResourceHandle;
use crate::shading::{BuiltinVariant, ShadingInputs};
use crate::uniform::{DrawUniforms, LightingState};

#[derive(Debug, Clone, Default)]
pub struct DrawState {
    pub uniforms: DrawUniforms,
    pub texture: Option<ResourceHandle>,
    pub screen_space: bool,
    pub user_shader: Option<ResourceHandle>,
    pub builtin: Option<BuiltinVariant>,
    pub lighting: LightingState,
}

impl DrawState {
    /// Selector inputs; handles that no longer resolve count as unbound
    pub fn shading_inputs(&self, is_valid: impl Fn(ResourceHandle) -> bool, lit_available: bool) -> ShadingInputs {
        ShadingInputs {
            user_shader: self.user_shader.filter(|&h| is_valid(h)),
            bound_builtin: self.builtin,
            lighting_enabled: self.lighting.is_enabled(),
            lit_available,
            texture_bound: self.texture.is_some_and(|h| is_valid(h)),
            screen_space: self.screen_space,
        }
    }

    /// Back to defaults, keeping nothing bound
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
