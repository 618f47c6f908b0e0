/// Per-draw shading-mode selection
///
/// Fixed priority:
/// 1. a shader bound by the user (including an explicitly bound built-in)
/// 2. the lit variant when lighting is on and the variant exists
/// 3. with a texture bound and lighting off, screen-space if requested,
///    textured otherwise
/// 4. the default vertex-color variant

use crate::resource::ResourceHandle;
use crate::shading::BuiltinVariant;

/// Shader chosen for one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingMode {
    /// User-created shader
    User(ResourceHandle),
    /// Built-in variant
    Builtin(BuiltinVariant),
}

/// State the selector looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadingInputs {
    pub user_shader: Option<ResourceHandle>,
    /// Built-in bound explicitly (Skybox, Pbr, ...); counts as a user binding
    pub bound_builtin: Option<BuiltinVariant>,
    pub lighting_enabled: bool,
    /// The lit variant was created at startup
    pub lit_available: bool,
    pub texture_bound: bool,
    pub screen_space: bool,
}

pub fn select_shading_mode(inputs: &ShadingInputs) -> ShadingMode {
    if let Some(handle) = inputs.user_shader {
        return ShadingMode::User(handle);
    }
    if let Some(variant) = inputs.bound_builtin {
        return ShadingMode::Builtin(variant);
    }
    if inputs.lighting_enabled && inputs.lit_available {
        return ShadingMode::Builtin(BuiltinVariant::Lit);
    }
    if inputs.texture_bound && !inputs.lighting_enabled {
        return if inputs.screen_space {
            ShadingMode::Builtin(BuiltinVariant::ScreenSpace)
        } else {
            ShadingMode::Builtin(BuiltinVariant::Textured)
        };
    }
    ShadingMode::Builtin(BuiltinVariant::Default)
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
