//! Shading-mode selection and built-in shader variants

pub mod mode;
pub mod variants;

pub use mode::{ShadingMode, ShadingInputs, select_shading_mode};
pub use variants::{BuiltinVariant, BuiltinShaderSources, BuiltinShaderSet, SpirvPair};

#[cfg(test)]
#[path = "variants_tests.rs"]
mod variants_tests;
