//! Uniform data: per-draw block layouts, the dynamic ring and lighting state

pub mod layout;
pub mod ring;
pub mod lighting;

pub use layout::{UniformBlockKind, DefaultUniformBlock, LitUniformBlock, DrawUniforms};
pub use ring::{UniformRing, align_up};
pub use lighting::{
    LightingState, Light, Material, LightBlock, MaterialBlock, LightingBlock, MAX_LIGHTS,
};
