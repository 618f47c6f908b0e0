//! Frame lifecycle and lazily opened render passes

pub mod recorder;
pub mod depth_pool;

pub use recorder::{FrameRecorder, FrameState, PassTarget};
pub use depth_pool::{DepthPool, DepthSlot};
