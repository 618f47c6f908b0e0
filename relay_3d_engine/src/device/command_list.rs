/// CommandList trait - for recording rendering commands

use std::sync::Arc;
use crate::error::Result;
use crate::device::{
    Pipeline, Buffer, BindingGroup, IndexType, Texture, SwapchainImage,
};

/// What happens to an attachment when rendering begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// Clear to the descriptor's clear value
    Clear,
    /// Keep previous contents
    Load,
}

/// Color attachment of a rendering scope
#[derive(Clone)]
pub enum ColorAttachment {
    /// The image acquired for this frame
    Swapchain(Arc<dyn SwapchainImage>),
    /// An offscreen color texture
    Texture(Arc<dyn Texture>),
}

/// Parameters of one rendering scope (dynamic rendering)
#[derive(Clone)]
pub struct RenderingDesc {
    pub color: ColorAttachment,
    pub color_load: LoadOp,
    pub clear_color: [f32; 4],
    pub depth: Option<Arc<dyn Texture>>,
    pub depth_load: LoadOp,
    pub clear_depth: f32,
    /// Render area in pixels
    pub extent: (u32, u32),
}

/// Command list for recording rendering commands
///
/// Recorded commands are handed to `GraphicsDevice::submit_and_present`.
pub trait CommandList: Send + Sync {
    /// Begin recording commands (resets anything previously recorded)
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Open a rendering scope on the given attachments
    fn begin_rendering(&mut self, desc: &RenderingDesc) -> Result<()>;

    /// Close the current rendering scope
    fn end_rendering(&mut self) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind a binding group at `set_index`
    ///
    /// `dynamic_offsets` holds one byte offset per dynamic uniform binding,
    /// in binding order.
    fn bind_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
        dynamic_offsets: &[u32],
    ) -> Result<()>;

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;

    /// Transition the acquired image for presentation (outside rendering)
    fn prepare_present(&mut self, image: &Arc<dyn SwapchainImage>) -> Result<()>;
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with the [0, 1] depth range
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}
