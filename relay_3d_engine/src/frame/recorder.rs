/// Frame and render-pass state machine
///
/// ```text
/// Idle --begin_frame--> FrameOpen --open_pass--> PassOpen
///                                     ^             |
///                                     |        close_pass
///                                     +-- PassClosed <-+
/// FrameOpen / PassOpen / PassClosed --end_frame--> Idle
/// ```
///
/// Passes are opened on demand by the first draw that needs one. A new clear
/// request or a render-target switch closes the open pass; the next draw
/// reopens one with the current target and clear state.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::device::{
    GraphicsDevice, CommandList, SwapchainImage, Texture, RenderingDesc, ColorAttachment,
    LoadOp, Viewport, Rect2D,
};
use crate::resource::ResourceHandle;
use crate::{engine_debug, engine_trace, engine_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    /// Frame begun, no pass opened yet
    FrameOpen,
    PassOpen,
    PassClosed,
}

/// Attachments for the next pass, resolved by the backend
#[derive(Clone)]
pub struct PassTarget {
    /// Offscreen color texture; `None` renders to the acquired image
    pub color: Option<Arc<dyn Texture>>,
    pub depth: Option<Arc<dyn Texture>>,
    pub extent: (u32, u32),
}

pub struct FrameRecorder {
    state: FrameState,
    commands: Option<Box<dyn CommandList>>,
    image: Option<Arc<dyn SwapchainImage>>,
    /// `None` is the default (visible) target; persists across frames
    target: Option<ResourceHandle>,
    clear_color: [f32; 4],
    clear_depth: f32,
    clear_pending: bool,
    /// A pass on the acquired image has been opened this frame
    swapchain_touched: bool,
    viewport: Option<Viewport>,
    passes_this_frame: u32,
}

impl FrameRecorder {
    pub fn new(clear_color: [f32; 4], clear_depth: f32) -> Self {
        Self {
            state: FrameState::Idle,
            commands: None,
            image: None,
            target: None,
            clear_color,
            clear_depth,
            clear_pending: false,
            swapchain_touched: false,
            viewport: None,
            passes_this_frame: 0,
        }
    }

    // ===== FRAME =====

    /// Acquire the next image and start recording
    ///
    /// Returns `Ok(false)` when the surface is out of date; the frame is then
    /// skipped and the recorder stays idle.
    pub fn begin_frame(&mut self, device: &mut dyn GraphicsDevice) -> Result<bool> {
        if self.state != FrameState::Idle {
            return Err(Error::InvalidState("begin_frame called while a frame is open".to_string()));
        }

        let Some(image) = device.acquire_next_image()? else {
            engine_warn!("relay3d::frame", "Surface out of date, frame skipped");
            return Ok(false);
        };

        if self.commands.is_none() {
            self.commands = Some(device.create_command_list()?);
        }
        if let Some(commands) = self.commands.as_mut() {
            commands.begin()?;
        }

        engine_trace!("relay3d::frame", "Frame begun on image {}", image.index());
        self.image = Some(image);
        self.clear_pending = true;
        self.swapchain_touched = false;
        self.passes_this_frame = 0;
        self.state = FrameState::FrameOpen;
        Ok(true)
    }

    /// Close any pass, finish recording, submit and present
    pub fn end_frame(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if self.state == FrameState::Idle {
            return Err(Error::InvalidState("end_frame called without begin_frame".to_string()));
        }
        self.close_pass()?;

        let image = self
            .image
            .take()
            .ok_or_else(|| Error::InvalidState("frame has no acquired image".to_string()))?;
        let commands = self
            .commands
            .as_mut()
            .ok_or_else(|| Error::InvalidState("frame has no command list".to_string()))?;

        self.state = FrameState::Idle;
        commands.prepare_present(&image)?;
        commands.end()?;
        device.submit_and_present(commands.as_ref(), &image)?;
        engine_trace!("relay3d::frame", "Frame submitted ({} passes)", self.passes_this_frame);
        Ok(())
    }

    /// Drop the current frame without submitting it
    pub fn abort(&mut self) {
        if self.state == FrameState::Idle {
            return;
        }
        if let Some(commands) = self.commands.as_mut() {
            if self.state == FrameState::PassOpen {
                let _ = commands.end_rendering();
            }
            let _ = commands.end();
        }
        self.image = None;
        self.clear_pending = false;
        self.state = FrameState::Idle;
        engine_debug!("relay3d::frame", "Frame aborted");
    }

    // ===== PASSES =====

    /// Open a pass on `target`; the first pass on the acquired image always clears
    pub fn open_pass(&mut self, target: PassTarget) -> Result<()> {
        match self.state {
            FrameState::Idle => {
                return Err(Error::InvalidState("cannot open a pass outside a frame".to_string()));
            }
            FrameState::PassOpen => {
                return Err(Error::InvalidState("a pass is already open".to_string()));
            }
            FrameState::FrameOpen | FrameState::PassClosed => {}
        }

        let color = match target.color {
            Some(texture) => ColorAttachment::Texture(texture),
            None => {
                let image = self
                    .image
                    .as_ref()
                    .ok_or_else(|| Error::InvalidState("frame has no acquired image".to_string()))?;
                ColorAttachment::Swapchain(Arc::clone(image))
            }
        };
        let on_swapchain = matches!(color, ColorAttachment::Swapchain(_));
        let clear = self.clear_pending || (on_swapchain && !self.swapchain_touched);
        let load = if clear { LoadOp::Clear } else { LoadOp::Load };

        let desc = RenderingDesc {
            color,
            color_load: load,
            clear_color: self.clear_color,
            depth: target.depth,
            depth_load: load,
            clear_depth: self.clear_depth,
            extent: target.extent,
        };

        let commands = self
            .commands
            .as_mut()
            .ok_or_else(|| Error::InvalidState("frame has no command list".to_string()))?;
        commands.begin_rendering(&desc)?;
        let viewport = self
            .viewport
            .unwrap_or_else(|| Viewport::from_extent(target.extent.0, target.extent.1));
        commands.set_viewport(viewport)?;
        commands.set_scissor(Rect2D {
            x: 0,
            y: 0,
            width: target.extent.0,
            height: target.extent.1,
        })?;

        self.clear_pending = false;
        self.swapchain_touched |= on_swapchain;
        self.passes_this_frame += 1;
        self.state = FrameState::PassOpen;
        Ok(())
    }

    /// Close the open pass, if any
    pub fn close_pass(&mut self) -> Result<()> {
        if self.state != FrameState::PassOpen {
            return Ok(());
        }
        if let Some(commands) = self.commands.as_mut() {
            commands.end_rendering()?;
        }
        self.state = FrameState::PassClosed;
        Ok(())
    }

    /// Commands of the open pass
    pub fn pass_commands(&mut self) -> Result<&mut dyn CommandList> {
        if self.state != FrameState::PassOpen {
            return Err(Error::InvalidState("no render pass open".to_string()));
        }
        match self.commands.as_mut() {
            Some(commands) => Ok(commands.as_mut()),
            None => Err(Error::InvalidState("frame has no command list".to_string())),
        }
    }

    // ===== STATE CHANGES =====

    /// New clear values; the next pass clears with them
    pub fn request_clear(&mut self, color: [f32; 4], depth: f32) -> Result<()> {
        self.close_pass()?;
        self.clear_color = color;
        self.clear_depth = depth;
        if self.state != FrameState::Idle {
            self.clear_pending = true;
        }
        Ok(())
    }

    /// Switch render target; false when it was already current
    pub fn set_target(&mut self, target: Option<ResourceHandle>) -> Result<bool> {
        if self.target == target {
            return Ok(false);
        }
        self.close_pass()?;
        self.target = target;
        Ok(true)
    }

    /// Viewport for subsequent passes (`None` = full target); applied now if a pass is open
    pub fn set_viewport(&mut self, viewport: Option<Viewport>) -> Result<()> {
        self.viewport = viewport;
        if self.state == FrameState::PassOpen {
            if let (Some(viewport), Some(commands)) = (viewport, self.commands.as_mut()) {
                commands.set_viewport(viewport)?;
            }
        }
        Ok(())
    }

    // ===== QUERIES =====

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn in_frame(&self) -> bool {
        self.state != FrameState::Idle
    }

    pub fn is_pass_open(&self) -> bool {
        self.state == FrameState::PassOpen
    }

    pub fn clear_pending(&self) -> bool {
        self.clear_pending
    }

    pub fn swapchain_touched(&self) -> bool {
        self.swapchain_touched
    }

    pub fn target(&self) -> Option<ResourceHandle> {
        self.target
    }

    pub fn image(&self) -> Option<&Arc<dyn SwapchainImage>> {
        self.image.as_ref()
    }

    pub fn clear_values(&self) -> ([f32; 4], f32) {
        (self.clear_color, self.clear_depth)
    }

    pub fn passes_this_frame(&self) -> u32 {
        self.passes_this_frame
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
