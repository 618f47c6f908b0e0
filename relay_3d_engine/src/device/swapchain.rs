/// Acquired presentation image

/// One image acquired from the surface for the current frame
///
/// Valid from `acquire_next_image` until `submit_and_present`.
pub trait SwapchainImage: Send + Sync {
    /// Index of the image inside the swapchain
    fn index(&self) -> u32;

    /// Image size in pixels
    fn extent(&self) -> (u32, u32);
}
