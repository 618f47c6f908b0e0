/// Render target: color + optional depth attachment borrowed from texture entries

use crate::resource::ResourceHandle;

/// Groups attachments by handle; owns nothing
///
/// Destroying the render target leaves both textures alive. Destroying one of
/// the textures leaves the render target pointing at a stale handle, which
/// resolves to nothing when the target is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetResource {
    pub color: ResourceHandle,
    pub depth: Option<ResourceHandle>,
    pub width: u32,
    pub height: u32,
}
