/// Texture resource: texture + sampled view (device object) and its sampler preset

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::device::{Texture, TextureFormat, TextureInfo, TextureRegion, SamplerType};

pub struct TextureResource {
    texture: Arc<dyn Texture>,
    sampler: SamplerType,
}

impl TextureResource {
    pub(crate) fn new(texture: Arc<dyn Texture>, sampler: SamplerType) -> Self {
        Self { texture, sampler }
    }

    pub fn texture(&self) -> &Arc<dyn Texture> {
        &self.texture
    }

    pub fn info(&self) -> &TextureInfo {
        self.texture.info()
    }

    pub fn width(&self) -> u32 {
        self.info().width
    }

    pub fn height(&self) -> u32 {
        self.info().height
    }

    pub fn format(&self) -> TextureFormat {
        self.info().format
    }

    pub fn sampler(&self) -> SamplerType {
        self.sampler
    }

    /// Sub-region write; size and format stay fixed
    pub fn update_region(&self, region: TextureRegion, data: &[u8]) -> Result<()> {
        let info = self.info();
        if !region.fits(info.width, info.height) {
            return Err(Error::InvalidResource(format!(
                "region {:?} outside {}x{} texture",
                region, info.width, info.height
            )));
        }
        let expected = region.width as usize * region.height as usize * info.format.bytes_per_pixel() as usize;
        if data.len() != expected {
            return Err(Error::InvalidResource(format!(
                "region upload expects {} bytes, got {}",
                expected, data.len()
            )));
        }
        self.texture.update_region(region, data)
    }
}
