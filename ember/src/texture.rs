//! Texture assets consumed by render passes.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use image::RgbaImage;

use crate::backend::{GraphicsBackend, TextureDesc, TextureId, TextureUsage};
use crate::error::{RenderError, Result};

/// A backend texture plus its dimensions and provenance.
///
/// Dimensions and handle are fixed for the asset's lifetime. The asset does
/// not own a backend reference, so it must be [`release`](Self::release)d
/// explicitly.
#[derive(Debug)]
pub struct TextureAsset {
    handle: TextureId,
    width: u32,
    height: u32,
    filename: Option<PathBuf>,
    staging: Option<RgbaImage>,
    released: bool,
}

impl TextureAsset {
    /// Upload raw RGBA8 pixels.
    pub fn from_rgba<B: GraphicsBackend + ?Sized>(
        backend: &mut B,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<Self> {
        let handle = create(backend, label, width, height, TextureUsage::Sampled, Some(rgba))?;
        Ok(Self::new(handle, width, height))
    }

    /// Upload a decoded image, keeping it as the staging surface.
    pub fn from_image<B: GraphicsBackend + ?Sized>(
        backend: &mut B,
        label: &str,
        image: RgbaImage,
    ) -> Result<Self> {
        let (width, height) = image.dimensions();
        let handle = create(
            backend,
            label,
            width,
            height,
            TextureUsage::Sampled,
            Some(image.as_raw().as_slice()),
        )?;
        Ok(Self {
            staging: Some(image),
            ..Self::new(handle, width, height)
        })
    }

    /// Decode an encoded image (PNG) and upload it.
    pub fn from_bytes<B: GraphicsBackend + ?Sized>(
        backend: &mut B,
        label: &str,
        bytes: &[u8],
    ) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| RenderError::Texture(format!("failed to decode '{label}': {e}")))?
            .to_rgba8();
        Self::from_image(backend, label, image)
    }

    /// Read, decode and upload an image file.
    pub fn load<B: GraphicsBackend + ?Sized>(backend: &mut B, path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| RenderError::ResourceRead {
            path: path.to_path_buf(),
            source,
        })?;
        let label = path.display().to_string();
        let asset = Self::from_bytes(backend, &label, &bytes)?;
        log::debug!("loaded texture {label} ({}x{})", asset.width, asset.height);
        Ok(Self {
            filename: Some(path.to_path_buf()),
            ..asset
        })
    }

    /// Allocate a depth attachment.
    pub fn depth<B: GraphicsBackend + ?Sized>(
        backend: &mut B,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let handle = create(backend, label, width, height, TextureUsage::DepthAttachment, None)?;
        Ok(Self::new(handle, width, height))
    }

    fn new(handle: TextureId, width: u32, height: u32) -> Self {
        Self {
            handle,
            width,
            height,
            filename: None,
            staging: None,
            released: false,
        }
    }

    /// Destroy the backend texture. Later calls do nothing.
    pub fn release<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        backend.destroy_texture(self.handle);
        self.staging = None;
    }

    pub fn handle(&self) -> TextureId {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size in pixels, as used by [`Drawable::sprite`](crate::render::Drawable::sprite).
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// CPU copy of the pixels, if one was kept.
    pub fn staging(&self) -> Option<&RgbaImage> {
        self.staging.as_ref()
    }

    /// Drop the CPU copy of the pixels.
    pub fn discard_staging(&mut self) {
        self.staging = None;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

fn create<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    label: &str,
    width: u32,
    height: u32,
    usage: TextureUsage,
    rgba: Option<&[u8]>,
) -> Result<TextureId> {
    let desc = TextureDesc {
        label,
        width,
        height,
        usage,
    };
    backend.create_texture(&desc, rgba).map_err(|log| {
        log::error!("texture '{label}' creation failed: {log}");
        RenderError::Texture(log)
    })
}
