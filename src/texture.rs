//! Screen-space texture projection and the backdrop texture slot.
//!
//! Every vertex takes its UV from where it sits over the backdrop, not from
//! its own face, so one image reads as painted onto the window and wraps
//! across the illusion's walls without seams.

use crate::{
    constants::REFERENCE_HEIGHT,
    geometry::{FaceName, IllusionGeometry, Mesh},
    projection::ScreenGeometry,
    Error, Result,
};
use image::RgbaImage;
use log::{info, warn};
use nalgebra::Point3;
use std::path::Path;

/// Backdrop texture coordinate of a world point (orthographic along `-z`)
pub fn world_to_uv(point: &Point3<f64>, screen: &ScreenGeometry) -> [f64; 2] {
    [
        point.x / (screen.aspect() * REFERENCE_HEIGHT) + 0.5,
        point.y / REFERENCE_HEIGHT + 0.5,
    ]
}

/// Overwrite the UVs of `mesh` from its vertex positions
pub fn project_uv(mesh: &mut Mesh, screen: &ScreenGeometry) {
    mesh.uvs = mesh.positions.iter().map(|p| world_to_uv(p, screen)).collect();
}

/// Meshes of the active geometry, ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct TexturedScene {
    pub backdrop: Mesh,
    pub faces: Vec<(FaceName, Mesh)>,
}

impl TexturedScene {
    /// All meshes, backdrop first
    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        std::iter::once(&self.backdrop).chain(self.faces.iter().map(|(_, mesh)| mesh))
    }
}

/// Mesh the geometry and project UVs for every vertex
pub fn project_geometry(geometry: &IllusionGeometry) -> TexturedScene {
    let screen = &geometry.screen;

    let mut backdrop = geometry.backdrop.mesh();
    project_uv(&mut backdrop, screen);

    let faces = geometry
        .faces
        .iter()
        .map(|face| {
            let mut mesh = face.mesh();
            project_uv(&mut mesh, screen);
            (face.name, mesh)
        })
        .collect();

    TexturedScene { backdrop, faces }
}

/// Decoded backdrop image
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub image: RgbaImage,
}

impl Texture {
    /// Decode any format the `image` crate recognises
    ///
    /// # Errors
    ///
    /// Returns `Error::TextureError` if the bytes are not a decodable image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| Error::TextureError(format!("Failed to decode texture: {e}")))?;
        let image = decoded.to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::TextureError("Texture has no pixels".to_string()));
        }
        Ok(Self { image })
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Flat single-colour texture used before any image is loaded
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(1, 1, image::Rgba(rgba)),
        }
    }

    /// Nearest-neighbour lookup; `v = 0` is the bottom of the image
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample(&self, uv: [f64; 2]) -> [u8; 4] {
        let (w, h) = self.image.dimensions();
        let u = uv[0].clamp(0.0, 1.0);
        let v = 1.0 - uv[1].clamp(0.0, 1.0);
        let x = ((u * f64::from(w)) as u32).min(w - 1);
        let y = ((v * f64::from(h)) as u32).min(h - 1);
        self.image.get_pixel(x, y).0
    }
}

/// The currently bound backdrop texture
pub struct TextureSlot {
    current: Texture,
    revision: u64,
}

impl TextureSlot {
    pub const fn new(initial: Texture) -> Self {
        Self {
            current: initial,
            revision: 0,
        }
    }

    pub const fn current(&self) -> &Texture {
        &self.current
    }

    /// Incremented whenever a new texture is bound
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Decode and bind `bytes`; on failure the previous texture stays bound
    ///
    /// # Errors
    ///
    /// Returns the decode error after logging it
    pub fn replace(&mut self, bytes: &[u8]) -> Result<&Texture> {
        match Texture::from_bytes(bytes) {
            Ok(texture) => {
                info!(
                    "Bound backdrop texture {}x{}",
                    texture.image.width(),
                    texture.image.height()
                );
                self.current = texture;
                self.revision += 1;
                Ok(&self.current)
            }
            Err(e) => {
                warn!("Keeping previous backdrop texture: {e}");
                Err(e)
            }
        }
    }
}

impl Default for TextureSlot {
    fn default() -> Self {
        Self::new(Texture::solid([32, 32, 32, 255]))
    }
}
