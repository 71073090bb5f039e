//! Render collaborator seam and a headless wireframe preview renderer.

use crate::{
    projection::{CameraPose, Frustum},
    texture::{Texture, TexturedScene},
    Error, Result,
};
use image::{Rgba, RgbaImage};
use log::{debug, info};
use nalgebra::{Matrix4, Point3};
use std::path::Path;

/// Retained scene the frame loop mutates and then asks to draw
pub trait SceneRenderer {
    /// Update the camera for this frame
    fn set_camera(&mut self, frustum: &Frustum, pose: &CameraPose);

    /// Replace all meshes; `generation` increases with every geometry rebuild
    fn upload_scene(&mut self, scene: &TexturedScene, generation: u64);

    /// Bind the backdrop texture; `revision` increases with every replacement
    fn bind_texture(&mut self, texture: &Texture, revision: u64);

    /// Rasterize the current state
    ///
    /// # Errors
    ///
    /// Returns an error if drawing fails
    fn render(&mut self) -> Result<()>;

    /// Match the output surface to a new viewport
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be recreated
    fn resize(&mut self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }
}

const BACKGROUND: Rgba<u8> = Rgba([8, 8, 12, 255]);
const BACKDROP_LINE: [u8; 4] = [110, 110, 120, 255];
const FACE_LINE: [u8; 4] = [40, 230, 170, 255];

/// NDC range beyond which an edge is not drawn
const NDC_LIMIT: f64 = 8.0;

/// Projects mesh edges into an RGBA canvas
pub struct WireframeRenderer {
    canvas: RgbaImage,
    view_projection: Option<Matrix4<f64>>,
    scene: Option<TexturedScene>,
    texture: Option<Texture>,
    generation: Option<u64>,
    frames_rendered: u64,
}

impl WireframeRenderer {
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty canvas
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!("Canvas must be non-empty, got {width}x{height}")));
        }
        Ok(Self {
            canvas: RgbaImage::from_pixel(width, height, BACKGROUND),
            view_projection: None,
            scene: None,
            texture: None,
            generation: None,
            frames_rendered: 0,
        })
    }

    pub const fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub const fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Geometry generation currently uploaded
    pub const fn generation(&self) -> Option<u64> {
        self.generation
    }

    /// # Errors
    ///
    /// Returns an error if the PNG cannot be written
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.canvas.save(path.as_ref())?;
        debug!("Saved snapshot to {}", path.as_ref().display());
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn to_pixel(&self, view_projection: &Matrix4<f64>, point: &Point3<f64>) -> Option<(i64, i64)> {
        let clip = view_projection * point.to_homogeneous();
        if clip.w <= f64::EPSILON {
            return None;
        }
        let (x, y) = (clip.x / clip.w, clip.y / clip.w);
        if x.abs() > NDC_LIMIT || y.abs() > NDC_LIMIT {
            return None;
        }
        let (w, h) = self.canvas.dimensions();
        let px = (x + 1.0) * 0.5 * f64::from(w - 1);
        let py = (1.0 - y) * 0.5 * f64::from(h - 1);
        Some((px.round() as i64, py.round() as i64))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn draw_line(&mut self, from: (i64, i64), to: (i64, i64), color: Rgba<u8>) {
        let (w, h) = self.canvas.dimensions();
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            if (0..i64::from(w)).contains(&x) && (0..i64::from(h)).contains(&y) {
                self.canvas.put_pixel(x as u32, y as u32, color);
            }
            if x == to.0 && y == to.1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn line_color(&self, base: [u8; 4], uv: [f64; 2]) -> Rgba<u8> {
        let tint = self.texture.as_ref().map_or(base, |t| t.sample(uv));
        let mut out = [0u8; 4];
        for (i, channel) in out.iter_mut().enumerate().take(3) {
            *channel = ((u16::from(base[i]) + u16::from(tint[i])) / 2) as u8;
        }
        out[3] = 255;
        Rgba(out)
    }
}

impl SceneRenderer for WireframeRenderer {
    fn set_camera(&mut self, frustum: &Frustum, pose: &CameraPose) {
        self.view_projection = Some(frustum.projection_matrix() * pose.view_matrix());
    }

    fn upload_scene(&mut self, scene: &TexturedScene, generation: u64) {
        if self.generation != Some(generation) {
            debug!("Uploading geometry generation {generation}");
            self.scene = Some(scene.clone());
            self.generation = Some(generation);
        }
    }

    fn bind_texture(&mut self, texture: &Texture, revision: u64) {
        debug!("Binding texture revision {revision}");
        self.texture = Some(texture.clone());
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!("Canvas must be non-empty, got {width}x{height}")));
        }
        self.canvas = RgbaImage::from_pixel(width, height, BACKGROUND);
        debug!("Canvas resized to {width}x{height}");
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        for pixel in self.canvas.pixels_mut() {
            *pixel = BACKGROUND;
        }
        let (Some(view_projection), Some(scene)) = (self.view_projection, self.scene.take()) else {
            self.frames_rendered += 1;
            return Ok(());
        };

        for (index, mesh) in scene.meshes().enumerate() {
            let base = if index == 0 { BACKDROP_LINE } else { FACE_LINE };
            for (a, b) in mesh.edges() {
                let (Some(from), Some(to)) = (
                    self.to_pixel(&view_projection, &mesh.positions[a]),
                    self.to_pixel(&view_projection, &mesh.positions[b]),
                ) else {
                    continue;
                };
                let uv = [
                    (mesh.uvs[a][0] + mesh.uvs[b][0]) / 2.0,
                    (mesh.uvs[a][1] + mesh.uvs[b][1]) / 2.0,
                ];
                let color = self.line_color(base, uv);
                self.draw_line(from, to, color);
            }
        }

        self.scene = Some(scene);
        self.frames_rendered += 1;
        if self.frames_rendered == 1 {
            let (w, h) = self.canvas.dimensions();
            info!("First wireframe frame rendered at {w}x{h}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{build_geometry, IllusionMode},
        projection::{solve, ScreenGeometry},
        stabilizer::StabilizedHead,
        texture::project_geometry,
    };

    #[test]
    fn test_rejects_empty_canvas() {
        assert!(WireframeRenderer::new(0, 10).is_err());
    }

    #[test]
    fn test_render_without_camera_clears() {
        let mut renderer = WireframeRenderer::new(8, 8).unwrap();
        renderer.render().unwrap();
        assert_eq!(renderer.frames_rendered(), 1);
        assert!(renderer.canvas().pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn test_backdrop_outline_hits_canvas_corners() {
        let screen = ScreenGeometry::from_viewport(64, 36).unwrap();
        let geometry = build_geometry(IllusionMode::Recede, 0.6, 0.6, &screen).unwrap();
        let head = StabilizedHead {
            x: 0.3,
            y: -0.2,
            z: 1.5,
            smoothed_depth: 0.0,
        };
        let (frustum, pose) = solve(&head, &screen, 0.05, 100.0).unwrap();

        let mut renderer = WireframeRenderer::new(64, 36).unwrap();
        renderer.set_camera(&frustum, &pose);
        renderer.upload_scene(&project_geometry(&geometry), 0);
        renderer.render().unwrap();

        for (x, y) in [(0, 0), (63, 0), (0, 35), (63, 35)] {
            assert_ne!(*renderer.canvas().get_pixel(x, y), BACKGROUND, "corner ({x}, {y})");
        }
        assert_eq!(renderer.generation(), Some(0));
    }

    #[test]
    fn test_resize_replaces_canvas() {
        let mut renderer = WireframeRenderer::new(8, 8).unwrap();
        renderer.resize(20, 10).unwrap();
        assert_eq!(renderer.canvas().dimensions(), (20, 10));
        assert!(renderer.resize(0, 10).is_err());
        assert_eq!(renderer.canvas().dimensions(), (20, 10));
    }
}
