//! Off-axis projection solver.
//!
//! The backdrop is a physical window of `width x height` centered on the
//! `z = 0` plane. The eye sits at the stabilized head position and looks
//! straight down `-z`; only the frustum bounds move, so the window edges
//! always map onto the viewport edges.

use crate::{
    constants::{EYE_DEPTH_EPSILON, REFERENCE_HEIGHT},
    stabilizer::StabilizedHead,
    Error, Result,
};
use nalgebra::{Isometry3, Matrix4, Point3, Translation3, UnitQuaternion};

/// World-space size of the backdrop window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenGeometry {
    pub width: f64,
    pub height: f64,
}

impl ScreenGeometry {
    /// Derive the backdrop size from viewport pixels at the reference height
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if either dimension is zero
    pub fn from_viewport(width_px: u32, height_px: u32) -> Result<Self> {
        if width_px == 0 || height_px == 0 {
            return Err(Error::InvalidInput(format!(
                "Viewport must be non-empty, got {width_px}x{height_px}"
            )));
        }
        let aspect = f64::from(width_px) / f64::from(height_px);
        Ok(Self {
            width: aspect * REFERENCE_HEIGHT,
            height: REFERENCE_HEIGHT,
        })
    }

    /// Width over height
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Backdrop corners in world space: bottom-left, bottom-right, top-right, top-left
    pub fn corners(&self) -> [Point3<f64>; 4] {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        [
            Point3::new(-hw, -hh, 0.0),
            Point3::new(hw, -hh, 0.0),
            Point3::new(hw, hh, 0.0),
            Point3::new(-hw, hh, 0.0),
        ]
    }
}

/// Asymmetric clipping planes, bounds measured on the near plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub near: f64,
    pub far: f64,
}

impl Frustum {
    /// True when `left = -right` and `bottom = -top` within `tolerance`
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        (self.left + self.right).abs() <= tolerance && (self.bottom + self.top).abs() <= tolerance
    }

    /// OpenGL-convention perspective matrix for these bounds (`glFrustum`)
    #[rustfmt::skip]
    pub fn projection_matrix(&self) -> Matrix4<f64> {
        let Self { left: l, right: r, top: t, bottom: b, near: n, far: f } = *self;
        Matrix4::new(
            2.0 * n / (r - l), 0.0,               (r + l) / (r - l),  0.0,
            0.0,               2.0 * n / (t - b), (t + b) / (t - b),  0.0,
            0.0,               0.0,               -(f + n) / (f - n), -2.0 * f * n / (f - n),
            0.0,               0.0,               -1.0,               0.0,
        )
    }
}

/// Camera placement; off-axis cameras translate but never rotate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl CameraPose {
    /// World-to-camera transform
    pub fn view_matrix(&self) -> Matrix4<f64> {
        Isometry3::from_parts(Translation3::from(self.position.coords), self.orientation)
            .inverse()
            .to_homogeneous()
    }
}

/// Solve the asymmetric frustum and camera pose for an eye at `head`
///
/// # Errors
///
/// Returns `Error::InvalidInput` if `near <= 0` or `far <= near`
pub fn solve(head: &StabilizedHead, screen: &ScreenGeometry, near: f64, far: f64) -> Result<(Frustum, CameraPose)> {
    if !(near > 0.0) {
        return Err(Error::InvalidInput(format!("Near plane must be positive, got {near}")));
    }
    if !(far > near) {
        return Err(Error::InvalidInput(format!(
            "Far plane ({far}) must lie beyond the near plane ({near})"
        )));
    }

    let eye_z = head.z.max(EYE_DEPTH_EPSILON);
    let scale = near / eye_z;
    let (hw, hh) = (screen.width / 2.0, screen.height / 2.0);

    let frustum = Frustum {
        left: (-hw - head.x) * scale,
        right: (hw - head.x) * scale,
        bottom: (-hh - head.y) * scale,
        top: (hh - head.y) * scale,
        near,
        far,
    };
    let pose = CameraPose {
        position: Point3::new(head.x, head.y, eye_z),
        orientation: UnitQuaternion::identity(),
    };

    Ok((frustum, pose))
}

/// Project a world point through `projection * view` to normalized device coordinates
pub fn project_to_ndc(frustum: &Frustum, pose: &CameraPose, point: &Point3<f64>) -> Point3<f64> {
    let clip = frustum.projection_matrix() * pose.view_matrix() * point.to_homogeneous();
    Point3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
}
