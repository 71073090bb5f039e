//! Illusion geometry: the backdrop plane plus a protruding box or a receding cavity.
//!
//! Geometry is built from scratch by [`build_geometry`] and never patched in
//! place. [`GeometryManager`] builds the replacement first and swaps it in
//! only once it is complete.

use crate::{projection::ScreenGeometry, Error, Result};
use log::{debug, info};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

/// Which illusion is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IllusionMode {
    /// Box growing out of the screen toward the viewer
    Protrude,
    /// Cavity sunk behind the screen
    Recede,
}

impl Default for IllusionMode {
    fn default() -> Self {
        Self::Protrude
    }
}

impl FromStr for IllusionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "protrude" | "box" | "out" => Ok(Self::Protrude),
            "recede" | "hole" | "in" => Ok(Self::Recede),
            other => Err(Error::InvalidInput(format!("Unknown illusion mode: {other}"))),
        }
    }
}

impl fmt::Display for IllusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protrude => write!(f, "protrude"),
            Self::Recede => write!(f, "recede"),
        }
    }
}

/// Face identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceName {
    Front,
    Back,
    Top,
    Bottom,
    Left,
    Right,
}

/// Triangle mesh in world space
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Point3<f64>>,
    /// One entry per position; zero until the texture projector fills them
    pub uvs: Vec<[f64; 2]>,
    pub indices: Vec<[u32; 3]>,
}

impl Mesh {
    fn new(positions: Vec<Point3<f64>>, indices: Vec<[u32; 3]>) -> Self {
        let uvs = vec![[0.0; 2]; positions.len()];
        Self { positions, uvs, indices }
    }

    /// Unique undirected edges, in first-seen order
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = Vec::new();
        for tri in &self.indices {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let (a, b) = (a as usize, b as usize);
                let key = (a.min(b), a.max(b));
                if !edges.contains(&key) {
                    edges.push(key);
                }
            }
        }
        edges
    }
}

/// Unit-square local coordinates of a face's corners: bottom-left first, counter-clockwise
const LOCAL_CORNERS: [(f64, f64); 4] = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

/// Midpoints of the bottom, right, top and left edges
const LOCAL_EDGE_MIDPOINTS: [(f64, f64); 4] = [(0.0, -0.5), (0.5, 0.0), (0.0, 0.5), (-0.5, 0.0)];

/// A rectangular plane: unit square in local XY, scaled, rotated, then translated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub name: FaceName,
    pub position: Point3<f64>,
    pub rotation: UnitQuaternion<f64>,
    /// Local X extent
    pub width: f64,
    /// Local Y extent
    pub height: f64,
}

impl Face {
    fn new(name: FaceName, position: Point3<f64>, rotation: UnitQuaternion<f64>, width: f64, height: f64) -> Self {
        Self {
            name,
            position,
            rotation,
            width,
            height,
        }
    }

    /// World position of the local unit-square point `(u, v)`
    pub fn local_to_world(&self, u: f64, v: f64) -> Point3<f64> {
        self.position + self.rotation * Vector3::new(u * self.width, v * self.height, 0.0)
    }

    pub fn corners(&self) -> [Point3<f64>; 4] {
        LOCAL_CORNERS.map(|(u, v)| self.local_to_world(u, v))
    }

    pub fn edge_midpoints(&self) -> [Point3<f64>; 4] {
        LOCAL_EDGE_MIDPOINTS.map(|(u, v)| self.local_to_world(u, v))
    }

    /// Visible side of the face
    pub fn normal(&self) -> Vector3<f64> {
        self.rotation * Vector3::z()
    }

    pub fn mesh(&self) -> Mesh {
        Mesh::new(self.corners().to_vec(), vec![[0, 1, 2], [0, 2, 3]])
    }
}

/// The screen plane, optionally with a centered square aperture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backdrop {
    pub width: f64,
    pub height: f64,
    /// Side length of the cut-out, present only for receding geometry
    pub aperture: Option<f64>,
}

impl Backdrop {
    pub fn mesh(&self) -> Mesh {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let outer = vec![
            Point3::new(-hw, -hh, 0.0),
            Point3::new(hw, -hh, 0.0),
            Point3::new(hw, hh, 0.0),
            Point3::new(-hw, hh, 0.0),
        ];

        match self.aperture {
            None => Mesh::new(outer, vec![[0, 1, 2], [0, 2, 3]]),
            Some(side) => {
                let h = side / 2.0;
                let mut positions = outer;
                positions.extend([
                    Point3::new(-h, -h, 0.0),
                    Point3::new(h, -h, 0.0),
                    Point3::new(h, h, 0.0),
                    Point3::new(-h, h, 0.0),
                ]);
                // Four strips around the hole, outer corner i pairs with inner corner i + 4
                let indices = (0..4u32)
                    .flat_map(|i| {
                        let next = (i + 1) % 4;
                        [[i, next, next + 4], [i, next + 4, i + 4]]
                    })
                    .collect();
                Mesh::new(positions, indices)
            }
        }
    }
}

/// Complete, immutable description of the active illusion
#[derive(Debug, Clone, PartialEq)]
pub struct IllusionGeometry {
    pub mode: IllusionMode,
    /// Lateral size actually used, after clamping to the backdrop
    pub lateral_size: f64,
    pub depth: f64,
    pub screen: ScreenGeometry,
    pub backdrop: Backdrop,
    pub faces: Vec<Face>,
}

impl IllusionGeometry {
    pub fn face(&self, name: FaceName) -> Option<&Face> {
        self.faces.iter().find(|face| face.name == name)
    }
}

fn rot_x(angle: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle)
}

fn rot_y(angle: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle)
}

/// Build the geometry for `mode` from scratch
///
/// `lateral_size` is clamped to the smaller backdrop dimension so the shape
/// never overhangs the screen.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the size or depth is not a positive finite number
pub fn build_geometry(
    mode: IllusionMode,
    lateral_size: f64,
    depth: f64,
    screen: &ScreenGeometry,
) -> Result<IllusionGeometry> {
    if !(lateral_size.is_finite() && lateral_size > 0.0) {
        return Err(Error::InvalidInput(format!("Lateral size must be positive, got {lateral_size}")));
    }
    if !(depth.is_finite() && depth > 0.0) {
        return Err(Error::InvalidInput(format!("Depth must be positive, got {depth}")));
    }

    let s = lateral_size.min(screen.width).min(screen.height);
    if s < lateral_size {
        debug!("Lateral size {lateral_size} clamped to {s} for a {}x{} backdrop", screen.width, screen.height);
    }
    let d = depth;
    let (hs, hd) = (s / 2.0, d / 2.0);

    // Side walls sit at the half-depth midpoint; the sign of `mid` picks the side of the screen
    let (cap, mid, backdrop) = match mode {
        IllusionMode::Protrude => (
            Face::new(FaceName::Front, Point3::new(0.0, 0.0, d), UnitQuaternion::identity(), s, s),
            hd,
            Backdrop {
                width: screen.width,
                height: screen.height,
                aperture: None,
            },
        ),
        IllusionMode::Recede => (
            Face::new(FaceName::Back, Point3::new(0.0, 0.0, -d), UnitQuaternion::identity(), s, s),
            -hd,
            Backdrop {
                width: screen.width,
                height: screen.height,
                aperture: Some(s),
            },
        ),
    };

    // Protruding walls face outward, receding walls face into the cavity
    let turn = match mode {
        IllusionMode::Protrude => FRAC_PI_2,
        IllusionMode::Recede => -FRAC_PI_2,
    };

    let faces = vec![
        cap,
        Face::new(FaceName::Top, Point3::new(0.0, hs, mid), rot_x(-turn), s, d),
        Face::new(FaceName::Bottom, Point3::new(0.0, -hs, mid), rot_x(turn), s, d),
        Face::new(FaceName::Right, Point3::new(hs, 0.0, mid), rot_y(turn), d, s),
        Face::new(FaceName::Left, Point3::new(-hs, 0.0, mid), rot_y(-turn), d, s),
    ];

    Ok(IllusionGeometry {
        mode,
        lateral_size: s,
        depth: d,
        screen: *screen,
        backdrop,
        faces,
    })
}

/// Owner of the active geometry
pub struct GeometryManager {
    current: IllusionGeometry,
    requested_size: f64,
    generation: u64,
}

impl GeometryManager {
    /// Build the initial geometry
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid
    pub fn new(mode: IllusionMode, lateral_size: f64, depth: f64, screen: &ScreenGeometry) -> Result<Self> {
        let current = build_geometry(mode, lateral_size, depth, screen)?;
        info!("Initial {mode} geometry: size {}, depth {depth}", current.lateral_size);
        Ok(Self {
            current,
            requested_size: lateral_size,
            generation: 0,
        })
    }

    pub const fn current(&self) -> &IllusionGeometry {
        &self.current
    }

    /// Incremented on every successful rebuild
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Rebuild for new parameters; the old geometry stays active on error
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid
    pub fn apply_mode(
        &mut self,
        mode: IllusionMode,
        lateral_size: f64,
        depth: f64,
        screen: &ScreenGeometry,
    ) -> Result<&IllusionGeometry> {
        let next = build_geometry(mode, lateral_size, depth, screen)?;
        self.current = next;
        self.requested_size = lateral_size;
        self.generation += 1;
        debug!(
            "Rebuilt {mode} geometry (generation {}): size {}, depth {depth}",
            self.generation, self.current.lateral_size
        );
        Ok(&self.current)
    }

    /// # Errors
    ///
    /// Returns an error if the current parameters cannot be rebuilt
    pub fn set_mode(&mut self, mode: IllusionMode) -> Result<&IllusionGeometry> {
        let screen = self.current.screen;
        self.apply_mode(mode, self.requested_size, self.current.depth, &screen)
    }

    /// # Errors
    ///
    /// Returns an error if `lateral_size` is invalid
    pub fn set_lateral_size(&mut self, lateral_size: f64) -> Result<&IllusionGeometry> {
        let screen = self.current.screen;
        self.apply_mode(self.current.mode, lateral_size, self.current.depth, &screen)
    }

    /// # Errors
    ///
    /// Returns an error if `depth` is invalid
    pub fn set_depth(&mut self, depth: f64) -> Result<&IllusionGeometry> {
        let screen = self.current.screen;
        self.apply_mode(self.current.mode, self.requested_size, depth, &screen)
    }

    /// Rebuild for a new viewport aspect; the requested size is re-clamped
    ///
    /// # Errors
    ///
    /// Returns an error if the current parameters cannot be rebuilt
    pub fn resize(&mut self, screen: &ScreenGeometry) -> Result<&IllusionGeometry> {
        self.apply_mode(self.current.mode, self.requested_size, self.current.depth, screen)
    }
}
