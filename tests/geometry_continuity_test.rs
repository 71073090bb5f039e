//! Edge continuity and determinism of the illusion geometry

use nalgebra::Point3;
use parallax_diorama::{
    geometry::{build_geometry, FaceName, GeometryManager, IllusionMode},
    projection::ScreenGeometry,
    texture::{project_geometry, world_to_uv},
};

const TOL: f64 = 1e-12;

fn screen() -> ScreenGeometry {
    ScreenGeometry::from_viewport(1920, 1080).unwrap()
}

fn assert_close(a: &Point3<f64>, b: &Point3<f64>, what: &str) {
    assert!((a - b).norm() < TOL, "{what}: {a:?} != {b:?}");
}

/// Index into `Face::edge_midpoints()`: bottom, right, top, left
const BOTTOM: usize = 0;
const RIGHT: usize = 1;
const TOP: usize = 2;
const LEFT: usize = 3;

#[test]
fn test_protrude_side_faces_share_front_edges() {
    for (s, d) in [(0.6, 0.6), (0.3, 1.2), (1.9, 0.05)] {
        let geometry = build_geometry(IllusionMode::Protrude, s, d, &screen()).unwrap();
        let front = geometry.face(FaceName::Front).unwrap().edge_midpoints();

        let front_edge = |name: FaceName| match name {
            FaceName::Top => front[TOP],
            FaceName::Bottom => front[BOTTOM],
            FaceName::Right => front[RIGHT],
            FaceName::Left => front[LEFT],
            _ => unreachable!(),
        };

        for name in [FaceName::Top, FaceName::Bottom, FaceName::Right, FaceName::Left] {
            let side = geometry.face(name).unwrap();
            let target = front_edge(name);
            let shared = side
                .edge_midpoints()
                .into_iter()
                .find(|m| (m - target).norm() < TOL)
                .unwrap_or_else(|| panic!("{name:?} has no edge on the front face for s={s}, d={d}"));
            assert_close(&shared, &target, &format!("{name:?}"));
        }
    }
}

#[test]
fn test_protrude_corners_meet_without_gaps() {
    let geometry = build_geometry(IllusionMode::Protrude, 0.8, 0.4, &screen()).unwrap();
    let front_corners = geometry.face(FaceName::Front).unwrap().corners();

    // Every front corner is also a corner of two side faces
    for corner in &front_corners {
        let touching = geometry.faces[1..]
            .iter()
            .filter(|side| side.corners().iter().any(|c| (c - corner).norm() < TOL))
            .count();
        assert_eq!(touching, 2, "front corner {corner:?}");
    }
}

#[test]
fn test_recede_walls_meet_back_and_aperture() {
    let geometry = build_geometry(IllusionMode::Recede, 0.7, 0.9, &screen()).unwrap();
    let back = geometry.face(FaceName::Back).unwrap().edge_midpoints();
    let h = geometry.lateral_size / 2.0;
    let aperture = [
        Point3::new(0.0, -h, 0.0),
        Point3::new(h, 0.0, 0.0),
        Point3::new(0.0, h, 0.0),
        Point3::new(-h, 0.0, 0.0),
    ];

    for (name, edge) in [
        (FaceName::Bottom, BOTTOM),
        (FaceName::Right, RIGHT),
        (FaceName::Top, TOP),
        (FaceName::Left, LEFT),
    ] {
        let mids = geometry.face(name).unwrap().edge_midpoints();
        assert!(mids.iter().any(|m| (m - back[edge]).norm() < TOL), "{name:?} misses the back face");
        assert!(mids.iter().any(|m| (m - aperture[edge]).norm() < TOL), "{name:?} misses the aperture");
    }

    // The aperture in the backdrop mesh has exactly the wall footprint
    let backdrop = geometry.backdrop.mesh();
    for corner in [(-h, -h), (h, -h), (h, h), (-h, h)] {
        let point = Point3::new(corner.0, corner.1, 0.0);
        assert!(backdrop.positions.iter().any(|p| (p - point).norm() < TOL));
    }
}

#[test]
fn test_rebuild_is_deterministic() {
    for mode in [IllusionMode::Protrude, IllusionMode::Recede] {
        let mut manager = GeometryManager::new(mode, 0.6, 0.6, &screen()).unwrap();
        let first = manager.apply_mode(mode, 0.45, 0.8, &screen()).unwrap().clone();
        let second = manager.apply_mode(mode, 0.45, 0.8, &screen()).unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(project_geometry(&first), project_geometry(&second));
    }
}

#[test]
fn test_mode_round_trip_restores_geometry() {
    let mut manager = GeometryManager::new(IllusionMode::Protrude, 0.6, 0.5, &screen()).unwrap();
    let original = manager.current().clone();

    manager.set_mode(IllusionMode::Recede).unwrap();
    manager.set_mode(IllusionMode::Protrude).unwrap();

    assert_eq!(manager.current(), &original);
    assert_eq!(manager.generation(), 2);
}

#[test]
fn test_side_wall_uvs_continue_backdrop_image() {
    let screen = screen();
    let geometry = build_geometry(IllusionMode::Protrude, 0.6, 0.6, &screen).unwrap();
    let scene = project_geometry(&geometry);

    // Where a wall meets the screen, its UV equals the backdrop UV underneath
    for (name, mesh) in &scene.faces {
        for (position, uv) in mesh.positions.iter().zip(&mesh.uvs) {
            if position.z.abs() < TOL {
                let under = world_to_uv(&Point3::new(position.x, position.y, 0.0), &screen);
                assert!((uv[0] - under[0]).abs() < TOL && (uv[1] - under[1]).abs() < TOL, "{name:?}");
            }
        }
    }
}
