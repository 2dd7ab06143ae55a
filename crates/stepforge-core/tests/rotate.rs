use nalgebra::Matrix3;
use stepforge_core::rotate::{rotate_line, step_matrix, write_rotated_parts};
use stepforge_core::view::{CameraAngles, RotStep, RotStepKind};

fn rotstep(x: f64, y: f64, z: f64, kind: RotStepKind) -> RotStep {
    RotStep { x, y, z, kind }
}

const BRICK: &str = "1 4 10 20 30 1 0 0 0 1 0 0 0 1 3001.dat";

#[test]
fn identity_keeps_part_line() {
    let m = step_matrix(&rotstep(0.0, 0.0, 0.0, RotStepKind::Rel), None);
    assert_eq!(BRICK, rotate_line(BRICK, &m));
}

#[test]
fn rotates_position_and_orientation() {
    let m = step_matrix(&rotstep(0.0, 90.0, 0.0, RotStepKind::Rel), None);
    assert_eq!(
        "1 4 30 20 -10 0 0 1 0 1 0 -1 0 0 3001.dat",
        rotate_line(BRICK, &m)
    );
}

#[test]
fn other_lines_pass_through() {
    let m = step_matrix(&rotstep(0.0, 90.0, 0.0, RotStepKind::Rel), None);
    for line in [
        "0 STEP",
        "2 24 0 0 0 10 0 0",
        "1 4 a b c 1 0 0 0 1 0 0 0 1 3001.dat",
        "1 4 10 20",
        "",
    ] {
        assert_eq!(line, rotate_line(line, &m));
    }
}

#[test]
fn keeps_file_names_with_spaces() {
    let m = Matrix3::identity();
    let line = "1 4 0 0 0 1 0 0 0 1 0 0 0 1 my sub model.ldr";
    assert_eq!(line, rotate_line(line, &m));
}

#[test]
fn camera_applies_only_to_relative_rotstep() {
    let camera = CameraAngles {
        latitude: 30.0,
        longitude: 45.0,
    };
    let abs = step_matrix(&rotstep(0.0, 0.0, 0.0, RotStepKind::Abs), Some(&camera));
    assert_eq!(Matrix3::identity(), abs);

    let rel = step_matrix(&rotstep(0.0, 0.0, 0.0, RotStepKind::Rel), Some(&camera));
    assert!((rel - Matrix3::identity()).norm() > 0.1);
}

#[test]
fn writes_rotated_step_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("tmp").join("step.ldr");
    let parts = vec!["0 FILE main.ldr".to_string(), BRICK.to_string()];
    let count = write_rotated_parts(
        &parts,
        &dest,
        &rotstep(0.0, 90.0, 0.0, RotStepKind::Rel),
        None,
    )
    .unwrap();
    assert_eq!(2, count);

    let text = std::fs::read_to_string(&dest).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        vec!["0 FILE main.ldr", "1 4 30 20 -10 0 0 1 0 1 0 -1 0 0 3001.dat"],
        lines
    );
}
