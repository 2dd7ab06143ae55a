//! Rotation of step parts before export.
//!
//! Only LDraw type-1 lines (sub-file references) carry a position and an
//! orientation; every other line is written through unchanged.

use crate::view::{CameraAngles, RotStep, RotStepKind};
use nalgebra::{Matrix3, Rotation3, Vector3};
use std::io::Write;
use std::path::Path;

fn axis_rotation(axis: Vector3<f64>, degrees: f64) -> Matrix3<f64> {
    Rotation3::from_axis_angle(&nalgebra::Unit::new_normalize(axis), degrees.to_radians()).into_inner()
}

/// Rotation about X, then Y, then Z, in degrees.
pub fn rotstep_matrix(rotstep: &RotStep) -> Matrix3<f64> {
    axis_rotation(Vector3::x(), rotstep.x)
        * axis_rotation(Vector3::y(), rotstep.y)
        * axis_rotation(Vector3::z(), rotstep.z)
}

/// Model rotation equivalent to viewing from the given latitude/longitude.
pub fn camera_matrix(camera: &CameraAngles) -> Matrix3<f64> {
    axis_rotation(Vector3::x(), camera.latitude) * axis_rotation(Vector3::y(), camera.longitude)
}

/// Combined rotation for a step. Camera angles are folded in only when they
/// are applied locally, and never for an absolute rotstep.
pub fn step_matrix(rotstep: &RotStep, camera: Option<&CameraAngles>) -> Matrix3<f64> {
    let rot = rotstep_matrix(rotstep);
    match (rotstep.kind, camera) {
        (RotStepKind::Rel, Some(camera)) => camera_matrix(camera) * rot,
        _ => rot,
    }
}

/// Applies `m` to one line. Malformed type-1 lines are returned unchanged.
pub fn rotate_line(line: &str, m: &Matrix3<f64>) -> String {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.first() != Some(&"1") || tokens.len() < 15 {
        return line.to_string();
    }
    let mut nums = [0.0f64; 12];
    for (i, tok) in tokens[2..14].iter().enumerate() {
        match tok.parse::<f64>() {
            Ok(v) => nums[i] = v,
            Err(_) => return line.to_string(),
        }
    }

    let pos = m * Vector3::new(nums[0], nums[1], nums[2]);
    let orient = m * Matrix3::new(
        nums[3], nums[4], nums[5], //
        nums[6], nums[7], nums[8], //
        nums[9], nums[10], nums[11],
    );

    let mut out = format!("1 {} {} {} {}", tokens[1], fmt_num(pos.x), fmt_num(pos.y), fmt_num(pos.z));
    for row in 0..3 {
        for col in 0..3 {
            out.push(' ');
            out.push_str(&fmt_num(orient[(row, col)]));
        }
    }
    // File names may contain spaces.
    out.push(' ');
    out.push_str(&tokens[14..].join(" "));
    out
}

pub fn rotate_parts(parts: &[String], m: &Matrix3<f64>) -> Vec<String> {
    parts.iter().map(|line| rotate_line(line, m)).collect()
}

/// Writes the rotated step to `dest`, creating its directory.
pub fn write_rotated_parts(
    parts: &[String],
    dest: &Path,
    rotstep: &RotStep,
    camera: Option<&CameraAngles>,
) -> std::io::Result<usize> {
    let m = step_matrix(rotstep, camera);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::io::BufWriter::new(std::fs::File::create(dest)?);
    for line in rotate_parts(parts, &m) {
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    Ok(parts.len())
}

/// Shortest decimal form with at most six fractional digits.
fn fmt_num(v: f64) -> String {
    let rounded = (v * 1e6).round() / 1e6;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}
