use crate::geom::Vec3;
use crate::prefs::{Preferences, RenderQuality};
use crate::view::{CameraAngles, ResolutionType, RotStep, StepView};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_RENDER_WIDTH: u32 = 1280;
pub const DEFAULT_RENDER_HEIGHT: u32 = 720;

/// LDView's default camera distance in LDraw units.
pub const LDU_DISTANCE: f64 = 5729.57;
/// Empirical factors LDView applies when it writes a POV scene.
const POV_DISTANCE_FACTOR: f64 = 0.455;
const POV_DISTANCE_SCALE: f64 = 1700.0 / 1000.0;
/// Camera distance factor for perspective projection.
const PERSPECTIVE_DISTANCE_FACTOR: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Orthographic,
    Perspective,
}

/// User-adjustable settings of the render dialog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub quality: RenderQuality,
    pub transparent_background: bool,
}

impl RenderSettings {
    pub fn from_prefs(prefs: &Preferences) -> Self {
        Self {
            width: DEFAULT_RENDER_WIDTH,
            height: DEFAULT_RENDER_HEIGHT,
            quality: prefs.povray_render_quality,
            transparent_background: true,
        }
    }
}

/// Everything needed to render one still image. Built once per render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub width: u32,
    pub height: u32,
    pub quality: RenderQuality,
    pub transparent_background: bool,
    pub camera: CameraAngles,
    pub apply_camera_locally: bool,
    pub target: Vec3,
    pub rotstep: RotStep,
    pub projection: Projection,
    pub fov: f64,
    pub model_scale: f64,
    pub resolution: f64,
    pub resolution_type: ResolutionType,
    pub auto_crop: bool,
    pub output: PathBuf,
}

impl RenderRequest {
    pub fn new(view: &StepView, settings: &RenderSettings, prefs: &Preferences, output: PathBuf) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            quality: settings.quality,
            transparent_background: settings.transparent_background,
            camera: view.camera,
            apply_camera_locally: prefs.apply_ca_locally,
            target: view.target,
            rotstep: view.rotstep,
            projection: if prefs.perspective_projection {
                Projection::Perspective
            } else {
                Projection::Orthographic
            },
            fov: view.fov,
            model_scale: view.model_scale,
            resolution: view.resolution,
            resolution_type: view.resolution_type,
            auto_crop: prefs.povray_auto_crop,
            output,
        }
    }

    /// Camera distance handed to the exporter, in LDraw units.
    pub fn camera_distance(&self) -> i64 {
        let std = std_camera_distance(
            self.width,
            self.model_scale,
            self.resolution,
            self.resolution_type,
        );
        let cd = (std * POV_DISTANCE_FACTOR * POV_DISTANCE_SCALE) as i64;
        match self.projection {
            Projection::Perspective => (cd as f64 * PERSPECTIVE_DISTANCE_FACTOR) as i64,
            Projection::Orthographic => cd,
        }
    }

    /// Camera angles passed to the exporter. Zero when the rotation was
    /// already applied to the exported parts.
    pub fn exporter_camera(&self) -> CameraAngles {
        if self.apply_camera_locally {
            CameraAngles::default()
        } else {
            self.camera
        }
    }
}

/// Distance at which a 1x1 brick (20 LDU) spans the image at the given scale.
pub fn std_camera_distance(
    image_width: u32,
    model_scale: f64,
    resolution: f64,
    resolution_type: ResolutionType,
) -> f64 {
    let onexone = 20.0 * resolution_type.ldu() * resolution * model_scale;
    if onexone <= 0.0 {
        return LDU_DISTANCE;
    }
    (f64::from(image_width) / onexone) * LDU_DISTANCE
}

/// Default output image for a step: `<dir>/<model>-step<n>-povray.png`.
pub fn default_output_path(dir: &Path, model: &Path, step_number: u32) -> PathBuf {
    let stem = model
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    dir.join(format!("{stem}-step{step_number}-povray.png"))
}
