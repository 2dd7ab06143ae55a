use crate::error::ConfigError;
use crate::geom::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionType {
    Dpi,
    Dpcm,
}

impl ResolutionType {
    /// Size of one LDraw unit in inches (DPI) or centimetres (DPCM).
    pub fn ldu(self) -> f64 {
        match self {
            ResolutionType::Dpi => 1.0 / 64.0,
            ResolutionType::Dpcm => 0.04,
        }
    }

    fn as_key(self) -> &'static str {
        match self {
            ResolutionType::Dpi => "DPI",
            ResolutionType::Dpcm => "DPCM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotStepKind {
    Rel,
    Abs,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotStep {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub kind: RotStepKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraAngles {
    pub latitude: f64,
    pub longitude: f64,
}

/// Viewer configuration of one step, as carried by its `_`-separated key:
/// `step_width_resolution_type_scale_fov_lat_lon_tx_ty_tz_rx_ry_rz_kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepView {
    pub step_number: u32,
    pub image_width: u32,
    pub resolution: f64,
    pub resolution_type: ResolutionType,
    pub model_scale: f64,
    pub fov: f64,
    pub camera: CameraAngles,
    pub target: Vec3,
    pub rotstep: RotStep,
}

const KEY_FIELDS: usize = 15;

impl Default for StepView {
    fn default() -> Self {
        Self {
            step_number: 1,
            image_width: 800,
            resolution: 150.0,
            resolution_type: ResolutionType::Dpi,
            model_scale: 1.0,
            fov: 30.0,
            camera: CameraAngles {
                latitude: 30.0,
                longitude: 45.0,
            },
            target: Vec3::default(),
            rotstep: RotStep {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                kind: RotStepKind::Rel,
            },
        }
    }
}

impl FromStr for StepView {
    type Err = ConfigError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let err = |message: String| ConfigError::ViewKey {
            key: key.to_string(),
            message,
        };
        // Composite viewer keys carry the view after the last ';'.
        let fields: Vec<&str> = key.rsplit(';').next().unwrap_or("").split('_').collect();
        if fields.len() != KEY_FIELDS {
            return Err(err(format!("expected {KEY_FIELDS} fields, found {}", fields.len())));
        }

        let num = |i: usize| -> Result<f64, ConfigError> {
            fields[i]
                .trim()
                .parse::<f64>()
                .map_err(|e| err(format!("field {i} ({:?}): {e}", fields[i])))
        };
        let int = |i: usize| -> Result<u32, ConfigError> {
            fields[i]
                .trim()
                .parse::<u32>()
                .map_err(|e| err(format!("field {i} ({:?}): {e}", fields[i])))
        };

        let resolution_type = match fields[3].trim().to_ascii_uppercase().as_str() {
            "DPI" => ResolutionType::Dpi,
            "DPCM" => ResolutionType::Dpcm,
            other => return Err(err(format!("unknown resolution type {other:?}"))),
        };
        let kind = match fields[14].trim().to_ascii_uppercase().as_str() {
            "REL" => RotStepKind::Rel,
            "ABS" => RotStepKind::Abs,
            other => return Err(err(format!("unknown rotstep type {other:?}"))),
        };

        Ok(StepView {
            step_number: int(0)?,
            image_width: int(1)?,
            resolution: num(2)?,
            resolution_type,
            model_scale: num(4)?,
            fov: num(5)?,
            camera: CameraAngles {
                latitude: num(6)?,
                longitude: num(7)?,
            },
            target: Vec3::new(num(8)?, num(9)?, num(10)?),
            rotstep: RotStep {
                x: num(11)?,
                y: num(12)?,
                z: num(13)?,
                kind,
            },
        })
    }
}

impl fmt::Display for StepView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.rotstep.kind {
            RotStepKind::Rel => "REL",
            RotStepKind::Abs => "ABS",
        };
        write!(
            f,
            "{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}",
            self.step_number,
            self.image_width,
            self.resolution,
            self.resolution_type.as_key(),
            self.model_scale,
            self.fov,
            self.camera.latitude,
            self.camera.longitude,
            self.target.x,
            self.target.y,
            self.target.z,
            self.rotstep.x,
            self.rotstep.y,
            self.rotstep.z,
            kind
        )
    }
}
