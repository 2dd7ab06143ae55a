use crate::error::ConfigError;
use crate::open_with::DEFAULT_MAX_OPEN_WITH_PROGRAMS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    #[default]
    High,
    Medium,
    Low,
}

impl RenderQuality {
    pub const ALL: [RenderQuality; 3] = [RenderQuality::High, RenderQuality::Medium, RenderQuality::Low];

    /// POV-Ray flags for this preset, one flag per argument.
    pub fn povray_flags(self) -> &'static [&'static str] {
        match self {
            RenderQuality::High => &["+Q11", "+R3", "+A0.1", "+J0.5"],
            RenderQuality::Medium => &["+Q5", "+A0.1"],
            RenderQuality::Low => &["+Q2"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RenderQuality::High => "High",
            RenderQuality::Medium => "Medium",
            RenderQuality::Low => "Low",
        }
    }
}

impl std::str::FromStr for RenderQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(RenderQuality::High),
            "medium" => Ok(RenderQuality::Medium),
            "low" => Ok(RenderQuality::Low),
            other => Err(format!("unknown render quality: {other}")),
        }
    }
}

/// Application preferences. Passed explicitly to the session and the render
/// coordinator; nothing reads them from global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub ldview_exe: Option<PathBuf>,
    pub povray_exe: Option<PathBuf>,
    pub ldraw_lib_path: Option<PathBuf>,
    pub alt_ldconfig_path: Option<PathBuf>,
    pub povray_ini_path: Option<PathBuf>,
    pub povray_inc_path: Option<PathBuf>,
    pub lgeo_path: Option<PathBuf>,
    pub lgeo_stl_lib: bool,
    pub perspective_projection: bool,
    pub apply_ca_locally: bool,
    pub povray_auto_crop: bool,
    pub povray_render_quality: RenderQuality,
    pub show_save_on_redraw: bool,
    pub show_save_on_update: bool,
    pub max_recent_files: usize,
    pub max_open_with_programs: usize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            ldview_exe: None,
            povray_exe: None,
            ldraw_lib_path: None,
            alt_ldconfig_path: None,
            povray_ini_path: None,
            povray_inc_path: None,
            lgeo_path: None,
            lgeo_stl_lib: false,
            perspective_projection: false,
            apply_ca_locally: true,
            povray_auto_crop: false,
            povray_render_quality: RenderQuality::High,
            show_save_on_redraw: true,
            show_save_on_update: true,
            max_recent_files: 8,
            max_open_with_programs: DEFAULT_MAX_OPEN_WITH_PROGRAMS,
        }
    }
}

impl Preferences {
    /// Loads preferences from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no preferences at {path:?}, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
