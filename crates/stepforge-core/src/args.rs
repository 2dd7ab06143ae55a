//! Command lines for the scene exporter (LDView) and the renderer (POV-Ray).
//!
//! Arguments are kept as an ordered list of keyed descriptors. Choices such as
//! perspective versus orthographic camera are made when the slot is filled,
//! so no flag is ever located or replaced by its rendered text.

use crate::paths::RenderPaths;
use crate::prefs::Preferences;
use crate::request::{Projection, RenderRequest};
use std::fmt;
use std::path::Path;

/// Fixed camera angle that makes LDView's perspective camera effectively
/// orthographic.
pub const ORTHOGRAPHIC_CAMERA_ANGLE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryPath {
    Include,
    Ini,
    LgeoParts,
    LgeoAssemblies,
    LgeoStl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKey {
    // exporter
    CameraAngle,
    CameraGlobe,
    DefaultZoom,
    DefaultLatLong,
    ModelCenter,
    SaveWidth,
    SaveHeight,
    ExportFile,
    LDrawDir,
    LDConfig,
    Model,
    // renderer
    Alpha,
    Display,
    NoOutput,
    Quality,
    Width,
    Height,
    Input,
    SharedMemory,
    Library(LibraryPath),
}

#[derive(Debug, Clone, PartialEq)]
struct Arg {
    key: ArgKey,
    tokens: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgList {
    args: Vec<Arg>,
}

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills `key` with one token. An existing slot keeps its position.
    pub fn set(&mut self, key: ArgKey, token: impl Into<String>) -> &mut Self {
        self.set_many(key, [token.into()])
    }

    pub fn set_many<I, T>(&mut self, key: ArgKey, tokens: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        match self.args.iter_mut().find(|a| a.key == key) {
            Some(arg) => arg.tokens = tokens,
            None => self.args.push(Arg { key, tokens }),
        }
        self
    }

    pub fn set_opt(&mut self, key: ArgKey, token: Option<String>) -> &mut Self {
        if let Some(token) = token {
            self.set(key, token);
        }
        self
    }

    pub fn contains(&self, key: ArgKey) -> bool {
        self.args.iter().any(|a| a.key == key)
    }

    pub fn get(&self, key: ArgKey) -> Option<&[String]> {
        self.args.iter().find(|a| a.key == key).map(|a| a.tokens.as_slice())
    }

    /// Index of the first token of `key` in the flattened argument vector.
    pub fn position(&self, key: ArgKey) -> Option<usize> {
        let mut index = 0;
        for arg in &self.args {
            if arg.key == key {
                return Some(index);
            }
            index += arg.tokens.len();
        }
        None
    }

    pub fn keys(&self) -> Vec<ArgKey> {
        self.args.iter().map(|a| a.key).collect()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.args.iter().flat_map(|a| a.tokens.iter().cloned()).collect()
    }
}

impl fmt::Display for ArgList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_vec().join(" "))
    }
}

/// Arguments that make LDView export the step as a POV-Ray scene.
pub fn exporter_args(req: &RenderRequest, prefs: &Preferences, paths: &RenderPaths) -> ArgList {
    let mut args = ArgList::new();
    let camera = req.exporter_camera();

    match req.projection {
        Projection::Perspective => args.set(ArgKey::CameraAngle, format!("-FOV={}", req.fov)),
        Projection::Orthographic => {
            args.set(ArgKey::CameraAngle, format!("-ca{ORTHOGRAPHIC_CAMERA_ANGLE}"))
        }
    };

    if req.target.is_zero() {
        args.set(
            ArgKey::CameraGlobe,
            format!(
                "-cg{},{},{}",
                camera.latitude,
                camera.longitude,
                req.camera_distance()
            ),
        );
    } else {
        // An explicit target replaces the camera globe.
        args.set(ArgKey::DefaultZoom, format!("-DefaultZoom={}", req.model_scale));
        args.set(
            ArgKey::DefaultLatLong,
            format!("-DefaultLatLong={},{}", camera.latitude, camera.longitude),
        );
        args.set(
            ArgKey::ModelCenter,
            format!("-ModelCenter={},{},{}", req.target.x, req.target.y, req.target.z),
        );
    }

    args.set(ArgKey::SaveWidth, format!("-SaveWidth={}", req.width));
    args.set(ArgKey::SaveHeight, format!("-SaveHeight={}", req.height));
    args.set(ArgKey::ExportFile, format!("-ExportFile={}", paths.scene_file().display()));
    args.set_opt(
        ArgKey::LDrawDir,
        prefs
            .ldraw_lib_path
            .as_deref()
            .map(|p| format!("-LDrawDir={}", p.display())),
    );
    args.set_opt(
        ArgKey::LDConfig,
        prefs
            .alt_ldconfig_path
            .as_deref()
            .map(|p| format!("-LDConfig={}", p.display())),
    );
    args.set(ArgKey::Model, paths.model_file().display().to_string());
    args
}

/// Arguments for POV-Ray, rendering into the shared progress buffer.
pub fn renderer_args(req: &RenderRequest, prefs: &Preferences, paths: &RenderPaths) -> ArgList {
    let mut args = ArgList::new();

    if req.transparent_background {
        args.set(ArgKey::Alpha, "+UA");
    }
    args.set(ArgKey::Display, "+D");
    args.set(ArgKey::NoOutput, "-O-");
    args.set_many(ArgKey::Quality, req.quality.povray_flags().iter().copied());
    args.set(ArgKey::Width, format!("+W{}", req.width));
    args.set(ArgKey::Height, format!("+H{}", req.height));
    args.set(ArgKey::Input, format!("+I{}", quoted(&paths.scene_file())));
    args.set(ArgKey::SharedMemory, format!("+SM{}", quoted(&paths.map_file)));

    for (key, dir) in library_paths(prefs) {
        args.set(ArgKey::Library(key), format!("+L{}", quoted(&dir)));
    }
    args
}

/// Library search paths in the order POV-Ray should see them.
fn library_paths(prefs: &Preferences) -> Vec<(LibraryPath, std::path::PathBuf)> {
    let mut paths = Vec::new();
    if let Some(inc) = &prefs.povray_inc_path {
        paths.push((LibraryPath::Include, inc.clone()));
    }
    if let Some(ini) = &prefs.povray_ini_path {
        paths.push((LibraryPath::Ini, ini.clone()));
    }
    if let Some(lgeo) = &prefs.lgeo_path {
        paths.push((LibraryPath::LgeoParts, lgeo.join("lg")));
        paths.push((LibraryPath::LgeoAssemblies, lgeo.join("ar")));
        if prefs.lgeo_stl_lib {
            paths.push((LibraryPath::LgeoStl, lgeo.join("stl")));
        }
    }
    paths
}

fn quoted(path: &Path) -> String {
    format!("\"{}\"", path.display())
}
