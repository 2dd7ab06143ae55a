//! The open model document: load, save, close, recent files and external
//! change detection.

use crate::error::SessionError;
use crate::open_with::{OpenWithEntry, OpenWithProgram, OpenWithPrograms};
use crate::prefs::Preferences;
use crate::recent::{RecentEntry, RecentFiles};
use crate::report::{elapsed_time, LoadReport};
use crate::settings::Settings;
use crate::strutil::extension_lower;
use crate::watch::ChangeWatcher;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const APP_NAME: &str = "StepForge";
pub const MODEL_EXTENSIONS: [&str; 3] = ["mpd", "ldr", "dat"];

/// Parses and serializes model documents on behalf of the session.
pub trait ModelStore {
    fn load(&mut self, path: &Path) -> Result<(), SessionError>;
    fn save(&self, path: &Path) -> Result<(), SessionError>;
    fn clear(&mut self);
    fn part_count(&self) -> usize;
    fn top_level_file(&self) -> Option<String>;
    /// Files the document pulls in from disk; watched for external changes.
    fn sub_file_paths(&self) -> Vec<PathBuf>;
    /// Lines of the step handed to the renderer.
    fn step_contents(&self) -> Vec<String>;
    fn header_contains(&self, _meta: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChoice {
    Save,
    Discard,
    Cancel,
}

/// What triggered a save check. Redraw and update checks can be switched off
/// in the preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveSender {
    #[default]
    User,
    Redraw,
    Update,
}

/// User decisions the session needs while it runs.
pub trait SessionPrompt {
    fn save_changes(&mut self, sender: SaveSender) -> SaveChoice;
    /// Destination for saving a document that has no file yet.
    fn save_path(&mut self, current: Option<&Path>) -> Option<PathBuf>;
    fn reload_changed(&mut self, path: &Path) -> bool;
}

pub fn is_model_file(path: &Path) -> bool {
    MODEL_EXTENSIONS.contains(&extension_lower(path).as_str())
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Ask before saving; otherwise modified documents are saved silently.
    pub interactive: bool,
    pub show_save_on_redraw: bool,
    pub show_save_on_update: bool,
    pub max_recent_files: usize,
    pub max_open_with_programs: usize,
    pub watch_files: bool,
    pub settings_path: Option<PathBuf>,
}

impl SessionConfig {
    pub fn from_prefs(prefs: &Preferences, settings_path: Option<PathBuf>) -> Self {
        Self {
            interactive: true,
            show_save_on_redraw: prefs.show_save_on_redraw,
            show_save_on_update: prefs.show_save_on_update,
            max_recent_files: prefs.max_recent_files,
            max_open_with_programs: prefs.max_open_with_programs,
            watch_files: true,
            settings_path,
        }
    }
}

pub struct DocumentSession<S> {
    store: S,
    config: SessionConfig,
    settings: Settings,
    recent: RecentFiles,
    open_with: OpenWithPrograms,
    current: Option<PathBuf>,
    modified: bool,
    display_page: u32,
    watcher: Option<ChangeWatcher>,
}

impl<S: ModelStore> DocumentSession<S> {
    pub fn new(store: S, config: SessionConfig) -> Result<Self, SessionError> {
        let settings = match &config.settings_path {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        let recent = RecentFiles::new(settings.recent_files.clone(), config.max_recent_files);
        let open_with = OpenWithPrograms::new(
            settings.open_with_programs.clone(),
            config.max_open_with_programs,
        );
        let watcher = if config.watch_files {
            match ChangeWatcher::new() {
                Ok(watcher) => Some(watcher),
                Err(err) => {
                    log::warn!("file change detection disabled: {err}");
                    None
                }
            }
        } else {
            None
        };
        Ok(Self {
            store,
            config,
            settings,
            recent,
            open_with,
            current: None,
            modified: false,
            display_page: 1,
            watcher,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn display_page(&self) -> u32 {
        self.display_page
    }

    /// Keeps `page` so the next `load_file` opens on it.
    pub fn save_display_page(&mut self, page: u32) -> Result<(), SessionError> {
        self.settings.saved_display_page = Some(page);
        self.persist()
    }

    pub fn window_title(&self) -> String {
        let name = self
            .current
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| APP_NAME.to_string());
        let marker = if self.modified { "*" } else { "" };
        format!("{name}{marker} - {APP_NAME} v{}", env!("CARGO_PKG_VERSION"))
    }

    pub fn recent_files(&self) -> Vec<RecentEntry> {
        self.recent.entries()
    }

    /// Drops recent entries that no longer exist on disk.
    pub fn refresh_recent(&mut self) -> Result<(), SessionError> {
        if self.recent.prune_missing() > 0 {
            self.persist()?;
        }
        Ok(())
    }

    pub fn clear_recent(&mut self) -> Result<(), SessionError> {
        self.recent.clear();
        self.persist()
    }

    /// Folder of the open model, for showing in the file manager.
    pub fn working_folder(&self) -> Option<PathBuf> {
        let current = self.current.as_deref()?;
        let dir = current.parent().filter(|d| !d.as_os_str().is_empty())?;
        Some(std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()))
    }

    pub fn open_with_programs(&self) -> Vec<OpenWithEntry> {
        self.open_with.entries()
    }

    /// Drops programs that no longer exist. Returns how many went.
    pub fn refresh_open_with(&mut self) -> Result<usize, SessionError> {
        let pruned = self.open_with.prune_missing();
        if pruned > 0 {
            self.persist()?;
        }
        Ok(pruned)
    }

    /// Returns `false` when the list is already full.
    pub fn add_open_with_program(&mut self, program: OpenWithProgram) -> Result<bool, SessionError> {
        if !self.open_with.add(program) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn remove_open_with_program(&mut self, index: usize) -> Result<(), SessionError> {
        self.open_with
            .remove(index)
            .ok_or(SessionError::NoOpenWithProgram { index })?;
        self.persist()
    }

    /// Hands the open model to an external program and returns its pid.
    pub fn open_with(&self, index: usize) -> Result<u32, SessionError> {
        let program = self
            .open_with
            .get(index)
            .ok_or(SessionError::NoOpenWithProgram { index })?;
        let current = self.current.as_deref().ok_or(SessionError::NoDocument)?;
        let pid = program.launch(current).map_err(|source| SessionError::Launch {
            program: program.path.clone(),
            source,
        })?;
        let name = program
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("Launched external application {name}...");
        Ok(pid)
    }

    /// Opens a model picked or dropped by the user, offering to save the
    /// current one first.
    /// `Ok(None)` when the user cancelled.
    pub fn open(
        &mut self,
        path: &Path,
        prompt: &mut dyn SessionPrompt,
    ) -> Result<Option<LoadReport>, SessionError> {
        if !self.maybe_save(true, SaveSender::User, prompt)? {
            return Ok(None);
        }
        if !is_model_file(path) {
            return Err(SessionError::UnsupportedExtension {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(SessionError::NotFound {
                path: path.to_path_buf(),
            });
        }
        self.settings.projects_path = path.parent().map(Path::to_path_buf);
        self.open_file(path).map(Some)
    }

    pub fn open_recent(
        &mut self,
        index: usize,
        prompt: &mut dyn SessionPrompt,
    ) -> Result<Option<LoadReport>, SessionError> {
        let path = self
            .recent
            .get(index)
            .map(Path::to_path_buf)
            .ok_or(SessionError::NoRecentFile { index })?;
        if !self.maybe_save(true, SaveSender::User, prompt)? {
            return Ok(None);
        }
        self.open_file(&path).map(Some)
    }

    /// Loads without prompting and restores a saved display page.
    pub fn load_file(&mut self, path: &Path) -> Result<LoadReport, SessionError> {
        if !path.is_file() {
            return Err(SessionError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let report = self.open_file(path)?;
        if let Some(page) = self.settings.saved_display_page.take() {
            self.display_page = page.max(1);
            self.persist()?;
        }
        Ok(report)
    }

    pub fn load_last_opened(&mut self) -> Result<Option<LoadReport>, SessionError> {
        self.refresh_recent()?;
        match self.recent.first().map(Path::to_path_buf) {
            Some(path) => self.load_file(&path).map(Some),
            None => Ok(None),
        }
    }

    fn open_file(&mut self, path: &Path) -> Result<LoadReport, SessionError> {
        let started = Instant::now();
        self.unwatch();
        self.close_file();
        log::info!("Loading LDraw model file {}...", path.display());
        if let Err(err) = self.store.load(path) {
            log::info!("Load LDraw model file {} aborted.", path.display());
            self.close();
            return Err(err);
        }
        self.display_page = 1;
        self.current = Some(path.to_path_buf());
        self.modified = false;
        self.remember(path)?;
        self.watch();

        let fade_steps = self.store.header_contains("FADE TRUE");
        let highlight_step = self.store.header_contains("HIGHLIGHT TRUE");
        if fade_steps {
            log::info!("Fade Previous Steps is ON.");
        }
        if highlight_step {
            log::info!("Highlight Current Step is ON.");
        }

        let elapsed = started.elapsed();
        let part_count = self.store.part_count();
        log::info!("File loaded ({part_count} parts). {}", elapsed_time(elapsed));
        Ok(LoadReport {
            file: path.to_path_buf(),
            part_count,
            fade_steps,
            highlight_step,
            elapsed_ms: elapsed.as_millis() as u64,
            elapsed: elapsed_time(elapsed),
        })
    }

    /// Offers to save a modified document. Returns `false` when the caller
    /// should abandon what it was about to do.
    pub fn maybe_save(
        &mut self,
        ask: bool,
        sender: SaveSender,
        prompt: &mut dyn SessionPrompt,
    ) -> Result<bool, SessionError> {
        let proceed = match sender {
            SaveSender::User => true,
            SaveSender::Redraw => self.config.show_save_on_redraw,
            SaveSender::Update => self.config.show_save_on_update,
        };
        if !self.modified || !proceed {
            return Ok(true);
        }
        if self.config.interactive && ask {
            match prompt.save_changes(sender) {
                SaveChoice::Save => return self.save(prompt),
                SaveChoice::Discard => {}
                SaveChoice::Cancel => return Ok(false),
            }
        } else if self.save(prompt)? {
            log::info!("Open document has been saved!");
        }
        Ok(true)
    }

    /// Saves to the current file, asking for a destination if there is none.
    /// `Ok(false)` when no destination was chosen.
    pub fn save(&mut self, prompt: &mut dyn SessionPrompt) -> Result<bool, SessionError> {
        match self.current.clone() {
            Some(path) => {
                self.unwatch();
                let result = self.save_file(&path);
                self.watch();
                result.map(|()| true)
            }
            None => match prompt.save_path(None) {
                Some(path) => self.save_as(&path).map(|_| true),
                None => Ok(false),
            },
        }
    }

    /// Saves under a new name and continues editing the new file.
    pub fn save_as(&mut self, path: &Path) -> Result<LoadReport, SessionError> {
        if !is_model_file(path) {
            return Err(SessionError::UnsupportedExtension {
                path: path.to_path_buf(),
            });
        }
        self.unwatch();
        if let Err(err) = self.save_file(path) {
            self.watch();
            return Err(err);
        }
        self.close_file();
        self.open_file(path)
    }

    /// Writes a copy; the open document, its dirty state and the recent
    /// list are unchanged.
    pub fn save_copy(&self, path: &Path) -> Result<(), SessionError> {
        if !is_model_file(path) {
            return Err(SessionError::UnsupportedExtension {
                path: path.to_path_buf(),
            });
        }
        self.store.save(path)?;
        log::info!("Copy saved to {}", path.display());
        Ok(())
    }

    fn save_file(&mut self, path: &Path) -> Result<(), SessionError> {
        self.store.save(path)?;
        self.current = Some(path.to_path_buf());
        self.modified = false;
        self.remember(path)?;
        log::info!("File saved");
        Ok(())
    }

    pub fn close(&mut self) {
        self.unwatch();
        let top = self.store.top_level_file();
        self.close_file();
        self.current = None;
        if let Some(top) = top {
            log::info!("Model {top} unloaded.");
        }
    }

    fn close_file(&mut self) {
        self.store.clear();
        self.modified = false;
        if let Some(current) = &self.current {
            log::debug!("File closed - {}.", current.display());
        }
    }

    /// Checks for external edits of the open files and offers to reload.
    /// Changes that arrive while the question is shown are ignored.
    pub fn poll_file_changes(
        &mut self,
        prompt: &mut dyn SessionPrompt,
    ) -> Result<Option<LoadReport>, SessionError> {
        let Some(watcher) = self.watcher.as_mut() else {
            return Ok(None);
        };
        let changed = watcher.poll();
        let Some(path) = changed.first() else {
            return Ok(None);
        };
        let Some(current) = self.current.clone() else {
            return Ok(None);
        };
        let reload = prompt.reload_changed(path);
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.discard_pending();
        }
        if !reload {
            return Ok(None);
        }
        let page = self.display_page;
        let report = self.open_file(&current)?;
        self.display_page = page;
        Ok(Some(report))
    }

    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.watcher
            .as_ref()
            .map(|w| w.watched().to_vec())
            .unwrap_or_default()
    }

    fn remember(&mut self, path: &Path) -> Result<(), SessionError> {
        self.recent.push(path);
        self.persist()
    }

    fn persist(&mut self) -> Result<(), SessionError> {
        self.settings.recent_files = self.recent.files().to_vec();
        self.settings.open_with_programs = self.open_with.programs().to_vec();
        if let Some(path) = &self.config.settings_path {
            self.settings.save(path)?;
        }
        Ok(())
    }

    fn watch(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        let Some(current) = self.current.clone() else {
            return;
        };
        let mut paths = vec![current];
        for sub in self.store.sub_file_paths() {
            if !paths.contains(&sub) {
                paths.push(sub);
            }
        }
        for path in paths {
            if let Err(err) = watcher.watch(&path) {
                log::warn!("cannot watch {}: {err}", path.display());
            }
        }
    }

    fn unwatch(&mut self) {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.unwatch_all();
        }
    }
}
