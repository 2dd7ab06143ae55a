use anyhow::{Context, Result};
use eframe::egui;
use std::path::{Path, PathBuf};
use std::time::Instant;
use stepforge_core::coordinator::POLL_INTERVAL;
use stepforge_core::open_with::OpenWithProgram;
use stepforge_core::paths::RenderPaths;
use stepforge_core::report::{elapsed_time, LoadReport, RenderReport};
use stepforge_core::request::default_output_path;
use stepforge_core::session::MODEL_EXTENSIONS;
use stepforge_core::{
    CancelPrompt, DocumentSession, LdviewExporter, ModelStore, PollStatus, Preferences, RenderContext,
    RenderCoordinator, RenderError, RenderQuality, RenderRequest, RenderSettings, SaveChoice,
    SaveSender, SessionConfig, SessionPrompt, StartOutcome, StepView, TextModelStore,
};

const CONFIG_ENV: &str = "STEPFORGE_CONFIG";
const SETTINGS_ENV: &str = "STEPFORGE_SETTINGS";
const DEFAULT_CONFIG: &str = ".stepforge/preferences.toml";
const DEFAULT_SETTINGS: &str = ".stepforge/settings.json";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let app = StepForgeApp::load()?;
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "StepForge",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("run gui: {e}"))
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var_os(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Native message boxes for the questions the session and the renderer ask.
struct DialogPrompt;

impl SessionPrompt for DialogPrompt {
    fn save_changes(&mut self, _sender: SaveSender) -> SaveChoice {
        let answer = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Warning)
            .set_title("StepForge")
            .set_description("The document has been modified.\nDo you want to save your changes?")
            .set_buttons(rfd::MessageButtons::YesNoCancel)
            .show();
        match answer {
            rfd::MessageDialogResult::Yes => SaveChoice::Save,
            rfd::MessageDialogResult::No => SaveChoice::Discard,
            _ => SaveChoice::Cancel,
        }
    }

    fn save_path(&mut self, current: Option<&Path>) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new().add_filter("LDraw models", &MODEL_EXTENSIONS);
        if let Some(dir) = current.and_then(Path::parent) {
            dialog = dialog.set_directory(dir);
        }
        dialog.save_file()
    }

    fn reload_changed(&mut self, path: &Path) -> bool {
        let answer = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Info)
            .set_title("StepForge")
            .set_description(format!(
                "The file \"{}\" contains changes made outside the editor.\nDo you want to reload?",
                path.display()
            ))
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        matches!(answer, rfd::MessageDialogResult::Yes)
    }
}

impl CancelPrompt for DialogPrompt {
    fn confirm_cancel(&mut self) -> bool {
        let answer = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Warning)
            .set_title("StepForge")
            .set_description("A render is in progress.\nDo you want to cancel it?")
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        matches!(answer, rfd::MessageDialogResult::Yes)
    }
}

struct StepForgeApp {
    prefs: Preferences,
    session: DocumentSession<TextModelStore>,
    coordinator: RenderCoordinator,

    settings: RenderSettings,
    view_key: String,
    output: Option<PathBuf>,

    preview: Option<egui::TextureHandle>,
    preview_pixels: u32,
    last_report: Option<RenderReport>,
    render_log: Option<String>,

    title: String,
    status: String,
}

impl StepForgeApp {
    fn load() -> Result<Self> {
        let config = env_path(CONFIG_ENV, DEFAULT_CONFIG);
        let prefs = Preferences::load(&config)?;
        let mut status = "Open an LDraw model to begin.".to_string();

        let session_config =
            SessionConfig::from_prefs(&prefs, Some(env_path(SETTINGS_ENV, DEFAULT_SETTINGS)));
        let mut session = match DocumentSession::new(TextModelStore::new(), session_config.clone()) {
            Ok(session) => session,
            Err(e) => {
                log::warn!("settings unreadable, recent files are not kept: {e}");
                status = format!("Settings unreadable ({e}); recent files are not kept.");
                let config = SessionConfig {
                    settings_path: None,
                    ..session_config
                };
                DocumentSession::new(TextModelStore::new(), config).context("start session")?
            }
        };

        match session.refresh_open_with() {
            Ok(0) => {}
            Ok(pruned) => log::info!("removed {pruned} missing open-with program(s)"),
            Err(e) => log::warn!("refresh open-with programs: {e}"),
        }
        match session.load_last_opened() {
            Ok(Some(report)) => status = loaded_status(&report),
            Ok(None) => {}
            Err(e) => status = format!("Could not reopen the last model: {e}"),
        }

        let ctx = RenderContext {
            prefs: prefs.clone(),
            paths: RenderPaths::new(&work_dir(session.current_file())),
        };
        Ok(Self {
            settings: RenderSettings::from_prefs(&prefs),
            coordinator: RenderCoordinator::new(ctx, LdviewExporter),
            prefs,
            session,
            view_key: StepView::default().to_string(),
            output: None,
            preview: None,
            preview_pixels: 0,
            last_report: None,
            render_log: None,
            title: String::new(),
            status,
        })
    }

    fn pick_model(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("LDraw models", &MODEL_EXTENSIONS);
        if let Some(dir) = &self.session.settings().projects_path {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.pick_file() {
            self.open_model(&path);
        }
    }

    fn open_model(&mut self, path: &Path) {
        match self.session.open(path, &mut DialogPrompt) {
            Ok(Some(report)) => self.after_load(&report),
            Ok(None) => self.status = "Open cancelled.".to_string(),
            Err(e) => self.status = format!("Failed to open {}: {e}", path.display()),
        }
    }

    fn open_recent(&mut self, index: usize) {
        match self.session.open_recent(index, &mut DialogPrompt) {
            Ok(Some(report)) => self.after_load(&report),
            Ok(None) => self.status = "Open cancelled.".to_string(),
            Err(e) => {
                self.status = format!("{e}");
                if let Err(e) = self.session.refresh_recent() {
                    log::warn!("refresh recent files: {e}");
                }
            }
        }
    }

    fn open_dropped(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some(path) = dropped.into_iter().find_map(|file| file.path) {
            self.open_model(&path);
        }
    }

    fn open_with(&mut self, index: usize) {
        match self.session.open_with(index) {
            Ok(_) => {
                if let Some(entry) = self.session.open_with_programs().get(index) {
                    self.status = format!("Launched {}.", entry.program.path.display());
                }
            }
            Err(e) => self.status = format!("Open With failed: {e}"),
        }
    }

    fn add_open_with_program(&mut self) {
        let Some(path) = rfd::FileDialog::new().set_title("Choose a program").pick_file() else {
            return;
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.session.add_open_with_program(OpenWithProgram::new(name, path)) {
            Ok(true) => {}
            Ok(false) => self.status = "The Open With list is full.".to_string(),
            Err(e) => self.status = format!("Add program failed: {e}"),
        }
    }

    fn open_working_folder(&mut self) {
        let Some(dir) = self.session.working_folder() else {
            return;
        };
        if let Err(e) = open::that(&dir) {
            self.status = format!("Failed to open folder {}: {e}", dir.display());
        }
    }

    fn after_load(&mut self, report: &LoadReport) {
        self.output = None;
        self.status = loaded_status(report);
    }

    fn save(&mut self) {
        match self.session.save(&mut DialogPrompt) {
            Ok(true) => self.status = "File saved.".to_string(),
            Ok(false) => self.status = "Save cancelled.".to_string(),
            Err(e) => self.status = format!("Save failed: {e}"),
        }
    }

    fn save_as(&mut self) {
        let Some(path) = DialogPrompt.save_path(self.session.current_file()) else {
            return;
        };
        match self.session.save_as(&path) {
            Ok(report) => self.after_load(&report),
            Err(e) => self.status = format!("Save As failed: {e}"),
        }
    }

    fn save_copy(&mut self) {
        let Some(path) = DialogPrompt.save_path(self.session.current_file()) else {
            return;
        };
        match self.session.save_copy(&path) {
            Ok(()) => self.status = format!("Copy saved to {}", path.display()),
            Err(e) => self.status = format!("Save Copy failed: {e}"),
        }
    }

    fn close_model(&mut self) {
        match self.session.maybe_save(true, SaveSender::User, &mut DialogPrompt) {
            Ok(true) => {
                self.session.close();
                self.output = None;
                self.status = "Model closed.".to_string();
            }
            Ok(false) => {}
            Err(e) => self.status = format!("Save failed: {e}"),
        }
    }

    fn pick_output(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("Images", &["png", "bmp", "jpg"]);
        if let Some(current) = self.session.current_file() {
            dialog = dialog.set_directory(work_dir(Some(current)));
        }
        if let Some(path) = dialog.save_file() {
            self.output = Some(path);
        }
    }

    fn output_path(&self) -> Option<PathBuf> {
        if let Some(output) = &self.output {
            return Some(output.clone());
        }
        let current = self.session.current_file()?;
        let step = self
            .view_key
            .parse::<StepView>()
            .map(|v| v.step_number)
            .unwrap_or(1);
        Some(default_output_path(&work_dir(Some(current)), current, step))
    }

    fn start_render(&mut self) {
        let Some(current) = self.session.current_file().map(Path::to_path_buf) else {
            self.status = "Open a model first.".to_string();
            return;
        };
        let view = match self.view_key.parse::<StepView>() {
            Ok(view) => view,
            Err(e) => {
                self.status = e.to_string();
                return;
            }
        };
        if !self.coordinator.is_running() {
            let ctx = RenderContext {
                prefs: self.prefs.clone(),
                paths: RenderPaths::new(&work_dir(Some(&current))),
            };
            if let Err(e) = self.coordinator.set_context(ctx) {
                self.status = e.to_string();
                return;
            }
        }
        let Some(output) = self.output_path() else {
            return;
        };
        let request = RenderRequest::new(&view, &self.settings, &self.prefs, output);
        let parts = self.session.store().step_contents();
        match self
            .coordinator
            .request_render(&request, &parts, &mut DialogPrompt)
        {
            Ok(StartOutcome::Started) => {
                self.preview_pixels = 0;
                self.last_report = None;
                self.render_log = None;
                self.status = "Rendering...".to_string();
            }
            Ok(StartOutcome::CancelPrompted { cancelled: true }) => {
                self.status = "Render cancelled.".to_string();
            }
            Ok(StartOutcome::CancelPrompted { cancelled: false }) => {}
            Err(e) => self.status = format!("Render failed: {e}"),
        }
    }

    fn cancel_render(&mut self) {
        match self.coordinator.prompt_cancel(&mut DialogPrompt) {
            Ok(true) => self.status = "Render cancelled.".to_string(),
            Ok(false) => {}
            Err(e) => self.status = format!("Cancel failed: {e}"),
        }
    }

    fn poll_render(&mut self, ctx: &egui::Context) {
        if !self.coordinator.is_running() || !self.coordinator.poll_due(Instant::now()) {
            return;
        }
        match self.coordinator.poll() {
            Ok(PollStatus::Running(progress)) => {
                if progress.pixels_read != self.preview_pixels {
                    self.preview_pixels = progress.pixels_read;
                    self.refresh_preview(ctx);
                }
            }
            Ok(PollStatus::Finished(report)) => {
                self.refresh_preview(ctx);
                self.status = format!(
                    "Rendered {}. {}",
                    report.output.display(),
                    report.elapsed
                );
                self.last_report = Some(report);
            }
            Ok(PollStatus::Idle) => {}
            Err(RenderError::Renderer { status, log }) => {
                self.status = format!("An error occurred while rendering ({status}).");
                self.render_log = Some(log);
            }
            Err(e) => self.status = format!("Render failed: {e}"),
        }
    }

    fn refresh_preview(&mut self, ctx: &egui::Context) {
        let Some(img) = self.coordinator.image() else {
            return;
        };
        let size = [img.width() as usize, img.height() as usize];
        let color = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
        match &mut self.preview {
            Some(texture) => texture.set(color, egui::TextureOptions::LINEAR),
            None => {
                self.preview = Some(ctx.load_texture("render-preview", color, egui::TextureOptions::LINEAR));
            }
        }
    }

    fn poll_file_changes(&mut self) {
        match self.session.poll_file_changes(&mut DialogPrompt) {
            Ok(Some(report)) => self.status = loaded_status(&report),
            Ok(None) => {}
            Err(e) => self.status = format!("Reload failed: {e}"),
        }
    }

    /// Whether the window may close now.
    fn confirm_close(&mut self) -> Result<bool> {
        if !self
            .coordinator
            .prompt_cancel(&mut DialogPrompt)
            .context("stop renderer")?
        {
            return Ok(false);
        }
        let proceed = self
            .session
            .maybe_save(true, SaveSender::User, &mut DialogPrompt)
            .context("save before exit")?;
        Ok(proceed)
    }

    fn file_controls(&mut self, ui: &mut egui::Ui) {
        let has_model = self.session.current_file().is_some();
        ui.horizontal(|ui| {
            if ui.button("Open…").clicked() {
                self.pick_model();
            }
            let recent = self.session.recent_files();
            ui.menu_button("Recent", |ui| {
                if recent.is_empty() {
                    ui.label("No recent files");
                }
                for (index, entry) in recent.iter().enumerate() {
                    let label = entry.label.replacen('&', "", 1);
                    if ui
                        .button(label)
                        .on_hover_text(entry.path.display().to_string())
                        .clicked()
                    {
                        self.open_recent(index);
                    }
                }
                ui.separator();
                if ui
                    .add_enabled(!recent.is_empty(), egui::Button::new("Clear recent"))
                    .clicked()
                {
                    if let Err(e) = self.session.clear_recent() {
                        self.status = format!("Clear recent failed: {e}");
                    }
                }
            });
            let programs = self.session.open_with_programs();
            ui.menu_button("Open With", |ui| {
                for (index, entry) in programs.iter().enumerate() {
                    let label = entry.label.replacen('&', "", 1);
                    if ui
                        .add_enabled(has_model, egui::Button::new(label))
                        .on_hover_text(entry.program.path.display().to_string())
                        .clicked()
                    {
                        self.open_with(index);
                    }
                }
                ui.separator();
                if ui.button("Add program…").clicked() {
                    self.add_open_with_program();
                }
                ui.add_enabled_ui(!programs.is_empty(), |ui| {
                    ui.menu_button("Remove", |ui| {
                        for (index, entry) in programs.iter().enumerate() {
                            if ui.button(entry.label.replacen('&', "", 1)).clicked() {
                                if let Err(e) = self.session.remove_open_with_program(index) {
                                    self.status = format!("Remove program failed: {e}");
                                }
                            }
                        }
                    });
                });
            });
            if ui
                .add_enabled(has_model, egui::Button::new("Open folder"))
                .clicked()
            {
                self.open_working_folder();
            }
            ui.separator();
            let modified = self.session.is_modified();
            if ui.add_enabled(has_model && modified, egui::Button::new("Save")).clicked() {
                self.save();
            }
            if ui.add_enabled(has_model, egui::Button::new("Save As…")).clicked() {
                self.save_as();
            }
            if ui.add_enabled(has_model, egui::Button::new("Save Copy…")).clicked() {
                self.save_copy();
            }
            if ui.add_enabled(has_model, egui::Button::new("Close")).clicked() {
                self.close_model();
            }
        });
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        let running = self.coordinator.is_running();
        ui.heading("POV-Ray render");
        ui.separator();

        ui.add_enabled_ui(!running, |ui| {
            egui::Grid::new("render-settings").num_columns(2).show(ui, |ui| {
                ui.label("Width");
                ui.add(egui::DragValue::new(&mut self.settings.width).range(1..=10_000));
                ui.end_row();
                ui.label("Height");
                ui.add(egui::DragValue::new(&mut self.settings.height).range(1..=10_000));
                ui.end_row();
                ui.label("Quality");
                egui::ComboBox::from_id_salt("quality")
                    .selected_text(self.settings.quality.label())
                    .show_ui(ui, |ui| {
                        for quality in RenderQuality::ALL {
                            ui.selectable_value(&mut self.settings.quality, quality, quality.label());
                        }
                    });
                ui.end_row();
            });
            ui.checkbox(&mut self.settings.transparent_background, "Transparent background");
            ui.label("Step view");
            ui.text_edit_singleline(&mut self.view_key);

            ui.horizontal(|ui| {
                ui.label("Output:");
                match self.output_path() {
                    Some(path) => ui.monospace(path.display().to_string()),
                    None => ui.label("(no model)"),
                };
            });
            ui.horizontal(|ui| {
                if ui.button("Browse…").clicked() {
                    self.pick_output();
                }
                if ui
                    .add_enabled(self.output.is_some(), egui::Button::new("Reset"))
                    .clicked()
                {
                    self.output = None;
                }
            });
        });

        ui.separator();
        let has_model = self.session.current_file().is_some();
        let label = if running { "Cancel" } else { "Render" };
        if ui.add_enabled(has_model || running, egui::Button::new(label)).clicked() {
            if running {
                self.cancel_render();
            } else {
                self.start_render();
            }
        }

        let progress = self.coordinator.progress();
        ui.add(egui::ProgressBar::new(progress.fraction()).show_percentage());
        if let Some(elapsed) = self.coordinator.elapsed() {
            ui.label(elapsed_time(elapsed));
        }

        if let Some(report) = &self.last_report {
            ui.separator();
            ui.label(format!("{} x {} pixels", report.width, report.height));
            ui.horizontal(|ui| {
                if ui.button("Open image").clicked() {
                    if let Err(e) = open::that(&report.output) {
                        log::warn!("open {}: {e}", report.output.display());
                    }
                }
                if let Some(dir) = report.output.parent() {
                    if ui.button("Open folder").clicked() {
                        if let Err(e) = open::that(dir) {
                            log::warn!("open {}: {e}", dir.display());
                        }
                    }
                }
            });
        }

        if let Some(log) = &self.render_log {
            ui.separator();
            ui.collapsing("Renderer log", |ui| {
                egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
                    ui.monospace(log);
                });
            });
        }
    }
}

impl eframe::App for StepForgeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            match self.confirm_close() {
                Ok(true) => {}
                Ok(false) => ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose),
                Err(e) => {
                    self.status = format!("{e:#}");
                    ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
                }
            }
        }

        self.open_dropped(ctx);
        self.poll_file_changes();
        self.poll_render(ctx);

        let title = self.session.window_title();
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            self.file_controls(ui);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                if let Some(current) = self.session.current_file() {
                    ui.separator();
                    ui.label(format!(
                        "{} ({} parts)",
                        current.display(),
                        self.session.store().part_count()
                    ));
                }
            });
        });

        egui::SidePanel::right("render").min_width(260.0).show(ctx, |ui| {
            self.render_controls(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| match &self.preview {
            Some(texture) => {
                ui.add(egui::Image::new(texture).shrink_to_fit());
            }
            None => {
                ui.centered_and_justified(|ui| {
                    ui.label("No render yet.");
                });
            }
        });

        // Keeps render and file-change polling going without input events.
        ctx.request_repaint_after(POLL_INTERVAL);
    }
}

fn work_dir(current: Option<&Path>) -> PathBuf {
    current
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn loaded_status(report: &LoadReport) -> String {
    format!(
        "Loaded {} ({} parts). {}",
        report.file.display(),
        report.part_count,
        report.elapsed
    )
}
