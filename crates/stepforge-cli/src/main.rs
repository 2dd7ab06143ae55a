use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use stepforge_core::args::{exporter_args, renderer_args};
use stepforge_core::coordinator::POLL_INTERVAL;
use stepforge_core::paths::RenderPaths;
use stepforge_core::report::elapsed_time;
use stepforge_core::request::default_output_path;
use stepforge_core::{
    DocumentSession, LdviewExporter, ModelStore, PollStatus, Preferences, RenderContext, RenderCoordinator,
    RenderError, RenderQuality, RenderRequest, RenderSettings, SaveChoice, SaveSender,
    SessionConfig, SessionPrompt, StepView, TextModelStore,
};

const DEFAULT_CONFIG: &str = ".stepforge/preferences.toml";
const DEFAULT_SETTINGS: &str = ".stepforge/settings.json";

#[derive(Debug, Parser)]
#[command(name = "stepforge")]
#[command(about = "Building instruction helper: model documents and POV-Ray step renders.")]
struct Cli {
    /// Preferences file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
    /// Session settings file (recent files).
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS)]
    settings: PathBuf,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QualityArg {
    High,
    Medium,
    Low,
}

impl From<QualityArg> for RenderQuality {
    fn from(q: QualityArg) -> Self {
        match q {
            QualityArg::High => RenderQuality::High,
            QualityArg::Medium => RenderQuality::Medium,
            QualityArg::Low => RenderQuality::Low,
        }
    }
}

#[derive(Debug, clap::Args)]
struct RenderOpts {
    input: PathBuf,
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long, value_enum)]
    quality: Option<QualityArg>,
    /// Render on an opaque background.
    #[arg(long)]
    opaque: bool,
    /// Step view key: step_width_resolution_type_scale_fov_lat_lon_tx_ty_tz_rx_ry_rz_kind.
    #[arg(long)]
    view: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render the model's top-level step with POV-Ray.
    Render {
        #[command(flatten)]
        opts: RenderOpts,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the LDView and POV-Ray command lines without running them.
    Args {
        #[command(flatten)]
        opts: RenderOpts,
    },
    /// Load a model, record it as recent and print a summary.
    Open { input: PathBuf },
    /// Write a copy of a model under another name.
    Copy { input: PathBuf, dest: PathBuf },
    /// List (or clear) recently opened models.
    Recent {
        #[arg(long)]
        clear: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let prefs = Preferences::load(&cli.config)?;
    match cli.cmd {
        Command::Render { opts, report } => render(&prefs, &cli.settings, &opts, report.as_deref()),
        Command::Args { opts } => print_args(&prefs, &cli.settings, &opts),
        Command::Open { input } => open(&prefs, &cli.settings, &input),
        Command::Copy { input, dest } => copy(&prefs, &cli.settings, &input, &dest),
        Command::Recent { clear } => recent(&prefs, &cli.settings, clear),
    }
}

/// Non-interactive answers: never discard, never reload.
struct BatchPrompt;

impl SessionPrompt for BatchPrompt {
    fn save_changes(&mut self, _sender: SaveSender) -> SaveChoice {
        SaveChoice::Save
    }

    fn save_path(&mut self, _current: Option<&Path>) -> Option<PathBuf> {
        None
    }

    fn reload_changed(&mut self, _path: &Path) -> bool {
        false
    }
}

fn session(prefs: &Preferences, settings: &Path) -> Result<DocumentSession<TextModelStore>> {
    let config = SessionConfig {
        interactive: false,
        watch_files: false,
        ..SessionConfig::from_prefs(prefs, Some(settings.to_path_buf()))
    };
    DocumentSession::new(TextModelStore::new(), config).context("open session")
}

struct PreparedRender {
    session: DocumentSession<TextModelStore>,
    request: RenderRequest,
    paths: RenderPaths,
}

fn prepare(prefs: &Preferences, settings: &Path, opts: &RenderOpts) -> Result<PreparedRender> {
    ensure_input_file(&opts.input)?;
    let input = std::fs::canonicalize(&opts.input)
        .with_context(|| format!("resolve input: {:?}", opts.input))?;

    let mut session = session(prefs, settings)?;
    let mut prompt = BatchPrompt;
    session
        .open(&input, &mut prompt)?
        .context("open was cancelled")?;

    let view: StepView = match &opts.view {
        Some(key) => key.parse()?,
        None => StepView::default(),
    };
    let mut render_settings = RenderSettings::from_prefs(prefs);
    if let Some(width) = opts.width {
        render_settings.width = width;
    }
    if let Some(height) = opts.height {
        render_settings.height = height;
    }
    if let Some(quality) = opts.quality {
        render_settings.quality = quality.into();
    }
    render_settings.transparent_background = !opts.opaque;

    let work_dir = input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&work_dir, &input, view.step_number));
    let request = RenderRequest::new(&view, &render_settings, prefs, output);
    Ok(PreparedRender {
        session,
        request,
        paths: RenderPaths::new(&work_dir),
    })
}

fn render(prefs: &Preferences, settings: &Path, opts: &RenderOpts, report: Option<&Path>) -> Result<()> {
    let prepared = prepare(prefs, settings, opts)?;
    let parts = prepared.session.store().step_contents();
    let ctx = RenderContext {
        prefs: prefs.clone(),
        paths: prepared.paths,
    };
    let mut coordinator = RenderCoordinator::new(ctx, LdviewExporter);
    coordinator.start(&prepared.request, &parts)?;

    let report_data = loop {
        std::thread::sleep(POLL_INTERVAL);
        match coordinator.poll() {
            Ok(PollStatus::Running(progress)) => {
                if let Some(elapsed) = coordinator.elapsed() {
                    log::info!(
                        "{:>5.1}% ({}/{} pixels). {}",
                        progress.fraction() * 100.0,
                        progress.pixels_read,
                        progress.pixel_count,
                        elapsed_time(elapsed)
                    );
                }
            }
            Ok(PollStatus::Finished(report)) => break report,
            Ok(PollStatus::Idle) => bail!("render stopped without a result"),
            Err(RenderError::Renderer { status, log }) => {
                eprintln!("{log}");
                bail!("An error occurred while rendering ({status}).");
            }
            Err(err) => return Err(err).context("render"),
        }
    };

    let json = serde_json::to_string_pretty(&report_data).context("serialize report")?;
    if let Some(path) = report {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        std::fs::write(path, &json).with_context(|| format!("write report: {path:?}"))?;
    } else {
        println!("{json}");
    }
    Ok(())
}

fn print_args(prefs: &Preferences, settings: &Path, opts: &RenderOpts) -> Result<()> {
    let prepared = prepare(prefs, settings, opts)?;
    let ldview = program_name(prefs.ldview_exe.as_deref(), "ldview");
    let povray = program_name(prefs.povray_exe.as_deref(), "povray");
    println!(
        "{ldview} {}",
        exporter_args(&prepared.request, prefs, &prepared.paths)
    );
    println!(
        "{povray} {}",
        renderer_args(&prepared.request, prefs, &prepared.paths)
    );
    Ok(())
}

fn program_name(exe: Option<&Path>, fallback: &str) -> String {
    exe.map(|p| p.display().to_string())
        .unwrap_or_else(|| fallback.to_string())
}

fn open(prefs: &Preferences, settings: &Path, input: &Path) -> Result<()> {
    ensure_input_file(input)?;
    let input = std::fs::canonicalize(input).with_context(|| format!("resolve input: {input:?}"))?;
    let mut session = session(prefs, settings)?;
    let report = session
        .open(&input, &mut BatchPrompt)?
        .context("open was cancelled")?;
    let json = serde_json::to_string_pretty(&report).context("serialize load report")?;
    println!("{json}");
    Ok(())
}

fn copy(prefs: &Preferences, settings: &Path, input: &Path, dest: &Path) -> Result<()> {
    ensure_input_file(input)?;
    let mut session = session(prefs, settings)?;
    session.load_file(input)?;
    session.save_copy(dest)?;
    Ok(())
}

fn recent(prefs: &Preferences, settings: &Path, clear: bool) -> Result<()> {
    let mut session = session(prefs, settings)?;
    if clear {
        session.clear_recent()?;
        return Ok(());
    }
    session.refresh_recent()?;
    for entry in session.recent_files() {
        println!("{}\t{}", entry.label.trim_start_matches('&'), entry.path.display());
    }
    Ok(())
}

fn ensure_input_file(input: &Path) -> Result<()> {
    match std::fs::metadata(input) {
        Ok(meta) => {
            if meta.is_file() {
                Ok(())
            } else {
                bail!("input is not a file: {input:?}");
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            bail!("input not found: {input:?} (cwd: {cwd:?}).");
        }
        Err(err) => Err(err).with_context(|| format!("stat input: {input:?}")),
    }
}
