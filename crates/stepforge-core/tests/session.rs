use std::path::{Path, PathBuf};
use std::time::Duration;
use stepforge_core::settings::Settings;
use stepforge_core::{
    DocumentSession, ModelStore, SaveChoice, SaveSender, SessionConfig, SessionError,
    SessionPrompt, TextModelStore,
};

#[derive(Default)]
struct ScriptedPrompt {
    choice: Option<SaveChoice>,
    save_path: Option<PathBuf>,
    reload: bool,
    save_questions: usize,
    reload_questions: usize,
}

impl SessionPrompt for ScriptedPrompt {
    fn save_changes(&mut self, _sender: SaveSender) -> SaveChoice {
        self.save_questions += 1;
        self.choice.unwrap_or(SaveChoice::Cancel)
    }

    fn save_path(&mut self, _current: Option<&Path>) -> Option<PathBuf> {
        self.save_path.clone()
    }

    fn reload_changed(&mut self, _path: &Path) -> bool {
        self.reload_questions += 1;
        self.reload
    }
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.ldr"),
            "0 Model A\n1 4 0 0 0 1 0 0 0 1 0 0 0 1 3001.dat\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("b.mpd"), "0 FILE b.mpd\n0 Model B\n").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> SessionConfig {
        SessionConfig {
            interactive: true,
            show_save_on_redraw: true,
            show_save_on_update: false,
            max_recent_files: 4,
            max_open_with_programs: 2,
            watch_files: false,
            settings_path: Some(self.path("settings.json")),
        }
    }

    fn session(&self) -> DocumentSession<TextModelStore> {
        DocumentSession::new(TextModelStore::new(), self.config()).unwrap()
    }

    fn edit(&self, session: &mut DocumentSession<TextModelStore>, line: &str) {
        let mut lines = session.store().lines().to_vec();
        lines.push(line.to_string());
        session.store_mut().set_lines(lines);
        session.mark_modified();
    }
}

#[test]
fn open_rejects_unsupported_and_missing_files() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let mut prompt = ScriptedPrompt::default();

    std::fs::write(fx.path("notes.txt"), "hello").unwrap();
    let err = session.open(&fx.path("notes.txt"), &mut prompt).unwrap_err();
    assert!(matches!(err, SessionError::UnsupportedExtension { .. }));

    let err = session.open(&fx.path("missing.ldr"), &mut prompt).unwrap_err();
    assert!(matches!(err, SessionError::NotFound { .. }));
    assert_eq!(None, session.current_file());
}

#[test]
fn open_records_recent_file() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let mut prompt = ScriptedPrompt::default();

    let report = session.open(&fx.path("a.ldr"), &mut prompt).unwrap().unwrap();
    assert_eq!(1, report.part_count);
    assert_eq!(Some(fx.path("a.ldr").as_path()), session.current_file());
    assert!(!session.is_modified());
    assert_eq!(Some(fx.dir.path().to_path_buf()), session.settings().projects_path);

    let saved = Settings::load(&fx.path("settings.json")).unwrap();
    assert_eq!(vec![fx.path("a.ldr")], saved.recent_files);

    // A new session starts from the persisted list.
    let mut next = fx.session();
    assert_eq!(fx.path("a.ldr"), next.recent_files()[0].path);
    let report = next.load_last_opened().unwrap().unwrap();
    assert_eq!(fx.path("a.ldr"), report.file);
}

#[test]
fn cancel_keeps_modified_document() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let mut prompt = ScriptedPrompt::default();
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();
    fx.edit(&mut session, "0 edited");

    prompt.choice = Some(SaveChoice::Cancel);
    assert!(session.open(&fx.path("b.mpd"), &mut prompt).unwrap().is_none());
    assert_eq!(1, prompt.save_questions);
    assert_eq!(Some(fx.path("a.ldr").as_path()), session.current_file());
    assert!(session.is_modified());
}

#[test]
fn discard_opens_without_saving() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let mut prompt = ScriptedPrompt::default();
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();
    fx.edit(&mut session, "0 edited");

    prompt.choice = Some(SaveChoice::Discard);
    session.open(&fx.path("b.mpd"), &mut prompt).unwrap().unwrap();
    assert_eq!(Some(fx.path("b.mpd").as_path()), session.current_file());
    let a = std::fs::read_to_string(fx.path("a.ldr")).unwrap();
    assert!(!a.contains("0 edited"));
}

#[test]
fn save_choice_writes_before_opening() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let mut prompt = ScriptedPrompt::default();
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();
    fx.edit(&mut session, "0 edited");

    prompt.choice = Some(SaveChoice::Save);
    session.open(&fx.path("b.mpd"), &mut prompt).unwrap().unwrap();
    let a = std::fs::read_to_string(fx.path("a.ldr")).unwrap();
    assert!(a.contains("0 edited"));
    assert_eq!(
        vec![fx.path("b.mpd"), fx.path("a.ldr")],
        session.recent_files().into_iter().map(|e| e.path).collect::<Vec<_>>()
    );
}

#[test]
fn save_as_switches_document() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let mut prompt = ScriptedPrompt::default();
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();
    fx.edit(&mut session, "0 renamed");

    let err = session.save_as(&fx.path("c.txt")).unwrap_err();
    assert!(matches!(err, SessionError::UnsupportedExtension { .. }));

    session.save_as(&fx.path("c.ldr")).unwrap();
    assert_eq!(Some(fx.path("c.ldr").as_path()), session.current_file());
    assert!(!session.is_modified());
    assert_eq!(fx.path("c.ldr"), session.recent_files()[0].path);
    assert!(std::fs::read_to_string(fx.path("c.ldr")).unwrap().contains("0 renamed"));
}

#[test]
fn save_copy_leaves_session_untouched() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let mut prompt = ScriptedPrompt::default();
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();
    fx.edit(&mut session, "0 copied");

    session.save_copy(&fx.path("copy.ldr")).unwrap();
    assert!(std::fs::read_to_string(fx.path("copy.ldr")).unwrap().contains("0 copied"));
    assert_eq!(Some(fx.path("a.ldr").as_path()), session.current_file());
    assert!(session.is_modified());
    assert_eq!(1, session.recent_files().len());
    assert!(session.window_title().starts_with("a.ldr*"));
}

#[test]
fn save_without_file_asks_for_destination() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session
        .store_mut()
        .set_lines(vec!["0 New model".to_string()]);
    session.mark_modified();

    let mut prompt = ScriptedPrompt::default();
    assert!(!session.save(&mut prompt).unwrap());

    prompt.save_path = Some(fx.path("new.ldr"));
    assert!(session.save(&mut prompt).unwrap());
    assert_eq!(Some(fx.path("new.ldr").as_path()), session.current_file());
    assert!(fx.path("new.ldr").is_file());
}

#[test]
fn update_checks_can_be_switched_off() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let mut prompt = ScriptedPrompt::default();
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();
    fx.edit(&mut session, "0 edited");

    assert!(session.maybe_save(true, SaveSender::Update, &mut prompt).unwrap());
    assert_eq!(0, prompt.save_questions);
    assert!(!session.maybe_save(true, SaveSender::Redraw, &mut prompt).unwrap());
    assert_eq!(1, prompt.save_questions);
}

#[test]
fn non_interactive_session_saves_silently() {
    let fx = Fixture::new();
    let config = SessionConfig {
        interactive: false,
        ..fx.config()
    };
    let mut session = DocumentSession::new(TextModelStore::new(), config).unwrap();
    let mut prompt = ScriptedPrompt::default();
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();
    fx.edit(&mut session, "0 batch");

    assert!(session.maybe_save(true, SaveSender::User, &mut prompt).unwrap());
    assert_eq!(0, prompt.save_questions);
    assert!(!session.is_modified());
    assert!(std::fs::read_to_string(fx.path("a.ldr")).unwrap().contains("0 batch"));
}

#[test]
fn close_and_recent_maintenance() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let mut prompt = ScriptedPrompt::default();
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();
    session.open(&fx.path("b.mpd"), &mut prompt).unwrap();

    session.close();
    assert_eq!(None, session.current_file());
    assert_eq!(0, session.store().part_count());
    assert!(session.window_title().starts_with("StepForge - StepForge v"));

    session.open_recent(1, &mut prompt).unwrap().unwrap();
    assert_eq!(Some(fx.path("a.ldr").as_path()), session.current_file());
    assert!(matches!(
        session.open_recent(9, &mut prompt),
        Err(SessionError::NoRecentFile { index: 9 })
    ));

    std::fs::remove_file(fx.path("b.mpd")).unwrap();
    session.refresh_recent().unwrap();
    assert_eq!(1, session.recent_files().len());

    session.clear_recent().unwrap();
    assert!(session.recent_files().is_empty());
    let saved = Settings::load(&fx.path("settings.json")).unwrap();
    assert!(saved.recent_files.is_empty());
}

#[test]
fn saved_display_page_is_used_once() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.save_display_page(5).unwrap();

    session.load_file(&fx.path("a.ldr")).unwrap();
    assert_eq!(5, session.display_page());
    assert_eq!(None, session.settings().saved_display_page);

    session.load_file(&fx.path("b.mpd")).unwrap();
    assert_eq!(1, session.display_page());
}

/// Polls until the watcher reports a change or a few seconds pass.
fn poll_changes(
    session: &mut DocumentSession<TextModelStore>,
    prompt: &mut ScriptedPrompt,
) -> Option<stepforge_core::report::LoadReport> {
    for _ in 0..100 {
        let report = session.poll_file_changes(prompt).unwrap();
        if report.is_some() || prompt.reload_questions > 0 {
            return report;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    None
}

#[test]
fn external_edit_offers_reload() {
    let fx = Fixture::new();
    let config = SessionConfig {
        watch_files: true,
        ..fx.config()
    };
    let mut session = DocumentSession::new(TextModelStore::new(), config).unwrap();
    let mut prompt = ScriptedPrompt {
        reload: true,
        ..ScriptedPrompt::default()
    };
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();
    assert_eq!(vec![fx.path("a.ldr")], session.watched_files());

    std::fs::write(
        fx.path("a.ldr"),
        "0 Model A\n1 4 0 0 0 1 0 0 0 1 0 0 0 1 3001.dat\n1 1 0 -24 0 1 0 0 0 1 0 0 0 1 3003.dat\n",
    )
    .unwrap();
    // Lets every event of the write queue up before the first poll.
    std::thread::sleep(Duration::from_millis(300));

    let report = poll_changes(&mut session, &mut prompt).expect("reload after external edit");
    assert_eq!(1, prompt.reload_questions);
    assert_eq!(2, report.part_count);
    assert_eq!(2, session.store().part_count());
    assert_eq!(vec![fx.path("a.ldr")], session.watched_files());

    // The session's own save is not an external change.
    prompt.reload_questions = 0;
    fx.edit(&mut session, "0 saved here");
    assert!(session.save(&mut prompt).unwrap());
    std::thread::sleep(Duration::from_millis(300));
    for _ in 0..5 {
        assert!(session.poll_file_changes(&mut prompt).unwrap().is_none());
        std::thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(0, prompt.reload_questions);
}

#[test]
fn declined_reload_keeps_document() {
    let fx = Fixture::new();
    let config = SessionConfig {
        watch_files: true,
        ..fx.config()
    };
    let mut session = DocumentSession::new(TextModelStore::new(), config).unwrap();
    let mut prompt = ScriptedPrompt::default();
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();

    std::fs::write(fx.path("a.ldr"), "0 Model A\n").unwrap();
    std::thread::sleep(Duration::from_millis(300));

    assert!(poll_changes(&mut session, &mut prompt).is_none());
    assert_eq!(1, prompt.reload_questions);
    assert_eq!(1, session.store().part_count());
}

#[test]
fn closed_session_watches_nothing() {
    let fx = Fixture::new();
    let config = SessionConfig {
        watch_files: true,
        ..fx.config()
    };
    let mut session = DocumentSession::new(TextModelStore::new(), config).unwrap();
    let mut prompt = ScriptedPrompt::default();
    session.open(&fx.path("a.ldr"), &mut prompt).unwrap();
    session.close();
    assert!(session.watched_files().is_empty());
}
