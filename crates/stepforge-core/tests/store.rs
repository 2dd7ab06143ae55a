use stepforge_core::{ModelStore, SessionError, TextModelStore};

const HOUSE: &str = "\
0 FILE main.ldr
0 Main model
0 !LPUB FADE TRUE
1 4 0 0 0 1 0 0 0 1 0 0 0 1 wall.ldr
1 15 0 -24 0 1 0 0 0 1 0 0 0 1 roof.ldr
1 1 0 0 0 1 0 0 0 1 0 0 0 1 3001.dat
0 STEP
0 FILE wall.ldr
1 4 0 0 0 1 0 0 0 1 0 0 0 1 3004.dat
";

#[test]
fn multi_part_document_structure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("house.mpd");
    std::fs::write(&path, HOUSE).unwrap();
    std::fs::write(dir.path().join("roof.ldr"), "1 2 0 0 0 1 0 0 0 1 0 0 0 1 3039.dat\n").unwrap();

    let mut store = TextModelStore::new();
    store.load(&path).unwrap();

    assert_eq!(vec!["main.ldr", "wall.ldr"], store.sub_file_order().to_vec());
    assert_eq!(Some("main.ldr".to_string()), store.top_level_file());
    assert_eq!(4, store.part_count());
    assert!(store.header_contains("fade true"));
    assert!(!store.header_contains("HIGHLIGHT TRUE"));

    // wall.ldr is a section and 3001.dat is not next to the model.
    assert_eq!(vec![dir.path().join("roof.ldr")], store.sub_file_paths());

    let step = store.step_contents();
    assert_eq!(7, step.len());
    assert_eq!("0 STEP", step[6]);
}

#[test]
fn single_file_step_is_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brick.ldr");
    std::fs::write(&path, "0 Brick\n1 4 0 0 0 1 0 0 0 1 0 0 0 1 3001.dat\n").unwrap();

    let mut store = TextModelStore::new();
    store.load(&path).unwrap();
    assert_eq!(Some("brick.ldr".to_string()), store.top_level_file());
    assert_eq!(2, store.step_contents().len());

    store.clear();
    assert_eq!(0, store.part_count());
    assert_eq!(None, store.top_level_file());
}

#[test]
fn empty_file_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.ldr");
    std::fs::write(&path, "\n\n").unwrap();

    let err = TextModelStore::new().load(&path).unwrap_err();
    assert!(matches!(err, SessionError::Load { .. }));
}

#[test]
fn save_writes_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.ldr");
    let mut store = TextModelStore::new();
    store.set_lines(vec!["0 Copy".to_string(), "0 STEP".to_string()]);
    store.save(&path).unwrap();
    assert_eq!("0 Copy\n0 STEP\n", std::fs::read_to_string(&path).unwrap());
}
