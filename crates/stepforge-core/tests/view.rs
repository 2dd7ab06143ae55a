use stepforge_core::view::{ResolutionType, RotStepKind};
use stepforge_core::{ConfigError, StepView};

const DEFAULT_KEY: &str = "1_800_150_DPI_1_30_30_45_0_0_0_0_0_0_REL";

#[test]
fn parses_default_key() {
    let view: StepView = DEFAULT_KEY.parse().unwrap();
    assert_eq!(StepView::default(), view);
    assert_eq!(DEFAULT_KEY, view.to_string());
}

#[test]
fn parses_last_segment_of_composite_key() {
    let view: StepView = "house.mpd;3;12_1024_40_DPCM_0.5_60_20_-35_10_-8_4_90_0_15_ABS"
        .parse()
        .unwrap();
    assert_eq!(12, view.step_number);
    assert_eq!(1024, view.image_width);
    assert_eq!(ResolutionType::Dpcm, view.resolution_type);
    assert_eq!(0.5, view.model_scale);
    assert_eq!(60.0, view.fov);
    assert_eq!(-35.0, view.camera.longitude);
    assert_eq!(-8.0, view.target.y);
    assert_eq!(90.0, view.rotstep.x);
    assert_eq!(15.0, view.rotstep.z);
    assert_eq!(RotStepKind::Abs, view.rotstep.kind);
}

#[test]
fn rejects_wrong_field_count() {
    let err = "1_800_150_DPI".parse::<StepView>().unwrap_err();
    assert!(matches!(err, ConfigError::ViewKey { .. }));
    assert!(err.to_string().contains("expected 15 fields"));
}

#[test]
fn rejects_unknown_resolution_type() {
    let err = "1_800_150_DPX_1_30_30_45_0_0_0_0_0_0_REL"
        .parse::<StepView>()
        .unwrap_err();
    assert!(err.to_string().contains("DPX"));
}

#[test]
fn rejects_non_numeric_field() {
    assert!("1_800_150_DPI_big_30_30_45_0_0_0_0_0_0_REL"
        .parse::<StepView>()
        .is_err());
}

#[test]
fn ldu_per_resolution_unit() {
    assert_eq!(1.0 / 64.0, ResolutionType::Dpi.ldu());
    assert_eq!(0.04, ResolutionType::Dpcm.ldu());
}
