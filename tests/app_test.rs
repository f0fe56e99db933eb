use crabshutter::testing::simulated::BACK_WIDE;
use crabshutter::testing::{RecordingPersistence, SimulatedBackend};
use crabshutter::{
    CameraApp, CameraError, CameraSettings, CrabShutterConfig, DeliverableKind,
    PresetPermissionGate, SessionState,
};
use std::sync::Arc;
use tempfile::tempdir;

fn app_with(
    backend: &SimulatedBackend,
    gate: PresetPermissionGate,
    settings: CameraSettings,
) -> (CameraApp, Arc<RecordingPersistence>) {
    let persistence = Arc::new(RecordingPersistence::new());
    let app = CameraApp::new(
        Arc::new(backend.clone()),
        Arc::new(gate),
        persistence.clone(),
        settings,
    )
    .unwrap();
    (app, persistence)
}

#[tokio::test]
async fn test_setup_camera_binds_primary() {
    let backend = SimulatedBackend::new();
    let (app, _) = app_with(
        &backend,
        PresetPermissionGate::granted(),
        CameraSettings::default(),
    );

    let device = app.setup_camera().await.unwrap();
    assert_eq!(device.model_id, BACK_WIDE);
    assert!(device.is_primary);
    assert!(app.session().state().is_running());
    assert_eq!(app.session().devices().len(), 4);
}

#[tokio::test]
async fn test_setup_camera_denied() {
    let backend = SimulatedBackend::new();
    let (app, _) = app_with(
        &backend,
        PresetPermissionGate::undetermined(false),
        CameraSettings::default(),
    );

    let err = app.setup_camera().await.unwrap_err();
    assert!(matches!(err, CameraError::PermissionDenied(_)));
    assert_eq!(app.session().state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn test_setup_camera_without_devices() {
    let backend = SimulatedBackend::without_primary();
    let (app, _) = app_with(
        &backend,
        PresetPermissionGate::granted(),
        CameraSettings::default(),
    );

    let err = app.setup_camera().await.unwrap_err();
    assert!(matches!(err, CameraError::DeviceNotFound(_)));
}

#[tokio::test]
async fn test_raw_shift_fix_applied_on_setup_disables_raw() {
    let backend = SimulatedBackend::new();
    let settings = CameraSettings {
        fix_raw_shift: true,
        ..CameraSettings::default()
    };
    let (app, persistence) = app_with(&backend, PresetPermissionGate::granted(), settings);

    app.setup_camera().await.unwrap();
    assert_eq!(app.session().zoom_factor(), 1.0001);
    assert_eq!(backend.hardware_zoom(), 1.0001);

    assert!(app.capture().await);
    assert_eq!(
        persistence.persisted()[0].kinds(),
        vec![DeliverableKind::Processed]
    );
}

#[tokio::test]
async fn test_toggling_raw_shift_fix() {
    let backend = SimulatedBackend::new();
    let (app, persistence) = app_with(
        &backend,
        PresetPermissionGate::granted(),
        CameraSettings::default(),
    );
    app.setup_camera().await.unwrap();

    app.set_fix_raw_shift(true);
    assert!(app.session().settings().fix_raw_shift);
    assert_eq!(app.session().zoom_factor(), 1.0001);

    app.set_fix_raw_shift(false);
    assert_eq!(app.session().zoom_factor(), 1.0);

    assert!(app.capture().await);
    assert_eq!(persistence.persisted()[0].len(), 2);
}

#[tokio::test]
async fn test_use_raw_toggle_applies_to_next_capture() {
    let backend = SimulatedBackend::new();
    let (app, persistence) = app_with(
        &backend,
        PresetPermissionGate::granted(),
        CameraSettings::default(),
    );
    app.setup_camera().await.unwrap();

    app.set_use_raw(false);
    assert!(app.capture().await);
    assert!(!backend.last_photo_settings().unwrap().is_raw());
    assert_eq!(persistence.persisted()[0].len(), 1);
}

#[tokio::test]
async fn test_capture_end_to_end_into_album() {
    let scratch = tempdir().unwrap();
    let album = tempdir().unwrap();
    let mut config = CrabShutterConfig::default();
    config.storage.scratch_directory = scratch.path().to_path_buf();
    config.storage.album_directory = album.path().to_path_buf();
    config.storage.auto_organize_by_date = false;

    let app = CameraApp::from_config(
        Arc::new(SimulatedBackend::new()),
        Arc::new(PresetPermissionGate::granted()),
        &config,
    )
    .unwrap();

    app.setup_camera().await.unwrap();
    assert!(app.capture().await);

    let saved = app.session().saved_file().expect("saved file");
    assert!(saved.starts_with(album.path()));
    assert!(saved.exists());
    assert!(!app.session().is_processing());

    assert!(app.stop_camera().await);
    assert_eq!(app.session().state(), SessionState::Stopped);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = CrabShutterConfig::default();
    config.camera.zoom_ramp_rate = 0.0;

    let result = CameraApp::from_config(
        Arc::new(SimulatedBackend::new()),
        Arc::new(PresetPermissionGate::granted()),
        &config,
    );
    assert!(matches!(result, Err(CameraError::ConfigurationError(_))));
}
