use std::io::Write;
use std::time::Duration;

use nmprio::ScanTrigger;
use nmprio_daemon::config::{ConfigError, DaemonConfig};

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = DaemonConfig::load(&dir.path().join("daemon.yml")).unwrap();
    assert_eq!(config, DaemonConfig::default());
}

#[test]
fn full_file_is_applied() {
    let file = write_config(
        r#"
poll_interval_secs: 15
priority_offset: 50
backoff:
  initial_ms: 250
  factor: 1.5
  max_secs: 60
scan_command: []
lock_file: /run/nmprio/daemon.lock
"#,
    );

    let config = DaemonConfig::load(file.path()).unwrap();
    let engine = config.engine_config();

    assert_eq!(engine.poll_interval, Duration::from_secs(15));
    assert_eq!(engine.priority_offset, 50);
    assert_eq!(engine.backoff.initial, Duration::from_millis(250));
    assert_eq!(engine.backoff.factor, 1.5);
    assert_eq!(engine.backoff.max, Duration::from_secs(60));
    assert_eq!(config.scan_trigger(), ScanTrigger::Dbus);
    assert_eq!(
        config.lock_file.as_deref(),
        Some(std::path::Path::new("/run/nmprio/daemon.lock"))
    );
}

#[test]
fn parse_error_names_the_file() {
    let file = write_config("poll_interval_secs: [not, a, number]\n");

    let err = DaemonConfig::load(file.path()).unwrap_err();
    match &err {
        ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
        other => panic!("expected parse error, got {other:?}"),
    }
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn invalid_values_are_rejected_on_load() {
    let file = write_config("backoff:\n  factor: 0.9\n");
    assert!(matches!(
        DaemonConfig::load(file.path()),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn unreadable_path_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be read as a file.
    assert!(matches!(
        DaemonConfig::load(dir.path()),
        Err(ConfigError::Read { .. })
    ));
}
