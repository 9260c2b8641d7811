use {
    base::logging::{FileLogger, StdoutLogger, format_today, level_from_env},
    log::{LevelFilter, Log},
    std::fs,
};

#[test]
fn test_stdout_logger_respects_level() {
    let logger = StdoutLogger::new(LevelFilter::Warn);
    let info = log::MetadataBuilder::new().level(log::Level::Info).build();
    let error = log::MetadataBuilder::new().level(log::Level::Error).build();
    assert!(!logger.enabled(&info));
    assert!(logger.enabled(&error));
}

#[test]
fn test_file_logger_writes_day_file() {
    let dir = std::env::temp_dir().join(format!("vision-log-test-{}-write", std::process::id()));
    let _ = fs::remove_dir_all(&dir);

    let logger = FileLogger::new(&dir, LevelFilter::Info).expect("create logger");
    logger.log(
        &log::RecordBuilder::new()
            .level(log::Level::Info)
            .file(Some("worker.rs"))
            .line(Some(7))
            .args(format_args!("frame skipped"))
            .build(),
    );
    logger.log(
        &log::RecordBuilder::new()
            .level(log::Level::Debug)
            .args(format_args!("filtered out"))
            .build(),
    );
    logger.flush();

    let content = fs::read_to_string(dir.join(format!("{}.log", format_today()))).unwrap();
    assert!(content.contains("frame skipped"));
    assert!(content.contains("worker.rs:7"));
    assert!(!content.contains("filtered out"));
    assert_eq!(logger.dir(), dir);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_level_from_env_fallback() {
    assert_eq!(
        level_from_env("VISION_TEST_UNSET_LEVEL_VAR", LevelFilter::Info),
        LevelFilter::Info
    );
}
