use {
    crate::{
        config::{FlipConfig, LogLevel},
        logger::{Logger, format_record},
    },
    log::{Level, Record},
    std::{
        fs,
        time::{Duration, SystemTime},
    },
};

#[test]
fn line_format() {
    let mut buf = vec![];
    let now = SystemTime::UNIX_EPOCH + Duration::from_millis(1_500);
    format_record(
        &mut buf,
        now,
        &Record::builder()
            .level(Level::Warn)
            .module_path(Some("jay_flip::flip"))
            .args(format_args!("flip queue retry"))
            .build(),
    );
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        "[1970-01-01T00:00:01.500Z WARN  jay_flip::flip] flip queue retry\n",
    );
}

// The only test that installs the global logger.
#[test]
fn file_logger_follows_config() {
    let path = std::env::temp_dir().join(format!("jay-flip-{}.log", std::process::id()));
    let _ = fs::remove_file(&path);
    let config = FlipConfig {
        log_level: LogLevel::Debug,
        ..Default::default()
    };
    let logger = Logger::install_file(&config, &path).unwrap();
    assert_eq!(logger.path(), Some(path.as_path()));
    log::debug!("before reload");
    logger.apply_config(&FlipConfig {
        log_level: LogLevel::Warn,
        ..Default::default()
    });
    log::debug!("after reload");
    log::warn!("still logged");
    let log = fs::read_to_string(&path).unwrap();
    let _ = fs::remove_file(&path);
    assert!(log.contains("DEBUG jay_flip::logger::tests] before reload\n"));
    assert!(!log.contains("after reload"));
    assert!(log.contains("WARN  jay_flip::logger::tests] still logged\n"));
}
