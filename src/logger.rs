#[cfg(test)]
mod tests;

use {
    crate::{config::FlipConfig, utils::oserror::OsError},
    backtrace::Backtrace,
    log::{Level, Log, Metadata, Record},
    std::{
        cell::RefCell,
        ffi::CString,
        io::Write,
        os::unix::ffi::OsStrExt,
        path::{Path, PathBuf},
        sync::{
            Arc,
            atomic::{AtomicU32, Ordering::Relaxed},
        },
        time::SystemTime,
    },
    thiserror::Error,
    uapi::{Fd, OwnedFd, c},
};

thread_local! {
    static BUFFER: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Could not dup stderr")]
    Dup(#[source] OsError),
    #[error("Could not open log file {}", .0.display())]
    Open(PathBuf, #[source] OsError),
    #[error("Log path contains a nul byte")]
    NulByte,
    #[error("A logger has already been installed")]
    AlreadyInstalled,
}

pub struct Logger {
    level: AtomicU32,
    path: Option<PathBuf>,
    file: OwnedFd,
}

impl Logger {
    pub fn install_stderr(config: &FlipConfig) -> Result<Arc<Self>, LoggerError> {
        let file = uapi::fcntl_dupfd_cloexec(2, 0).map_err(|e| LoggerError::Dup(e.into()))?;
        Self::install(config.log_level.into(), None, file)
    }

    /// Appends to the file at `path`. Panics are logged with a backtrace.
    pub fn install_file(config: &FlipConfig, path: &Path) -> Result<Arc<Self>, LoggerError> {
        let cpath =
            CString::new(path.as_os_str().as_bytes()).map_err(|_| LoggerError::NulByte)?;
        let file = uapi::open(
            &*cpath,
            c::O_CREAT | c::O_APPEND | c::O_CLOEXEC | c::O_WRONLY,
            0o644,
        )
        .map_err(|e| LoggerError::Open(path.to_path_buf(), e.into()))?;
        let slf = Self::install(config.log_level.into(), Some(path.to_path_buf()), file)?;
        std::panic::set_hook(Box::new(|p| {
            match p.location() {
                Some(loc) => log::error!(
                    "Panic at {} line {} column {}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                ),
                None => log::error!("Panic at unknown location"),
            }
            if let Some(msg) = p.payload().downcast_ref::<&str>() {
                log::error!("Message: {}", msg);
            }
            if let Some(msg) = p.payload().downcast_ref::<String>() {
                log::error!("Message: {}", msg);
            }
            log::error!("Backtrace:\n{:?}", Backtrace::new());
        }));
        Ok(slf)
    }

    fn install(level: Level, path: Option<PathBuf>, file: OwnedFd) -> Result<Arc<Self>, LoggerError> {
        let slf = Arc::new(Self {
            level: AtomicU32::new(level as _),
            path,
            file,
        });
        log::set_boxed_logger(Box::new(LogWrapper {
            logger: slf.clone(),
        }))
        .map_err(|_| LoggerError::AlreadyInstalled)?;
        log::set_max_level(level.to_level_filter());
        Ok(slf)
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as _, Relaxed);
        log::set_max_level(level.to_level_filter());
    }

    /// Applies the log level of a reloaded config.
    pub fn apply_config(&self, config: &FlipConfig) {
        self.set_level(config.log_level.into());
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn enabled(&self, level: Level) -> bool {
        level as u32 <= self.level.load(Relaxed)
    }
}

struct LogWrapper {
    logger: Arc<Logger>,
}

impl Log for LogWrapper {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.logger.enabled(metadata.level())
    }

    fn log(&self, record: &Record) {
        if !self.logger.enabled(record.level()) {
            return;
        }
        BUFFER.with_borrow_mut(|buffer| {
            buffer.clear();
            format_record(buffer, SystemTime::now(), record);
            let mut fd = Fd::new(self.logger.file.raw());
            let _ = fd.write_all(buffer);
        });
    }

    fn flush(&self) {
        // nothing
    }
}

fn format_record(buffer: &mut Vec<u8>, now: SystemTime, record: &Record) {
    let now = humantime::format_rfc3339_millis(now);
    let _ = match record.module_path() {
        Some(mp) => writeln!(
            buffer,
            "[{} {:5} {}] {}",
            now,
            record.level(),
            mp,
            record.args(),
        ),
        None => writeln!(buffer, "[{} {:5}] {}", now, record.level(), record.args()),
    };
}
