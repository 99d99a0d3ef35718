//! Run-scoped logging context
//!
//! There is no process-global logger: a [`RunLogger`] is constructed
//! explicitly for one training run and injected into whatever needs it.
//! Log files rotate by filename timestamp at construction, so restarting
//! a run never appends to a stale file.

use crate::Result;
use chrono::Local;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Log severity, ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Line-oriented log sink scoped to a single run
pub struct RunLogger {
    name: String,
    min_level: Level,
    file: Option<RefCell<File>>,
    file_path: Option<PathBuf>,
    mirror_stderr: bool,
}

impl RunLogger {
    /// Logger writing to `{dir}/{name}_{YYYY_MM_DD_HHh}.log` and stderr
    pub fn to_file(name: &str, dir: &Path) -> Result<Self> {
        let timestamp = Local::now().format("%Y_%m_%d_%Hh");
        let path = dir.join(format!("{name}_{timestamp}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            name: name.to_string(),
            min_level: Level::Debug,
            file: Some(RefCell::new(file)),
            file_path: Some(path),
            mirror_stderr: true,
        })
    }

    /// Logger writing to stderr only
    pub fn to_stderr(name: &str) -> Self {
        Self {
            name: name.to_string(),
            min_level: Level::Debug,
            file: None,
            file_path: None,
            mirror_stderr: true,
        }
    }

    /// Logger that discards everything (tests)
    pub fn silent() -> Self {
        Self {
            name: String::new(),
            min_level: Level::Error,
            file: None,
            file_path: None,
            mirror_stderr: false,
        }
    }

    /// Drop records below `level`
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Path of the log file, if writing to one
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Emit one record
    pub fn log(&self, level: Level, message: &str) {
        if level < self.min_level {
            return;
        }
        let line = format!(
            "{} - {} - {} - {}",
            Local::now().format("%d/%m/%Y %H:%M:%S"),
            self.name,
            level.as_str(),
            message
        );
        if let Some(file) = &self.file {
            // A full disk must not take training down with it.
            let _ = writeln!(file.borrow_mut(), "{line}");
        }
        if self.mirror_stderr {
            eprintln!("{line}");
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}
