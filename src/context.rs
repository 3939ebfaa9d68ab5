//! Per-run execution state: the item fetcher, the log sink and the log
//! entries accumulated while a script runs.

use std::cell::RefCell;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fetcher::ItemFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(text)
    }
}

/// One audit line. `group` is usually the command name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub group: String,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<5} [{}] {}",
            self.timestamp.to_rfc3339(),
            self.level,
            self.group,
            self.message
        )
    }
}

/// Receives every entry as it is logged.
pub trait LogSink {
    fn log(&self, entry: &LogEntry);
}

/// Forwards entries to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, entry: &LogEntry) {
        log::log!(
            target: "clove_script::run",
            log::Level::from(entry.level),
            "[{}] {}",
            entry.group,
            entry.message
        );
    }
}

/// Keeps a copy of every entry; handy when embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RefCell<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }
}

impl LogSink for MemorySink {
    fn log(&self, entry: &LogEntry) {
        self.entries.borrow_mut().push(entry.clone());
    }
}

/// State for exactly one script run. Built fresh for each run and consumed
/// when the run finishes.
pub struct ExecutionContext<'a> {
    fetcher: &'a dyn ItemFetcher,
    sink: &'a dyn LogSink,
    entries: Vec<LogEntry>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(fetcher: &'a dyn ItemFetcher, sink: &'a dyn LogSink) -> Self {
        ExecutionContext {
            fetcher,
            sink,
            entries: Vec::new(),
        }
    }

    pub fn fetcher(&self) -> &'a dyn ItemFetcher {
        self.fetcher
    }

    pub fn log(&mut self, level: LogLevel, group: &str, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            group: group.to_string(),
            message: message.into(),
        };
        self.sink.log(&entry);
        self.entries.push(entry);
    }

    pub fn debug(&mut self, group: &str, message: impl Into<String>) {
        self.log(LogLevel::Debug, group, message);
    }

    pub fn info(&mut self, group: &str, message: impl Into<String>) {
        self.log(LogLevel::Info, group, message);
    }

    pub fn warn(&mut self, group: &str, message: impl Into<String>) {
        self.log(LogLevel::Warning, group, message);
    }

    pub fn error(&mut self, group: &str, message: impl Into<String>) {
        self.log(LogLevel::Error, group, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}
