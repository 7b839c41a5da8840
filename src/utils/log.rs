// src/utils/log.rs

//! Operator console output.
//!
//! Timestamped, leveled lines for the pipeline entry points. Library
//! modules report through the `log` crate facade; this module carries
//! the structured cycle output an operator watches on the console.

use std::sync::OnceLock;

use chrono::Local;

/// Console verbosity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Parse a configured level name; anything unrecognized (including
    /// "debug") shows everything.
    fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "warn" | "warning" => Level::Warn,
            "error" => Level::Error,
            _ => Level::Info,
        }
    }
}

static THRESHOLD: OnceLock<Level> = OnceLock::new();

/// Set the console threshold from the configured level name.
pub fn init(level: &str) {
    let _ = THRESHOLD.set(Level::parse(level));
}

fn enabled_at(level: Level, threshold: Level) -> bool {
    level >= threshold
}

fn enabled(level: Level) -> bool {
    enabled_at(level, THRESHOLD.get().copied().unwrap_or(Level::Info))
}

fn line(level: Level, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [{}] {}", timestamp, level.label(), message)
}

/// Informational progress line.
pub fn info(message: &str) {
    if enabled(Level::Info) {
        println!("{}", line(Level::Info, message));
    }
}

/// Warning line, on stderr.
pub fn warn(message: &str) {
    if enabled(Level::Warn) {
        eprintln!("{}", line(Level::Warn, message));
    }
}

/// Error line, on stderr.
pub fn error(message: &str) {
    if enabled(Level::Error) {
        eprintln!("{}", line(Level::Error, message));
    }
}

/// Completion line; shown regardless of threshold.
pub fn success(message: &str) {
    println!("{}", line(Level::Info, message));
}

/// Bordered section header.
pub fn header(title: &str) {
    if enabled(Level::Info) {
        let border = "═".repeat(60);
        println!("{}", line(Level::Info, &border));
        println!("{}", line(Level::Info, &format!("  {}", title)));
        println!("{}", line(Level::Info, &border));
    }
}

/// Key/value block summarizing a finished run.
pub fn summary(title: &str, items: &[(&str, String)]) {
    if enabled(Level::Info) {
        println!();
        println!("{}", line(Level::Info, &format!("[SUMMARY] {}", title)));
        for (key, value) in items {
            println!("{}", line(Level::Info, &format!("    {}: {}", key, value)));
        }
    }
}
