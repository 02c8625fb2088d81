//! Logging setup: colored console output plus an optional plain log file

use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Logger writing colored messages to the console and, when configured,
/// plain-text copies of every message to a log file
pub struct ChimeraMapLogger {
    console_level: LevelFilter,
    file_writer: Option<Mutex<Box<dyn Write + Send>>>,
}

impl ChimeraMapLogger {
    pub fn new(verbose: bool, log_file: Option<&Path>) -> Result<Self, std::io::Error> {
        let console_level = if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };

        let file_writer = match log_file {
            Some(log_path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(log_path)?;
                Some(Mutex::new(Box::new(file) as Box<dyn Write + Send>))
            }
            None => None,
        };

        Ok(ChimeraMapLogger {
            console_level,
            file_writer,
        })
    }

    fn colored_level(level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN".yellow().bold(),
            Level::Info => "INFO".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".purple().bold(),
        }
    }
}

impl log::Log for ChimeraMapLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.file_writer.is_some() || metadata.level() <= self.console_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let level = record.level();

        if level <= self.console_level {
            let message = format!(
                "[{} {}] {}",
                timestamp.to_string().dimmed(),
                Self::colored_level(level),
                record.args()
            );
            if level == Level::Error || level == Level::Warn {
                eprintln!("{}", message);
            } else {
                println!("{}", message);
            }
        }

        if let Some(ref file_writer) = self.file_writer {
            if let Ok(mut writer) = file_writer.lock() {
                let _ = writeln!(writer, "[{} {}] {}", timestamp, level, record.args());
                let _ = writer.flush();
            }
        }
    }

    fn flush(&self) {
        if let Some(ref file_writer) = self.file_writer {
            if let Ok(mut writer) = file_writer.lock() {
                let _ = writer.flush();
            }
        }
    }
}

/// Install the logger; the file (when given) receives all levels, the
/// console is filtered by the verbosity switch
pub fn init_logger(verbose: bool, log_file: Option<&Path>) -> Result<(), anyhow::Error> {
    let logger = ChimeraMapLogger::new(verbose, log_file)
        .map_err(|e| anyhow::anyhow!("Failed to create logger: {}", e))?;

    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;
    log::set_max_level(LevelFilter::Debug);

    Ok(())
}
