//! Backend for the `log` facade used by the command-line tool.
//!
//! Lines go to stderr as `[LEVEL] message`, warnings in yellow and errors
//! in red, so they never mix with program output on stdout.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

struct StderrLogger {
    level: LevelFilter,
}

fn color_for(level: Level) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match level {
        Level::Error => {
            spec.set_fg(Some(Color::Red)).set_bold(true);
        }
        Level::Warn => {
            spec.set_fg(Some(Color::Yellow)).set_bold(true);
        }
        Level::Debug | Level::Trace => {
            spec.set_dimmed(true);
        }
        Level::Info => {}
    }
    spec
}

/// Write one formatted record to `out`.
fn write_record(out: &mut dyn WriteColor, level: Level, message: &str) -> std::io::Result<()> {
    out.set_color(&color_for(level))?;
    write!(out, "[{}]", level)?;
    out.reset()?;
    writeln!(out, " {}", message)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = StandardStream::stderr(ColorChoice::Auto);
        // a failed diagnostic write has nowhere to be reported
        let _ = write_record(&mut stderr, record.level(), &record.args().to_string());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the logger. Fails if another logger is already set.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(StderrLogger { level }))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::NoColor;

    #[test]
    fn test_record_format() {
        let mut out = NoColor::new(Vec::new());
        write_record(&mut out, Level::Warn, "weak scope left open").unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert_eq!(text, "[WARN] weak scope left open\n");
    }

    #[test]
    fn test_level_filter() {
        let logger = StderrLogger {
            level: LevelFilter::Info,
        };
        let debug = Metadata::builder().level(Level::Debug).build();
        let error = Metadata::builder().level(Level::Error).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&error));
    }
}
