use std::io::stderr;
use std::sync::OnceLock;

use log::set_logger;
use log::set_max_level;
use log::LevelFilter;
use log::Log;
use log::Metadata;
use log::Record;
use log::SetLoggerError;

/// Writes `LEVEL message` lines to stderr, one `write_all` per record.
pub struct Logger;

impl Logger {
    /// Install the global logger, mapping a `-v` occurrence count onto the
    /// original tool's three verbosity levels (`DEBUG_NORMAL`/`DEBUG_VERBOSE`/
    /// `DEBUG_SPAM`): zero occurrences is `Warn`, one is `Info`, two or more
    /// is `Trace`.
    pub fn init(verbosity: u8) -> Result<(), SetLoggerError> {
        let max_level = match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Trace,
        };
        set_logger(LOGGER.get_or_init(move || Logger)).map(|()| set_max_level(max_level))
    }
}

impl Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        use std::fmt::Write;
        let mut buffer = String::with_capacity(4096);
        if writeln!(&mut buffer, "{} {}", record.level(), record.args()).is_ok() {
            use std::io::Write;
            let _ = stderr().write_all(buffer.as_bytes());
        }
    }

    fn flush(&self) {
        use std::io::Write;
        let _ = stderr().flush();
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();
