use {
    anyhow::Result,
    log::{LevelFilter, Log, Metadata, Record},
    std::{
        fs::{File, OpenOptions, create_dir_all},
        io::Write,
        path::PathBuf,
        sync::Mutex,
        time::{SystemTime, UNIX_EPOCH},
    },
};

const SECS_PER_DAY: u64 = 86_400;

/// Wall clock split into (days since epoch, seconds into the day, millis).
fn wall_clock() -> (u64, u64, u32) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs();
    (secs / SECS_PER_DAY, secs % SECS_PER_DAY, now.subsec_millis())
}

/// Format current time as `YYYY-MM-DDTHH:MM:SS.mmm` (UTC).
pub fn format_timestamp() -> String {
    let (days, time_of_day, millis) = wall_clock();
    let (year, month, day) = date_from_days(days as i64);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60,
        millis
    )
}

/// Format current date as `YYYY-MM-DD` (UTC).
pub fn format_today() -> String {
    let (days, _, _) = wall_clock();
    let (year, month, day) = date_from_days(days as i64);
    format!("{:04}-{:02}-{:02}", year, month, day)
}

// proleptic gregorian date from a day count (Hinnant's days_from_civil inverse)
pub(crate) fn date_from_days(days: i64) -> (i64, u32, u32) {
    let shifted = days + 719_468;
    let era = shifted.div_euclid(146_097);
    let day_of_era = shifted.rem_euclid(146_097) as u32;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let month_index = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * month_index + 2) / 5 + 1;
    let month = if month_index < 10 {
        month_index + 3
    } else {
        month_index - 9
    };
    let year = year_of_era as i64 + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

/// One formatted log line. Worker threads are named after their camera, so
/// the thread name tells which camera a message belongs to.
fn format_record(record: &Record) -> String {
    let thread = std::thread::current();
    format!(
        "{} {:<5} [{}] {}:{} - {}",
        format_timestamp(),
        record.level(),
        thread.name().unwrap_or("unnamed"),
        record.file().unwrap_or("unknown"),
        record.line().unwrap_or(0),
        record.args()
    )
}

/// Logger that prints every record to stdout.
pub struct StdoutLogger {
    level: LevelFilter,
}

impl StdoutLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl Log for StdoutLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{}", format_record(record));
        }
    }

    fn flush(&self) {
        std::io::stdout().flush().ok();
    }
}

struct FileLoggerState {
    dir: PathBuf,
    current_date: String,
    file: File,
}

/// Logger writing to `<dir>/<date>.log`, switching files when the day changes.
pub struct FileLogger {
    level: LevelFilter,
    state: Mutex<FileLoggerState>,
}

fn open_day_file(dir: &PathBuf, date: &str) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(format!("{}.log", date)))
}

impl FileLogger {
    pub fn new(dir: impl Into<PathBuf>, level: LevelFilter) -> Result<Self> {
        let dir = dir.into();
        create_dir_all(&dir)?;
        let current_date = format_today();
        let file = open_day_file(&dir, &current_date)?;
        Ok(Self {
            level,
            state: Mutex::new(FileLoggerState {
                dir,
                current_date,
                file,
            }),
        })
    }

    /// Directory the day files are written to.
    pub fn dir(&self) -> PathBuf {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .dir
            .clone()
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(record);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let today = format_today();
        if today != state.current_date {
            match open_day_file(&state.dir, &today) {
                Ok(file) => {
                    state.file = file;
                    state.current_date = today;
                }
                Err(error) => eprintln!("cannot roll log over to {}: {}", today, error),
            }
        }
        if let Err(error) = writeln!(state.file, "{}", line) {
            eprintln!("cannot write log file: {}", error);
            eprintln!("{}", line);
        }
    }

    fn flush(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.file.flush().ok();
    }
}

/// Parse a level filter from an environment variable, falling back to `default`.
pub fn level_from_env(var: &str, default: LevelFilter) -> LevelFilter {
    std::env::var(var)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Install a `StdoutLogger`. Only the first install per process wins.
pub fn init_stdout_logger(level: LevelFilter) {
    // set_logger needs a &'static logger
    if log::set_logger(Box::leak(Box::new(StdoutLogger::new(level)))).is_ok() {
        log::set_max_level(level);
    }
}

/// Install a `FileLogger` writing into `dir`.
pub fn init_file_logger(dir: impl Into<PathBuf>, level: LevelFilter) -> Result<()> {
    let logger = FileLogger::new(dir, level)?;
    if log::set_logger(Box::leak(Box::new(logger))).is_ok() {
        log::set_max_level(level);
    }
    Ok(())
}

/// Log at error level, flush, and terminate the process.
#[macro_export]
macro_rules! log_fatal {
    ($($arg:tt)*) => {{
        $crate::log::error!($($arg)*);
        $crate::log::logger().flush();
        std::process::exit(1);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_days_epoch() {
        assert_eq!(date_from_days(0), (1970, 1, 1));
    }

    #[test]
    fn test_date_from_days_leap_day() {
        assert_eq!(date_from_days(11_016), (2000, 2, 29));
    }

    #[test]
    fn test_date_from_days_before_epoch() {
        assert_eq!(date_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn test_timestamp_layout() {
        let ts = format_timestamp();
        assert_eq!(ts.len(), 23);
        assert_eq!(&ts[10..11], "T");
        assert_eq!(&ts[19..20], ".");
    }
}
