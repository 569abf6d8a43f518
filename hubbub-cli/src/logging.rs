//! In-memory log ring shared between the logger and the TUI log pane.
//!
//! Printing to the terminal while raw mode and the alternate screen are
//! active would corrupt the display, so records accumulate in a bounded
//! ring the UI renders on demand. `play` mode has no TUI and mirrors
//! records to stderr instead.

use log::{LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::JoinHandle;

const LOG_CAPACITY: usize = 400;

pub type LogBuffer = Arc<Mutex<VecDeque<String>>>;

struct RingLogger {
    level: LevelFilter,
    buffer: LogBuffer,
    echo_stderr: bool,
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format!("[{}] {}", record.level(), record.args());
        if self.echo_stderr {
            eprintln!("{}", line);
        }
        push_line(&self.buffer, line);
    }

    fn flush(&self) {}
}

fn push_line(buffer: &LogBuffer, line: String) {
    let mut buffer = buffer.lock().unwrap();
    if buffer.len() >= LOG_CAPACITY {
        buffer.pop_front();
    }
    buffer.push_back(line);
}

static BUFFER: OnceLock<LogBuffer> = OnceLock::new();
static LOGGER: OnceLock<RingLogger> = OnceLock::new();

/// Pick the log level from the `--log-level` flag, falling back to the
/// `HUBBUB_LOG` environment variable, then to `info`.
pub fn level_from(flag: Option<&str>) -> LevelFilter {
    let name = match flag {
        Some(value) => Some(value.to_string()),
        None => std::env::var("HUBBUB_LOG").ok(),
    };

    match name.as_deref().unwrap_or("info").to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Install the ring logger and hand back its buffer.
pub fn init(level: LevelFilter, echo_stderr: bool) -> LogBuffer {
    let buffer = BUFFER
        .get_or_init(|| Arc::new(Mutex::new(VecDeque::with_capacity(LOG_CAPACITY))))
        .clone();

    let logger = LOGGER.get_or_init(|| RingLogger {
        level,
        buffer: Arc::clone(&buffer),
        echo_stderr,
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }

    buffer
}

pub fn snapshot(buffer: &LogBuffer) -> Vec<String> {
    buffer.lock().unwrap().iter().cloned().collect()
}

/// Routes the process stderr into the log ring while alive.
///
/// Audio backends write diagnostics straight to fd 2, which tears up a
/// raw-mode terminal. The guard swaps fd 2 for a pipe whose read end a
/// thread drains into the ring; dropping the guard puts the original fd
/// back, which closes the pipe and ends the thread.
pub struct StderrRedirect {
    saved_fd: RawFd,
    reader: Option<JoinHandle<()>>,
}

pub fn redirect_stderr(buffer: LogBuffer) -> Option<StderrRedirect> {
    let stderr_fd = std::io::stderr().as_raw_fd();
    let mut pipe_fds = [0; 2];
    if unsafe { libc::pipe(pipe_fds.as_mut_ptr()) } != 0 {
        return None;
    }
    let [read_fd, write_fd] = pipe_fds;

    let saved_fd = unsafe { libc::dup(stderr_fd) };
    if saved_fd < 0 || unsafe { libc::dup2(write_fd, stderr_fd) } < 0 {
        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
            if saved_fd >= 0 {
                libc::close(saved_fd);
            }
        }
        return None;
    }
    // fd 2 now holds the write end open; the duplicate is redundant.
    unsafe { libc::close(write_fd) };

    let reader = std::thread::spawn(move || {
        let pipe = unsafe { std::fs::File::from_raw_fd(read_fd) };
        for line in BufReader::new(pipe).lines() {
            let Ok(line) = line else { break };
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            push_line(&buffer, format!("[stderr] {}", trimmed));
        }
    });

    Some(StderrRedirect {
        saved_fd,
        reader: Some(reader),
    })
}

impl Drop for StderrRedirect {
    fn drop(&mut self) {
        let stderr_fd = std::io::stderr().as_raw_fd();
        unsafe {
            libc::dup2(self.saved_fd, stderr_fd);
            libc::close(self.saved_fd);
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}
