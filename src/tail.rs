use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL_DELAY: Duration = Duration::from_millis(100);
const BUFFER_SIZE: usize = 32 * 1024;

/// Tails a file that another process is still appending to, forwarding
/// complete lines to a sink. On EOF the reader retries with a bounded
/// delay until stopped, then drains whatever is left.
///
/// The wrapper uses this to reproduce the inner stage's log file into its
/// own logger, and to notice a `panic:` line the inner stage left behind.
pub struct LogTail {
    stop: Arc<AtomicBool>,
    panic_line: Arc<Mutex<Option<String>>>,
    handle: Option<JoinHandle<()>>,
}

impl LogTail {
    /// Starts tailing into the process logger.
    pub fn start(path: &Path) -> LogTail {
        LogTail::start_with(path, |line| log::info!(target: "wrapped", "{}", line))
    }

    /// Starts tailing with a custom line sink.
    pub fn start_with<F>(path: &Path, sink: F) -> LogTail
    where
        F: Fn(&str) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let panic_line = Arc::new(Mutex::new(None));
        let handle = {
            let path = path.to_path_buf();
            let stop = Arc::clone(&stop);
            let panic_line = Arc::clone(&panic_line);
            thread::spawn(move || run(&path, &stop, &panic_line, sink))
        };
        LogTail { stop, panic_line, handle: Some(handle) }
    }

    /// Stops the tail after draining remaining data. Returns the captured
    /// `panic:` line, if the tailed process left one.
    pub fn stop(mut self) -> Option<String> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.panic_line.lock().unwrap().take()
    }
}

fn run<F>(path: &Path, stop: &AtomicBool, panic_line: &Mutex<Option<String>>, sink: F)
where
    F: Fn(&str),
{
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(err) => {
            log::error!("tail {}: {}", path.display(), err);
            return;
        }
    };

    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        match file.read(&mut buf) {
            Ok(0) => {
                // Caught up. The writer may not be done yet; only a stop
                // request ends the tail.
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                thread::sleep(POLL_DELAY);
            }
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                    let rest = pending.split_off(pos + 1);
                    pending.pop();
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    forward(&line, panic_line, &sink);
                    pending = rest;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => {
                // Transient read errors get the same bounded retry as EOF.
                if stop.load(Ordering::SeqCst) {
                    log::error!("tail {}: {}", path.display(), err);
                    break;
                }
                thread::sleep(POLL_DELAY);
            }
        }
    }

    // A partial last line still gets reported.
    if !pending.is_empty() {
        let line = String::from_utf8_lossy(&pending).into_owned();
        forward(&line, panic_line, &sink);
    }
}

fn forward<F: Fn(&str)>(line: &str, panic_line: &Mutex<Option<String>>, sink: &F) {
    if line.starts_with("panic: ") {
        let mut slot = panic_line.lock().unwrap();
        if slot.is_none() {
            *slot = Some(line.to_string());
        }
    }
    sink(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn collecting(path: &Path) -> (LogTail, Arc<Mutex<Vec<String>>>) {
        let lines: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let lines = Arc::clone(&lines);
            move |line: &str| lines.lock().unwrap().push(line.to_string())
        };
        (LogTail::start_with(path, sink), lines)
    }

    #[test]
    fn forwards_appended_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        let (tail, lines) = collecting(file.path());

        writeln!(file, "second").unwrap();
        file.flush().unwrap();
        // Give the reader a couple of poll cycles to catch up.
        thread::sleep(Duration::from_millis(300));

        assert!(tail.stop().is_none());
        assert_eq!(*lines.lock().unwrap(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn drains_after_stop() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let (tail, lines) = collecting(file.path());
        thread::sleep(Duration::from_millis(150));

        writeln!(file, "late").unwrap();
        file.flush().unwrap();
        // Written but possibly unread when stop lands: must still drain.
        thread::sleep(Duration::from_millis(150));
        tail.stop();
        assert_eq!(*lines.lock().unwrap(), vec!["late".to_string()]);
    }

    #[test]
    fn reports_partial_last_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "no trailing newline").unwrap();
        file.flush().unwrap();
        let (tail, lines) = collecting(file.path());
        thread::sleep(Duration::from_millis(150));
        tail.stop();
        assert_eq!(*lines.lock().unwrap(), vec!["no trailing newline".to_string()]);
    }

    #[test]
    fn captures_panic_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "some log output").unwrap();
        writeln!(file, "panic: great sadness").unwrap();
        writeln!(file, "stack trace line").unwrap();
        file.flush().unwrap();

        let (tail, lines) = collecting(file.path());
        thread::sleep(Duration::from_millis(150));
        let captured = tail.stop();
        assert_eq!(captured.as_deref(), Some("panic: great sadness"));
        assert_eq!(lines.lock().unwrap().len(), 3);
    }
}
