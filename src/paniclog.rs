use std::any::Any;
use std::backtrace::Backtrace;
use std::fs::OpenOptions;
use std::io::Write;

/// Extracts the human-readable message from a panic payload.
pub fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

/// Appends a panic report to the log file: the `panic:` line the wrapper's
/// tail watches for, followed by a backtrace. Best-effort; there is nowhere
/// left to report failures to.
pub fn append(path: &str, message: &str) {
    if path.is_empty() {
        return;
    }
    if let Ok(mut file) = OpenOptions::new().append(true).create(true).open(path) {
        let trace = Backtrace::force_capture();
        let _ = writeln!(file, "panic: {}", message);
        let _ = writeln!(file, "{}", trace);
    }
}
