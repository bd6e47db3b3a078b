//! Run narration. Mirrors the teacher's own stdout/stderr wrapper
//! (`vizier-core::observer::Console`) rather than pulling in a logging
//! facade: a thin set of helpers that prefix each line and honor `--debug`
//! for verbose/progress output, as spec.md §6 describes for the `debug` flag.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG: AtomicBool = AtomicBool::new(false);

pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

pub fn info(scope: &str, message: impl std::fmt::Display) {
    println!("[{scope}] {message}");
}

pub fn warn(scope: &str, message: impl std::fmt::Display) {
    eprintln!("[{scope}] warning: {message}");
}

pub fn error(scope: &str, message: impl std::fmt::Display) {
    eprintln!("[{scope}] error: {message}");
}

/// Only emitted when `--debug` is set, e.g. Fetch Pool clone progress.
pub fn debug(scope: &str, message: impl std::fmt::Display) {
    if debug_enabled() {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        let _ = writeln!(handle, "[{scope}] debug: {message}");
    }
}
