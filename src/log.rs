//! Module-coded diagnostic channels.
//!
//! Every subsystem reports through these functions under a short module
//! code (`"TYPC"`, `"PASS"`, `"EQST"`, ...) so a reader can tell at a
//! glance which stage produced a message.
//!
//! | Channel | Gate | Stream |
//! |-----------|----------------------|--------|
//! | `error` | always (unless `-q`) | stderr |
//! | `warning` | always (unless `-q`) | stderr |
//! | `debug` | `--debug [N]` | stderr |
//! | `stat` | `--stats` | stdout |
//!
//! Stats are emitted one `key=value` per line so external benchmark
//! harnesses can scrape them.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::expr::Loc;
use crate::style::Style;

static DEBUG_LEVEL: AtomicU8 = AtomicU8::new(0);
static STATS_ENABLED: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

/// Set the debug verbosity (0 = none, 1 = basic, 2 = extra).
pub fn set_debug(level: u8) {
    DEBUG_LEVEL.store(level, Ordering::Relaxed);
}

/// Enable or disable `key=value` stat output on stdout.
pub fn set_stats(enabled: bool) {
    STATS_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Suppress or restore error/warning/debug output.
pub fn set_quiet(enabled: bool) {
    QUIET.store(enabled, Ordering::Relaxed);
}

fn quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Report an error attributed to `module`.
pub fn error(module: &str, msg: impl AsRef<str>) {
    if quiet() {
        return;
    }
    eprintln!("[{}] {}: {}", module, Style::bold_red("error"), msg.as_ref());
}

/// Report an error attributed to `module` at a known source location.
pub fn error_at(module: &str, msg: impl AsRef<str>, loc: Loc) {
    if quiet() {
        return;
    }
    eprintln!(
        "[{}] {} ({}): {}",
        module,
        Style::bold_red("error"),
        Style::blue(&loc.to_string()),
        msg.as_ref()
    );
}

/// Report an internal invariant violation. These indicate a compiler bug,
/// not a user mistake.
pub fn internal(module: &str, msg: impl AsRef<str>) {
    if quiet() {
        return;
    }
    eprintln!(
        "[{}] {}: {}",
        module,
        Style::bold_red("internal error"),
        msg.as_ref()
    );
}

/// Report a warning attributed to `module`.
pub fn warning(module: &str, msg: impl AsRef<str>) {
    if quiet() {
        return;
    }
    eprintln!(
        "[{}] {}: {}",
        module,
        Style::bold_yellow("warning"),
        msg.as_ref()
    );
}

/// Report a warning at a known source location.
pub fn warning_at(module: &str, msg: impl AsRef<str>, loc: Loc) {
    if quiet() {
        return;
    }
    eprintln!(
        "[{}] {} ({}): {}",
        module,
        Style::bold_yellow("warning"),
        Style::blue(&loc.to_string()),
        msg.as_ref()
    );
}

/// Emit a debug message when the configured verbosity is at least `level`.
pub fn debug(module: &str, level: u8, msg: impl AsRef<str>) {
    if quiet() || DEBUG_LEVEL.load(Ordering::Relaxed) < level {
        return;
    }
    eprintln!("[{}] {}: {}", module, Style::cyan("debug"), msg.as_ref());
}

/// Emit a `key=value` stat line on stdout when stats are enabled.
pub fn stat(_module: &str, key_value: impl AsRef<str>) {
    if !STATS_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    println!("{}", key_value.as_ref());
}
