//! # Debugging and Logging Utilities
//!
//! Conditional logging and phase timing for the compiler pipeline, gated
//! by environment variables so that release binaries stay quiet.

use std::time::Instant;

/// Debugging is enabled by the `CAC_DEBUG` environment variable or by a
/// debug build.
pub fn is_debug_enabled() -> bool {
    std::env::var("CAC_DEBUG").is_ok() || cfg!(debug_assertions)
}

/// Phase timing is enabled by the `CAC_VERBOSE` environment variable.
pub fn is_perf_enabled() -> bool {
    std::env::var("CAC_VERBOSE").is_ok()
}

/// Logs a lexer-phase message when debugging is enabled.
pub fn log_lexer(message: &str) {
    if is_debug_enabled() {
        println!("LEXER: {}", message);
    }
}

/// Logs a parser-phase message when debugging is enabled.
pub fn log_parser(message: &str) {
    if is_debug_enabled() {
        println!("PARSER: {}", message);
    }
}

/// Logs a code-generation message when debugging is enabled.
pub fn log_codegen(message: &str) {
    if is_debug_enabled() {
        println!("CODEGEN: {}", message);
    }
}

/// Logs a driver-level message when debugging is enabled.
pub fn log_compiler(message: &str) {
    if is_debug_enabled() {
        println!("COMPILER: {}", message);
    }
}

/// Times one operation.
///
/// Usage: `let timer = PerfTimer::new("parse"); … timer.finish();`
pub struct PerfTimer {
    start: Instant,
    label: String,
}

impl PerfTimer {
    pub fn new(label: &str) -> Self {
        Self {
            start: Instant::now(),
            label: label.to_string(),
        }
    }

    /// Stops the timer and prints the elapsed time when phase timing is
    /// enabled.
    pub fn finish(self) {
        if is_perf_enabled() {
            let duration = self.start.elapsed();
            println!("{}: {:?}", self.label, duration);
        }
    }
}
