//! Unit tests for log.rs
//!
//! Tests LogSeverity ordering, the severity threshold and logger replacement.
//! The logger is global, so every test touching it is #[serial].

use crate::log::{self, Logger, LogEntry, LogSeverity, DefaultLogger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

// ============================================================================
// TEST LOGGER
// ============================================================================

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn install_capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { entries: entries.clone() });
    entries
}

/// Entries from this file only (other tests may log concurrently)
fn captured_here(entries: &Arc<Mutex<Vec<LogEntry>>>) -> Vec<LogEntry> {
    entries.lock().unwrap().iter().filter(|e| e.source == "test::log").cloned().collect()
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_u8_round_trip_covers_all_levels() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(LogSeverity::from_u8(severity as u8), severity);
    }
}

#[test]
fn test_default_logger_handles_both_formats() {
    let logger = DefaultLogger;
    logger.log(&LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "test::log".to_string(),
        message: "plain".to_string(),
        file: None,
        line: None,
    });
    logger.log(&LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "test::log".to_string(),
        message: "detailed".to_string(),
        file: Some("log_tests.rs"),
        line: Some(42),
    });
}

// ============================================================================
// GLOBAL LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_custom_logger_receives_entries() {
    let entries = install_capture();
    log::set_max_severity(LogSeverity::Trace);

    crate::pipeline_info!("test::log", "hello {}", 1);
    crate::pipeline_warn!("test::log", "careful");

    let captured = captured_here(&entries);
    log::reset_logger();

    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].message, "hello 1");
    assert_eq!(captured[0].source, "test::log");
    assert!(captured[0].file.is_none());
    assert_eq!(captured[1].severity, LogSeverity::Warn);
}

#[test]
#[serial]
fn test_error_macro_records_file_and_line() {
    let entries = install_capture();
    log::set_max_severity(LogSeverity::Trace);

    crate::pipeline_error!("test::log", "broken");

    let captured = captured_here(&entries);
    log::reset_logger();

    assert_eq!(captured.len(), 1);
    assert!(captured[0].file.unwrap().ends_with("log_tests.rs"));
    assert!(captured[0].line.is_some());
}

#[test]
#[serial]
fn test_severity_threshold_drops_lower_entries() {
    let entries = install_capture();
    log::set_max_severity(LogSeverity::Warn);

    crate::pipeline_trace!("test::log", "dropped");
    crate::pipeline_debug!("test::log", "dropped");
    crate::pipeline_info!("test::log", "dropped");
    crate::pipeline_warn!("test::log", "kept");
    crate::pipeline_error!("test::log", "kept");

    let captured = captured_here(&entries);
    log::set_max_severity(LogSeverity::Trace);
    log::reset_logger();

    assert_eq!(captured.len(), 2);
    assert!(captured.iter().all(|e| e.message == "kept"));
}

#[test]
#[serial]
fn test_enabled_follows_threshold() {
    log::set_max_severity(LogSeverity::Info);
    assert!(!log::enabled(LogSeverity::Debug));
    assert!(log::enabled(LogSeverity::Info));
    assert_eq!(log::max_severity(), LogSeverity::Info);
    log::set_max_severity(LogSeverity::Trace);
    assert!(log::enabled(LogSeverity::Trace));
}
