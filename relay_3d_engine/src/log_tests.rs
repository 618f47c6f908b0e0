//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger formatting and the error macros.
//! Tests that swap the global logger are marked #[serial].

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use crate::relay3d::{Engine, Error, Result};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: entries.clone() });
    entries
}

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(86_400),
        source: "relay3d::test".to_string(),
        message: "mesh uploaded".to_string(),
        file,
        line,
    }
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

// ============================================================================
// DEFAULT LOGGER FORMAT
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Info, None, None));
    assert!(line.contains("[INFO ]"));
    assert!(line.contains("[relay3d::test]"));
    assert!(line.ends_with("mesh uploaded"));
}

#[test]
fn test_format_plain_with_location() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Error, Some("mesh_cache.rs"), Some(42)));
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("mesh uploaded (mesh_cache.rs:42)"));
}

#[test]
fn test_default_logger_does_not_panic() {
    DefaultLogger.log(&entry(LogSeverity::Trace, None, None));
    DefaultLogger.log(&entry(LogSeverity::Error, Some("x.rs"), Some(1)));
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
#[serial]
fn test_engine_error_macro_records_location() {
    let entries = capture();
    crate::engine_error!("relay3d::test", "error macro {}", 7);
    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    let found = entries.iter().find(|e| e.message == "error macro 7").unwrap();
    assert_eq!(found.severity, LogSeverity::Error);
    assert!(found.file.unwrap().ends_with("log_tests.rs"));
    assert!(found.line.is_some());
}

#[test]
#[serial]
fn test_engine_err_macro_logs_and_builds_error() {
    let entries = capture();
    let err = crate::engine_err!("relay3d::test", "queue submit failed: {}", -4);
    Engine::reset_logger();

    match err {
        Error::BackendError(msg) => assert_eq!(msg, "queue submit failed: -4"),
        other => panic!("unexpected error: {:?}", other),
    }
    let entries = entries.lock().unwrap();
    assert!(entries.iter().any(|e| e.severity == LogSeverity::Error && e.message == "queue submit failed: -4"));
}

#[test]
#[serial]
fn test_engine_bail_macro_returns_early() {
    fn doubled(input: u32) -> Result<u32> {
        if input == 0 {
            crate::engine_bail!("relay3d::test", "bail {}", "now");
        }
        Ok(input * 2)
    }

    let entries = capture();
    let passed = doubled(3);
    let result = doubled(0);
    Engine::reset_logger();

    assert!(matches!(passed, Ok(6)));
    assert!(matches!(result, Err(Error::BackendError(ref m)) if m == "bail now"));
    assert!(entries.lock().unwrap().iter().any(|e| e.message == "bail now"));
}

#[test]
#[serial]
fn test_engine_warn_err_macro_logs_warning() {
    let entries = capture();
    let err = crate::engine_warn_err!("relay3d::test", "surface lost");
    Engine::reset_logger();

    assert!(matches!(err, Error::BackendError(_)));
    let entries = entries.lock().unwrap();
    let found = entries.iter().find(|e| e.message == "surface lost").unwrap();
    assert_eq!(found.severity, LogSeverity::Warn);
    assert!(found.file.is_none());
}
