//! Unit tests for vulkan_debug.rs
//!
//! The callback state is global: every test touching it runs serially.

use ash::vk;
use relay_3d_engine::relay3d::device::{DebugSeverity, DeviceConfig};
use serial_test::serial;
use super::*;

fn config(severity: DebugSeverity, enable_stats: bool) -> DebugConfig {
    DebugConfig {
        severity,
        panic_on_error: false,
        enable_stats,
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[test]
fn test_message_level_picks_highest_bit() {
    type S = vk::DebugUtilsMessageSeverityFlagsEXT;
    assert_eq!(message_level(S::ERROR), MessageLevel::Error);
    assert_eq!(message_level(S::WARNING), MessageLevel::Warning);
    assert_eq!(message_level(S::INFO), MessageLevel::Info);
    assert_eq!(message_level(S::VERBOSE), MessageLevel::Verbose);
    assert_eq!(message_level(S::WARNING | S::INFO), MessageLevel::Warning);
}

#[test]
fn test_message_type_name() {
    type T = vk::DebugUtilsMessageTypeFlagsEXT;
    assert_eq!(message_type_name(T::VALIDATION), "Validation");
    assert_eq!(message_type_name(T::PERFORMANCE), "Performance");
    assert_eq!(message_type_name(T::GENERAL), "General");
}

#[test]
fn test_filter_errors_only() {
    assert!(passes_filter(DebugSeverity::ErrorsOnly, MessageLevel::Error));
    assert!(!passes_filter(DebugSeverity::ErrorsOnly, MessageLevel::Warning));
    assert!(!passes_filter(DebugSeverity::ErrorsOnly, MessageLevel::Verbose));
}

#[test]
fn test_filter_errors_and_warnings() {
    assert!(passes_filter(DebugSeverity::ErrorsAndWarnings, MessageLevel::Error));
    assert!(passes_filter(DebugSeverity::ErrorsAndWarnings, MessageLevel::Warning));
    assert!(!passes_filter(DebugSeverity::ErrorsAndWarnings, MessageLevel::Info));
}

#[test]
fn test_filter_all() {
    assert!(passes_filter(DebugSeverity::All, MessageLevel::Info));
    assert!(passes_filter(DebugSeverity::All, MessageLevel::Verbose));
}

#[test]
fn test_severity_mask_matches_filter() {
    type S = vk::DebugUtilsMessageSeverityFlagsEXT;
    assert_eq!(severity_mask(DebugSeverity::ErrorsOnly), S::ERROR);
    assert_eq!(severity_mask(DebugSeverity::ErrorsAndWarnings), S::ERROR | S::WARNING);
    assert!(severity_mask(DebugSeverity::All).contains(S::VERBOSE));
}

#[test]
fn test_config_from_device_config() {
    let device_config = DeviceConfig {
        debug_severity: DebugSeverity::All,
        panic_on_error: true,
        enable_validation_stats: false,
        ..DeviceConfig::default()
    };
    let config = DebugConfig::from(&device_config);
    assert_eq!(config.severity, DebugSeverity::All);
    assert!(config.panic_on_error);
    assert!(!config.enable_stats);
}

// ============================================================================
// COUNTERS
// ============================================================================

#[test]
#[serial]
fn test_messages_ignored_without_config() {
    init_debug_config(config(DebugSeverity::All, true));
    cleanup_debug_config();

    assert!(!handle_message(MessageLevel::Error, "Validation", "VUID-test", "ignored"));
    assert_eq!(get_validation_stats().total(), 0);
}

#[test]
#[serial]
fn test_counts_per_severity() {
    init_debug_config(config(DebugSeverity::All, true));

    handle_message(MessageLevel::Error, "Validation", "VUID-a", "first error");
    handle_message(MessageLevel::Warning, "Performance", "VUID-b", "a warning");
    handle_message(MessageLevel::Info, "General", "VUID-c", "some info");
    handle_message(MessageLevel::Info, "General", "VUID-c", "some info");

    let stats = get_validation_stats();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.warnings, 1);
    assert_eq!(stats.info, 2);
    assert_eq!(stats.verbose, 0);
    assert_eq!(stats.total(), 4);

    cleanup_debug_config();
}

#[test]
#[serial]
fn test_filtered_messages_not_counted() {
    init_debug_config(config(DebugSeverity::ErrorsOnly, true));

    assert!(!handle_message(MessageLevel::Warning, "Validation", "VUID-w", "warning"));
    assert!(handle_message(MessageLevel::Error, "Validation", "VUID-e", "error"));

    let stats = get_validation_stats();
    assert_eq!(stats.warnings, 0);
    assert_eq!(stats.errors, 1);

    cleanup_debug_config();
}

#[test]
#[serial]
fn test_stats_disabled() {
    init_debug_config(config(DebugSeverity::All, false));

    assert!(handle_message(MessageLevel::Error, "Validation", "VUID-e", "error"));
    assert_eq!(get_validation_stats().total(), 0);

    cleanup_debug_config();
}

#[test]
#[serial]
fn test_init_resets_counters() {
    init_debug_config(config(DebugSeverity::All, true));
    handle_message(MessageLevel::Error, "Validation", "VUID-e", "error");
    assert_eq!(get_validation_stats().errors, 1);

    init_debug_config(config(DebugSeverity::All, true));
    assert_eq!(get_validation_stats().total(), 0);

    cleanup_debug_config();
}

#[test]
#[serial]
fn test_cleanup_keeps_counters() {
    init_debug_config(config(DebugSeverity::All, true));
    handle_message(MessageLevel::Warning, "Validation", "VUID-w", "warning");
    cleanup_debug_config();

    assert_eq!(get_validation_stats().warnings, 1);
    print_validation_stats_report();
}

#[test]
#[serial]
#[should_panic(expected = "panic_on_error")]
fn test_panic_on_error() {
    init_debug_config(DebugConfig {
        severity: DebugSeverity::ErrorsOnly,
        panic_on_error: true,
        enable_stats: false,
    });
    handle_message(MessageLevel::Error, "Validation", "VUID-e", "fatal");
}
