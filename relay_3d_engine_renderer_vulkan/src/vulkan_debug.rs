/// Validation layer messages
///
/// Messages from VK_LAYER_KHRONOS_validation are filtered by the configured
/// severity, counted per severity and forwarded to the engine logger. The
/// messenger itself only exists with the `vulkan-validation` feature; the
/// counters and the report are always available (and stay at zero without it).

use ash::vk;
use colored::*;
use relay_3d_engine::relay3d::device::{DebugSeverity, DeviceConfig, ValidationStats};
use relay_3d_engine::{engine_debug, engine_error, engine_info, engine_warn};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

const SOURCE: &str = "relay3d::vulkan::validation";

/// Active configuration, `None` while no device owns a messenger
static DEBUG_CONFIG: Mutex<Option<DebugConfig>> = Mutex::new(None);

static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Occurrences per message text, for the duplicate summary of the report
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Callback configuration, taken from the device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DebugConfig {
    pub severity: DebugSeverity,
    pub panic_on_error: bool,
    pub enable_stats: bool,
}

impl From<&DeviceConfig> for DebugConfig {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            severity: config.debug_severity,
            panic_on_error: config.panic_on_error,
            enable_stats: config.enable_validation_stats,
        }
    }
}

/// Severity of a single validation message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

pub(crate) fn message_level(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> MessageLevel {
    if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        MessageLevel::Error
    } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        MessageLevel::Warning
    } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        MessageLevel::Info
    } else {
        MessageLevel::Verbose
    }
}

pub(crate) fn passes_filter(severity: DebugSeverity, level: MessageLevel) -> bool {
    match severity {
        DebugSeverity::ErrorsOnly => level == MessageLevel::Error,
        DebugSeverity::ErrorsAndWarnings => {
            matches!(level, MessageLevel::Error | MessageLevel::Warning)
        }
        DebugSeverity::All => true,
    }
}

pub(crate) fn message_type_name(types: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if types.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if types.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Severity mask requested from the messenger for a filter
pub(crate) fn severity_mask(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    let errors = vk::DebugUtilsMessageSeverityFlagsEXT::ERROR;
    match severity {
        DebugSeverity::ErrorsOnly => errors,
        DebugSeverity::ErrorsAndWarnings => errors | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
        DebugSeverity::All => {
            errors
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn increment(&self, level: MessageLevel) {
        let counter = match level {
            MessageLevel::Error => &self.errors,
            MessageLevel::Warning => &self.warnings,
            MessageLevel::Info => &self.info,
            MessageLevel::Verbose => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

fn track_message(message: &str) -> u32 {
    let Ok(mut guard) = MESSAGE_TRACKER.lock() else {
        return 1;
    };
    let count = guard
        .get_or_insert_with(FxHashMap::default)
        .entry(message.to_string())
        .or_insert(0);
    *count += 1;
    *count
}

// ============================================================================
// Public entry points
// ============================================================================

/// Install the callback configuration and reset the counters
pub(crate) fn init_debug_config(config: DebugConfig) {
    VALIDATION_STATS.reset();
    if let Ok(mut tracker) = MESSAGE_TRACKER.lock() {
        *tracker = Some(FxHashMap::default());
    }
    if let Ok(mut guard) = DEBUG_CONFIG.lock() {
        *guard = Some(config);
    }
}

/// Stop reporting messages (counters are kept for a final report)
pub(crate) fn cleanup_debug_config() {
    if let Ok(mut guard) = DEBUG_CONFIG.lock() {
        *guard = None;
    }
}

/// Validation message counts since the last device creation
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Print the validation counters to stdout
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    if let Ok(tracker) = MESSAGE_TRACKER.lock() {
        let repeated = tracker
            .as_ref()
            .map(|messages| messages.values().filter(|&&count| count > 1).count())
            .unwrap_or(0);
        if repeated > 0 {
            println!("\n  {} message(s) appeared multiple times", repeated);
        }
    }

    println!("{}\n", "====================================".bright_blue().bold());
}

/// Filter, count and log one message
///
/// Returns `false` when the message was filtered out.
pub(crate) fn handle_message(level: MessageLevel, type_name: &str, message_id: &str, message: &str) -> bool {
    let config = match DEBUG_CONFIG.lock() {
        Ok(guard) => match *guard {
            Some(config) => config,
            None => return false,
        },
        Err(_) => return false,
    };

    if !passes_filter(config.severity, level) {
        return false;
    }

    let occurrences = if config.enable_stats {
        VALIDATION_STATS.increment(level);
        track_message(message)
    } else {
        1
    };
    let repeat = if occurrences > 1 { format!(" [x{}]", occurrences) } else { String::new() };

    match level {
        MessageLevel::Error => engine_error!(SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id, message),
        MessageLevel::Warning => engine_warn!(SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id, message),
        MessageLevel::Info => engine_info!(SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id, message),
        MessageLevel::Verbose => engine_debug!(SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id, message),
    }

    if config.panic_on_error && level == MessageLevel::Error {
        panic!("Vulkan validation error (panic_on_error)\n  Message ID: {}\n  {}", message_id, message);
    }
    true
}

/// Debug messenger callback registered with VK_EXT_debug_utils
#[cfg(feature = "vulkan-validation")]
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    use std::ffi::CStr;

    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let message_id = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    handle_message(
        message_level(message_severity),
        message_type_name(message_type),
        message_id,
        message,
    );

    // Never abort the Vulkan call
    vk::FALSE
}

#[cfg(test)]
#[path = "vulkan_debug_tests.rs"]
mod tests;
