//! Unit tests for error.rs

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkCreateDevice failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkCreateDevice failed"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_state_display() {
    let err = Error::InvalidState("begin_frame called twice".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid state"));
    assert!(display.contains("begin_frame called twice"));
}

#[test]
fn test_uniform_ring_exhausted_display() {
    let err = Error::UniformRingExhausted { capacity: 1024, requested: 1280 };
    let display = format!("{}", err);
    assert!(display.contains("Uniform ring exhausted"));
    assert!(display.contains("1024"));
    assert!(display.contains("1280"));
}

#[test]
fn test_unsupported_display() {
    let err = Error::Unsupported("buffer readback".to_string());
    assert_eq!(format!("{}", err), "Unsupported: buffer readback");
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_preserves_fields() {
    let err = Error::UniformRingExhausted { capacity: 512, requested: 768 };
    match err.clone() {
        Error::UniformRingExhausted { capacity, requested } => {
            assert_eq!(capacity, 512);
            assert_eq!(requested, 768);
        }
        other => panic!("unexpected variant: {:?}", other),
    }
}

#[test]
fn test_result_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::InvalidResource("stale handle".to_string()))
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert!(matches!(outer(), Err(Error::InvalidResource(_))));
}
