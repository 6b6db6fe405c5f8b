//! FFI bindings for the engagement scorer
//!
//! This module provides C-compatible functions for scoring from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `engage_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::AnalysisConfig;
use crate::encoder::ReportEncoder;
use crate::scoring::aggregate;
use crate::trace::score_trace;
use crate::types::{EyeCounts, ScoreBreakdown};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn encode_report(breakdown: &ScoreBreakdown, url: Option<String>) -> *mut c_char {
    match ReportEncoder::new().encode_to_json(breakdown, url.as_deref()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Scoring API
// ============================================================================

/// Composite engagement score for three event counts.
///
/// Pure function; never fails.
#[no_mangle]
pub extern "C" fn engage_aggregate(
    disfluency_count: u32,
    blink_count: u32,
    gaze_count: u32,
) -> f64 {
    aggregate(disfluency_count, blink_count, gaze_count)
}

/// Build the engagement report JSON for three event counts.
///
/// # Safety
/// - `url` must be a valid null-terminated C string, or NULL for no URL.
/// - Returns a newly allocated string that must be freed with `engage_free_string`.
/// - Returns NULL on error; call `engage_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn engage_report_json(
    disfluency_count: u32,
    blink_count: u32,
    gaze_count: u32,
    url: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let breakdown = ScoreBreakdown::from_counts(
        disfluency_count,
        EyeCounts {
            gaze_count,
            blink_count,
        },
    );
    encode_report(&breakdown, cstr_to_string(url))
}

/// Score recorded frame and window traces (NDJSON) and return the report JSON.
///
/// # Safety
/// - `frames` and `windows` must be valid null-terminated C strings.
/// - `url` must be a valid null-terminated C string, or NULL for no URL.
/// - Returns a newly allocated string that must be freed with `engage_free_string`.
/// - Returns NULL on error; call `engage_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn engage_score_trace(
    frames: *const c_char,
    windows: *const c_char,
    url: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let frames_str = match cstr_to_string(frames) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frames string pointer");
            return ptr::null_mut();
        }
    };

    let windows_str = match cstr_to_string(windows) {
        Some(s) => s,
        None => {
            set_last_error("Invalid windows string pointer");
            return ptr::null_mut();
        }
    };

    match score_trace(&frames_str, &windows_str, &AnalysisConfig::default()) {
        Ok(breakdown) => encode_report(&breakdown, cstr_to_string(url)),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by engage functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an engage function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn engage_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next engage function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn engage_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn engage_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_ffi_aggregate() {
        assert!((engage_aggregate(0, 0, 0) - 495.0).abs() < 1e-9);
        assert_eq!(engage_aggregate(100, 100, 100), 0.0);
    }

    #[test]
    fn test_ffi_report_json() {
        let url = CString::new("https://cdn.example/interview.mp4").unwrap();

        unsafe {
            let result = engage_report_json(3, 8, 12, url.as_ptr());
            assert!(!result.is_null());

            let json = CStr::from_ptr(result).to_str().unwrap();
            let value: serde_json::Value = serde_json::from_str(json).unwrap();
            assert_eq!(value["blink"]["value"], 8);
            assert_eq!(value["gaze"]["value"], 12);
            assert_eq!(value["urlvideo"], "https://cdn.example/interview.mp4");

            engage_free_string(result);
        }
    }

    #[test]
    fn test_ffi_report_without_url() {
        unsafe {
            let result = engage_report_json(0, 0, 0, ptr::null());
            assert!(!result.is_null());

            let json = CStr::from_ptr(result).to_str().unwrap();
            assert!(json.contains("\"urlvideo\":null"));
            engage_free_string(result);
        }
    }

    #[test]
    fn test_ffi_score_trace() {
        let frames = CString::new("{\"gaze\":\"center\",\"blink\":90.0}\n{\"faces\":[]}").unwrap();
        let windows = CString::new("{\"score\":0.95}\n{\"score\":0.1}").unwrap();

        unsafe {
            let result = engage_score_trace(frames.as_ptr(), windows.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let json = CStr::from_ptr(result).to_str().unwrap();
            let value: serde_json::Value = serde_json::from_str(json).unwrap();
            assert_eq!(value["disfluency"]["value"], 1);
            engage_free_string(result);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let frames = CString::new("not json").unwrap();
        let windows = CString::new("").unwrap();

        unsafe {
            let result = engage_score_trace(frames.as_ptr(), windows.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = engage_last_error();
            assert!(!error.is_null());

            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("line 1"));
        }
    }

    #[test]
    fn test_ffi_null_pointer() {
        unsafe {
            let result = engage_score_trace(ptr::null(), ptr::null(), ptr::null());
            assert!(result.is_null());
            assert!(!engage_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = engage_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
