//! FFI bindings for Fitlytics
//!
//! This module provides C-compatible functions for calling Fitlytics from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `fitlytics_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::calibration::calibrate_score;
use crate::form::Exercise;
use crate::model::ModelArtifact;
use crate::pipeline::{parse_object, FitlyticsEngine};

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

// ============================================================================
// Engine Lifecycle
// ============================================================================

/// Opaque handle to a FitlyticsEngine
pub struct FitlyticsEngineHandle {
    engine: FitlyticsEngine,
}

/// Create an engine from model artifact JSON documents.
///
/// # Safety
/// - `activity_model_json` and `fitness_model_json` must each be a valid
///   null-terminated C string or NULL (that pipeline is then unavailable).
/// - Returns a pointer that must be freed with `fitlytics_engine_free`.
/// - Returns NULL on error; call `fitlytics_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_engine_new(
    activity_model_json: *const c_char,
    fitness_model_json: *const c_char,
) -> *mut FitlyticsEngineHandle {
    clear_last_error();

    let mut engine = FitlyticsEngine::new();

    if !activity_model_json.is_null() {
        let Some(json) = cstr_to_string(activity_model_json) else {
            set_last_error("Invalid activity model string");
            return ptr::null_mut();
        };
        match ModelArtifact::from_json(&json) {
            Ok(model) => engine = engine.with_activity_model(model),
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    }

    if !fitness_model_json.is_null() {
        let Some(json) = cstr_to_string(fitness_model_json) else {
            set_last_error("Invalid fitness model string");
            return ptr::null_mut();
        };
        match ModelArtifact::from_json(&json) {
            Ok(model) => engine = engine.with_fitness_model(model),
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    }

    Box::into_raw(Box::new(FitlyticsEngineHandle { engine }))
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `fitlytics_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_engine_free(engine: *mut FitlyticsEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Run a JSON-in/JSON-out engine call with the shared pointer and error plumbing
unsafe fn with_engine_json(
    engine: *const FitlyticsEngineHandle,
    json: *const c_char,
    call: impl FnOnce(&FitlyticsEngine, &str) -> Result<String, crate::ComputeError>,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    match call(&handle.engine, &json_str) {
        Ok(payload) => string_to_cstr(&payload),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Activity Pipeline
// ============================================================================

/// Classify sensor JSON and return the activity payload JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `fitlytics_engine_new`.
/// - `sensor_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `fitlytics_free_string`.
/// - Returns NULL on error; call `fitlytics_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_classify_activity(
    engine: *const FitlyticsEngineHandle,
    sensor_json: *const c_char,
) -> *mut c_char {
    with_engine_json(engine, sensor_json, |engine, json| engine.classify_json(json))
}

/// Classify sensor JSON and write the bare label to `out_label`.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `fitlytics_engine_new`.
/// - `sensor_json` must be a valid null-terminated C string.
/// - `out_label` must be a valid, writable pointer.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_activity_label(
    engine: *const FitlyticsEngineHandle,
    sensor_json: *const c_char,
    out_label: *mut i64,
) -> i32 {
    clear_last_error();

    if engine.is_null() || out_label.is_null() {
        set_last_error("Null engine or output pointer");
        return -1;
    }

    let handle = &*engine;

    let Some(json_str) = cstr_to_string(sensor_json) else {
        set_last_error("Invalid JSON string pointer");
        return -1;
    };

    let result = parse_object(&json_str).and_then(|sensor| handle.engine.classify(&sensor));

    match result {
        Ok(label) => {
            *out_label = label;
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Fitness Pipeline
// ============================================================================

/// Score a request row of model columns and return the fitness payload JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `fitlytics_engine_new`.
/// - `request_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `fitlytics_free_string`.
/// - Returns NULL on error; call `fitlytics_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_fitness_score(
    engine: *const FitlyticsEngineHandle,
    request_json: *const c_char,
) -> *mut c_char {
    with_engine_json(engine, request_json, |engine, json| engine.score_json(json))
}

/// Score raw form inputs (categorical labels) and return the fitness payload JSON.
///
/// # Safety
/// Same contract as `fitlytics_fitness_score`.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_fitness_score_raw_inputs(
    engine: *const FitlyticsEngineHandle,
    inputs_json: *const c_char,
) -> *mut c_char {
    with_engine_json(engine, inputs_json, |engine, json| {
        engine.score_raw_inputs_json(json)
    })
}

/// Calibrate a raw prediction against its request fields.
///
/// # Safety
/// - `request_json` must be a valid null-terminated C string.
/// - Returns NaN on error; call `fitlytics_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_calibrate_score(raw: f64, request_json: *const c_char) -> f64 {
    clear_last_error();

    let Some(json_str) = cstr_to_string(request_json) else {
        set_last_error("Invalid JSON string pointer");
        return f64::NAN;
    };

    match parse_object(&json_str).and_then(|request| calibrate_score(raw, &request)) {
        Ok(score) => score,
        Err(e) => {
            set_last_error(&e.to_string());
            f64::NAN
        }
    }
}

// ============================================================================
// Form Evaluation
// ============================================================================

/// Evaluate an exercise window and return the form payload JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `fitlytics_engine_new` (no model
///   needs to be loaded).
/// - `exercise` must be a valid null-terminated C string holding an exercise label,
///   e.g. "Jumping Jacks".
/// - `sensor_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `fitlytics_free_string`.
/// - Returns NULL on error; call `fitlytics_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_evaluate_form(
    engine: *const FitlyticsEngineHandle,
    exercise: *const c_char,
    sensor_json: *const c_char,
) -> *mut c_char {
    let Some(label) = cstr_to_string(exercise) else {
        set_last_error("Invalid exercise string pointer");
        return ptr::null_mut();
    };

    with_engine_json(engine, sensor_json, |engine, json| {
        engine.evaluate_form_json(Exercise::from_label(&label)?, json)
    })
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Fitlytics functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Fitlytics function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Fitlytics function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Fitlytics library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn fitlytics_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
