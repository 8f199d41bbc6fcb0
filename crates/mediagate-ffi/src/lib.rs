//! C FFI surface for mediagate.
//!
//! Pattern: C strings in, JSON out, thread-local last error.
//! Every returned string is owned by the caller and released with
//! `mediagate_string_free`.
//!
//! One-shot calls (`mediagate_validate`, `mediagate_probe`) read their
//! configuration from the `MEDIAGATE_*` environment. Services validating many
//! files open a handle once so the catalog is parsed a single time.
//!
//! Request JSON:
//!
//! ```json
//! { "path": "/uploads/clip.mp4", "placement": "101", "media_id": 14,
//!   "catalog": "/etc/mediagate/catalog.json", "requirements": { "max_size_mb": 5 },
//!   "locale": "es", "policy": "empty", "probe": "native" }
//! ```
//!
//! `requirements` replaces the placement lookup when present.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::ptr;

use serde::Deserialize;
use serde_json::Value;

use mediagate_core::effects::build_extractor;
use mediagate_core::effects::sniff::{read_head, MagicSniffer, HEAD_LEN};
use mediagate_core::{
    requirement_set_from_json, Catalog, Locale, MetadataExtractor, PlacementRef, SignatureSniffer,
    Settings, Upload, ValidationError, ValidationReport, Validator,
};

// ---------------------------------------------------------------------------
// Error handling (thread-local last error)
// ---------------------------------------------------------------------------

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_error(msg: String) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = Some(msg));
}

fn clear_error() {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = None);
}

/// Returns the last error message (caller frees with `mediagate_string_free`).
#[no_mangle]
pub extern "C" fn mediagate_last_error() -> *mut c_char {
    LAST_ERROR.with(|cell| {
        cell.borrow_mut()
            .take()
            .and_then(|s| CString::new(s).ok())
            .map(|s| s.into_raw())
            .unwrap_or(ptr::null_mut())
    })
}

/// Frees a string returned from mediagate FFI.
///
/// # Safety
/// Must be a pointer returned from this FFI and not already freed.
#[no_mangle]
pub unsafe extern "C" fn mediagate_string_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ValidateRequest {
    #[serde(default)]
    path: String,
    /// String or number.
    #[serde(default)]
    placement: Option<Value>,
    #[serde(default)]
    media_id: Option<u32>,
    #[serde(default)]
    catalog: Option<PathBuf>,
    #[serde(default)]
    requirements: Option<Value>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    policy: Option<String>,
    #[serde(default)]
    probe: Option<String>,
}

/// Settings accepted by `mediagate_open`; unset fields keep the environment's.
#[derive(Debug, Default, Deserialize)]
struct OpenConfig {
    #[serde(default)]
    catalog: Option<PathBuf>,
    #[serde(default)]
    ffprobe: Option<String>,
    #[serde(default)]
    probe: Option<String>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    policy: Option<String>,
}

impl ValidateRequest {
    fn placement_id(&self) -> Option<String> {
        match self.placement.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Request-level overrides on top of `base`.
    fn settings(&self, base: &Settings) -> Result<Settings, String> {
        let mut settings = base.clone();
        if let Some(catalog) = &self.catalog {
            settings.catalog = Some(catalog.clone());
        }
        if let Some(locale) = &self.locale {
            settings.locale = locale.parse()?;
        }
        if let Some(policy) = &self.policy {
            settings.policy = policy.parse()?;
        }
        if let Some(probe) = &self.probe {
            settings.probe = probe.parse()?;
        }
        Ok(settings)
    }
}

impl OpenConfig {
    fn apply(self, mut settings: Settings) -> Result<Settings, String> {
        if let Some(catalog) = self.catalog {
            settings.catalog = Some(catalog);
        }
        if let Some(ffprobe) = self.ffprobe {
            settings.ffprobe = ffprobe;
        }
        if let Some(probe) = self.probe {
            settings.probe = probe.parse()?;
        }
        if let Some(locale) = self.locale {
            settings.locale = locale.parse()?;
        }
        if let Some(policy) = self.policy {
            settings.policy = policy.parse()?;
        }
        Ok(settings)
    }
}

fn run_request(base: &Settings, preloaded: Option<&Catalog>, request: &ValidateRequest) -> Result<ValidationReport, String> {
    let settings = request.settings(base)?;
    // A catalog named in the request wins over the handle's.
    let preloaded = preloaded.filter(|_| request.catalog.is_none());
    validate(&settings, preloaded, request).map_err(|e| describe(&e, settings.locale))
}

fn validate(
    settings: &Settings,
    preloaded: Option<&Catalog>,
    request: &ValidateRequest,
) -> Result<ValidationReport, ValidationError> {
    if request.path.trim().is_empty() {
        return Err(ValidationError::MissingPath);
    }
    let path = Path::new(&request.path);
    let upload = Upload::from_path(path)?;
    let buffer = read_head(path, HEAD_LEN)?;
    let validator = Validator::from_settings(settings);

    if let Some(requirements) = &request.requirements {
        let requirements = requirement_set_from_json(requirements)?;
        return validator.check(&upload, &buffer, &requirements);
    }

    let placement = request.placement_id().ok_or(ValidationError::MissingPlacement)?;
    let target = PlacementRef {
        placement,
        media_id: request.media_id,
    };

    let loaded;
    let catalog = match preloaded {
        Some(catalog) => catalog,
        None => {
            loaded = settings
                .load_catalog()?
                .ok_or_else(|| ValidationError::Catalog("no catalog configured".into()))?;
            &loaded
        }
    };
    validator.check_placement(&upload, &buffer, &target, catalog)
}

/// Uploader-facing message followed by the technical cause chain.
fn describe(e: &ValidationError, locale: Locale) -> String {
    let mut out = e.user_message(locale).to_string();
    let mut cause: Option<&dyn std::error::Error> = Some(e);
    while let Some(err) = cause {
        out.push_str(" | ");
        out.push_str(&err.to_string());
        cause = err.source();
    }
    out
}

// ---------------------------------------------------------------------------
// One-shot calls
// ---------------------------------------------------------------------------

/// Validate one file. Returns the report JSON array (caller frees), or NULL on error.
#[no_mangle]
pub extern "C" fn mediagate_validate(request_json: *const c_char) -> *mut c_char {
    clear_error();
    let request = match parse_json::<ValidateRequest>(request_json) {
        Ok(r) => r,
        Err(e) => return err_null(e),
    };
    match run_request(&Settings::from_env(), None, &request) {
        Ok(report) => json_to_cstr(&report),
        Err(e) => err_null(e),
    }
}

/// Extract metadata from a file. Returns MediaMetadata JSON, or NULL on error.
#[no_mangle]
pub extern "C" fn mediagate_probe(path: *const c_char) -> *mut c_char {
    clear_error();
    let path = match read_cstr(path) {
        Ok(p) => p,
        Err(e) => return err_null(e),
    };
    let settings = Settings::from_env();
    match build_extractor(settings.probe, &settings.ffprobe).probe(Path::new(&path)) {
        Ok(metadata) => json_to_cstr(&metadata),
        Err(e) => err_null(e.to_string()),
    }
}

/// Detect a file's type from its leading bytes.
/// Returns `{"extension", "mime_type"}` JSON, or NULL when unknown or unreadable.
#[no_mangle]
pub extern "C" fn mediagate_sniff(path: *const c_char) -> *mut c_char {
    clear_error();
    let path = match read_cstr(path) {
        Ok(p) => p,
        Err(e) => return err_null(e),
    };
    let buffer = match read_head(Path::new(&path), HEAD_LEN) {
        Ok(b) => b,
        Err(e) => return err_null(e.to_string()),
    };
    match MagicSniffer::new().sniff(&buffer) {
        Some(signature) => json_to_cstr(&signature),
        None => err_null(format!("unrecognized file type: {}", path)),
    }
}

// ---------------------------------------------------------------------------
// Opaque handle
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct ValidatorHandle {
    _private: [u8; 0],
}

struct ValidatorHandleInner {
    settings: Settings,
    catalog: Option<Catalog>,
}

/// Opens a validator. `config_json` may be NULL; its fields override the
/// environment. The catalog, if any, is loaded now.
///
/// # Safety
/// `config_json` must be NULL or a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn mediagate_open(config_json: *const c_char) -> *mut ValidatorHandle {
    clear_error();
    let config = if config_json.is_null() {
        OpenConfig::default()
    } else {
        match parse_json::<OpenConfig>(config_json) {
            Ok(c) => c,
            Err(e) => {
                set_error(e);
                return ptr::null_mut();
            }
        }
    };

    let settings = match config.apply(Settings::from_env()) {
        Ok(s) => s,
        Err(e) => {
            set_error(e);
            return ptr::null_mut();
        }
    };
    match settings.load_catalog() {
        Ok(catalog) => {
            Box::into_raw(Box::new(ValidatorHandleInner { settings, catalog })) as *mut ValidatorHandle
        }
        Err(e) => {
            set_error(describe(&e, settings.locale));
            ptr::null_mut()
        }
    }
}

/// Validate one file with an open handle. Same request and result as
/// `mediagate_validate`.
#[no_mangle]
pub extern "C" fn mediagate_check(handle: *mut ValidatorHandle, request_json: *const c_char) -> *mut c_char {
    clear_error();
    let inner = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return err_null(e),
    };
    let request = match parse_json::<ValidateRequest>(request_json) {
        Ok(r) => r,
        Err(e) => return err_null(e),
    };
    match run_request(&inner.settings, inner.catalog.as_ref(), &request) {
        Ok(report) => json_to_cstr(&report),
        Err(e) => err_null(e),
    }
}

/// Releases a handle from `mediagate_open`.
#[no_mangle]
pub extern "C" fn mediagate_close(handle: *mut ValidatorHandle) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle as *mut ValidatorHandleInner));
        }
    }
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Returns the FFI API version.
#[no_mangle]
pub extern "C" fn mediagate_version() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn handle_ref<'a>(handle: *mut ValidatorHandle) -> Result<&'a ValidatorHandleInner, String> {
    if handle.is_null() {
        return Err("null validator handle".into());
    }
    Ok(unsafe { &*(handle as *mut ValidatorHandleInner) })
}

fn read_cstr(ptr: *const c_char) -> Result<String, String> {
    if ptr.is_null() {
        return Err("null string pointer".into());
    }
    unsafe {
        CStr::from_ptr(ptr)
            .to_str()
            .map(String::from)
            .map_err(|_| "invalid utf-8".into())
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(ptr: *const c_char) -> Result<T, String> {
    let text = read_cstr(ptr)?;
    serde_json::from_str(&text).map_err(|e| format!("invalid request json: {}", e))
}

fn json_to_cstr<T: serde::Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => to_cstr(json),
        Err(e) => err_null(e.to_string()),
    }
}

fn to_cstr(s: String) -> *mut c_char {
    CString::new(s)
        .map(|c| c.into_raw())
        .unwrap_or(ptr::null_mut())
}

fn err_null(msg: String) -> *mut c_char {
    log::debug!("mediagate-ffi: {}", msg);
    set_error(msg);
    ptr::null_mut()
}

// ---------------------------------------------------------------------------
// FFI Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    /// Read a *mut c_char into a String and free it.
    fn read_ffi_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null(), "FFI returned null string: {}", last_error());
        let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_string() };
        unsafe { mediagate_string_free(ptr) };
        s
    }

    fn last_error() -> String {
        let ptr = mediagate_last_error();
        if ptr.is_null() {
            return String::new();
        }
        let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_string() };
        unsafe { mediagate_string_free(ptr) };
        s
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    /// 16-bit mono PCM WAV at 8 kHz, one second of silence.
    fn wav_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, mediagate_core::fixtures::silent_wav(8000, 8000)).expect("write wav");
        path
    }

    fn catalog_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(
            br#"{
                "validated_media": [14, 22],
                "placements": {
                    "101": [
                        {"meta_key": "min_channels", "meta_value": 1},
                        {"meta_key": "max_channels", "meta_value": 2},
                        {"meta_key": "codec_audio", "meta_value": "aac"}
                    ]
                }
            }"#,
        )
        .expect("write catalog");
        file
    }

    fn open_native(catalog: &Path) -> *mut ValidatorHandle {
        let config = c(&serde_json::json!({
            "probe": "native",
            "catalog": catalog,
        })
        .to_string());
        let handle = unsafe { mediagate_open(config.as_ptr()) };
        assert!(!handle.is_null(), "mediagate_open returned null: {}", last_error());
        handle
    }

    // -------------------------------------------------------------------
    // Basics
    // -------------------------------------------------------------------

    #[test]
    fn ffi_version() {
        assert_eq!(mediagate_version(), 1);
    }

    #[test]
    fn ffi_string_free_null_safe() {
        unsafe { mediagate_string_free(ptr::null_mut()) };
    }

    #[test]
    fn ffi_null_inputs_set_last_error() {
        assert!(mediagate_validate(ptr::null()).is_null());
        assert_eq!(last_error(), "null string pointer");

        let req = c("{}");
        assert!(mediagate_check(ptr::null_mut(), req.as_ptr()).is_null());
        assert_eq!(last_error(), "null validator handle");

        // error is consumed by the first read
        assert!(mediagate_last_error().is_null());
    }

    #[test]
    fn ffi_validate_input_errors() {
        let req = c(r#"{"placement": "101"}"#);
        assert!(mediagate_validate(req.as_ptr()).is_null());
        assert!(last_error().starts_with("The file could not be retrieved"));

        let req = c(r#"{"path": "/x", "locale": "fr"}"#);
        assert!(mediagate_validate(req.as_ptr()).is_null());
        assert!(last_error().contains("unsupported locale"));

        let req = c("not json");
        assert!(mediagate_validate(req.as_ptr()).is_null());
        assert!(last_error().starts_with("invalid request json"));
    }

    // -------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------

    #[test]
    fn ffi_validate_inline_requirements() {
        let dir = TempDir::new().expect("tempdir");
        let wav = wav_file(&dir);
        let req = c(&serde_json::json!({
            "path": wav,
            "probe": "native",
            "requirements": {
                "mime_type": ["audio/wav"],
                "min_sample_rate": 8000,
                "max_sample_rate": 48000
            }
        })
        .to_string());

        let json = read_ffi_string(mediagate_validate(req.as_ptr()));
        let report: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0]["type"], "mime_type");
        assert_eq!(report[0]["status"], true);
        assert_eq!(report[1]["type"], "sample_rate");
        assert_eq!(report[1]["value"], "8000 Hz");
        assert_eq!(report[1]["status"], true);
    }

    #[test]
    fn ffi_handle_checks_placements() {
        let dir = TempDir::new().expect("tempdir");
        let wav = wav_file(&dir);
        let catalog = catalog_file();
        let handle = open_native(catalog.path());

        let req = c(&serde_json::json!({"path": wav, "placement": 101, "media_id": 14}).to_string());
        let json = read_ffi_string(mediagate_check(handle, req.as_ptr()));
        let report: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0]["type"], "channels");
        assert_eq!(report[0]["status"], true);
        assert_eq!(report[1]["type"], "codec_audio");
        assert_eq!(report[1]["status"], false);

        // media category outside the validated list
        let req = c(&serde_json::json!({"path": wav, "placement": "101", "media_id": 3}).to_string());
        assert_eq!(read_ffi_string(mediagate_check(handle, req.as_ptr())), "[]");

        let req = c(&serde_json::json!({"path": wav, "placement": "999", "locale": "es"}).to_string());
        assert!(mediagate_check(handle, req.as_ptr()).is_null());
        assert!(last_error().starts_with("No se ha podido recuperar los requisitos del formato."));

        mediagate_close(handle);
    }

    #[test]
    fn ffi_open_rejects_missing_catalog() {
        let config = c(r#"{"catalog": "/nonexistent/mediagate/catalog.json"}"#);
        let handle = unsafe { mediagate_open(config.as_ptr()) };
        assert!(handle.is_null());
        assert!(last_error().contains("catalog"));
    }

    #[test]
    fn ffi_unreadable_file_respects_policy() {
        let dir = TempDir::new().expect("tempdir");
        let garbage = dir.path().join("noise.bin");
        std::fs::write(&garbage, [0x13u8; 512]).expect("write");

        let req = c(&serde_json::json!({
            "path": garbage,
            "probe": "native",
            "requirements": {"max_size_mb": 5}
        })
        .to_string());
        assert!(mediagate_validate(req.as_ptr()).is_null());
        assert!(last_error().starts_with("The material file could not be read."));

        let req = c(&serde_json::json!({
            "path": garbage,
            "probe": "native",
            "policy": "empty",
            "requirements": {"max_size_mb": 5}
        })
        .to_string());
        assert_eq!(read_ffi_string(mediagate_validate(req.as_ptr())), "[]");
    }

    // -------------------------------------------------------------------
    // Sniff
    // -------------------------------------------------------------------

    #[test]
    fn ffi_sniff_wav() {
        let dir = TempDir::new().expect("tempdir");
        let wav = wav_file(&dir);
        let path = c(wav.to_str().unwrap());
        let json = read_ffi_string(mediagate_sniff(path.as_ptr()));
        let signature: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(signature["mime_type"], "audio/vnd.wave");
        assert_eq!(signature["extension"], "wav");
    }
}
