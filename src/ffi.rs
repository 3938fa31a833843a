//! FFI 接口 - C/C++ 绑定
//!
//! 文件列表和配置都以 JSON 传入；返回的字符串由调用者用 `lp_string_free` 释放。

use crate::config::PreviewConfig;
use crate::error::{PreviewError, Result};
use crate::externals::BindingTable;
use crate::preview::LivePreview;
use crate::project::{File, Project};
use crate::sandbox::{render_headless, Surface};
use serde_json::{json, Value};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    let ptr = unsafe { ptr.as_ref() }?;
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn into_c_string(text: String) -> *mut c_char {
    // 内部 NUL 会截断 CString，替换掉
    match CString::new(text.replace('\0', "\u{fffd}")) {
        Ok(s) => s.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn parse_project(files_json: &str) -> Result<Project> {
    let files: Vec<File> = serde_json::from_str(files_json)?;
    Ok(Project::new(
        files.into_iter().map(|f| File::new(&f.path, &f.content)).collect(),
    ))
}

fn parse_config(config_json: Option<&str>) -> Result<PreviewConfig> {
    match config_json {
        Some(json) if !json.trim().is_empty() => PreviewConfig::from_json(json),
        _ => Ok(PreviewConfig::default()),
    }
}

fn surface_json(surface: &Surface) -> Value {
    match surface {
        Surface::Blank => json!({ "surface": "blank" }),
        Surface::Mounted { html } => json!({ "surface": "mounted", "html": html }),
        Surface::Diagnostic(d) => json!({
            "surface": "diagnostic",
            "kind": d.kind.code(),
            "title": d.kind.title(),
            "message": d.message,
        }),
    }
}

fn error_json(err: &PreviewError) -> Value {
    json!({ "surface": "error", "message": err.to_string() })
}

/// 生成浏览器文档；`files_json` 为 `[{"path": "...", "content": "..."}]`
#[no_mangle]
pub extern "C" fn lp_build_document(files_json: *const c_char, config_json: *const c_char) -> *mut c_char {
    let Some(files) = read_str(files_json) else {
        return std::ptr::null_mut();
    };
    let result = parse_project(files)
        .and_then(|project| parse_config(read_str(config_json)).map(|config| (project, config)));
    match result {
        Ok((project, config)) => into_c_string(LivePreview::new(config).document(&project)),
        Err(err) => {
            tracing::warn!(error = %err, "lp_build_document failed");
            std::ptr::null_mut()
        }
    }
}

/// 无头渲染，返回描述表面的 JSON
#[no_mangle]
pub extern "C" fn lp_render_headless(files_json: *const c_char, config_json: *const c_char) -> *mut c_char {
    let Some(files) = read_str(files_json) else {
        return std::ptr::null_mut();
    };
    let result = parse_project(files).and_then(|project| {
        let config = parse_config(read_str(config_json))?;
        render_headless(&project, &config, BindingTable::standard())
    });
    let value = match result {
        Ok(surface) => surface_json(&surface),
        Err(err) => error_json(&err),
    };
    into_c_string(value.to_string())
}

/// 释放本库返回的字符串
#[no_mangle]
pub extern "C" fn lp_string_free(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}
