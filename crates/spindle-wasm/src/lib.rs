//! WASM bindings for spindle.
//!
//! Exposes `parse()`, `render()` and `toRegex()` to JavaScript via
//! wasm-bindgen. Options are plain JS objects using the same camelCase keys
//! as the Rust option structs; errors are thrown.

use serde::de::DeserializeOwned;
use spindle_extglob::{grammar::verbatim_renderer, regex_renderer, ExtglobError};
use spindle_parser::ParserOptions;
use spindle_render::{RenderOptions, Rendered};
use wasm_bindgen::prelude::*;

/// Read an options object, treating `undefined` and `null` as defaults.
fn options_from<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsError> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| JsError::new(&format!("Invalid options: {e}")))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsError::new(&e.to_string()))
}

/// Parse an extglob pattern.
///
/// Returns the document as `{ source, label, nodes, errors }`.
#[wasm_bindgen]
pub fn parse(pattern: &str, options: JsValue) -> Result<JsValue, JsError> {
    let options: ParserOptions = options_from(options)?;
    let doc = spindle_extglob::parse(pattern, options).map_err(|e| JsError::new(&e.to_string()))?;
    to_js(&doc)
}

/// Parse a pattern and render it back.
///
/// `target` is `"verbatim"` (the default) or `"regex"`. Returns
/// `{ output: string, fragments: number, sourceMap?: object }`.
#[wasm_bindgen]
pub fn render(
    pattern: &str,
    target: Option<String>,
    parser_options: JsValue,
    render_options: JsValue,
) -> Result<JsValue, JsError> {
    let parser_options: ParserOptions = options_from(parser_options)?;
    let render_options: RenderOptions = options_from(render_options)?;
    let rendered = render_native(
        pattern,
        target.as_deref().unwrap_or("verbatim"),
        parser_options,
        render_options,
    )
    .map_err(|e| JsError::new(&e.to_string()))?;

    let js_obj = js_sys::Object::new();
    js_sys::Reflect::set(&js_obj, &"output".into(), &rendered.output.as_str().into())
        .map_err(|_| JsError::new("Failed to set output property"))?;
    js_sys::Reflect::set(
        &js_obj,
        &"fragments".into(),
        &JsValue::from_f64(rendered.fragments as f64),
    )
    .map_err(|_| JsError::new("Failed to set fragments property"))?;
    if let Some(source_map) = &rendered.source_map {
        js_sys::Reflect::set(&js_obj, &"sourceMap".into(), &to_js(source_map)?)
            .map_err(|_| JsError::new("Failed to set sourceMap property"))?;
    }

    Ok(js_obj.into())
}

/// Convert a pattern to regular-expression source.
#[wasm_bindgen(js_name = toRegex)]
pub fn to_regex(pattern: &str) -> Result<String, JsError> {
    spindle_extglob::to_regex(pattern).map_err(|e| JsError::new(&e.to_string()))
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Error for an unknown render target.
#[derive(Debug, thiserror::Error)]
enum TargetError {
    #[error("Unknown render target '{0}', expected \"verbatim\" or \"regex\"")]
    Unknown(String),
    #[error(transparent)]
    Pipeline(#[from] ExtglobError),
}

fn render_native(
    pattern: &str,
    target: &str,
    parser_options: ParserOptions,
    render_options: RenderOptions,
) -> Result<Rendered, TargetError> {
    let mut renderer = match target {
        "verbatim" => verbatim_renderer(render_options),
        "regex" => regex_renderer(render_options),
        other => return Err(TargetError::Unknown(other.to_string())),
    };
    let doc = spindle_extglob::parse(pattern, parser_options).map_err(ExtglobError::from)?;
    Ok(renderer.render(&doc).map_err(ExtglobError::from)?)
}
