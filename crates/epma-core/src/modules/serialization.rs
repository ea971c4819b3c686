use serde::Serialize;
use std::fs;
use std::path::Path;

/// Report cell text for a float. Undefined values are left blank.
pub fn format_cell(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    format!("{value}")
}

pub fn format_optional_cell(value: Option<f64>) -> String {
    value.map(format_cell).unwrap_or_default()
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

pub fn write_json_artifact<T: Serialize + ?Sized>(path: &Path, value: &T) -> std::io::Result<()> {
    let content = render_json(value).map_err(std::io::Error::other)?;
    write_text_artifact(path, &content)
}
