use anyhow::Result;
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

pub fn tagmerge_cmd() -> Command {
    Command::cargo_bin("tagmerge").unwrap()
}

/// Write a schema-v1 annotation record (text with tags inlined)
pub fn write_annotation(dir: &Path, name: &str, text: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let record = serde_json::json!({
        "document_type": "annotation",
        "file_name": name,
        "file_path": path.display().to_string(),
        "text": text,
    });
    fs::write(&path, serde_json::to_string_pretty(&record)?)?;
    Ok(path)
}
