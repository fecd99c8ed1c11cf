//! Scene and document files
//!
//! Both are exchanged as pretty-printed JSON.

use anyhow::{Context, Result};
use fmdl_common::FmdlDocument;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::scene::Scene;

fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}: {}", what, path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}: {}", what, path.display()))
}

fn save_json<T: Serialize>(value: &T, path: &Path, what: &str) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", what))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}: {}", what, path.display()))
}

/// Load a scene, rejecting broken parent links
pub fn load_scene(path: &Path) -> Result<Scene> {
    let scene: Scene = load_json(path, "scene")?;
    scene
        .validate()
        .with_context(|| format!("Invalid scene: {}", path.display()))?;
    Ok(scene)
}

pub fn save_scene(scene: &Scene, path: &Path) -> Result<()> {
    save_json(scene, path, "scene")
}

pub fn load_document(path: &Path) -> Result<FmdlDocument> {
    load_json(path, "document")
}

pub fn save_document(doc: &FmdlDocument, path: &Path) -> Result<()> {
    save_json(doc, path, "document")
}
