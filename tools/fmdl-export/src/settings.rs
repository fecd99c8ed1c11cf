//! fmdl.toml configuration
//!
//! Every section is optional; a missing file or section means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// fmdl.toml structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FmdlConfig {
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub import: ImportSettings,
    #[serde(default)]
    pub weld: WeldPolicy,
}

impl FmdlConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse fmdl.toml")
    }
}

fn default_true() -> bool {
    true
}

/// Gates for the optional extension codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtensionFlags {
    /// Master switch; when false no codec runs
    #[serde(default = "default_true")]
    pub enable_extensions: bool,
    #[serde(default = "default_true")]
    pub enable_antiblur: bool,
    #[serde(default = "default_true")]
    pub enable_vertex_loop_preservation: bool,
    #[serde(default = "default_true")]
    pub enable_mesh_splitting: bool,
}

impl Default for ExtensionFlags {
    fn default() -> Self {
        Self {
            enable_extensions: true,
            enable_antiblur: true,
            enable_vertex_loop_preservation: true,
            enable_mesh_splitting: true,
        }
    }
}

impl ExtensionFlags {
    pub fn antiblur(&self) -> bool {
        self.enable_extensions && self.enable_antiblur
    }

    pub fn vertex_loop_preservation(&self) -> bool {
        self.enable_extensions && self.enable_vertex_loop_preservation
    }

    pub fn mesh_splitting(&self) -> bool {
        self.enable_extensions && self.enable_mesh_splitting
    }
}

/// `[export]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExportSettings {
    #[serde(flatten)]
    pub extensions: ExtensionFlags,

    /// Scene object whose subtree is exported.
    /// Default: the whole scene
    #[serde(default)]
    pub root_object: Option<String>,
}

/// Which meshes get a lattice object for their bounding box on import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundingBoxMode {
    None,
    /// Only meshes carrying the custom bounding box extension header
    #[default]
    Custom,
    All,
}

/// `[import]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ImportSettings {
    #[serde(flatten)]
    pub extensions: ExtensionFlags,

    #[serde(default)]
    pub bounding_box_mode: BoundingBoxMode,
}

impl ImportSettings {
    /// Custom bounding boxes are an extension, so they are skipped when
    /// extensions are disabled
    pub fn effective_bounding_box_mode(&self) -> BoundingBoxMode {
        match self.bounding_box_mode {
            BoundingBoxMode::Custom if !self.extensions.enable_extensions => BoundingBoxMode::None,
            mode => mode,
        }
    }
}

/// Empirical thresholds used while welding face corners
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WeldPolicy {
    /// Minimum normal dot product for two corners to share a vertex
    pub normal_similarity: f32,
    /// Tangents whose dot with the running average is below this are
    /// treated as opposite and deferred
    pub tangent_opposite: f32,
    /// Tangents with a squared length at or below this are ignored
    pub degenerate_tangent_length_squared: f32,
}

impl Default for WeldPolicy {
    fn default() -> Self {
        Self {
            normal_similarity: 0.99,
            tangent_opposite: -0.9,
            degenerate_tangent_length_squared: 0.1,
        }
    }
}
