//! Material instances and texture references

use serde::{Deserialize, Serialize};

use super::document::TextureId;

/// Shader binding for a set of meshes
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialInstance {
    pub name: String,
    pub shader: String,
    pub technique: String,
    /// Named four-component shader parameters, in authoring order
    pub parameters: Vec<(String, [f32; 4])>,
    /// Texture bindings keyed by role (e.g. `Base_Tex_SRGB`, `NormalMap_Tex_NRM`)
    pub textures: Vec<(String, TextureId)>,
}

impl MaterialInstance {
    pub fn parameter(&self, name: &str) -> Option<[f32; 4]> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Reference to an external texture file
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Texture {
    pub filename: String,
    pub directory: String,
}

/// Whether a texture role samples tangent-space normals
pub fn is_normal_map_role(role: &str) -> bool {
    role.contains("_NRM")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_lookup() {
        let material = MaterialInstance {
            parameters: vec![("MatParamIndex_0".to_string(), [1.0, 0.0, 0.0, 0.5])],
            ..Default::default()
        };
        assert_eq!(material.parameter("MatParamIndex_0"), Some([1.0, 0.0, 0.0, 0.5]));
        assert_eq!(material.parameter("missing"), None);
    }

    #[test]
    fn test_normal_map_role() {
        assert!(is_normal_map_role("NormalMap_Tex_NRM"));
        assert!(!is_normal_map_role("Base_Tex_SRGB"));
    }
}
