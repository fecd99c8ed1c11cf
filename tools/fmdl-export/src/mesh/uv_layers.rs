//! Assignment of host UV layers to the format's UV channels

use fmdl_common::{is_normal_map_role, MAX_UV_CHANNELS};

use crate::error::{FmdlError, Result};
use crate::scene::{AuthoringMesh, Material};

/// Layer name used for the primary (colour) UV channel
pub const UV_MAP_COLOR: &str = "UVMap";

/// Layer name used for the normal map UV channel
pub const UV_MAP_NORMALS: &str = "normal_map";

/// Host UV layers feeding the format's channels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UvSelection {
    pub color: usize,
    /// `None` when normal maps sample the colour channel
    pub normals: Option<usize>,
}

impl UvSelection {
    pub fn uv_count(&self) -> u8 {
        if self.normals.is_some() { 2 } else { 1 }
    }
}

/// Decide which UV layers become the colour and normals channels
///
/// Texture bindings on the material take precedence, then the layer naming
/// convention, then "the other layer" when there are exactly two.
pub fn resolve_uv_layers(name: &str, mesh: &AuthoringMesh, material: &Material) -> Result<UvSelection> {
    let layers = &mesh.uv_layers;
    match layers.len() {
        0 => return Err(FmdlError::MissingUvMap(name.to_string())),
        1 => {
            return Ok(UvSelection {
                color: 0,
                normals: None,
            })
        }
        n if n > MAX_UV_CHANNELS => {
            return Err(FmdlError::TooManyUvChannels {
                mesh: name.to_string(),
                count: n,
            })
        }
        _ => {}
    }

    let ambiguous = |reason: String| FmdlError::AmbiguousUvMaps {
        mesh: name.to_string(),
        reason,
    };

    let mut color_maps: Vec<usize> = Vec::new();
    let mut normal_maps: Vec<usize> = Vec::new();
    for texture in &material.textures {
        let Some(layer) = texture.uv_map.as_deref().and_then(|uv| mesh.uv_layer(uv)) else {
            continue;
        };
        let maps = if is_normal_map_role(&texture.role) {
            &mut normal_maps
        } else {
            &mut color_maps
        };
        if !maps.contains(&layer) {
            maps.push(layer);
        }
    }

    if color_maps.len() > 1 {
        return Err(ambiguous(
            "multiple UV maps configured as primary UV map".to_string(),
        ));
    }
    if normal_maps.len() > 1 {
        return Err(ambiguous(
            "multiple UV maps configured as normals UV map".to_string(),
        ));
    }

    if color_maps.is_empty() {
        if let Some(layer) = mesh.uv_layer(UV_MAP_COLOR).filter(|l| !normal_maps.contains(l)) {
            color_maps.push(layer);
        }
    }
    if normal_maps.is_empty() {
        if let Some(layer) = mesh.uv_layer(UV_MAP_NORMALS).filter(|l| !color_maps.contains(l)) {
            normal_maps.push(layer);
        }
    }
    if color_maps.is_empty() && normal_maps.len() == 1 && layers.len() == 2 {
        color_maps.push(1 - normal_maps[0]);
    }

    let (Some(&color), Some(&normals)) = (color_maps.first(), normal_maps.first()) else {
        let role = if color_maps.is_empty() { "primary" } else { "normals" };
        return Err(ambiguous(format!(
            "found {} UV maps, but no {} UV map is configured",
            layers.len(),
            role
        )));
    };

    Ok(UvSelection {
        color,
        normals: (color != normals).then_some(normals),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MaterialTexture, UvLayer};

    fn mesh_with_layers(names: &[&str]) -> AuthoringMesh {
        AuthoringMesh {
            uv_layers: names
                .iter()
                .map(|n| UvLayer {
                    name: n.to_string(),
                    uvs: Vec::new(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn texture(role: &str, uv_map: &str) -> MaterialTexture {
        MaterialTexture {
            image: "img".to_string(),
            role: role.to_string(),
            uv_map: Some(uv_map.to_string()),
        }
    }

    #[test]
    fn test_no_layers() {
        let err = resolve_uv_layers("m", &mesh_with_layers(&[]), &Material::default()).unwrap_err();
        assert!(matches!(err, FmdlError::MissingUvMap(_)));
    }

    #[test]
    fn test_single_layer() {
        let sel = resolve_uv_layers("m", &mesh_with_layers(&["any"]), &Material::default()).unwrap();
        assert_eq!(sel, UvSelection { color: 0, normals: None });
        assert_eq!(sel.uv_count(), 1);
    }

    #[test]
    fn test_three_layers_rejected() {
        let err = resolve_uv_layers("m", &mesh_with_layers(&["a", "b", "c"]), &Material::default())
            .unwrap_err();
        assert!(matches!(err, FmdlError::TooManyUvChannels { count: 3, .. }));
    }

    #[test]
    fn test_naming_convention() {
        let sel = resolve_uv_layers(
            "m",
            &mesh_with_layers(&[UV_MAP_NORMALS, UV_MAP_COLOR]),
            &Material::default(),
        )
        .unwrap();
        assert_eq!(sel, UvSelection { color: 1, normals: Some(0) });
    }

    #[test]
    fn test_texture_bindings_take_precedence() {
        let material = Material {
            textures: vec![texture("Base_Tex_SRGB", "second"), texture("NormalMap_Tex_NRM", "first")],
            ..Default::default()
        };
        let sel = resolve_uv_layers("m", &mesh_with_layers(&["first", "second"]), &material).unwrap();
        assert_eq!(sel, UvSelection { color: 1, normals: Some(0) });
    }

    #[test]
    fn test_other_of_two_layers() {
        let material = Material {
            textures: vec![texture("NormalMap_Tex_NRM", "b")],
            ..Default::default()
        };
        let sel = resolve_uv_layers("m", &mesh_with_layers(&["a", "b"]), &material).unwrap();
        assert_eq!(sel, UvSelection { color: 0, normals: Some(1) });
    }

    #[test]
    fn test_same_layer_for_both_roles() {
        let material = Material {
            textures: vec![texture("Base_Tex_SRGB", "a"), texture("NormalMap_Tex_NRM", "a")],
            ..Default::default()
        };
        let sel = resolve_uv_layers("m", &mesh_with_layers(&["a", "b"]), &material).unwrap();
        assert_eq!(sel, UvSelection { color: 0, normals: None });
    }

    #[test]
    fn test_unconfigured_layers_ambiguous() {
        let err = resolve_uv_layers("m", &mesh_with_layers(&["a", "b"]), &Material::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mesh 'm' has ambiguous UV maps: found 2 UV maps, but no primary UV map is configured."
        );
    }

    #[test]
    fn test_conflicting_primary_maps() {
        let material = Material {
            textures: vec![texture("Base_Tex_SRGB", "a"), texture("Layer_Tex_SRGB", "b")],
            ..Default::default()
        };
        let err = resolve_uv_layers("m", &mesh_with_layers(&["a", "b"]), &material).unwrap_err();
        assert!(err.to_string().contains("multiple UV maps configured as primary UV map"));
    }
}
