//! Material and texture conversion

use fmdl_common::{
    is_normal_map_role, FmdlDocument, MaterialId, MaterialInstance, Mesh, Texture, TextureId,
    EXT_ANTIBLUR,
};
use hashbrown::HashMap;
use tracing::debug;

use crate::error::{FmdlError, Result};
use crate::mesh::{UV_MAP_COLOR, UV_MAP_NORMALS};
use crate::scene::{
    simplify_name, Image, Material, MaterialParameter, MaterialTexture, ObjectId, Scene,
};

/// Host materials are split per mesh state the format stores on meshes
pub type MaterialKey = (MaterialId, u8, u8, bool);

pub fn material_key(mesh: &Mesh) -> MaterialKey {
    (
        mesh.material_instance,
        mesh.alpha_flags,
        mesh.shadow_flags,
        mesh.has_extension_header(EXT_ANTIBLUR),
    )
}

/// Export every material used by `mesh_objects`, in first-use order
///
/// Returns the material id for each exported host material name. Textures
/// are shared between materials binding the same image.
pub fn export_materials(
    scene: &Scene,
    mesh_objects: &[ObjectId],
    doc: &mut FmdlDocument,
) -> Result<HashMap<String, MaterialId>> {
    let mut used: Vec<usize> = Vec::new();
    for &id in mesh_objects {
        let Some(mesh) = scene.mesh(id) else {
            continue;
        };
        for name in mesh.materials.iter().flatten() {
            if name.is_empty() {
                continue;
            }
            let index = scene
                .find_material(name)
                .ok_or_else(|| FmdlError::UnknownMaterial {
                    mesh: scene.object(id).name.clone(),
                    material: name.clone(),
                })?;
            if !used.contains(&index) {
                used.push(index);
            }
        }
    }

    let mut textures: HashMap<usize, TextureId> = HashMap::new();
    let mut ids = HashMap::new();
    for index in used {
        let material = &scene.materials[index];
        let id = export_material(scene, material, &mut textures, doc)?;
        ids.insert(material.name.clone(), id);
    }
    Ok(ids)
}

fn export_material(
    scene: &Scene,
    material: &Material,
    textures: &mut HashMap<usize, TextureId>,
    doc: &mut FmdlDocument,
) -> Result<MaterialId> {
    let mut instance = MaterialInstance {
        name: simplify_name(&material.name).to_string(),
        shader: material.shader.clone(),
        technique: material.technique.clone(),
        parameters: material
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.values))
            .collect(),
        textures: Vec::with_capacity(material.textures.len()),
    };

    for binding in &material.textures {
        let image_index = scene
            .find_image(&binding.image)
            .ok_or_else(|| FmdlError::UnknownImage {
                material: material.name.clone(),
                image: binding.image.clone(),
            })?;
        let texture = match textures.get(&image_index) {
            Some(&texture) => texture,
            None => {
                let image = &scene.images[image_index];
                let texture = doc.add_texture(Texture {
                    filename: image.filename.clone(),
                    directory: image.directory.clone(),
                });
                textures.insert(image_index, texture);
                texture
            }
        };
        instance.textures.push((binding.role.clone(), texture));
    }

    debug!(
        "Material '{}': {} parameters, {} textures",
        instance.name,
        instance.parameters.len(),
        instance.textures.len()
    );
    Ok(doc.add_material_instance(instance))
}

/// Whether any mesh using `material` has a separate normals UV channel
pub fn material_has_separate_uv_maps(doc: &FmdlDocument, material: MaterialId) -> bool {
    doc.meshes
        .iter()
        .any(|m| m.material_instance == material && m.has_distinct_uv_channels())
}

/// Create one host material per distinct [`MaterialKey`] in the document
///
/// Returns the scene material index for every key.
pub fn import_materials(scene: &mut Scene, doc: &FmdlDocument) -> HashMap<MaterialKey, usize> {
    let mut materials: HashMap<MaterialKey, usize> = HashMap::new();
    let mut images: HashMap<TextureId, String> = HashMap::new();
    let mut images_by_file: HashMap<&Texture, String> = HashMap::new();

    for mesh in &doc.meshes {
        let key = material_key(mesh);
        if materials.contains_key(&key) {
            continue;
        }
        let instance = doc.material_instance(mesh.material_instance);
        let (_, alpha_flags, shadow_flags, antiblur) = key;

        let normals_uv_map = if material_has_separate_uv_maps(doc, mesh.material_instance) {
            UV_MAP_NORMALS
        } else {
            UV_MAP_COLOR
        };

        let mut bindings = Vec::with_capacity(instance.textures.len());
        for (role, texture_id) in &instance.textures {
            let image = match images.get(texture_id) {
                Some(name) => name.clone(),
                None => {
                    let texture = doc.texture(*texture_id);
                    let name = match images_by_file.get(texture) {
                        Some(name) => name.clone(),
                        None => {
                            let index = scene.add_image(Image {
                                name: texture.filename.clone(),
                                filename: texture.filename.clone(),
                                directory: texture.directory.clone(),
                            });
                            let name = scene.images[index].name.clone();
                            images_by_file.insert(texture, name.clone());
                            name
                        }
                    };
                    images.insert(*texture_id, name.clone());
                    name
                }
            };
            let uv_map = if is_normal_map_role(role) {
                normals_uv_map
            } else {
                UV_MAP_COLOR
            };
            bindings.push(MaterialTexture {
                image,
                role: role.clone(),
                uv_map: Some(uv_map.to_string()),
            });
        }

        let index = scene.add_material(Material {
            name: instance.name.clone(),
            shader: instance.shader.clone(),
            technique: instance.technique.clone(),
            parameters: instance
                .parameters
                .iter()
                .map(|(name, values)| MaterialParameter {
                    name: name.clone(),
                    values: *values,
                })
                .collect(),
            textures: bindings,
            alpha_flags,
            shadow_flags,
            antiblur,
        });
        materials.insert(key, index);
    }

    materials
}
