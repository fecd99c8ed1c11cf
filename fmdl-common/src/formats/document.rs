//! Top-level FMDL document

use serde::{Deserialize, Serialize};

use super::material::{MaterialInstance, Texture};
use super::mesh::{Mesh, MeshInvariantError};
use super::mesh_group::MeshGroup;
use super::skeleton::Bone;

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            /// Position in the owning document array
            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

document_id!(
    /// Index into [`FmdlDocument::bones`]
    BoneId
);
document_id!(
    /// Index into [`FmdlDocument::meshes`]
    MeshId
);
document_id!(
    /// Index into [`FmdlDocument::mesh_groups`]
    MeshGroupId
);
document_id!(
    /// Index into [`FmdlDocument::material_instances`]
    MaterialId
);
document_id!(
    /// Index into [`FmdlDocument::textures`]
    TextureId
);

/// Structural problems found by [`FmdlDocument::check_references`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("bone '{bone}' has out-of-range parent {parent}")]
    BoneParent { bone: String, parent: usize },

    #[error("bone '{0}' is part of a parent cycle")]
    BoneCycle(String),

    #[error("mesh {mesh} references missing material {material}")]
    MeshMaterial { mesh: usize, material: usize },

    #[error("mesh {mesh}: {source}")]
    Mesh {
        mesh: usize,
        #[source]
        source: MeshInvariantError,
    },

    #[error("material '{material}' references missing texture {texture}")]
    MaterialTexture { material: String, texture: usize },

    #[error("mesh group '{group}' references missing {what} {index}")]
    MeshGroupReference {
        group: String,
        what: &'static str,
        index: usize,
    },
}

/// In-memory exchange-format document
///
/// Produced by export and handed to the binary serializer; produced by the
/// serializer and consumed by import.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FmdlDocument {
    pub bones: Vec<Bone>,
    pub material_instances: Vec<MaterialInstance>,
    pub textures: Vec<Texture>,
    pub meshes: Vec<Mesh>,
    pub mesh_groups: Vec<MeshGroup>,
}

impl FmdlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bone(&self, id: BoneId) -> &Bone {
        &self.bones[id.0]
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0]
    }

    pub fn mesh_group(&self, id: MeshGroupId) -> &MeshGroup {
        &self.mesh_groups[id.0]
    }

    pub fn material_instance(&self, id: MaterialId) -> &MaterialInstance {
        &self.material_instances[id.0]
    }

    pub fn texture(&self, id: TextureId) -> &Texture {
        &self.textures[id.0]
    }

    /// Append a bone, returning its id
    pub fn add_bone(&mut self, bone: Bone) -> BoneId {
        self.bones.push(bone);
        BoneId(self.bones.len() - 1)
    }

    /// Append a mesh, returning its id
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    /// Append a material instance, returning its id
    pub fn add_material_instance(&mut self, material: MaterialInstance) -> MaterialId {
        self.material_instances.push(material);
        MaterialId(self.material_instances.len() - 1)
    }

    /// Append a texture, returning its id
    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    /// Append a mesh group and link it below `parent`
    pub fn add_mesh_group(&mut self, name: &str, parent: Option<MeshGroupId>) -> MeshGroupId {
        let id = MeshGroupId(self.mesh_groups.len());
        self.mesh_groups.push(MeshGroup::new(name, parent));
        if let Some(parent) = parent {
            self.mesh_groups[parent.0].children.push(id);
        }
        id
    }

    pub fn bone_ids(&self) -> impl Iterator<Item = BoneId> + '_ {
        (0..self.bones.len()).map(BoneId)
    }

    pub fn mesh_ids(&self) -> impl Iterator<Item = MeshId> + '_ {
        (0..self.meshes.len()).map(MeshId)
    }

    pub fn mesh_group_ids(&self) -> impl Iterator<Item = MeshGroupId> + '_ {
        (0..self.mesh_groups.len()).map(MeshGroupId)
    }

    /// Mesh groups without a parent, in document order
    pub fn root_mesh_groups(&self) -> Vec<MeshGroupId> {
        self.mesh_group_ids()
            .filter(|id| self.mesh_groups[id.0].parent.is_none())
            .collect()
    }

    /// Find a bone by name
    pub fn find_bone(&self, name: &str) -> Option<BoneId> {
        self.bones.iter().position(|b| b.name == name).map(BoneId)
    }

    /// Verify that every cross reference points inside the document and
    /// that every mesh satisfies its vertex field and bone group invariants
    pub fn check_references(&self) -> Result<(), DocumentError> {
        for bone in &self.bones {
            match bone.parent {
                Some(parent) if parent.0 >= self.bones.len() => {
                    return Err(DocumentError::BoneParent {
                        bone: bone.name.clone(),
                        parent: parent.0,
                    });
                }
                _ => {}
            }
        }

        // A parent chain longer than the bone count must revisit a bone
        for bone in &self.bones {
            let mut steps = 0;
            let mut current = bone.parent;
            while let Some(parent) = current {
                steps += 1;
                if steps > self.bones.len() {
                    return Err(DocumentError::BoneCycle(bone.name.clone()));
                }
                current = self.bones[parent.0].parent;
            }
        }

        for material in &self.material_instances {
            for (_, texture) in &material.textures {
                if texture.0 >= self.textures.len() {
                    return Err(DocumentError::MaterialTexture {
                        material: material.name.clone(),
                        texture: texture.0,
                    });
                }
            }
        }

        for (index, mesh) in self.meshes.iter().enumerate() {
            if mesh.material_instance.0 >= self.material_instances.len() {
                return Err(DocumentError::MeshMaterial {
                    mesh: index,
                    material: mesh.material_instance.0,
                });
            }
            mesh.check_invariants(self.bones.len())
                .map_err(|source| DocumentError::Mesh { mesh: index, source })?;
        }

        for group in &self.mesh_groups {
            let dangling = |what: &'static str, index: usize| DocumentError::MeshGroupReference {
                group: group.name.clone(),
                what,
                index,
            };
            if let Some(parent) = group.parent.filter(|p| p.0 >= self.mesh_groups.len()) {
                return Err(dangling("parent group", parent.0));
            }
            if let Some(child) = group.children.iter().find(|c| c.0 >= self.mesh_groups.len()) {
                return Err(dangling("child group", child.0));
            }
            if let Some(mesh) = group.meshes.iter().find(|m| m.0 >= self.meshes.len()) {
                return Err(dangling("mesh", mesh.0));
            }
        }

        Ok(())
    }
}
