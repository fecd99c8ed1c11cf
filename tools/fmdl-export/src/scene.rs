//! Host scene model
//!
//! A flat arena of scene objects addressed by [`ObjectId`]. Parent links are
//! the only graph edges; children are derived on demand and always visited
//! in name order so that every traversal is deterministic.
//!
//! All coordinates are world-space and Z-up.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{FmdlError, Result};

/// Index into [`Scene::objects`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub usize);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(default)]
    pub parent: Option<ObjectId>,
    #[serde(flatten)]
    pub kind: ObjectKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Mesh(AuthoringMesh),
    Empty {
        /// Set on the root object created by an import
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fmdl_filename: Option<String>,
    },
    Armature(Armature),
    /// A lattice parented to a mesh defines that mesh's bounding box
    Lattice(Lattice),
}

impl ObjectKind {
    pub fn empty() -> Self {
        ObjectKind::Empty {
            fmdl_filename: None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectKind::Mesh(_) => "mesh",
            ObjectKind::Empty { .. } => "empty",
            ObjectKind::Armature(_) => "armature",
            ObjectKind::Lattice(_) => "lattice",
        }
    }
}

/// Face-corner attributed mesh as authored in the host
///
/// Per-corner arrays are indexed by corner, with the corners of polygon `n`
/// following those of polygon `n - 1`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthoringMesh {
    /// Vertex slot positions
    pub positions: Vec<Vec3>,
    /// Vertex slot indices per polygon, at least three each
    pub polygons: Vec<Vec<u32>>,
    /// Per-corner normals; empty means flat shading
    #[serde(default)]
    pub normals: Vec<Vec3>,
    /// Per-corner tangents; empty means none were computed
    #[serde(default)]
    pub tangents: Vec<Vec3>,
    #[serde(default)]
    pub color_layers: Vec<ColorLayer>,
    #[serde(default)]
    pub uv_layers: Vec<UvLayer>,
    /// Vertex group names, usually bone names
    #[serde(default)]
    pub vertex_groups: Vec<String>,
    /// Per-slot `(vertex group index, weight)` lists
    #[serde(default)]
    pub weights: Vec<Vec<(u32, f32)>>,
    /// Material slots by material name
    #[serde(default)]
    pub materials: Vec<Option<String>>,
    #[serde(default)]
    pub high_precision_uvs: bool,
    /// Armature deforming this mesh
    #[serde(default)]
    pub armature: Option<ObjectId>,
}

impl AuthoringMesh {
    pub fn corner_count(&self) -> usize {
        self.polygons.iter().map(Vec::len).sum()
    }

    /// Number of triangles after fan triangulation
    pub fn triangle_count(&self) -> usize {
        self.polygons
            .iter()
            .map(|p| p.len().saturating_sub(2))
            .sum()
    }

    pub fn uv_layer(&self, name: &str) -> Option<usize> {
        self.uv_layers.iter().position(|l| l.name == name)
    }
}

/// Per-corner RGBA colours
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorLayer {
    pub name: String,
    pub colors: Vec<[f32; 4]>,
}

/// Per-corner texture coordinates (origin bottom-left)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    pub uvs: Vec<Vec2>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Armature {
    pub bones: Vec<ArmatureBone>,
}

impl Armature {
    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmatureBone {
    pub name: String,
    pub head: Vec3,
    pub tail: Vec3,
    /// Index into [`Armature::bones`]; parents precede their children
    pub parent: Option<usize>,
    #[serde(default)]
    pub connected: bool,
}

/// Axis-aligned box in world space
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    pub min: Vec3,
    pub max: Vec3,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub shader: String,
    #[serde(default)]
    pub technique: String,
    #[serde(default)]
    pub parameters: Vec<MaterialParameter>,
    #[serde(default)]
    pub textures: Vec<MaterialTexture>,
    #[serde(default)]
    pub alpha_flags: u8,
    #[serde(default)]
    pub shadow_flags: u8,
    #[serde(default)]
    pub antiblur: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialParameter {
    pub name: String,
    pub values: [f32; 4],
}

pub const DEFAULT_TEXTURE_ROLE: &str = "Base_Tex_SRGB";

fn default_texture_role() -> String {
    DEFAULT_TEXTURE_ROLE.to_string()
}

/// Image bound to a material
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialTexture {
    /// Name of the bound [`Image`]
    pub image: String,
    #[serde(default = "default_texture_role")]
    pub role: String,
    /// UV layer sampled by this texture
    #[serde(default)]
    pub uv_map: Option<String>,
}

/// Image resource; textures are shared by image, not by file name
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    pub filename: String,
    #[serde(default)]
    pub directory: String,
}

/// Ordered `(object name, parent name)` pairs describing the scene shape
pub type SceneSignature = Vec<(String, Option<String>)>;

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, id: ObjectId) -> &SceneObject {
        &self.objects[id.0]
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut SceneObject {
        &mut self.objects[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        (0..self.objects.len()).map(ObjectId)
    }

    /// Check that every parent link points at an object and that no object
    /// is its own ancestor
    pub fn validate(&self) -> Result<()> {
        for object in &self.objects {
            if let Some(parent) = object.parent {
                if parent.0 >= self.objects.len() {
                    return Err(FmdlError::DanglingParent {
                        object: object.name.clone(),
                        parent: parent.0,
                    });
                }
            }
        }

        // 0: unvisited, 1: on the current walk, 2: known to reach a root
        let mut state = vec![0u8; self.objects.len()];
        for start in 0..self.objects.len() {
            let mut walk = Vec::new();
            let mut current = Some(start);
            while let Some(id) = current {
                match state[id] {
                    2 => break,
                    1 => return Err(FmdlError::ParentCycle(self.objects[id].name.clone())),
                    _ => {}
                }
                state[id] = 1;
                walk.push(id);
                current = self.objects[id].parent.map(|p| p.0);
            }
            for id in walk {
                state[id] = 2;
            }
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().position(|o| o.name == name).map(ObjectId)
    }

    pub fn find_material(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.name == name)
    }

    pub fn find_image(&self, name: &str) -> Option<usize> {
        self.images.iter().position(|i| i.name == name)
    }

    /// Add an object, renaming it `name.001`, `name.002`, ... if taken
    pub fn add_object(&mut self, name: &str, parent: Option<ObjectId>, kind: ObjectKind) -> ObjectId {
        let name = unique_name(name, |n| self.find(n).is_some());
        self.objects.push(SceneObject { name, parent, kind });
        ObjectId(self.objects.len() - 1)
    }

    /// Add a material, renaming it like [`Scene::add_object`]; returns its index
    pub fn add_material(&mut self, mut material: Material) -> usize {
        material.name = unique_name(&material.name, |n| self.find_material(n).is_some());
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Add an image, renaming it like [`Scene::add_object`]; returns its index
    pub fn add_image(&mut self, mut image: Image) -> usize {
        image.name = unique_name(&image.name, |n| self.find_image(n).is_some());
        self.images.push(image);
        self.images.len() - 1
    }

    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) {
        self.objects[child.0].parent = parent;
    }

    /// Direct children, sorted by name
    pub fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut children: Vec<ObjectId> = self
            .ids()
            .filter(|&c| self.objects[c.0].parent == Some(id))
            .collect();
        children.sort_by(|a, b| self.objects[a.0].name.cmp(&self.objects[b.0].name));
        children
    }

    /// Objects without a parent, in scene order
    pub fn roots(&self) -> Vec<ObjectId> {
        self.ids()
            .filter(|&id| self.objects[id.0].parent.is_none())
            .collect()
    }

    pub fn mesh(&self, id: ObjectId) -> Option<&AuthoringMesh> {
        match &self.objects[id.0].kind {
            ObjectKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Name path from just below `root` down to `id`, joined with `/`
    pub fn path_name(&self, id: ObjectId, root: Option<ObjectId>) -> String {
        let mut name = self.objects[id.0].name.clone();
        let mut parent = self.objects[id.0].parent;
        while let Some(p) = parent {
            if Some(p) == root {
                break;
            }
            name = format!("{}/{}", self.objects[p.0].name, name);
            parent = self.objects[p.0].parent;
        }
        name
    }

    pub fn signature(&self) -> SceneSignature {
        self.objects
            .iter()
            .map(|o| {
                (
                    o.name.clone(),
                    o.parent.map(|p| self.objects[p.0].name.clone()),
                )
            })
            .collect()
    }
}

fn unique_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }
    (1..)
        .map(|n| format!("{}.{:03}", name, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Strip a trailing `.NNN` duplicate suffix from a host object name
pub fn simplify_name(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() >= 4 {
        let (head, tail) = bytes.split_at(bytes.len() - 4);
        if tail[0] == b'.' && tail[1..].iter().all(u8::is_ascii_digit) {
            return &name[..head.len()];
        }
    }
    name
}

/// Remembers the last observed scene signature
///
/// Summaries and other derived data only need recomputing when the
/// signature changes.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    latest: Option<SceneSignature>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the scene's signature, returning whether it changed
    pub fn observe(&mut self, scene: &Scene) -> bool {
        let signature = scene.signature();
        if self.latest.as_ref() == Some(&signature) {
            return false;
        }
        self.latest = Some(signature);
        true
    }
}
