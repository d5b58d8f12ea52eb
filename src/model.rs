use glam::{Vec2, Vec3};

use crate::error::{VantageError, VantageResult};

/// Decoded scene as produced by a [`crate::decode::SceneDecoder`].
///
/// Carries only what the bridge commands dereference; renderer-side data
/// stays behind the engine's prepared-scene handle.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedScene {
    #[serde(default)]
    pub root_node: u32,
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub data: ElementData,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementData {
    Node {
        #[serde(default)]
        children: Vec<u32>,
        #[serde(default)]
        attribs: Vec<u32>,
    },
    Mesh(Mesh),
    Material,
    Light,
}

impl ElementData {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Node { .. } => "node",
            Self::Mesh(_) => "mesh",
            Self::Material => "material",
            Self::Light => "light",
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh {
    #[serde(default)]
    pub vertex_indices: Vec<u32>,
    pub positions: VertexStream<Vec3>,
    #[serde(default)]
    pub normals: Option<VertexStream<Vec3>>,
    #[serde(default)]
    pub uvs: Option<VertexStream<Vec2>>,
    #[serde(default)]
    pub faces: Vec<Face>,
    #[serde(default)]
    pub materials: Vec<u32>,
}

/// Per-corner vertex attribute: `values` addressed through `indices`.
/// An empty `indices` list means the identity mapping.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct VertexStream<T> {
    pub values: Vec<T>,
    #[serde(default)]
    pub indices: Vec<u32>,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Face {
    pub index_begin: u32,
    pub num_indices: u32,
}

impl<T: Copy> VertexStream<T> {
    pub fn get(&self, corner: usize) -> Option<T> {
        if self.indices.is_empty() {
            self.values.get(corner).copied()
        } else {
            let ix = *self.indices.get(corner)? as usize;
            self.values.get(ix).copied()
        }
    }

    fn covers(&self, num_corners: usize) -> bool {
        if self.indices.is_empty() {
            self.values.len() >= num_corners
        } else {
            self.indices.len() >= num_corners
                && self
                    .indices
                    .iter()
                    .all(|&ix| (ix as usize) < self.values.len())
        }
    }
}

impl Mesh {
    pub fn num_indices(&self) -> usize {
        self.vertex_indices.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.values.len()
    }

    /// Face containing the given vertex-stream index, by binary search over
    /// the ascending face table.
    pub fn face_of_index(&self, index: u32) -> Option<u32> {
        let at = self
            .faces
            .partition_point(|f| f.index_begin <= index)
            .checked_sub(1)?;
        let face = &self.faces[at];
        (index < face.index_begin + face.num_indices).then_some(at as u32)
    }
}

impl ParsedScene {
    pub fn validate(&self) -> VantageResult<()> {
        if self.elements.is_empty() {
            return Err(VantageError::scene("scene has no elements"));
        }
        if self.root_node as usize >= self.elements.len() {
            return Err(VantageError::scene(format!(
                "root node id {} out of range",
                self.root_node
            )));
        }

        for (id, element) in self.elements.iter().enumerate() {
            match &element.data {
                ElementData::Node { children, attribs } => {
                    for &child in children.iter().chain(attribs) {
                        if child as usize >= self.elements.len() {
                            return Err(VantageError::scene(format!(
                                "node '{}' references missing element {child}",
                                element.name
                            )));
                        }
                    }
                }
                ElementData::Mesh(mesh) => self.validate_mesh(id, &element.name, mesh)?,
                ElementData::Material | ElementData::Light => {}
            }
        }
        Ok(())
    }

    fn validate_mesh(&self, id: usize, name: &str, mesh: &Mesh) -> VantageResult<()> {
        let num_corners = mesh.num_indices();

        if !mesh.positions.covers(num_corners) {
            return Err(VantageError::scene(format!(
                "mesh '{name}' ({id}): position stream does not cover {num_corners} indices"
            )));
        }
        if let Some(normals) = &mesh.normals {
            if !normals.covers(num_corners) {
                return Err(VantageError::scene(format!(
                    "mesh '{name}' ({id}): normal stream does not cover {num_corners} indices"
                )));
            }
        }
        if let Some(uvs) = &mesh.uvs {
            if !uvs.covers(num_corners) {
                return Err(VantageError::scene(format!(
                    "mesh '{name}' ({id}): uv stream does not cover {num_corners} indices"
                )));
            }
        }

        let mut expected_begin = 0u32;
        for face in &mesh.faces {
            if face.index_begin != expected_begin {
                return Err(VantageError::scene(format!(
                    "mesh '{name}' ({id}): face table is not contiguous at index {}",
                    face.index_begin
                )));
            }
            expected_begin = face.index_begin + face.num_indices;
        }
        if expected_begin as usize != num_corners {
            return Err(VantageError::scene(format!(
                "mesh '{name}' ({id}): face table covers {expected_begin} of {num_corners} indices"
            )));
        }

        for &mat in &mesh.materials {
            match self.elements.get(mat as usize) {
                Some(el) if matches!(el.data, ElementData::Material) => {}
                Some(_) => {
                    return Err(VantageError::scene(format!(
                        "mesh '{name}' ({id}): element {mat} is not a material"
                    )));
                }
                None => {
                    return Err(VantageError::scene(format!(
                        "mesh '{name}' ({id}): references missing material {mat}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> Mesh {
        Mesh {
            vertex_indices: vec![0, 1, 2, 0, 2, 3],
            positions: VertexStream {
                values: vec![
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(1.0, 0.0, 0.0),
                    Vec3::new(1.0, 1.0, 0.0),
                    Vec3::new(0.0, 1.0, 0.0),
                ],
                indices: vec![0, 1, 2, 0, 2, 3],
            },
            normals: None,
            uvs: None,
            faces: vec![
                Face {
                    index_begin: 0,
                    num_indices: 3,
                },
                Face {
                    index_begin: 3,
                    num_indices: 3,
                },
            ],
            materials: vec![],
        }
    }

    fn scene_with(mesh: Mesh) -> ParsedScene {
        ParsedScene {
            root_node: 0,
            elements: vec![
                Element {
                    name: "root".to_string(),
                    data: ElementData::Node {
                        children: vec![1],
                        attribs: vec![],
                    },
                },
                Element {
                    name: "quad".to_string(),
                    data: ElementData::Mesh(mesh),
                },
            ],
        }
    }

    #[test]
    fn face_lookup_spans_face_boundaries() {
        let mesh = quad_mesh();
        assert_eq!(mesh.face_of_index(0), Some(0));
        assert_eq!(mesh.face_of_index(2), Some(0));
        assert_eq!(mesh.face_of_index(3), Some(1));
        assert_eq!(mesh.face_of_index(5), Some(1));
        assert_eq!(mesh.face_of_index(6), None);
    }

    #[test]
    fn identity_stream_reads_values_directly() {
        let stream = VertexStream {
            values: vec![1.0f32, 2.0, 3.0],
            indices: vec![],
        };
        assert_eq!(stream.get(1), Some(2.0));
        assert_eq!(stream.get(3), None);
    }

    #[test]
    fn validate_accepts_quad_scene() {
        scene_with(quad_mesh()).validate().unwrap();
    }

    #[test]
    fn validate_rejects_dangling_child() {
        let mut scene = scene_with(quad_mesh());
        let ElementData::Node { children, .. } = &mut scene.elements[0].data else {
            unreachable!();
        };
        children.push(9);
        assert!(scene.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_position_stream() {
        let mut mesh = quad_mesh();
        mesh.positions.indices.pop();
        assert!(scene_with(mesh).validate().is_err());
    }

    #[test]
    fn validate_rejects_gapped_face_table() {
        let mut mesh = quad_mesh();
        mesh.faces[1].index_begin = 4;
        assert!(scene_with(mesh).validate().is_err());
    }

    #[test]
    fn scene_json_decodes() {
        let scene: ParsedScene = serde_json::from_str(
            r#"{
                "rootNode": 0,
                "elements": [
                    {"type": "node", "name": "root", "children": [1]},
                    {"type": "mesh", "name": "tri",
                     "vertexIndices": [0, 1, 2],
                     "positions": {"values": [[0,0,0], [1,0,0], [0,1,0]]},
                     "faces": [{"indexBegin": 0, "numIndices": 3}]}
                ]
            }"#,
        )
        .unwrap();
        scene.validate().unwrap();
        assert_eq!(scene.elements.len(), 2);
    }
}
