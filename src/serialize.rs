use serde_json::{Value, json};

use crate::model::{ElementData, ParsedScene};

/// Serialize the scene graph for the embedding host's outliner: the root node
/// id plus one entry per element, in table order so array position is the
/// element id.
pub fn serialize_scene(scene: &ParsedScene) -> Value {
    let elements: Vec<Value> = scene
        .elements
        .iter()
        .map(|element| {
            let mut obj = json!({
                "type": element.data.type_name(),
                "name": element.name,
            });
            match &element.data {
                ElementData::Node { children, attribs } => {
                    obj["children"] = json!(children);
                    obj["attribs"] = json!(attribs);
                }
                ElementData::Mesh(mesh) => {
                    obj["materials"] = json!(mesh.materials);
                    obj["numVertices"] = json!(mesh.num_vertices());
                    obj["numIndices"] = json!(mesh.num_indices());
                    obj["numFaces"] = json!(mesh.faces.len());
                    obj["hasNormals"] = json!(mesh.normals.is_some());
                    obj["hasUvs"] = json!(mesh.uvs.is_some());
                }
                ElementData::Material | ElementData::Light => {}
            }
            obj
        })
        .collect();

    json!({
        "rootNode": scene.root_node,
        "elements": elements,
    })
}
