use glam::Vec3;
use serde_json::Value;

use crate::engine::{CameraParams, PropOverride, TargetDesc};

/// Wire-side argument shapes for each command. Required fields stay `Option`
/// here so handlers can report their absence by name; everything else carries
/// the protocol's defaults.

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitArgs {
    pub pretty: Option<bool>,
    pub verbose: Option<bool>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSceneArgs {
    pub name: Option<String>,
    #[serde(default)]
    pub data_pointer: u64,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderArgs {
    pub target: Option<TargetDesc>,
    pub desc: Option<SceneDescArgs>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDescArgs {
    pub scene_name: Option<String>,
    pub camera: Option<CameraArgs>,
    pub selected_element: Option<i64>,
    pub highlight_vertex_index: Option<i64>,
    pub highlight_face_index: Option<i64>,
    #[serde(default)]
    pub overrides: Vec<Value>,
    pub animation: Option<AnimationArgs>,
}

impl SceneDescArgs {
    pub fn time(&self) -> f64 {
        self.animation.as_ref().map_or(0.0, |a| a.time)
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationArgs {
    #[serde(default)]
    pub time: f64,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraArgs {
    pub position: Option<PartialVec3>,
    pub target: Option<PartialVec3>,
    pub field_of_view: Option<f32>,
    pub near_plane: Option<f32>,
    pub far_plane: Option<f32>,
}

/// Camera vectors merge per component, so a request may move only one axis
/// and inherit the rest from the defaults.
#[derive(Clone, Copy, Debug, Default, serde::Deserialize)]
pub struct PartialVec3 {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl PartialVec3 {
    pub fn resolve(self, def: Vec3) -> Vec3 {
        Vec3::new(
            self.x.unwrap_or(def.x),
            self.y.unwrap_or(def.y),
            self.z.unwrap_or(def.z),
        )
    }
}

impl CameraArgs {
    pub fn resolve(args: Option<&Self>) -> CameraParams {
        let def = CameraParams::default();
        let Some(a) = args else { return def };
        CameraParams {
            position: a
                .position
                .map_or(def.position, |p| p.resolve(def.position)),
            target: a.target.map_or(def.target, |t| t.resolve(def.target)),
            field_of_view: a.field_of_view.unwrap_or(def.field_of_view),
            near_plane: a.near_plane.unwrap_or(def.near_plane),
            far_plane: a.far_plane.unwrap_or(def.far_plane),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentArgs {
    #[serde(default)]
    pub target_index: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPixelsArgs {
    #[serde(default)]
    pub target_index: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeResourcesArgs {
    #[serde(default)]
    pub scenes: bool,
    #[serde(default)]
    pub targets: bool,
    #[serde(default)]
    pub globals: bool,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVertexArgs {
    pub scene_name: Option<String>,
    pub element_id: Option<u64>,
    pub index: Option<u64>,
}

/// Map a wire id that uses negative values for "none" onto an option.
pub fn element_ref(raw: Option<i64>) -> Option<u32> {
    match raw {
        Some(v) if (0..i64::from(u32::MAX)).contains(&v) => Some(v as u32),
        _ => None,
    }
}

/// Translate raw override entries into typed overrides.
///
/// Entries that are not objects or carry no usable `value` are dropped
/// without error; array values fill up to three components, scalars only the
/// first. Property names borrow from the request.
pub fn translate_overrides(entries: &[Value]) -> Vec<PropOverride<'_>> {
    entries
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let value = obj.get("value")?;

            let mut comps = [0.0f64; 3];
            match value {
                Value::Array(items) => {
                    for (slot, item) in comps.iter_mut().zip(items) {
                        *slot = item.as_f64().unwrap_or(0.0);
                    }
                }
                Value::Number(n) => comps[0] = n.as_f64().unwrap_or(0.0),
                _ => return None,
            }

            Some(PropOverride {
                element_id: obj.get("elementId").and_then(Value::as_u64).unwrap_or(0) as u32,
                name: obj.get("name").and_then(Value::as_str).unwrap_or(""),
                value: comps,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn camera_defaults_when_absent() {
        let cam = CameraArgs::resolve(None);
        assert_eq!(cam.position, Vec3::new(4.0, 4.0, 4.0));
        assert_eq!(cam.field_of_view, 50.0);
    }

    #[test]
    fn camera_merges_partial_vectors() {
        let args: CameraArgs =
            serde_json::from_value(json!({"position": {"y": 9.0}, "fieldOfView": 30.0})).unwrap();
        let cam = CameraArgs::resolve(Some(&args));
        assert_eq!(cam.position, Vec3::new(4.0, 9.0, 4.0));
        assert_relative_eq!(cam.field_of_view, 30.0);
        assert_relative_eq!(cam.near_plane, 0.01);
        assert_eq!(cam.target, Vec3::ZERO);
    }

    #[test]
    fn overrides_skip_entries_without_values() {
        let entries = vec![
            json!({"elementId": 3, "name": "u_color", "value": [1.0, 0.5, 0.25]}),
            json!({"elementId": 4, "name": "no_value"}),
            json!({"elementId": 5, "name": "scalar", "value": 2.5}),
            json!({"elementId": 6, "name": "bad", "value": "red"}),
            json!(42),
        ];
        let overrides = translate_overrides(&entries);
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[0].element_id, 3);
        assert_eq!(overrides[0].value, [1.0, 0.5, 0.25]);
        assert_eq!(overrides[1].name, "scalar");
        assert_eq!(overrides[1].value, [2.5, 0.0, 0.0]);
    }

    #[test]
    fn short_override_arrays_zero_fill() {
        let entries = vec![json!({"elementId": 1, "name": "p", "value": [7.0]})];
        let overrides = translate_overrides(&entries);
        assert_eq!(overrides[0].value, [7.0, 0.0, 0.0]);
    }

    #[test]
    fn negative_element_refs_mean_none() {
        assert_eq!(element_ref(Some(-1)), None);
        assert_eq!(element_ref(Some(12)), Some(12));
        assert_eq!(element_ref(None), None);
    }
}
