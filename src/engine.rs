use glam::Vec3;

use crate::error::VantageResult;
use crate::model::ParsedScene;

/// Opaque handle to a render-ready scene owned by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PreparedSceneId(pub u64);

fn default_extent() -> u32 {
    256
}

fn default_samples() -> u32 {
    1
}

fn default_pixel_scale() -> f32 {
    1.0
}

/// Offscreen target selection for a render call.
#[derive(Clone, Copy, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDesc {
    #[serde(default)]
    pub target_index: u32,
    #[serde(default = "default_extent")]
    pub width: u32,
    #[serde(default = "default_extent")]
    pub height: u32,
    #[serde(default = "default_samples")]
    pub samples: u32,
    #[serde(default = "default_pixel_scale")]
    pub pixel_scale: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraParams {
    pub position: Vec3,
    pub target: Vec3,
    pub field_of_view: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            position: Vec3::new(4.0, 4.0, 4.0),
            target: Vec3::ZERO,
            field_of_view: 50.0,
            near_plane: 0.01,
            far_plane: 100.0,
        }
    }
}

/// Per-render, request-scoped substitution of a scene element's property.
/// The name borrows from the request; it is never copied on the way to the
/// engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropOverride<'req> {
    pub element_id: u32,
    pub name: &'req str,
    pub value: [f64; 3],
}

#[derive(Clone, Debug)]
pub struct RenderParams<'req> {
    pub camera: CameraParams,
    pub selected_element: Option<u32>,
    pub highlight_vertex_index: Option<u32>,
    pub highlight_face_index: Option<u32>,
    pub time: f64,
    pub overrides: Vec<PropOverride<'req>>,
}

/// External rendering collaborator.
///
/// The bridge treats every call as fully blocking and never retains borrows
/// into the engine across calls. `setup` must be idempotent; it runs on
/// init, render, present, and getPixels.
pub trait RenderEngine {
    fn setup(&mut self);

    /// Derive a render-ready scene from a parsed one.
    fn prepare_scene(&mut self, scene: &ParsedScene) -> VantageResult<PreparedSceneId>;

    fn render(
        &mut self,
        scene: PreparedSceneId,
        target: &TargetDesc,
        params: &RenderParams<'_>,
    ) -> VantageResult<()>;

    /// Composite a target's current contents at the given dimensions.
    fn present(&mut self, target_index: u32, width: u32, height: u32) -> VantageResult<()>;

    /// Write RGBA8 pixels for a target into `out` (exactly width*height*4
    /// bytes).
    fn read_pixels(
        &mut self,
        target_index: u32,
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> VantageResult<()>;

    fn release_scene(&mut self, scene: PreparedSceneId);

    fn release_targets(&mut self);

    fn shutdown(&mut self);
}
