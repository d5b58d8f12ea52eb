use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::{CameraParams, PreparedSceneId, RenderEngine, RenderParams, TargetDesc};
use crate::error::{VantageError, VantageResult};
use crate::model::{ElementData, ParsedScene};

/// Everything the engine saw for the most recent render call, for
/// deterministic assertions in tests and diagnostics in the CLI.
#[derive(Clone, Debug)]
pub struct RenderRecord {
    pub scene: PreparedSceneId,
    pub target: TargetDesc,
    pub camera: CameraParams,
    pub selected_element: Option<u32>,
    pub highlight_vertex_index: Option<u32>,
    pub highlight_face_index: Option<u32>,
    pub time: f64,
    pub overrides: Vec<(u32, String, [f64; 3])>,
}

struct SceneStats {
    meshes: u32,
}

struct TargetImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[derive(Default)]
struct CpuState {
    ready: bool,
    next_scene: u64,
    scenes: HashMap<u64, SceneStats>,
    targets: HashMap<u32, TargetImage>,
    presents: Vec<(u32, u32, u32)>,
    last_render: Option<RenderRecord>,
    shutdowns: u32,
}

/// Flat-raster reference engine.
///
/// Renders each target as a solid fill derived from the prepared scene,
/// enough to drive the bridge end to end without a GPU. State sits behind
/// `Rc<RefCell>` so a [`CpuEngineProbe`] can observe it from tests; the
/// bridge runs single-threaded, one call at a time.
pub struct CpuEngine {
    state: Rc<RefCell<CpuState>>,
    clear_rgba: [u8; 4],
}

impl CpuEngine {
    pub fn new() -> Self {
        Self::with_clear([18, 20, 28, 255])
    }

    pub fn with_clear(clear_rgba: [u8; 4]) -> Self {
        Self {
            state: Rc::new(RefCell::new(CpuState::default())),
            clear_rgba,
        }
    }

    pub fn probe(&self) -> CpuEngineProbe {
        CpuEngineProbe {
            state: Rc::clone(&self.state),
        }
    }
}

impl Default for CpuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine for CpuEngine {
    fn setup(&mut self) {
        self.state.borrow_mut().ready = true;
    }

    fn prepare_scene(&mut self, scene: &ParsedScene) -> VantageResult<PreparedSceneId> {
        let mut state = self.state.borrow_mut();
        if !state.ready {
            return Err(VantageError::engine("engine has not been set up"));
        }
        let meshes = scene
            .elements
            .iter()
            .filter(|e| matches!(e.data, ElementData::Mesh(_)))
            .count() as u32;
        let id = state.next_scene;
        state.next_scene += 1;
        state.scenes.insert(id, SceneStats { meshes });
        Ok(PreparedSceneId(id))
    }

    fn render(
        &mut self,
        scene: PreparedSceneId,
        target: &TargetDesc,
        params: &RenderParams<'_>,
    ) -> VantageResult<()> {
        let mut state = self.state.borrow_mut();
        let meshes = state
            .scenes
            .get(&scene.0)
            .ok_or_else(|| VantageError::engine(format!("unknown prepared scene {}", scene.0)))?
            .meshes;

        let width = ((target.width as f32 * target.pixel_scale) as u32).max(1);
        let height = ((target.height as f32 * target.pixel_scale) as u32).max(1);

        let mut color = self.clear_rgba;
        color[1] = color[1].saturating_add((meshes * 16) as u8);
        if params.selected_element.is_some() {
            color[0] = color[0].saturating_add(64);
        }

        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for px in pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
        state.targets.insert(
            target.target_index,
            TargetImage {
                width,
                height,
                pixels,
            },
        );

        state.last_render = Some(RenderRecord {
            scene,
            target: *target,
            camera: params.camera,
            selected_element: params.selected_element,
            highlight_vertex_index: params.highlight_vertex_index,
            highlight_face_index: params.highlight_face_index,
            time: params.time,
            overrides: params
                .overrides
                .iter()
                .map(|o| (o.element_id, o.name.to_string(), o.value))
                .collect(),
        });
        Ok(())
    }

    fn present(&mut self, target_index: u32, width: u32, height: u32) -> VantageResult<()> {
        self.state
            .borrow_mut()
            .presents
            .push((target_index, width, height));
        Ok(())
    }

    fn read_pixels(
        &mut self,
        target_index: u32,
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> VantageResult<()> {
        let state = self.state.borrow();
        let image = state.targets.get(&target_index).ok_or_else(|| {
            VantageError::engine(format!("no pixels rendered for target {target_index}"))
        })?;
        if out.len() != width as usize * height as usize * 4 {
            return Err(VantageError::engine("readback buffer size mismatch"));
        }

        // Nearest-neighbor blit from the stored resolution.
        for y in 0..height as usize {
            let sy = y * image.height as usize / height.max(1) as usize;
            for x in 0..width as usize {
                let sx = x * image.width as usize / width.max(1) as usize;
                let src = (sy * image.width as usize + sx) * 4;
                let dst = (y * width as usize + x) * 4;
                out[dst..dst + 4].copy_from_slice(&image.pixels[src..src + 4]);
            }
        }
        Ok(())
    }

    fn release_scene(&mut self, scene: PreparedSceneId) {
        self.state.borrow_mut().scenes.remove(&scene.0);
    }

    fn release_targets(&mut self) {
        self.state.borrow_mut().targets.clear();
    }

    fn shutdown(&mut self) {
        let mut state = self.state.borrow_mut();
        state.scenes.clear();
        state.targets.clear();
        state.last_render = None;
        state.ready = false;
        state.shutdowns += 1;
    }
}

/// Read-only view into a [`CpuEngine`]'s state.
pub struct CpuEngineProbe {
    state: Rc<RefCell<CpuState>>,
}

impl CpuEngineProbe {
    pub fn last_render(&self) -> Option<RenderRecord> {
        self.state.borrow().last_render.clone()
    }

    pub fn scene_count(&self) -> usize {
        self.state.borrow().scenes.len()
    }

    pub fn target_count(&self) -> usize {
        self.state.borrow().targets.len()
    }

    pub fn present_count(&self) -> usize {
        self.state.borrow().presents.len()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }

    pub fn shutdown_count(&self) -> u32 {
        self.state.borrow().shutdowns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri_scene() -> ParsedScene {
        serde_json::from_str(
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
        .unwrap()
    }

    fn params() -> RenderParams<'static> {
        RenderParams {
            camera: CameraParams::default(),
            selected_element: None,
            highlight_vertex_index: None,
            highlight_face_index: None,
            time: 0.0,
            overrides: Vec::new(),
        }
    }

    fn target(index: u32, extent: u32) -> TargetDesc {
        TargetDesc {
            target_index: index,
            width: extent,
            height: extent,
            samples: 1,
            pixel_scale: 1.0,
        }
    }

    #[test]
    fn render_then_read_back_roundtrips() {
        let mut engine = CpuEngine::new();
        engine.setup();
        let scene = engine.prepare_scene(&tri_scene()).unwrap();
        engine.render(scene, &target(0, 4), &params()).unwrap();

        let mut out = vec![0u8; 4 * 4 * 4];
        engine.read_pixels(0, 4, 4, &mut out).unwrap();
        assert_eq!(out[3], 255);
        assert_eq!(&out[..4], &out[out.len() - 4..]);
    }

    #[test]
    fn readback_rescales_to_requested_dimensions() {
        let mut engine = CpuEngine::new();
        engine.setup();
        let scene = engine.prepare_scene(&tri_scene()).unwrap();
        engine.render(scene, &target(1, 8), &params()).unwrap();

        let mut out = vec![0u8; 2 * 2 * 4];
        engine.read_pixels(1, 2, 2, &mut out).unwrap();
        assert_eq!(out[3], 255);
    }

    #[test]
    fn reading_an_unrendered_target_fails() {
        let mut engine = CpuEngine::new();
        engine.setup();
        let mut out = vec![0u8; 4];
        let err = engine.read_pixels(7, 1, 1, &mut out).unwrap_err();
        assert!(err.to_string().contains("target 7"));
    }

    #[test]
    fn released_scene_is_gone() {
        let mut engine = CpuEngine::new();
        engine.setup();
        let probe = engine.probe();
        let scene = engine.prepare_scene(&tri_scene()).unwrap();
        assert_eq!(probe.scene_count(), 1);
        engine.release_scene(scene);
        assert_eq!(probe.scene_count(), 0);
        assert!(engine.render(scene, &target(0, 4), &params()).is_err());
    }
}
