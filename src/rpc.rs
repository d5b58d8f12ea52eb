use std::time::Instant;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::decode::SceneDecoder;
use crate::engine::{RenderEngine, RenderParams};
use crate::envelope::{self, EnvelopeMeta};
use crate::error::{VantageError, VantageResult};
use crate::model::ElementData;
use crate::pixels::PixelCache;
use crate::registry::SceneRegistry;
use crate::request::{
    CameraArgs, FreeResourcesArgs, GetPixelsArgs, GetVertexArgs, InitArgs, LoadSceneArgs,
    PresentArgs, RenderArgs, element_ref, translate_overrides,
};
use crate::serialize::serialize_scene;

/// Synchronous command bridge between an embedding host and the viewer.
///
/// All process-wide mutable state lives here, including the external decoder
/// and render engine. One call runs one command to completion; concurrent
/// callers are unsupported, which `&mut self` makes structural.
pub struct Bridge {
    pretty: bool,
    verbose: bool,
    registry: SceneRegistry,
    pixels: PixelCache,
    decoder: Box<dyn SceneDecoder>,
    engine: Box<dyn RenderEngine>,
}

impl Bridge {
    pub fn new(decoder: Box<dyn SceneDecoder>, engine: Box<dyn RenderEngine>) -> Self {
        Self {
            pretty: false,
            verbose: false,
            registry: SceneRegistry::new(),
            pixels: PixelCache::new(),
            decoder,
            engine,
        }
    }

    /// Handle one request. The input text is consumed and released
    /// unconditionally once parsed; the returned text is a fresh allocation
    /// owned by the caller.
    pub fn call(&mut self, request: String) -> String {
        let started = Instant::now();
        if self.verbose {
            debug!(target: "vantage::rpc", request = %request, "request");
        }

        let parsed = serde_json::from_str::<Value>(&request);
        drop(request);

        let response = match parsed {
            Err(err) => {
                let err = VantageError::parse(err.to_string());
                envelope::failure(self.meta(started), &err.to_string())
            }
            Ok(value) => match self.handle(&value) {
                Ok(fields) => envelope::success(self.meta(started), fields),
                Err(err) => envelope::failure(self.meta(started), &err.to_string()),
            },
        };

        if self.verbose {
            debug!(target: "vantage::rpc", response = %response, "response");
        }
        response
    }

    /// Registered scene count, including entries whose decode failed.
    pub fn scene_count(&self) -> usize {
        self.registry.len()
    }

    /// In-process view of the readback cache, for hosts that share an address
    /// space with the bridge instead of reading through `dataPointer`.
    pub fn pixel_data(&self) -> &[u8] {
        self.pixels.data()
    }

    fn meta(&self, started: Instant) -> EnvelopeMeta {
        EnvelopeMeta {
            duration_secs: started.elapsed().as_secs_f64(),
            pretty: self.pretty,
        }
    }

    fn handle(&mut self, value: &Value) -> VantageResult<Map<String, Value>> {
        if !value.is_object() {
            return Err(VantageError::validation("expected a top-level object"));
        }
        let cmd = value.get("cmd").and_then(Value::as_str).unwrap_or("(missing)");

        match cmd {
            "init" => self.cmd_init(value),
            "loadScene" => self.cmd_load_scene(value),
            "render" => self.cmd_render(value),
            "present" => self.cmd_present(value),
            "getPixels" => self.cmd_get_pixels(value),
            "freeResources" => self.cmd_free_resources(value),
            "getVertex" => self.cmd_get_vertex(value),
            other => Err(VantageError::validation(format!("unknown cmd: '{other}'"))),
        }
    }

    fn cmd_init(&mut self, value: &Value) -> VantageResult<Map<String, Value>> {
        let args = InitArgs::deserialize(value).map_err(invalid_args)?;
        if let Some(pretty) = args.pretty {
            self.pretty = pretty;
        }
        if let Some(verbose) = args.verbose {
            self.verbose = verbose;
        }

        self.engine.setup();

        let mut fields = Map::new();
        fields.insert("pretty".to_string(), Value::Bool(self.pretty));
        fields.insert("verbose".to_string(), Value::Bool(self.verbose));
        Ok(fields)
    }

    fn cmd_load_scene(&mut self, value: &Value) -> VantageResult<Map<String, Value>> {
        let args = LoadSceneArgs::deserialize(value).map_err(invalid_args)?;
        let name = args
            .name
            .ok_or_else(|| VantageError::validation("missing field: 'name'"))?;
        if args.data_pointer == 0 || args.size == 0 {
            return Err(VantageError::validation(format!(
                "bad data range: {{ {:#x}, {} }}",
                args.data_pointer, args.size
            )));
        }

        // Register the name before decoding; a decoder failure leaves the
        // entry behind in the "not loaded" state.
        self.registry.find_or_create(&name);

        let scene = self.decoder.decode(args.data_pointer, args.size)?;
        let summary = serialize_scene(&scene);

        let entry = self.registry.find_or_create(&name);
        // Replacing drops any superseded scene; the render-ready handle is
        // cleared only by an explicit freeResources.
        entry.parsed = Some(scene);

        let mut fields = Map::new();
        fields.insert("scene".to_string(), summary);
        Ok(fields)
    }

    fn cmd_render(&mut self, value: &Value) -> VantageResult<Map<String, Value>> {
        let args = RenderArgs::deserialize(value).map_err(invalid_args)?;
        let target = args
            .target
            .ok_or_else(|| VantageError::validation("missing field: 'target'"))?;
        let desc = args
            .desc
            .ok_or_else(|| VantageError::validation("missing field: 'desc'"))?;

        self.engine.setup();

        let name = desc
            .scene_name
            .as_deref()
            .ok_or_else(|| VantageError::validation("missing field: 'sceneName'"))?;
        let entry = self
            .registry
            .find_mut(name)
            .ok_or_else(|| VantageError::scene(format!("scene not found: '{name}'")))?;
        let parsed = entry
            .parsed
            .as_ref()
            .ok_or_else(|| VantageError::scene("scene not loaded"))?;

        let prepared = match entry.prepared {
            Some(id) => id,
            None => {
                let id = self.engine.prepare_scene(parsed)?;
                entry.prepared = Some(id);
                id
            }
        };

        let params = RenderParams {
            camera: CameraArgs::resolve(desc.camera.as_ref()),
            selected_element: element_ref(desc.selected_element),
            highlight_vertex_index: element_ref(desc.highlight_vertex_index),
            highlight_face_index: element_ref(desc.highlight_face_index),
            time: desc.time(),
            overrides: translate_overrides(&desc.overrides),
        };

        self.engine.render(prepared, &target, &params)?;
        Ok(Map::new())
    }

    fn cmd_present(&mut self, value: &Value) -> VantageResult<Map<String, Value>> {
        let args = PresentArgs::deserialize(value).map_err(invalid_args)?;
        self.engine.setup();
        self.engine
            .present(args.target_index, args.width, args.height)?;
        Ok(Map::new())
    }

    fn cmd_get_pixels(&mut self, value: &Value) -> VantageResult<Map<String, Value>> {
        let args = GetPixelsArgs::deserialize(value).map_err(invalid_args)?;
        let required = args.width as usize * args.height as usize * 4;

        self.engine.setup();

        // Grow before the engine runs; the buffer keeps its last-grown
        // capacity even when readback fails.
        let buf = self.pixels.ensure(required);
        self.engine
            .read_pixels(args.target_index, args.width, args.height, buf)?;

        let mut fields = Map::new();
        fields.insert("dataPointer".to_string(), json!(self.pixels.address()));
        Ok(fields)
    }

    fn cmd_free_resources(&mut self, value: &Value) -> VantageResult<Map<String, Value>> {
        let args = FreeResourcesArgs::deserialize(value).map_err(invalid_args)?;

        if args.scenes {
            for entry in self.registry.entries_mut() {
                if let Some(id) = entry.prepared.take() {
                    self.engine.release_scene(id);
                }
            }
        }
        if args.targets {
            self.engine.release_targets();
        }
        if args.globals {
            self.engine.shutdown();
        }
        Ok(Map::new())
    }

    fn cmd_get_vertex(&mut self, value: &Value) -> VantageResult<Map<String, Value>> {
        let args = GetVertexArgs::deserialize(value).map_err(invalid_args)?;
        let name = args
            .scene_name
            .ok_or_else(|| VantageError::validation("missing field: 'sceneName'"))?;
        let entry = self
            .registry
            .find(&name)
            .ok_or_else(|| VantageError::scene(format!("scene not found: '{name}'")))?;
        let parsed = entry
            .parsed
            .as_ref()
            .ok_or_else(|| VantageError::scene("scene not loaded"))?;

        let element_id = args
            .element_id
            .ok_or_else(|| VantageError::validation("missing field: 'elementId'"))?
            as usize;
        let index = args
            .index
            .ok_or_else(|| VantageError::validation("missing field: 'index'"))?
            as usize;

        let element = parsed
            .elements
            .get(element_id)
            .ok_or_else(|| VantageError::scene(format!("element id out of range: {element_id}")))?;
        let ElementData::Mesh(mesh) = &element.data else {
            return Err(VantageError::scene(format!(
                "element {element_id} is not a mesh"
            )));
        };
        if index >= mesh.num_indices() {
            return Err(VantageError::scene(format!(
                "vertex index out of bounds: {index}"
            )));
        }

        let mut fields = Map::new();
        fields.insert("vertexIndex".to_string(), json!(mesh.vertex_indices[index]));

        let position = mesh
            .positions
            .get(index)
            .ok_or_else(|| VantageError::scene("position stream is missing data"))?;
        fields.insert("position".to_string(), vec3_json(position));

        if let Some(normal) = mesh.normals.as_ref().and_then(|s| s.get(index)) {
            fields.insert("normal".to_string(), vec3_json(normal));
        }
        if let Some(uv) = mesh.uvs.as_ref().and_then(|s| s.get(index)) {
            fields.insert("uv".to_string(), json!({ "x": uv.x, "y": uv.y }));
        }

        let face = mesh
            .face_of_index(index as u32)
            .ok_or_else(|| VantageError::scene(format!("no face covers index {index}")))?;
        fields.insert("face".to_string(), json!(face));
        Ok(fields)
    }
}

fn invalid_args(err: serde_json::Error) -> VantageError {
    VantageError::validation(err.to_string())
}

fn vec3_json(v: glam::Vec3) -> Value {
    json!({ "x": v.x, "y": v.y, "z": v.z })
}
