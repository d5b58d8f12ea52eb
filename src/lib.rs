#![forbid(unsafe_code)]

pub mod decode;
pub mod engine;
pub mod engine_cpu;
pub mod envelope;
pub mod error;
pub mod model;
pub mod pixels;
pub mod registry;
pub mod request;
pub mod rpc;
pub mod serialize;

pub use decode::{JsonSceneDecoder, SceneDecoder};
pub use engine::{
    CameraParams, PreparedSceneId, PropOverride, RenderEngine, RenderParams, TargetDesc,
};
pub use engine_cpu::{CpuEngine, CpuEngineProbe, RenderRecord};
pub use error::{VantageError, VantageResult};
pub use model::{Element, ElementData, Face, Mesh, ParsedScene, VertexStream};
pub use pixels::PixelCache;
pub use registry::{SceneEntry, SceneRegistry};
pub use rpc::Bridge;
