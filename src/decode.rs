use std::collections::HashMap;

use crate::error::{VantageError, VantageResult};
use crate::model::ParsedScene;

/// External scene-file decoding collaborator.
///
/// The bridge only validates that the data reference is present and has
/// non-zero extent; resolving the raw address to bytes is the decoder's
/// concern. Failures must carry the decoder's formatted diagnostic, which the
/// load handler embeds verbatim in the error response.
pub trait SceneDecoder {
    fn decode(&mut self, address: u64, size: u64) -> VantageResult<ParsedScene>;
}

/// Reference decoder for the JSON scene-document format.
///
/// Hosts stage byte blocks under explicit addresses before issuing a
/// `loadScene` that refers to them.
#[derive(Default)]
pub struct JsonSceneDecoder {
    blocks: HashMap<u64, Vec<u8>>,
}

impl JsonSceneDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, address: u64, bytes: Vec<u8>) {
        self.blocks.insert(address, bytes);
    }

    pub fn unstage(&mut self, address: u64) {
        self.blocks.remove(&address);
    }
}

impl SceneDecoder for JsonSceneDecoder {
    #[tracing::instrument(skip(self))]
    fn decode(&mut self, address: u64, size: u64) -> VantageResult<ParsedScene> {
        let block = self.blocks.get(&address).ok_or_else(|| {
            VantageError::decode(format!("no staged data at address {address:#x}"))
        })?;
        let size = size as usize;
        if size > block.len() {
            return Err(VantageError::decode(format!(
                "staged block at {address:#x} holds {} bytes, request says {size}",
                block.len()
            )));
        }

        let scene: ParsedScene = serde_json::from_slice(&block[..size])
            .map_err(|err| VantageError::decode(err.to_string()))?;
        scene
            .validate()
            .map_err(|err| VantageError::decode(err.to_string()))?;
        Ok(scene)
    }
}
