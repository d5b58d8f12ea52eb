use crate::engine::PreparedSceneId;
use crate::model::ParsedScene;

/// One named scene slot.
///
/// The entry is created on the first load attempt under a new name, so a
/// failed decode still registers the name with an empty `parsed` slot; that
/// state is observable as a distinct "scene not loaded" error. The
/// render-ready handle is created lazily by the render command and cleared
/// only by explicit teardown.
pub struct SceneEntry {
    name: String,
    pub parsed: Option<ParsedScene>,
    pub prepared: Option<PreparedSceneId>,
}

impl SceneEntry {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Append-only, name-keyed scene collection. Lookup is an exact,
/// case-sensitive linear scan; entry order is stable for the process
/// lifetime.
#[derive(Default)]
pub struct SceneRegistry {
    entries: Vec<SceneEntry>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&SceneEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub fn find_or_create(&mut self, name: &str) -> &mut SceneEntry {
        if let Some(at) = self.entries.iter().position(|e| e.name == name) {
            return &mut self.entries[at];
        }
        self.entries.push(SceneEntry {
            name: name.to_string(),
            parsed: None,
            prepared: None,
        });
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut SceneEntry> {
        self.entries.iter_mut()
    }
}
