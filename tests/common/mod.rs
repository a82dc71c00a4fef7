//! Shared `Scene`/`RendererBackend` doubles for the `tests/` integration
//! suite. Separate from `src/test_support.rs`, which is `#[cfg(test)]`-gated
//! to the library's own unit tests and invisible to these binaries.

use parking_lot::Mutex;
use render_controller::{
    AttributeValue, Attributes, Box3, Camera, Globals, Hash128, LightPayload, Match, Name, ObjectHandle,
    ObjectPayload, OutputSpec, PathMatcher, RendererBackend, Scene, ScenePath, UpstreamResult,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone)]
struct PathEntry {
    attributes: Attributes,
    attributes_rev: u64,
    transform: glam::Affine3A,
    transform_rev: u64,
    object: Arc<dyn Fn() -> ObjectPayload + Send + Sync>,
    object_rev: u64,
    children: Vec<Name>,
    children_rev: u64,
    bound: Box3,
}

impl Default for PathEntry {
    fn default() -> Self {
        Self {
            attributes: Attributes::new(),
            attributes_rev: 0,
            transform: glam::Affine3A::IDENTITY,
            transform_rev: 0,
            object: Arc::new(|| ObjectPayload::Null),
            object_rev: 0,
            children: Vec::new(),
            children_rev: 0,
            bound: Box3::empty(),
        }
    }
}

struct MockSceneState {
    paths: HashMap<String, PathEntry>,
    globals: Globals,
    sets: BTreeMap<Arc<str>, Arc<dyn PathMatcher>>,
}

/// A mutable-state mock upstream scene: test code mutates it between passes
/// via the setters below, each of which bumps the relevant per-path
/// revision counter so the engine observes a changed hash.
pub struct MockScene {
    state: Mutex<MockSceneState>,
}

impl MockScene {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockSceneState { paths: HashMap::new(), globals: Globals::default(), sets: BTreeMap::new() }),
        })
    }

    fn entry<'a>(state: &'a mut MockSceneState, path: &str) -> &'a mut PathEntry {
        state.paths.entry(path.to_string()).or_default()
    }

    pub fn set_visible(&self, path: &str, visible: bool) {
        let mut state = self.state.lock();
        let entry = Self::entry(&mut state, path);
        entry.attributes.insert(Arc::from("scene:visible"), AttributeValue::Bool(visible));
        entry.attributes_rev += 1;
    }

    pub fn set_attribute(&self, path: &str, key: &str, value: AttributeValue) {
        let mut state = self.state.lock();
        let entry = Self::entry(&mut state, path);
        entry.attributes.insert(Arc::from(key), value);
        entry.attributes_rev += 1;
    }

    pub fn set_object(&self, path: &str, object: impl Fn() -> ObjectPayload + Send + Sync + 'static) {
        let mut state = self.state.lock();
        let entry = Self::entry(&mut state, path);
        entry.object = Arc::new(object);
        entry.object_rev += 1;
    }

    /// Bumps the object revision without changing the factory, so the next
    /// fetch reports a new hash for an otherwise-identical payload.
    pub fn touch_object(&self, path: &str) {
        let mut state = self.state.lock();
        Self::entry(&mut state, path).object_rev += 1;
    }

    pub fn set_children(&self, path: &str, children: Vec<Name>) {
        let mut state = self.state.lock();
        let entry = Self::entry(&mut state, path);
        entry.children = children;
        entry.children_rev += 1;
    }

    pub fn set_globals(&self, globals: Globals) {
        self.state.lock().globals = globals;
    }

    pub fn set_sets(&self, sets: BTreeMap<Arc<str>, Arc<dyn PathMatcher>>) {
        self.state.lock().sets = sets;
    }
}

impl Scene for MockScene {
    fn attributes(&self, path: &ScenePath) -> UpstreamResult<(Attributes, Hash128)> {
        let state = self.state.lock();
        let entry = state.paths.get(&path.to_string()).cloned().unwrap_or_default();
        Ok((entry.attributes, Hash128::of(&entry.attributes_rev)))
    }

    fn transform(&self, path: &ScenePath) -> UpstreamResult<(glam::Affine3A, Hash128)> {
        let state = self.state.lock();
        let entry = state.paths.get(&path.to_string()).cloned().unwrap_or_default();
        Ok((entry.transform, Hash128::of(&entry.transform_rev)))
    }

    fn object(&self, path: &ScenePath) -> UpstreamResult<(ObjectPayload, Hash128)> {
        let state = self.state.lock();
        let entry = state.paths.get(&path.to_string()).cloned().unwrap_or_default();
        Ok(((entry.object)(), Hash128::of(&entry.object_rev)))
    }

    fn child_names(&self, path: &ScenePath) -> UpstreamResult<(Vec<Name>, Hash128)> {
        let state = self.state.lock();
        let entry = state.paths.get(&path.to_string()).cloned().unwrap_or_default();
        Ok((entry.children, Hash128::of(&entry.children_rev)))
    }

    fn bound(&self, path: &ScenePath) -> UpstreamResult<Box3> {
        let state = self.state.lock();
        Ok(state.paths.get(&path.to_string()).map(|e| e.bound).unwrap_or_else(Box3::empty))
    }

    fn globals(&self) -> UpstreamResult<Globals> {
        Ok(self.state.lock().globals.clone())
    }

    fn sets(&self) -> UpstreamResult<BTreeMap<Arc<str>, Arc<dyn PathMatcher>>> {
        Ok(self.state.lock().sets.clone())
    }
}

/// A matcher naming exactly one path as a member: `EXACT` at that path,
/// `DESCENDANT` at every strict ancestor (so traversal keeps descending to
/// reach it), nothing elsewhere.
pub struct ExactPathMatcher(pub ScenePath);

impl PathMatcher for ExactPathMatcher {
    fn matches(&self, path: &ScenePath) -> Match {
        if path == &self.0 {
            Match::EXACT
        } else if is_strict_prefix(path, &self.0) {
            Match::DESCENDANT
        } else {
            Match::empty()
        }
    }
}

fn is_strict_prefix(prefix: &ScenePath, of: &ScenePath) -> bool {
    let prefix = prefix.segments();
    let of = of.segments();
    prefix.len() < of.len() && prefix.iter().zip(of.iter()).all(|(a, b)| a.as_ref() == b.as_ref())
}

/// Records every handle creation/release/retag, in order, so tests can
/// assert on the backend-ordering rules (§10 S5, S6).
pub struct RecordingRenderer {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    refuse_retag: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl RecordingRenderer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::new(Mutex::new(Vec::new())),
            refuse_retag: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn set_refuse_retag(&self, refuse: bool) {
        self.refuse_retag.store(refuse, Ordering::Relaxed);
    }

    fn make_handle(&self, kind: &'static str, name: &str) -> Box<dyn ObjectHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.log.lock().push(format!("create {kind} {name} #{id}"));
        Box::new(RecordingObjectHandle {
            id,
            kind,
            name: name.to_string(),
            log: Arc::clone(&self.log),
            refuse_retag: Arc::clone(&self.refuse_retag),
        })
    }
}

struct RecordingObjectHandle {
    id: u64,
    kind: &'static str,
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    refuse_retag: Arc<AtomicBool>,
}

impl ObjectHandle for RecordingObjectHandle {
    fn set_transform(&self, _transform: glam::Affine3A) {
        self.log.lock().push(format!("set_transform {} {} #{}", self.kind, self.name, self.id));
    }

    fn set_attributes(&self, _attrs: &dyn render_controller::AttributesHandle) -> bool {
        if self.refuse_retag.load(Ordering::Relaxed) {
            self.log.lock().push(format!("retag-refused {} {} #{}", self.kind, self.name, self.id));
            false
        } else {
            self.log.lock().push(format!("retag {} {} #{}", self.kind, self.name, self.id));
            true
        }
    }
}

impl Drop for RecordingObjectHandle {
    fn drop(&mut self) {
        self.log.lock().push(format!("release {} {} #{}", self.kind, self.name, self.id));
    }
}

pub struct RecordingAttributesHandle;
impl render_controller::AttributesHandle for RecordingAttributesHandle {}

impl RendererBackend for RecordingRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self, _attrs: &Attributes) -> Box<dyn render_controller::AttributesHandle> {
        Box::new(RecordingAttributesHandle)
    }

    fn object(&self, name: &str, _payload: &ObjectPayload, _attrs: &dyn render_controller::AttributesHandle) -> Option<Box<dyn ObjectHandle>> {
        Some(self.make_handle("object", name))
    }

    fn camera(&self, name: &str, _camera: &Camera, _attrs: &dyn render_controller::AttributesHandle) -> Option<Box<dyn ObjectHandle>> {
        Some(self.make_handle("camera", name))
    }

    fn light(&self, name: &str, _payload: Option<&LightPayload>, _attrs: &dyn render_controller::AttributesHandle) -> Option<Box<dyn ObjectHandle>> {
        Some(self.make_handle("light", name))
    }

    fn set_option(&self, name: &str, _value: &AttributeValue) {
        self.log.lock().push(format!("set_option {name}"));
    }

    fn set_output(&self, name: &str, _spec: &OutputSpec) {
        self.log.lock().push(format!("set_output {name}"));
    }
}
