//! Minimal [`Scene`]/[`RendererBackend`] doubles shared by unit tests across
//! modules.
//!
//! Kept separate from any single module's `#[cfg(test)] mod tests` because
//! [`render_sets`](crate::render_sets), [`node`](crate::node), and
//! [`controller`](crate::controller) tests all need the same cheap doubles.
//! Not visible to `tests/` integration tests (this module is compiled only
//! when the library itself is built for unit testing) — those bring their
//! own recording renderer under `tests/common`.

#![cfg(test)]

use crate::hash::Hash128;
use crate::path::{Name, ScenePath};
use crate::renderer::{AttributesHandle, ObjectHandle, OutputSpec, RendererBackend};
use crate::upstream::{
    AttributeValue, Attributes, Box3, Camera, Globals, LightPayload, ObjectPayload, PathMatcher, Scene,
};
use glam::Affine3A;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A scene double whose every location returns the same canned values.
/// Good enough for tests that only exercise routing, sets, or the shape of
/// a single node's update — not hierarchy traversal.
pub struct StubScene {
    pub attributes: Attributes,
    pub transform: Affine3A,
    pub object: Arc<dyn Fn() -> ObjectPayload + Send + Sync>,
    pub child_names: Vec<Name>,
    pub bound: Box3,
    pub globals: Globals,
    pub sets: BTreeMap<Arc<str>, Arc<dyn PathMatcher>>,
}

impl Default for StubScene {
    fn default() -> Self {
        Self {
            attributes: Attributes::default(),
            transform: Affine3A::IDENTITY,
            object: Arc::new(|| ObjectPayload::Null),
            child_names: Vec::new(),
            bound: Box3::empty(),
            globals: Globals::default(),
            sets: BTreeMap::new(),
        }
    }
}

impl StubScene {
    #[must_use]
    pub fn with_sets(sets: BTreeMap<Arc<str>, Arc<dyn PathMatcher>>) -> Self {
        Self { sets, ..Self::default() }
    }
}

impl Scene for StubScene {
    fn attributes(&self, _path: &ScenePath) -> crate::upstream::UpstreamResult<(Attributes, Hash128)> {
        let hash = Hash128::of(&format!("{:?}", self.attributes.len()));
        Ok((self.attributes.clone(), hash))
    }

    fn transform(&self, _path: &ScenePath) -> crate::upstream::UpstreamResult<(Affine3A, Hash128)> {
        Ok((self.transform, Hash128::of(&affine_bytes(self.transform))))
    }

    fn object(&self, _path: &ScenePath) -> crate::upstream::UpstreamResult<(ObjectPayload, Hash128)> {
        Ok(((self.object)(), Hash128::NONE))
    }

    fn child_names(&self, _path: &ScenePath) -> crate::upstream::UpstreamResult<(Vec<Name>, Hash128)> {
        let hash = Hash128::of(&self.child_names.iter().map(ToString::to_string).collect::<Vec<_>>());
        Ok((self.child_names.clone(), hash))
    }

    fn bound(&self, _path: &ScenePath) -> crate::upstream::UpstreamResult<Box3> {
        Ok(self.bound)
    }

    fn globals(&self) -> crate::upstream::UpstreamResult<Globals> {
        Ok(self.globals.clone())
    }

    fn sets(&self) -> crate::upstream::UpstreamResult<BTreeMap<Arc<str>, Arc<dyn PathMatcher>>> {
        Ok(self.sets.clone())
    }
}

fn affine_bytes(affine: Affine3A) -> [u8; 48] {
    let cols = affine.matrix3.to_cols_array();
    let translation = affine.translation.to_array();
    let mut bytes = [0u8; 48];
    for (i, v) in cols.iter().enumerate() {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
    for (i, v) in translation.iter().enumerate() {
        bytes[36 + i * 4..36 + i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// A [`RendererBackend`] that never actually renders anything — it just
/// appends one line per call to a shared log, in order, so tests can assert
/// on create/release/retag ordering (§10 S4-S6).
pub struct RecordingRenderer {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    refuse_retag: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl RecordingRenderer {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::new(Mutex::new(Vec::new())),
            refuse_retag: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(0),
        }
    }

    #[must_use]
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

impl RendererBackend for RecordingRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self, _attrs: &Attributes) -> Box<dyn AttributesHandle> {
        Box::new(RecordingAttributesHandle)
    }

    fn object(&self, name: &str, _payload: &ObjectPayload, _attrs: &dyn AttributesHandle) -> Option<Box<dyn ObjectHandle>> {
        Some(self.make_handle("object", name))
    }

    fn camera(&self, name: &str, _camera: &Camera, _attrs: &dyn AttributesHandle) -> Option<Box<dyn ObjectHandle>> {
        Some(self.make_handle("camera", name))
    }

    fn light(&self, name: &str, _payload: Option<&LightPayload>, _attrs: &dyn AttributesHandle) -> Option<Box<dyn ObjectHandle>> {
        Some(self.make_handle("light", name))
    }

    fn set_option(&self, name: &str, _value: &AttributeValue) {
        self.log.lock().push(format!("set_option {name}"));
    }

    fn set_output(&self, name: &str, _spec: &OutputSpec) {
        self.log.lock().push(format!("set_output {name}"));
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
    fn set_transform(&self, _transform: Affine3A) {
        self.log.lock().push(format!("set_transform {} {} #{}", self.kind, self.name, self.id));
    }

    fn set_attributes(&self, _attrs: &dyn AttributesHandle) -> bool {
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

struct RecordingAttributesHandle;
impl AttributesHandle for RecordingAttributesHandle {}
