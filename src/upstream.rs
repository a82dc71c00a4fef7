//! The read-only upstream scene interface.
//!
//! This crate never parses a scene-description language or runs a
//! procedural evaluator itself (see `SPEC_FULL.md` §1, Deliberately out of
//! scope). Instead, the embedder implements [`Scene`] over whatever
//! lazily-evaluated representation it already has, and the
//! [`crate::controller::Controller`] drives it.

use crate::hash::Hash128;
use crate::path::{Name, ScenePath};
use glam::{Affine3A, Vec3};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A single attribute value.
///
/// `NameList` is what the synthesized `sets` attribute is made of; `Custom`
/// is an escape hatch for embedder-specific attribute payloads that this
/// engine only ever forwards opaquely to the renderer.
#[derive(Clone)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    String(Arc<str>),
    NameList(Vec<Name>),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl std::fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "Bool({b})"),
            AttributeValue::Int(i) => write!(f, "Int({i})"),
            AttributeValue::Float(v) => write!(f, "Float({v})"),
            AttributeValue::String(s) => write!(f, "String({s:?})"),
            AttributeValue::NameList(names) => write!(f, "NameList({names:?})"),
            AttributeValue::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a == b,
            (AttributeValue::Int(a), AttributeValue::Int(b)) => a == b,
            (AttributeValue::Float(a), AttributeValue::Float(b)) => a == b,
            (AttributeValue::String(a), AttributeValue::String(b)) => a == b,
            (AttributeValue::NameList(a), AttributeValue::NameList(b)) => a == b,
            // Custom payloads are compared by identity only; callers relying
            // on hash short-circuiting should not mutate a `Custom` value in
            // place.
            (AttributeValue::Custom(a), AttributeValue::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A flattened attribute mapping. Sorted by name so the synthesized `sets`
/// entry and content hashing are both deterministic.
pub type Attributes = BTreeMap<Arc<str>, AttributeValue>;

/// Name reserved for the visibility gate (§4.1 step 2).
pub const VISIBLE_ATTRIBUTE: &str = "scene:visible";
/// Name this engine overwrites with [`crate::render_sets::RenderSets::sets_attribute`].
pub const SETS_ATTRIBUTE: &str = "sets";

/// Returns whether `attributes` marks its location as visible (default true).
#[must_use]
pub fn is_visible(attributes: &Attributes) -> bool {
    match attributes.get(VISIBLE_ATTRIBUTE) {
        Some(AttributeValue::Bool(false)) => false,
        _ => true,
    }
}

/// Camera projection kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionType {
    Perspective,
    Orthographic,
}

/// A camera description, as produced by the upstream scene and as overlaid
/// with camera-relevant globals before being handed to the renderer.
///
/// Fields mirror what `RendererAlgo::applyCameraGlobals` overlays in the
/// reference implementation: output resolution and clipping are scene-wide
/// (globals) concerns layered onto a per-location projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub projection_type: ProjectionType,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
    pub resolution: (u32, u32),
    pub pixel_aspect_ratio: f32,
}

impl Camera {
    #[must_use]
    pub fn new_perspective(fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self {
            projection_type: ProjectionType::Perspective,
            fov_y_radians,
            near,
            far,
            resolution: (1920, 1080),
            pixel_aspect_ratio: 1.0,
        }
    }
}

/// A light description. Kept intentionally small — lighting models are a
/// renderer concern; this engine only needs enough to route the payload and
/// detect content change via the upstream hash.
#[derive(Debug, Clone, PartialEq)]
pub enum LightPayload {
    Directional { color: Vec3, intensity: f32 },
    Point { color: Vec3, intensity: f32, range: f32 },
    Spot { color: Vec3, intensity: f32, range: f32, inner_cone: f32, outer_cone: f32 },
}

/// The object found at a location, as returned by [`Scene::object`].
pub enum ObjectPayload {
    /// The null-sentinel: "no object here". Permitted for the Light role
    /// (a light location with a null payload still creates a light handle
    /// with no geometry); treated as "clear the object handle" for Camera
    /// and Object roles.
    Null,
    Camera(Camera),
    Light(LightPayload),
    /// An opaque renderable payload forwarded to the renderer without
    /// interpretation (meshes, curves, volumes, ...).
    Renderable(Arc<dyn Any + Send + Sync>),
}

impl ObjectPayload {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ObjectPayload::Null)
    }
}

/// An axis-aligned bounding box, used only to build the wireframe
/// "unexpanded children" proxy (§4.1 step 10).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Box3 {
    #[must_use]
    pub const fn empty() -> Self {
        Self { min: Vec3::ZERO, max: Vec3::ZERO }
    }
}

/// Scene-wide configuration: output options, the active camera name, and the
/// `attribute:*` entries applied at the root (§4.1 step 1, root case).
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub entries: BTreeMap<Arc<str>, AttributeValue>,
}

/// Reserved globals key naming the active camera path (§6).
pub const CAMERA_OPTION: &str = "option:render:camera";

impl Globals {
    /// The `attribute:*` subset, with the prefix stripped, used to seed the
    /// root node's `full_attributes` (§4.1 step 1).
    #[must_use]
    pub fn root_attributes(&self) -> Attributes {
        self.entries
            .iter()
            .filter_map(|(k, v)| k.strip_prefix("attribute:").map(|stripped| (Arc::from(stripped), v.clone())))
            .collect()
    }

    #[must_use]
    pub fn camera_option(&self) -> Option<&str> {
        match self.entries.get(CAMERA_OPTION) {
            Some(AttributeValue::String(s)) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Overlays camera-relevant globals (resolution, pixel aspect ratio,
    /// clipping) onto `camera`, mirroring `RendererAlgo::applyCameraGlobals`.
    pub fn apply_to_camera(&self, camera: &mut Camera) {
        if let Some(AttributeValue::Int(w)) = self.entries.get("option:render:resolution:x") {
            camera.resolution.0 = *w as u32;
        }
        if let Some(AttributeValue::Int(h)) = self.entries.get("option:render:resolution:y") {
            camera.resolution.1 = *h as u32;
        }
        if let Some(AttributeValue::Float(par)) = self.entries.get("option:render:pixelAspectRatio") {
            camera.pixel_aspect_ratio = *par;
        }
    }
}

/// A named path-matcher, as produced by [`Scene::sets`]. An embedder
/// supplies one implementation per named set (`render:foreground`,
/// `__cameras`, `__lights`, ...); [`crate::render_sets::RenderSets`] only
/// ever calls [`PathMatcher::matches`].
pub trait PathMatcher: Send + Sync {
    fn matches(&self, path: &ScenePath) -> crate::dirty::Match;
}

/// An embedder-supplied failure, opaque to this crate. Wrapped into
/// [`crate::error::Error::Upstream`] at every call site (§7).
pub type UpstreamError = Box<dyn std::error::Error + Send + Sync>;

/// Alias for `Result<T, UpstreamError>`.
pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

/// The read-only upstream scene interface (§6).
///
/// Every method is evaluated "in a path-scoped context" conceptually: the
/// `path` argument stands in for the context the reference implementation
/// installs via `ScenePlug::PathScope` before each plug evaluation. Methods
/// take `&self` only — they must be safely callable concurrently from many
/// worker threads (§5). Each fetch may fail: a lazily-evaluated upstream can
/// hit a procedural error, which this crate reports as
/// [`crate::error::Error::Upstream`] without interpreting it.
pub trait Scene: Send + Sync {
    /// Announces the composed pass context (host-supplied `context` plus the
    /// reserved `scene:renderer` key) ahead of every pass, so an embedder
    /// that installs a path-scoped context around its own evaluator has a
    /// chance to refresh it. Most embedders that don't branch on context can
    /// leave the default no-op.
    fn context_changed(&self, context: &Attributes) {
        let _ = context;
    }

    fn attributes(&self, path: &ScenePath) -> UpstreamResult<(Attributes, Hash128)>;
    fn transform(&self, path: &ScenePath) -> UpstreamResult<(Affine3A, Hash128)>;
    fn object(&self, path: &ScenePath) -> UpstreamResult<(ObjectPayload, Hash128)>;
    fn child_names(&self, path: &ScenePath) -> UpstreamResult<(Vec<Name>, Hash128)>;
    fn bound(&self, path: &ScenePath) -> UpstreamResult<Box3>;
    fn globals(&self) -> UpstreamResult<Globals>;
    fn sets(&self) -> UpstreamResult<BTreeMap<Arc<str>, Arc<dyn PathMatcher>>>;
}
