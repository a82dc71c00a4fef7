//! The renderer backend interface.
//!
//! This crate never creates a GPU device, rasterizer, or ray-tracer itself
//! (see `SPEC_FULL.md` §1). The embedder implements [`RendererBackend`] over
//! its own renderer, and [`crate::node::SceneNode::update`] calls it to keep
//! the renderer's flat object list in agreement with the scene mirror.

use crate::upstream::{Attributes, Camera, LightPayload, ObjectPayload};
use glam::Affine3A;

/// Backend identity recognized for the concurrent-swap fast path (§4.1 step 5,
/// §10 S6). Any other `name()` uses the conservative release-before-create
/// ordering.
pub const OPENGL_BACKEND_NAME: &str = "OpenGL";

/// An output destination the renderer should write to (a render target, a
/// display driver, ...). Left fully opaque; this engine only forwards it.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub name: String,
    pub kind: String,
}

/// An opaque, backend-owned reference to registered attributes.
pub trait AttributesHandle: Send + Sync {}

/// An opaque, backend-owned reference to a registered object, camera, or
/// light. Released by dropping the `Box`.
pub trait ObjectHandle: Send + Sync {
    /// Pushes a new world transform to the backend.
    fn set_transform(&self, transform: Affine3A);

    /// Attempts to retag this handle's attributes in place.
    ///
    /// Returns `false` to mean "cannot retag; please replace" — the caller
    /// then discards this handle and rebuilds the object from scratch
    /// (§4.1 step 6).
    fn set_attributes(&self, attrs: &dyn AttributesHandle) -> bool;
}

/// The renderer backend interface (§6).
pub trait RendererBackend: Send + Sync {
    /// Backend identity, compared against [`OPENGL_BACKEND_NAME`].
    fn name(&self) -> &str;

    fn attributes(&self, attrs: &Attributes) -> Box<dyn AttributesHandle>;

    fn object(
        &self,
        name: &str,
        payload: &ObjectPayload,
        attrs: &dyn AttributesHandle,
    ) -> Option<Box<dyn ObjectHandle>>;

    fn camera(
        &self,
        name: &str,
        camera: &Camera,
        attrs: &dyn AttributesHandle,
    ) -> Option<Box<dyn ObjectHandle>>;

    fn light(
        &self,
        name: &str,
        payload: Option<&LightPayload>,
        attrs: &dyn AttributesHandle,
    ) -> Option<Box<dyn ObjectHandle>>;

    fn set_option(&self, name: &str, value: &crate::upstream::AttributeValue);
    fn set_output(&self, name: &str, spec: &OutputSpec);

    /// Called during Controller destruction before handles are released.
    fn pause(&self) {}
}
