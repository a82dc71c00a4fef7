//! Synthesizes a camera when the upstream globals do not name one (§4.5).

use crate::consts::DEFAULT_CAMERA_NAME;
use crate::renderer::{ObjectHandle, RendererBackend, OPENGL_BACKEND_NAME};
use crate::upstream::{AttributeValue, Attributes, Camera, Globals};
use std::sync::Arc;

const DEFAULT_FOV_Y_RADIANS: f32 = std::f32::consts::FRAC_PI_4;
const DEFAULT_NEAR: f32 = 0.01;
const DEFAULT_FAR: f32 = 100_000.0;

/// Owns the renderer handle for a synthesized default camera, if one is
/// currently needed. Registered under [`DEFAULT_CAMERA_NAME`] and announced
/// to the renderer via its `"camera"` option.
#[derive(Default)]
pub struct DefaultCameraManager {
    handle: Option<Box<dyn ObjectHandle>>,
}

impl DefaultCameraManager {
    #[must_use]
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Re-evaluates whether a default camera is needed, given the latest
    /// globals, and creates, updates, or tears it down accordingly. The
    /// OpenGL backend supplies its own camera and is never managed here.
    pub fn refresh(&mut self, globals: &Globals, renderer: &dyn RendererBackend) {
        if renderer.name() == OPENGL_BACKEND_NAME {
            self.handle = None;
            return;
        }

        let needs_default = globals.camera_option().map_or(true, str::is_empty);
        if !needs_default {
            if self.handle.take().is_some() {
                log::debug!("default camera released: globals now name an explicit camera");
            }
            return;
        }

        let mut camera = Camera::new_perspective(DEFAULT_FOV_Y_RADIANS, DEFAULT_NEAR, DEFAULT_FAR);
        globals.apply_to_camera(&mut camera);

        let attrs_handle = renderer.attributes(&Attributes::new());
        self.handle = renderer.camera(DEFAULT_CAMERA_NAME, &camera, attrs_handle.as_ref());
        renderer.set_option("camera", &AttributeValue::String(Arc::from(DEFAULT_CAMERA_NAME)));
        log::debug!("default camera ({DEFAULT_CAMERA_NAME}) synthesized");
    }

    /// Releases the handle ahead of renderer teardown (§4.5).
    pub fn teardown(&mut self) {
        self.handle = None;
    }
}
