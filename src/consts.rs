//! Compile-time constants: proxy-geometry attributes and the default camera
//! identity.

/// Name suffix for the wireframe "unexpanded children" bounding-box proxy
/// (§4.1 step 10). Reserved: an embedder must not use this suffix for any
/// other purpose.
pub const UNEXPANDED_CHILDREN_SUFFIX: &str = "__unexpandedChildren__";

/// Name registered for a synthesized default camera (§4.5).
pub const DEFAULT_CAMERA_NAME: &str = "gaffer:defaultCamera";

/// Reserved context key set to the backend name for the duration of a pass.
pub const RENDERER_CONTEXT_KEY: &str = "scene:renderer";

/// Attribute key names applied to a bound-proxy's attribute set: wireframe,
/// translucent, grey.
pub const BOUND_ATTRIBUTE_WIREFRAME: &str = "gl:primitive:wireframe";
pub const BOUND_ATTRIBUTE_TRANSPARENCY: &str = "gl:primitive:transparency";
pub const BOUND_ATTRIBUTE_COLOR: &str = "gl:primitive:solid_color";
