#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]

//! An incremental, parallel scene-graph update engine that drives a
//! pluggable renderer backend from a lazily-evaluated upstream scene.
//!
//! This crate owns none of the scene representation or the renderer: an
//! embedder implements [`upstream::Scene`] over whatever scene source it
//! already has, and [`renderer::RendererBackend`] over whatever renderer it
//! already drives. [`controller::Controller`] is the entry point — it
//! mirrors the upstream scene incrementally, short-circuits unchanged
//! locations by content hash, and issues the minimal set of renderer edits
//! on every pass.

pub mod background;
pub mod consts;
pub mod controller;
pub mod default_camera;
pub mod dirty;
pub mod error;
pub mod hash;
pub mod node;
pub mod path;
pub mod render_sets;
pub mod renderer;
pub mod traversal;
pub mod upstream;

#[cfg(test)]
mod test_support;

pub use background::{BackgroundTask, CancellationToken};
pub use controller::Controller;
pub use dirty::{DirtyFlags, Match, NodeType};
pub use error::{Error, Result};
pub use hash::Hash128;
pub use node::{ExpandedPaths, SceneNode};
pub use path::{Name, ScenePath};
pub use render_sets::RenderSets;
pub use renderer::{AttributesHandle, ObjectHandle, OutputSpec, RendererBackend};
pub use traversal::{Progress, TreeKind};
pub use upstream::{
    AttributeValue, Attributes, Box3, Camera, Globals, LightPayload, ObjectPayload, PathMatcher, Scene, UpstreamError,
    UpstreamResult,
};
