//! Persistent per-location scene mirror state and its update contract.
//!
//! A [`SceneNode`] is the unit the rest of the crate operates on: one per
//! live location in one of the Camera/Light/Object trees. Everything it
//! needs from outside — the upstream scene, the renderer, the render sets,
//! the current globals, the expansion policy, and a cancellation token — is
//! bundled in [`UpdateContext`] and borrowed for the duration of one
//! `update()` call. Nothing here stores a pointer back to its parent: inherited
//! state (`full_attributes`, `full_transform`) is read from the parent while
//! it is still on the traversal's call stack and handed down by reference,
//! which sidesteps the raw back-pointer a naive C++ port would reach for.

use crate::background::CancellationToken;
use crate::consts::{BOUND_ATTRIBUTE_COLOR, BOUND_ATTRIBUTE_TRANSPARENCY, BOUND_ATTRIBUTE_WIREFRAME, UNEXPANDED_CHILDREN_SUFFIX};
use crate::dirty::{DirtyFlags, NodeType};
use crate::error::{Error, Result};
use crate::hash::Hash128;
use crate::path::{Name, ScenePath};
use crate::render_sets::RenderSets;
use crate::renderer::{AttributesHandle, ObjectHandle, RendererBackend, OPENGL_BACKEND_NAME};
use crate::upstream::{is_visible, Attributes, AttributeValue, Box3, Globals, ObjectPayload, Scene, SETS_ATTRIBUTE};
use glam::Affine3A;
use std::collections::HashSet;
use std::sync::Arc;

/// The user-specified subset of exact paths to descend into; everything else
/// is represented by a wireframe bound proxy (§4.1 step 9).
#[derive(Debug, Clone, Default)]
pub struct ExpandedPaths(HashSet<ScenePath>);

impl ExpandedPaths {
    #[must_use]
    pub fn new() -> Self {
        Self(HashSet::new())
    }

    pub fn set(&mut self, paths: impl IntoIterator<Item = ScenePath>) {
        self.0 = paths.into_iter().collect();
    }

    #[must_use]
    pub fn contains_exact(&self, path: &ScenePath) -> bool {
        self.0.contains(path)
    }
}

/// Geometry payload for the synthesized "unexpanded children" bound proxy
/// (§4.1 step 10). Forwarded through [`ObjectPayload::Renderable`] since it
/// is not a real upstream object.
#[derive(Debug, Clone, Copy)]
pub struct BoundProxyPayload(pub Box3);

/// Everything a [`SceneNode::update`] call needs beyond its own fields and
/// its inherited state, borrowed for the duration of one call.
pub struct UpdateContext<'a> {
    pub scene: &'a dyn Scene,
    pub renderer: &'a dyn RendererBackend,
    pub render_sets: &'a RenderSets,
    pub globals: &'a Globals,
    pub expanded_paths: &'a ExpandedPaths,
    pub min_expansion_depth: usize,
    pub cancellation: &'a CancellationToken,
}

/// Persistent per-location state mirroring one upstream path, in one of the
/// three type-indexed trees (§3).
pub struct SceneNode {
    pub name: Name,
    pub children: Vec<SceneNode>,

    attributes_hash: Hash128,
    transform_hash: Hash128,
    child_names_hash: Hash128,
    object_hash: Hash128,

    pub full_attributes: Attributes,
    pub full_transform: Affine3A,

    object_handle: Option<Box<dyn ObjectHandle>>,
    attributes_handle: Option<Box<dyn AttributesHandle>>,
    bound_handle: Option<Box<dyn ObjectHandle>>,

    pub expanded: bool,
    pub cleared: bool,
}

impl SceneNode {
    /// A freshly-created node: no hashes, no handles, `cleared == true`
    /// until the first successful `update()`.
    #[must_use]
    pub fn new(name: Name) -> Self {
        Self {
            name,
            children: Vec::new(),
            attributes_hash: Hash128::NONE,
            transform_hash: Hash128::NONE,
            child_names_hash: Hash128::NONE,
            object_hash: Hash128::NONE,
            full_attributes: Attributes::new(),
            full_transform: Affine3A::IDENTITY,
            object_handle: None,
            attributes_handle: None,
            bound_handle: None,
            expanded: false,
            cleared: true,
        }
    }

    #[must_use]
    pub fn has_object_handle(&self) -> bool {
        self.object_handle.is_some()
    }

    #[must_use]
    pub fn has_bound_handle(&self) -> bool {
        self.bound_handle.is_some()
    }

    /// Releases every handle, zeros cached hashes, drops all children, and
    /// marks the node `cleared` (§4.1, end). Dropping `children` recursively
    /// releases their own handles — `ObjectHandle`/`AttributesHandle` are
    /// released on `Drop`, so no explicit teardown walk is needed.
    pub fn clear(&mut self) {
        self.object_handle = None;
        self.attributes_handle = None;
        self.bound_handle = None;
        self.attributes_hash = Hash128::NONE;
        self.transform_hash = Hash128::NONE;
        self.child_names_hash = Hash128::NONE;
        self.object_hash = Hash128::NONE;
        self.full_attributes = Attributes::new();
        self.full_transform = Affine3A::IDENTITY;
        self.children.clear();
        self.expanded = false;
        self.cleared = true;
    }

    /// Updates this node for one pass. See SceneNode::update in §4.1 for the
    /// step-by-step contract; returns the bits that changed at this node.
    #[allow(clippy::too_many_lines)]
    pub fn update(
        &mut self,
        path: &ScenePath,
        dirty: DirtyFlags,
        parent_changed: DirtyFlags,
        node_type: NodeType,
        parent_attributes: &Attributes,
        parent_transform: Affine3A,
        ctx: &UpdateContext<'_>,
    ) -> Result<DirtyFlags> {
        ctx.cancellation.check()?;
        let mut changed = DirtyFlags::empty();
        let is_root = path.is_empty();

        // 1. Attributes.
        if is_root {
            let root_attrs = ctx.globals.root_attributes();
            if root_attrs != self.full_attributes {
                self.full_attributes = root_attrs;
                self.attributes_handle = None;
                changed |= DirtyFlags::ATTRIBUTES;
            }
        } else if dirty.contains(DirtyFlags::ATTRIBUTES) || parent_changed.contains(DirtyFlags::ATTRIBUTES) {
            ctx.cancellation.check()?;
            let (local, hash) = ctx.scene.attributes(path).map_err(Error::Upstream)?;
            let parent_did_change = parent_changed.contains(DirtyFlags::ATTRIBUTES);
            if hash != self.attributes_hash || parent_did_change {
                self.attributes_hash = hash;
                let mut merged = parent_attributes.clone();
                merged.extend(local);
                self.full_attributes = merged;
                self.attributes_handle = None;
                changed |= DirtyFlags::ATTRIBUTES;
                log::trace!("attributes changed at {path}");
            } else {
                log::trace!("attributes short-circuited at {path}");
            }
        }

        // 2. Visibility gate.
        if !is_visible(&self.full_attributes) {
            self.clear();
            log::debug!("{path} gated invisible; subtree cleared");
            return Ok(changed);
        }

        // 3. Render sets.
        if dirty.contains(DirtyFlags::RENDER_SETS) || changed.contains(DirtyFlags::ATTRIBUTES) {
            let sets = ctx.render_sets.sets_attribute(path);
            self.full_attributes.insert(Arc::from(SETS_ATTRIBUTE), AttributeValue::NameList(sets));
            changed |= DirtyFlags::ATTRIBUTES;
        }

        // 4. Transform.
        if dirty.contains(DirtyFlags::TRANSFORM) {
            ctx.cancellation.check()?;
            let (local, hash) = ctx.scene.transform(path).map_err(Error::Upstream)?;
            let parent_did_change = parent_changed.contains(DirtyFlags::TRANSFORM);
            if hash != self.transform_hash || parent_did_change {
                self.transform_hash = hash;
                self.full_transform = parent_transform * local;
                changed |= DirtyFlags::TRANSFORM;
            }
        }

        // 5. Object.
        if dirty.contains(DirtyFlags::OBJECT) {
            if node_type == NodeType::None {
                self.object_hash = Hash128::NONE;
                if self.object_handle.take().is_some() {
                    log::debug!("{path} object handle released; role no longer matches this tree");
                    changed |= DirtyFlags::OBJECT;
                }
            } else {
                ctx.cancellation.check()?;
                let (payload, hash) = ctx.scene.object(path).map_err(Error::Upstream)?;
                if hash != self.object_hash {
                    self.object_hash = hash;
                    changed |= DirtyFlags::OBJECT;
                    self.rebuild_object(path, node_type, &payload, ctx);
                }
            }
        }

        // 6. Attribute-only fast path.
        if !changed.contains(DirtyFlags::OBJECT) && changed.contains(DirtyFlags::ATTRIBUTES) && node_type != NodeType::None {
            if self.object_handle.is_some() {
                let mut attrs_box = self.attributes_handle.take();
                if attrs_box.is_none() {
                    attrs_box = Some(ctx.renderer.attributes(&self.full_attributes));
                }
                let retagged = {
                    let handle = self.object_handle.as_deref().expect("checked is_some above");
                    handle.set_attributes(attrs_box.as_deref().expect("just ensured present"))
                };
                self.attributes_handle = attrs_box;
                if !retagged {
                    log::error!("{path} refused attribute retag; rebuilding object");
                    ctx.cancellation.check()?;
                    let (payload, hash) = ctx.scene.object(path).map_err(Error::Upstream)?;
                    self.object_hash = hash;
                    self.rebuild_object(path, node_type, &payload, ctx);
                    changed |= DirtyFlags::OBJECT;
                }
            }
        }

        // 7. Transform application.
        if changed.contains(DirtyFlags::OBJECT) || changed.contains(DirtyFlags::TRANSFORM) {
            if let Some(handle) = self.object_handle.as_deref() {
                handle.set_transform(self.full_transform);
            }
        }

        // 8. Children.
        if dirty.contains(DirtyFlags::CHILD_NAMES) {
            ctx.cancellation.check()?;
            let (new_names, hash) = ctx.scene.child_names(path).map_err(Error::Upstream)?;
            if hash != self.child_names_hash {
                self.child_names_hash = hash;
                let differs = new_names.len() != self.children.len()
                    || new_names.iter().zip(self.children.iter()).any(|(n, c)| n.as_ref() != c.name.as_ref());
                if differs {
                    log::warn!("{path} child list reordered; discarding and recreating {} children", new_names.len());
                    self.children = new_names.into_iter().map(SceneNode::new).collect();
                    changed |= DirtyFlags::CHILD_NAMES;
                }
            }
        }

        // 9. Expansion.
        if dirty.contains(DirtyFlags::EXPANSION) {
            let new_expanded = ctx.min_expansion_depth >= path.len() || ctx.expanded_paths.contains_exact(path);
            if new_expanded != self.expanded {
                self.expanded = new_expanded;
                changed |= DirtyFlags::EXPANSION;
            }
        }

        // 10. Proxy bound.
        let needs_proxy = !self.expanded && !self.children.is_empty();
        if changed.contains(DirtyFlags::EXPANSION) || changed.contains(DirtyFlags::CHILD_NAMES) || dirty.contains(DirtyFlags::BOUND) {
            if needs_proxy {
                ctx.cancellation.check()?;
                let bound = ctx.scene.bound(path).map_err(Error::Upstream)?;
                let proxy_name = format!("{path}/{UNEXPANDED_CHILDREN_SUFFIX}");
                let proxy_attrs = bound_proxy_attributes();
                let attrs_handle = ctx.renderer.attributes(&proxy_attrs);
                let payload = ObjectPayload::Renderable(Arc::new(BoundProxyPayload(bound)));
                self.bound_handle = ctx.renderer.object(&proxy_name, &payload, attrs_handle.as_ref());
                log::debug!("{proxy_name} built");
                changed |= DirtyFlags::BOUND;
            } else if self.bound_handle.is_some() {
                self.bound_handle = None;
                log::debug!("{path} unexpanded-children proxy released");
                changed |= DirtyFlags::BOUND;
            }
        }
        if changed.contains(DirtyFlags::TRANSFORM) {
            if let Some(handle) = self.bound_handle.as_deref() {
                handle.set_transform(self.full_transform);
            }
        }

        self.cleared = false;
        Ok(changed)
    }

    /// Creates or replaces the object handle, honoring the backend-ordering
    /// rule (§4.1 step 5): release before create, except for the
    /// concurrent-swap backend identity.
    fn rebuild_object(&mut self, path: &ScenePath, node_type: NodeType, payload: &ObjectPayload, ctx: &UpdateContext<'_>) {
        if payload.is_null() && node_type != NodeType::Light {
            if self.object_handle.take().is_some() {
                log::debug!("{path} object handle released (null payload)");
            }
            return;
        }

        let mut attrs_box = self.attributes_handle.take();
        if attrs_box.is_none() {
            attrs_box = Some(ctx.renderer.attributes(&self.full_attributes));
        }
        let attrs_ref = attrs_box.as_deref().expect("just ensured present");
        let name = path.to_string();
        let concurrent_swap = ctx.renderer.name() == OPENGL_BACKEND_NAME;

        if concurrent_swap {
            let new_handle = build_object_handle(node_type, payload, &name, attrs_ref, ctx);
            self.object_handle = new_handle;
        } else {
            if self.object_handle.take().is_some() {
                log::debug!("{path} {} handle released before recreate", node_type_label(node_type));
            }
            let new_handle = build_object_handle(node_type, payload, &name, attrs_ref, ctx);
            self.object_handle = new_handle;
        }
        self.attributes_handle = attrs_box;
    }
}

fn build_object_handle(
    node_type: NodeType,
    payload: &ObjectPayload,
    name: &str,
    attrs: &dyn AttributesHandle,
    ctx: &UpdateContext<'_>,
) -> Option<Box<dyn ObjectHandle>> {
    match node_type {
        NodeType::Camera => match payload {
            ObjectPayload::Camera(camera) => {
                let mut camera = camera.clone();
                ctx.globals.apply_to_camera(&mut camera);
                ctx.renderer.camera(name, &camera, attrs)
            }
            _ => None,
        },
        NodeType::Light => {
            let light_payload = match payload {
                ObjectPayload::Light(light) => Some(light),
                _ => None,
            };
            ctx.renderer.light(name, light_payload, attrs)
        }
        NodeType::Object => ctx.renderer.object(name, payload, attrs),
        NodeType::None => None,
    }
}

fn node_type_label(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Camera => "camera",
        NodeType::Light => "light",
        NodeType::Object => "object",
        NodeType::None => "none",
    }
}

fn bound_proxy_attributes() -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert(Arc::from(BOUND_ATTRIBUTE_WIREFRAME), AttributeValue::Bool(true));
    attrs.insert(Arc::from(BOUND_ATTRIBUTE_TRANSPARENCY), AttributeValue::Float(0.5));
    attrs.insert(Arc::from(BOUND_ATTRIBUTE_COLOR), AttributeValue::String(Arc::from("grey")));
    attrs
}
