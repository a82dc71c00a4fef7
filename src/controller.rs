//! The public façade: owns the three type-indexed mirror trees, the latest
//! globals, the expansion policy, the dirty bitmask, and the single
//! in-flight background pass (§4.4).

use crate::background::{BackgroundTask, CancellationToken};
use crate::default_camera::DefaultCameraManager;
use crate::dirty::DirtyFlags;
use crate::error::{Error, Result};
use crate::node::{ExpandedPaths, SceneNode, UpdateContext};
use crate::path::ScenePath;
use crate::render_sets::RenderSets;
use crate::renderer::{OutputSpec, RendererBackend};
use crate::traversal::{self, Progress, TreeKind};
use crate::upstream::{AttributeValue, Attributes, Camera, Globals, Scene};
use glam::Affine3A;
use parking_lot::Mutex;
use std::sync::Arc;

const UI_CONTEXT_PREFIX: &str = "ui:";
const OPTION_PREFIX: &str = "option:";
const OUTPUT_PREFIX: &str = "output:";

struct ControllerInner {
    scene: Option<Arc<dyn Scene>>,
    renderer: Arc<dyn RendererBackend>,
    context: Attributes,
    render_sets: RenderSets,
    globals: Globals,
    expanded_paths: ExpandedPaths,
    min_expansion_depth: usize,
    dirty: DirtyFlags,
    update_required: bool,
    camera_root: SceneNode,
    light_root: SceneNode,
    object_root: SceneNode,
    default_camera: DefaultCameraManager,
    on_update_required: Option<Arc<dyn Fn() + Send + Sync>>,
}

/// Drives a pluggable renderer backend from a lazily-evaluated upstream
/// scene. Thread-safe: setters and `update()` may be called from any
/// thread, serialized internally by a single lock plus the background-pass
/// cancel-and-join discipline described in §5.
pub struct Controller {
    inner: Arc<Mutex<ControllerInner>>,
    background: Option<BackgroundTask>,
}

impl Controller {
    #[must_use]
    pub fn new(renderer: Arc<dyn RendererBackend>) -> Self {
        let inner = ControllerInner {
            scene: None,
            renderer,
            context: Attributes::new(),
            render_sets: RenderSets::new(),
            globals: Globals::default(),
            expanded_paths: ExpandedPaths::new(),
            min_expansion_depth: 0,
            dirty: DirtyFlags::empty(),
            update_required: false,
            camera_root: SceneNode::new(Arc::from("")),
            light_root: SceneNode::new(Arc::from("")),
            object_root: SceneNode::new(Arc::from("")),
            default_camera: DefaultCameraManager::new(),
            on_update_required: None,
        };
        Self { inner: Arc::new(Mutex::new(inner)), background: None }
    }

    fn cancel_background(&mut self) {
        if let Some(task) = self.background.take() {
            task.cancel_and_join();
        }
    }

    pub fn set_scene(&mut self, scene: Arc<dyn Scene>) {
        self.cancel_background();
        self.dirty_all();
        self.inner.lock().scene = Some(scene);
    }

    pub fn set_context(&mut self, context: Attributes) {
        self.cancel_background();
        self.inner.lock().context = context;
        self.dirty_all();
    }

    /// Upstream notification that one context entry changed. Entries
    /// prefixed `ui:` cannot influence renderable state and are ignored
    /// (§4.4 dispatch table).
    pub fn context_entry_changed(&mut self, name: &str) {
        if name.starts_with(UI_CONTEXT_PREFIX) {
            return;
        }
        self.cancel_background();
        self.dirty_all();
    }

    pub fn set_expanded_paths(&mut self, paths: impl IntoIterator<Item = ScenePath>) {
        self.cancel_background();
        let mut inner = self.inner.lock();
        inner.expanded_paths.set(paths);
        Self::mark_dirty_locked(&mut inner, DirtyFlags::EXPANSION);
    }

    pub fn set_minimum_expansion_depth(&mut self, depth: usize) {
        self.cancel_background();
        let mut inner = self.inner.lock();
        inner.min_expansion_depth = depth;
        Self::mark_dirty_locked(&mut inner, DirtyFlags::EXPANSION);
    }

    /// Upstream dirty-notification dispatch table (§4.4).
    pub fn notify_bound_changed(&mut self) {
        self.mark_dirty(DirtyFlags::BOUND);
    }
    pub fn notify_transform_changed(&mut self) {
        self.mark_dirty(DirtyFlags::TRANSFORM);
    }
    pub fn notify_attributes_changed(&mut self) {
        self.mark_dirty(DirtyFlags::ATTRIBUTES);
    }
    pub fn notify_object_changed(&mut self) {
        self.mark_dirty(DirtyFlags::OBJECT);
    }
    pub fn notify_child_names_changed(&mut self) {
        self.mark_dirty(DirtyFlags::CHILD_NAMES);
    }
    pub fn notify_globals_changed(&mut self) {
        self.mark_dirty(DirtyFlags::GLOBALS);
    }
    pub fn notify_sets_changed(&mut self) {
        self.mark_dirty(DirtyFlags::SETS);
    }

    /// The upstream scene's identity itself changed (e.g. reconnected to a
    /// different plug). Does not dirty anything by itself — only requests a
    /// pass, since `set_scene` is what actually supplies new content.
    pub fn notify_scene_identity_changed(&mut self) {
        let mut inner = self.inner.lock();
        if !inner.update_required {
            inner.update_required = true;
            Self::fire_observer(&inner);
        }
    }

    pub fn set_update_required_observer(&mut self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner.lock().on_update_required = Some(Arc::new(callback));
    }

    #[must_use]
    pub fn update_required(&self) -> bool {
        self.inner.lock().update_required
    }

    fn dirty_all(&mut self) {
        let mut inner = self.inner.lock();
        Self::mark_dirty_locked(&mut inner, DirtyFlags::ALL);
    }

    fn mark_dirty(&mut self, bit: DirtyFlags) {
        let mut inner = self.inner.lock();
        Self::mark_dirty_locked(&mut inner, bit);
    }

    fn mark_dirty_locked(inner: &mut ControllerInner, bit: DirtyFlags) {
        let was_clean = !inner.update_required;
        inner.dirty |= bit;
        inner.update_required = true;
        if was_clean {
            Self::fire_observer(inner);
        }
    }

    fn fire_observer(inner: &ControllerInner) {
        if let Some(callback) = &inner.on_update_required {
            callback();
        }
    }

    /// Runs one synchronous update pass on the calling thread.
    pub fn update(&mut self, progress: &(dyn Fn(Progress) + Sync)) -> Result<()> {
        self.cancel_background();
        let token = CancellationToken::new();
        let mut inner = self.inner.lock();
        Self::update_internal(&mut inner, &token, progress)
    }

    /// Schedules `update` on a background thread. The returned
    /// [`BackgroundTask`] must be cancelled (or allowed to finish) before
    /// any setter runs again; setters do this automatically.
    pub fn update_in_background(&mut self, progress: impl Fn(Progress) + Send + Sync + 'static) {
        self.cancel_background();
        let inner = Arc::clone(&self.inner);
        self.background = Some(BackgroundTask::spawn(move |token| {
            let mut inner = inner.lock();
            let _ = Self::update_internal(&mut inner, &token, &progress);
        }));
    }

    fn update_internal(inner: &mut ControllerInner, token: &CancellationToken, progress: &(dyn Fn(Progress) + Sync)) -> Result<()> {
        let scene = inner
            .scene
            .clone()
            .ok_or_else(|| Error::Configuration("no scene attached; call set_scene first".to_string()))?;

        let result = Self::run_pass(inner, scene.as_ref(), token, progress);
        match &result {
            Ok(()) => {
                inner.dirty = DirtyFlags::empty();
                inner.update_required = false;
                progress(Progress::Completed);
            }
            Err(Error::Cancelled) => {
                log::debug!("update pass cancelled; dirty state preserved");
                progress(Progress::Cancelled);
            }
            Err(err) => {
                log::error!("update pass failed: {err}");
                inner.update_required = false;
                progress(Progress::Errored);
            }
        }
        result
    }

    fn run_pass(inner: &mut ControllerInner, scene: &dyn Scene, token: &CancellationToken, progress: &(dyn Fn(Progress) + Sync)) -> Result<()> {
        let mut pass_context = inner.context.clone();
        pass_context.insert(Arc::from(crate::consts::RENDERER_CONTEXT_KEY), AttributeValue::String(Arc::from(inner.renderer.name())));
        scene.context_changed(&pass_context);

        let mut camera_globals_changed = false;

        if inner.dirty.contains(DirtyFlags::GLOBALS) {
            token.check()?;
            let new_globals = scene.globals().map_err(Error::Upstream)?;
            Self::push_globals_to_renderer(&new_globals, inner.renderer.as_ref());
            camera_globals_changed = Self::camera_globals_differ(&inner.globals, &new_globals);
            inner.globals = new_globals;
        }

        if inner.dirty.contains(DirtyFlags::SETS) {
            token.check()?;
            if inner.render_sets.update(scene)? {
                inner.dirty |= DirtyFlags::RENDER_SETS;
            }
        }

        let pass_dirty = inner.dirty;

        if camera_globals_changed {
            inner.camera_root.clear();
        }
        Self::run_tree(
            &mut inner.camera_root,
            TreeKind::Camera,
            inner.renderer.as_ref(),
            &inner.render_sets,
            &inner.globals,
            &inner.expanded_paths,
            inner.min_expansion_depth,
            scene,
            pass_dirty,
            token,
            progress,
        )?;
        Self::run_tree(
            &mut inner.light_root,
            TreeKind::Light,
            inner.renderer.as_ref(),
            &inner.render_sets,
            &inner.globals,
            &inner.expanded_paths,
            inner.min_expansion_depth,
            scene,
            pass_dirty,
            token,
            progress,
        )?;
        Self::run_tree(
            &mut inner.object_root,
            TreeKind::Object,
            inner.renderer.as_ref(),
            &inner.render_sets,
            &inner.globals,
            &inner.expanded_paths,
            inner.min_expansion_depth,
            scene,
            pass_dirty,
            token,
            progress,
        )?;

        if camera_globals_changed {
            inner.default_camera.refresh(&inner.globals, inner.renderer.as_ref());
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_tree(
        root: &mut SceneNode,
        tree: TreeKind,
        renderer: &dyn RendererBackend,
        render_sets: &RenderSets,
        globals: &Globals,
        expanded_paths: &ExpandedPaths,
        min_expansion_depth: usize,
        scene: &dyn Scene,
        dirty: DirtyFlags,
        token: &CancellationToken,
        progress: &(dyn Fn(Progress) + Sync),
    ) -> Result<()> {
        let ctx = UpdateContext { scene, renderer, render_sets, globals, expanded_paths, min_expansion_depth, cancellation: token };
        traversal::run(root, tree, &ScenePath::root(), dirty, DirtyFlags::empty(), &Attributes::new(), Affine3A::IDENTITY, &ctx, progress)
    }

    fn push_globals_to_renderer(globals: &Globals, renderer: &dyn RendererBackend) {
        for (key, value) in &globals.entries {
            if let Some(name) = key.strip_prefix(OPTION_PREFIX) {
                renderer.set_option(name, value);
            } else if let Some(name) = key.strip_prefix(OUTPUT_PREFIX) {
                let kind = match value {
                    AttributeValue::String(s) => s.to_string(),
                    _ => "default".to_string(),
                };
                renderer.set_output(name, &OutputSpec { name: name.to_string(), kind });
            }
        }
    }

    /// Compares globals by their effect on a prototype camera rather than
    /// structurally, so unrelated globals changes don't force a camera
    /// rebuild (§4.4 step 1).
    fn camera_globals_differ(old: &Globals, new: &Globals) -> bool {
        let base = Camera::new_perspective(std::f32::consts::FRAC_PI_4, 0.01, 100_000.0);
        let mut old_proto = base.clone();
        old.apply_to_camera(&mut old_proto);
        let mut new_proto = base;
        new.apply_to_camera(&mut new_proto);
        old_proto != new_proto
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.cancel_background();
        let mut inner = self.inner.lock();
        inner.renderer.pause();
        inner.default_camera.teardown();
    }
}
