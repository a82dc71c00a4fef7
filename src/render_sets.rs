//! Named path-sets that drive both object routing and the synthesized
//! `sets` attribute (§4.3).

use crate::dirty::Match;
use crate::path::{Name, ScenePath};
use crate::upstream::{PathMatcher, Scene};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Reserved set names the upstream [`Scene::sets`] map may contain, used to
/// route a location to the Camera or Light tree (§4.2 `scene_graph_match`).
/// Not exposed through [`RenderSets::sets_attribute`] — only `render:*`
/// names are.
pub const CAMERAS_SET: &str = "__cameras";
pub const LIGHTS_SET: &str = "__lights";

/// Prefix identifying a set as eligible for the synthesized `sets`
/// attribute.
const RENDER_SET_PREFIX: &str = "render:";

/// Maintains the "cameras", "lights", and arbitrary `render:*` path-sets.
pub struct RenderSets {
    sets: BTreeMap<Arc<str>, Arc<dyn PathMatcher>>,
}

impl Default for RenderSets {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSets {
    #[must_use]
    pub fn new() -> Self {
        Self { sets: BTreeMap::new() }
    }

    /// Refreshes from the upstream scene. Returns whether any render set
    /// actually changed — this is the signal that gates recomputation of the
    /// `RENDER_SETS` dirty bit in the Controller (§4.4 step 2).
    ///
    /// Change is detected structurally (set added/removed, or its matcher
    /// identity replaced) rather than by deep comparison: an embedder is
    /// expected to hand out a fresh `Arc` only when a set's membership
    /// actually changed.
    pub fn update(&mut self, scene: &dyn Scene) -> crate::error::Result<bool> {
        let new_sets = scene.sets().map_err(crate::error::Error::Upstream)?;
        let changed = !Self::same_matchers(&self.sets, &new_sets);
        self.sets = new_sets;
        Ok(changed)
    }

    fn same_matchers(
        a: &BTreeMap<Arc<str>, Arc<dyn PathMatcher>>,
        b: &BTreeMap<Arc<str>, Arc<dyn PathMatcher>>,
    ) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && Arc::ptr_eq(va, vb))
    }

    /// Membership of `path` in the named set, or [`Match::empty`] if the set
    /// does not exist.
    #[must_use]
    pub fn matches(&self, set_name: &str, path: &ScenePath) -> Match {
        self.sets.get(set_name).map_or(Match::empty(), |m| m.matches(path))
    }

    #[must_use]
    pub fn cameras_match(&self, path: &ScenePath) -> Match {
        self.matches(CAMERAS_SET, path)
    }

    #[must_use]
    pub fn lights_match(&self, path: &ScenePath) -> Match {
        self.matches(LIGHTS_SET, path)
    }

    /// Sorted list of `render:*` set names that exactly contain `path`, used
    /// to synthesize the `sets` attribute (§4.1 step 3).
    #[must_use]
    pub fn sets_attribute(&self, path: &ScenePath) -> Vec<Name> {
        let mut names: Vec<Name> = self
            .sets
            .iter()
            .filter(|(name, _)| name.starts_with(RENDER_SET_PREFIX))
            .filter(|(_, matcher)| matcher.matches(path).contains(Match::EXACT))
            .map(|(name, _)| Arc::from(name.as_ref()))
            .collect();
        names.sort();
        names
    }
}
