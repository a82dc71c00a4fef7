//! Recursive parallel traversal over one SceneNode tree.
//!
//! One `run()` call is one task in the sense of §4.2: it updates exactly one
//! node, then fans out one child task per child using rayon's work-stealing
//! pool. A parent always finishes its own `SceneNode::update` before any
//! child task is spawned — children only ever read the parent's already-
//! finalized `full_attributes`/`full_transform`, so the tree needs no
//! per-node locking (§5).

use crate::dirty::{DirtyFlags, Match, NodeType};
use crate::error::Result;
use crate::node::{SceneNode, UpdateContext};
use crate::path::ScenePath;
use crate::upstream::Attributes;
use glam::Affine3A;
use rayon::prelude::*;

/// Which of the three independent mirror trees a traversal is walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    Camera,
    Light,
    Object,
}

impl TreeKind {
    fn native_role(self) -> NodeType {
        match self {
            TreeKind::Camera => NodeType::Camera,
            TreeKind::Light => NodeType::Light,
            TreeKind::Object => NodeType::Object,
        }
    }
}

/// Status reported to the caller's progress callback, once per node that
/// changed (`Running`), and once at the end of an `update_internal` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Running,
    Completed,
    Cancelled,
    Errored,
}

/// `scene_graph_match` (§4.2): routes a path to Camera, Light, or Object
/// membership bits for the given tree.
fn scene_graph_match(tree: TreeKind, render_sets: &crate::render_sets::RenderSets, path: &ScenePath) -> Match {
    match tree {
        TreeKind::Camera => render_sets.cameras_match(path),
        TreeKind::Light => render_sets.lights_match(path),
        TreeKind::Object => {
            let union = render_sets.cameras_match(path) | render_sets.lights_match(path);
            if union.contains(Match::EXACT) {
                Match::ANCESTOR | Match::DESCENDANT
            } else {
                Match::EVERY
            }
        }
    }
}

/// The object role this node plays in `tree`, given its routing match. Only
/// an exact match carries the tree's native type; everything else is a
/// pass-through location that still needs traversing to reach descendants.
fn node_role(tree: TreeKind, match_bits: Match) -> NodeType {
    if match_bits.contains(Match::EXACT) {
        tree.native_role()
    } else {
        NodeType::None
    }
}

/// Recursively updates `node` and its subtree within `tree`.
#[allow(clippy::too_many_arguments)]
pub fn run(
    node: &mut SceneNode,
    tree: TreeKind,
    path: &ScenePath,
    dirty: DirtyFlags,
    parent_changed: DirtyFlags,
    parent_attributes: &Attributes,
    parent_transform: Affine3A,
    ctx: &UpdateContext<'_>,
    progress: &(dyn Fn(Progress) + Sync),
) -> Result<()> {
    ctx.cancellation.check()?;

    let match_bits = scene_graph_match(tree, ctx.render_sets, path);
    if !match_bits.intersects(Match::EXACT | Match::DESCENDANT) {
        node.clear();
        return Ok(());
    }

    let dirty = if node.cleared { DirtyFlags::ALL } else { dirty };
    let role = node_role(tree, match_bits);

    let changed = node.update(path, dirty, parent_changed, role, parent_attributes, parent_transform, ctx)?;
    if !changed.is_empty() {
        progress(Progress::Running);
    }

    if node.children.is_empty() {
        return Ok(());
    }

    if !node.expanded {
        for child in &mut node.children {
            child.clear();
        }
        return Ok(());
    }

    let full_attributes = node.full_attributes.clone();
    let full_transform = node.full_transform;
    let child_parent_changed = dirty | changed;

    node.children.par_iter_mut().try_for_each(|child| -> Result<()> {
        ctx.cancellation.check()?;
        let child_path = path.child(&child.name);
        run(child, tree, &child_path, dirty, child_parent_changed, &full_attributes, full_transform, ctx, progress)
    })
}
