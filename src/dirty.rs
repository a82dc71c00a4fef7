//! Dirty-component bitmasks and path-matcher result bits.

use bitflags::bitflags;

bitflags! {
    /// Which scene components may have changed since the last update pass.
    ///
    /// Chosen over per-component queues because dirty events coalesce
    /// trivially with bitwise OR, and a traversal can test relevance in O(1)
    /// at each node without touching a queue.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u32 {
        const BOUND        = 1 << 0;
        const TRANSFORM    = 1 << 1;
        const ATTRIBUTES   = 1 << 2;
        const OBJECT       = 1 << 3;
        const CHILD_NAMES  = 1 << 4;
        const GLOBALS      = 1 << 5;
        const SETS         = 1 << 6;
        /// Derived from `SETS`: paths belonging to `render:*` sets, and the
        /// cameras/lights sets, need recomputing. `SETS` can raise this bit;
        /// this bit never raises `SETS` back (see DESIGN.md, Open Question ii).
        const RENDER_SETS  = 1 << 7;
        const EXPANSION    = 1 << 8;

        const ALL = Self::BOUND.bits() | Self::TRANSFORM.bits() | Self::ATTRIBUTES.bits()
            | Self::OBJECT.bits() | Self::CHILD_NAMES.bits() | Self::GLOBALS.bits()
            | Self::SETS.bits() | Self::RENDER_SETS.bits() | Self::EXPANSION.bits();
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        DirtyFlags::empty()
    }
}

bitflags! {
    /// How a path relates to a path-matcher (a render set, the cameras set,
    /// or the lights set). Used both to route a location to one of the three
    /// scene-graph trees and to prune traversal of irrelevant subtrees.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Match: u8 {
        /// This exact path is a member.
        const EXACT      = 1 << 0;
        /// A descendant of this path is a member.
        const DESCENDANT = 1 << 1;
        /// An ancestor of this path is a member (set membership is
        /// inherited downward by convention of the matcher, not of this
        /// engine).
        const ANCESTOR   = 1 << 2;

        const EVERY = Self::EXACT.bits() | Self::DESCENDANT.bits() | Self::ANCESTOR.bits();
    }
}

/// Which of the three scene-graph trees a node belongs to, or none.
///
/// Chosen over a single tree with per-node type tags so that the
/// Camera/Light/Object ordering requirement is a property of the outer loop
/// (see [`crate::controller::Controller`]), not an intra-traversal
/// constraint, and so cancellation mid-Object-tree never leaves cameras
/// half-updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Camera,
    Light,
    Object,
    /// This path does not carry an object of the tree currently being
    /// traversed, but may still need to be descended to reach a matching
    /// descendant.
    None,
}

impl NodeType {
    #[must_use]
    pub fn all() -> [NodeType; 3] {
        [NodeType::Camera, NodeType::Light, NodeType::Object]
    }
}
