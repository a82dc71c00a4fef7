//! Scene location paths.
//!
//! A [`ScenePath`] names a location by the sequence of child names from the
//! root. It is cheap to clone (an `Arc<str>` per segment) because the
//! traversal pushes and pops a segment per level on every worker thread.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// One path segment (a child name).
pub type Name = Arc<str>;

/// An absolute location in the scene, root-relative.
///
/// Stored inline up to four segments before spilling to the heap, since most
/// production scenes are shallow relative to their breadth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ScenePath(SmallVec<[Name; 4]>);

impl ScenePath {
    /// The root path (zero segments).
    #[must_use]
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Returns a new path with `name` appended.
    #[must_use]
    pub fn child(&self, name: &Name) -> Self {
        let mut segments = self.0.clone();
        segments.push(Arc::clone(name));
        Self(segments)
    }

    /// Number of segments (the root has zero).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[Name] {
        &self.0
    }

    /// The final path component, or `None` at the root.
    #[must_use]
    pub fn last(&self) -> Option<&Name> {
        self.0.last()
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
