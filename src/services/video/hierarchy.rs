use std::sync::Arc;

use super::host::{ControllerRef, PlayerRef};

/// A native player surface located in a view-controller tree.
#[derive(Clone)]
pub struct SurfaceMatch {
    /// The controller that is the player surface
    pub surface: ControllerRef,

    /// The player it presents, absent once the surface has let go of it
    pub player: Option<PlayerRef>,
}

impl SurfaceMatch {
    /// Whether this match is the same surface node as `other`.
    pub fn is_surface(&self, other: &ControllerRef) -> bool {
        same_surface(&self.surface, other)
    }
}

/// Compares two controllers by node identity.
pub fn same_surface(a: &ControllerRef, b: &ControllerRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Depth-first search for the first native player surface under `root`.
///
/// Surfaces match by kind, whether or not they still hold a player.
///
/// Each node is checked before its presented controller, and the presented
/// branch is searched before the children, so a fixed tree always yields the
/// same match. Pure: nothing in the tree is touched.
pub fn find_player_surface(root: Option<&ControllerRef>) -> Option<SurfaceMatch> {
    let root = root?;
    search(root)
}

fn search(node: &ControllerRef) -> Option<SurfaceMatch> {
    if node.is_player_surface() {
        return Some(SurfaceMatch {
            surface: Arc::clone(node),
            player: node.player(),
        });
    }

    if let Some(found) = node.presented().as_ref().and_then(search) {
        return Some(found);
    }

    node.children().iter().find_map(search)
}
