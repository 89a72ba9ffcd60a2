//! Renderer and asset loader seams

use crate::error::AssetError;
use async_trait::async_trait;
use glam::Mat4;
use std::fmt;

/// Handle to a node the scene backend created from a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// The scene graph the placed models live in.
///
/// The engine only ever clones templates, attaches and detaches the clones,
/// and overwrites their world transform.
pub trait SceneBackend {
    /// A loaded, never-mutated renderable
    type Template;

    /// Clone `template` into a new, detached node
    fn instantiate(&mut self, template: &Self::Template) -> NodeId;

    /// Add a node to the rendered scene
    fn attach(&mut self, node: NodeId);

    /// Remove a node from the rendered scene and discard it
    fn detach(&mut self, node: NodeId);

    /// Overwrite the node's world transform, bypassing any local
    /// position/rotation/scale composition
    fn set_world_transform(&mut self, node: NodeId, transform: Mat4);
}

/// Asynchronous model loading
#[async_trait(?Send)]
pub trait AssetLoader {
    /// What a successful load produces
    type Template;

    /// Load and decode an asset
    async fn load(&self, asset: &str) -> Result<Self::Template, AssetError>;
}
