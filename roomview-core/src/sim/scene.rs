//! In-memory scene graph and asset loader

use crate::error::AssetError;
use crate::scene::{AssetLoader, NodeId, SceneBackend};
use async_trait::async_trait;
use glam::Mat4;
use std::collections::{BTreeMap, HashSet};

/// A "decoded" model: just its asset name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTemplate {
    /// Asset the template was loaded from
    pub asset: String,
}

/// Everything the engine did to one node
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNode {
    /// Asset of the template the node was cloned from
    pub asset: String,
    /// Whether the node is part of the rendered scene
    pub attached: bool,
    /// Last world transform written
    pub world_transform: Mat4,
}

/// Scene backend that records instead of rendering
#[derive(Debug, Default)]
pub struct RecordingScene {
    nodes: BTreeMap<NodeId, RecordedNode>,
    next_id: u64,
    transform_writes: usize,
}

impl RecordingScene {
    /// Empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a template without going through a loader
    pub fn load_template(&self, asset: &str) -> ModelTemplate {
        ModelTemplate {
            asset: asset.to_string(),
        }
    }

    /// Live node by id; detached nodes are discarded
    pub fn node(&self, id: NodeId) -> Option<&RecordedNode> {
        self.nodes.get(&id)
    }

    /// Number of nodes currently in the rendered scene
    pub fn attached_count(&self) -> usize {
        self.nodes.values().filter(|n| n.attached).count()
    }

    /// Total world transform writes so far
    pub fn transform_writes(&self) -> usize {
        self.transform_writes
    }
}

impl SceneBackend for RecordingScene {
    type Template = ModelTemplate;

    fn instantiate(&mut self, template: &ModelTemplate) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(
            id,
            RecordedNode {
                asset: template.asset.clone(),
                attached: false,
                world_transform: Mat4::IDENTITY,
            },
        );
        id
    }

    fn attach(&mut self, node: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.attached = true;
        }
    }

    fn detach(&mut self, node: NodeId) {
        self.nodes.remove(&node);
    }

    fn set_world_transform(&mut self, node: NodeId, transform: Mat4) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.world_transform = transform;
            self.transform_writes += 1;
        }
    }
}

/// Loader that knows a fixed set of assets
#[derive(Debug, Clone, Default)]
pub struct SimAssetLoader {
    available: HashSet<String>,
    corrupt: HashSet<String>,
}

impl SimAssetLoader {
    /// Loader serving exactly `assets`
    pub fn new<I, A>(assets: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            available: assets.into_iter().map(Into::into).collect(),
            corrupt: HashSet::new(),
        }
    }

    /// Serve `asset` but fail to decode it
    pub fn with_corrupt(mut self, asset: impl Into<String>) -> Self {
        let asset = asset.into();
        self.available.insert(asset.clone());
        self.corrupt.insert(asset);
        self
    }
}

#[async_trait(?Send)]
impl AssetLoader for SimAssetLoader {
    type Template = ModelTemplate;

    async fn load(&self, asset: &str) -> Result<ModelTemplate, AssetError> {
        if !self.available.contains(asset) {
            return Err(AssetError::Fetch {
                asset: asset.to_string(),
                reason: "not found".to_string(),
            });
        }
        if self.corrupt.contains(asset) {
            return Err(AssetError::Decode {
                asset: asset.to_string(),
                reason: "invalid glTF header".to_string(),
            });
        }
        Ok(ModelTemplate {
            asset: asset.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_discards_node() {
        let mut scene = RecordingScene::new();
        let template = scene.load_template("sofa");
        let node = scene.instantiate(&template);
        scene.attach(node);
        assert_eq!(scene.attached_count(), 1);

        scene.detach(node);
        assert!(scene.node(node).is_none());
        assert_eq!(scene.attached_count(), 0);
    }

    #[test]
    fn test_loader_distinguishes_fetch_and_decode() {
        let loader = SimAssetLoader::new(["sofa.glb"]).with_corrupt("broken.glb");

        assert!(tokio_test::block_on(loader.load("sofa.glb")).is_ok());
        assert!(matches!(
            tokio_test::block_on(loader.load("missing.glb")),
            Err(AssetError::Fetch { .. })
        ));
        assert!(matches!(
            tokio_test::block_on(loader.load("broken.glb")),
            Err(AssetError::Decode { .. })
        ));
    }
}
