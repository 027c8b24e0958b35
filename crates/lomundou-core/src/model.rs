//! Model assets and the asset loader contract

use tracing::{debug, error};

use crate::error::LoadError;
use crate::geometry::{Euler, Vec3};

/// Root node of a decoded model inside the external scene graph
pub trait SceneNode {
    fn rotation(&self) -> Euler;
    fn set_rotation(&mut self, rotation: Euler);
    fn set_scale(&mut self, scale: Vec3);
    fn set_position(&mut self, position: Vec3);
    fn set_visible(&mut self, visible: bool);
    /// Turn on shadow casting and receiving for every mesh below this node
    fn enable_shadows(&mut self);
}

/// Raw output of the model decode service
pub struct DecodedModel<N, C> {
    pub node: N,
    pub clips: Vec<C>,
}

/// External model decode service (glTF with compressed geometry)
#[allow(async_fn_in_trait)]
pub trait ModelDecoder {
    type Node: SceneNode;
    type Clip;

    async fn decode(&self, path: &str) -> Result<DecodedModel<Self::Node, Self::Clip>, LoadError>;
}

/// A model that decoded successfully and has been placed
pub struct LoadedModel<N, C> {
    pub path: String,
    pub node: N,
    pub clips: Vec<C>,
    /// Scale applied at load time; pinch zoom multiplies this
    pub base_scale: Vec3,
}

/// Load one model, applying placement and shadows.
///
/// A decode failure is logged and returned as `None`. Callers treat that as
/// the final state for the marker: it never activates.
pub async fn load_model<D: ModelDecoder>(
    decoder: &D,
    path: &str,
    scale: Vec3,
    position: Vec3,
) -> Option<LoadedModel<D::Node, D::Clip>> {
    match decoder.decode(path).await {
        Ok(DecodedModel { mut node, clips }) => {
            node.set_scale(scale);
            node.set_position(position);
            node.enable_shadows();
            debug!(path, clips = clips.len(), "Model loaded");
            Some(LoadedModel {
                path: path.to_string(),
                node,
                clips,
                base_scale: scale,
            })
        }
        Err(e) => {
            error!(path, error = %e, "Failed to load model");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDecoder;

    #[tokio::test]
    async fn test_load_applies_placement_and_shadows() {
        let decoder = FakeDecoder::with_clips(2);
        let model = load_model(&decoder, "scene1.glb", Vec3::splat(0.1), Vec3::new(0.0, -0.4, 0.0))
            .await
            .expect("model should load");

        assert_eq!(model.path, "scene1.glb");
        assert_eq!(model.clips.len(), 2);
        assert_eq!(model.base_scale, Vec3::splat(0.1));
        assert_eq!(model.node.scale, Vec3::splat(0.1));
        assert_eq!(model.node.position, Vec3::new(0.0, -0.4, 0.0));
        assert!(model.node.shadows);
    }

    #[tokio::test]
    async fn test_decode_failure_is_absent() {
        let decoder = FakeDecoder::with_clips(1).failing(&["broken.glb"]);
        let model = load_model(&decoder, "broken.glb", Vec3::ONE, Vec3::default()).await;
        assert!(model.is_none());

        let model = load_model(&decoder, "fine.glb", Vec3::ONE, Vec3::default()).await;
        assert!(model.is_some());
    }
}
