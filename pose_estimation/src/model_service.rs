use pose_proto::{DetectionResult, ImageFrame};
use tonic::{async_trait, Status};

#[async_trait]
pub trait ModelService: Send + Sync + Clone + 'static {
    async fn detect(&self, frame: ImageFrame) -> Result<DetectionResult, Status>;
}
