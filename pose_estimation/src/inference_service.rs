use crate::{model_service::ModelService, state::State};
use pose_proto::{
    pose_service_server::PoseService, DetectionResult, Empty, ImageFrame, LandmarkNames,
};
use std::sync::Arc;
use tonic::{async_trait, Request, Response, Status};

#[derive(Debug, Clone)]
pub struct InferenceService<M: ModelService, S: State> {
    model_service: Arc<M>,
    service_state: Arc<S>,
}

impl<M: ModelService, S: State> InferenceService<M, S> {
    pub fn new(model_service: M, state: S) -> Self {
        Self {
            model_service: Arc::new(model_service),
            service_state: Arc::new(state),
        }
    }
}

#[async_trait]
impl<M: ModelService, S: State> PoseService for InferenceService<M, S> {
    async fn detect(
        &self,
        request: Request<ImageFrame>,
    ) -> Result<Response<DetectionResult>, Status> {
        let image_frame = request.into_inner();
        let model_service = self.model_service.clone();
        let result = model_service.detect(image_frame).await?;

        match &result.pose {
            Some(pose) => {
                tracing::debug!("Returning a pose with {} landmarks", pose.landmarks.len())
            }
            None => tracing::debug!("No pose detected in frame"),
        }

        Ok(Response::new(result))
    }

    async fn get_landmark_names(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<LandmarkNames>, Status> {
        let names = self.service_state.landmark_names().clone();
        let response = LandmarkNames { names };

        Ok(Response::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LandmarksConfig;
    use crate::state::LANDMARK_COUNT;
    use pose_proto::{Landmark, PoseSnapshot};

    #[derive(Clone)]
    struct MockModelService {
        detects: bool,
    }

    #[async_trait]
    impl ModelService for MockModelService {
        async fn detect(&self, _frame: ImageFrame) -> Result<DetectionResult, Status> {
            if !self.detects {
                return Ok(DetectionResult { pose: None });
            }

            let landmarks = (0..LANDMARK_COUNT)
                .map(|i| Landmark {
                    x: 0.5,
                    y: i as f32 / LANDMARK_COUNT as f32,
                    z: 0.0,
                    visibility: 0.9,
                })
                .collect();

            Ok(DetectionResult {
                pose: Some(PoseSnapshot { landmarks }),
            })
        }
    }

    struct MockState {
        names: Vec<String>,
    }

    impl State for MockState {
        fn new(_landmarks_cfg: &LandmarksConfig) -> Result<Self, String> {
            unimplemented!("tests build MockState directly")
        }

        fn landmark_names(&self) -> &Vec<String> {
            &self.names
        }
    }

    fn mock_state() -> MockState {
        MockState {
            names: (0..LANDMARK_COUNT).map(|i| format!("joint_{i}")).collect(),
        }
    }

    fn frame() -> Request<ImageFrame> {
        Request::new(ImageFrame {
            image_data: vec![0; 16],
            timestamp: 1,
        })
    }

    #[tokio::test]
    async fn detect_returns_full_snapshot() {
        let service = InferenceService::new(MockModelService { detects: true }, mock_state());

        let result = service.detect(frame()).await.unwrap().into_inner();
        let pose = result.pose.expect("expected a pose");
        assert_eq!(pose.landmarks.len(), LANDMARK_COUNT);
    }

    #[tokio::test]
    async fn detect_reports_missing_pose_as_a_value() {
        let service = InferenceService::new(MockModelService { detects: false }, mock_state());

        let result = service.detect(frame()).await.unwrap().into_inner();
        assert!(result.pose.is_none());
    }

    #[tokio::test]
    async fn landmark_names_come_from_state() {
        let service = InferenceService::new(MockModelService { detects: true }, mock_state());

        let names = service
            .get_landmark_names(Request::new(Empty {}))
            .await
            .unwrap()
            .into_inner()
            .names;
        assert_eq!(names.len(), LANDMARK_COUNT);
        assert_eq!(names[0], "joint_0");
    }
}
