use crate::client::{PoseClient, PoseClientError};
use pose_proto::Landmark;
use posture_core::landmark::{RIGHT_EAR, RIGHT_SHOULDER};
use posture_core::{neck_angle, Point2, PosturePolicy};
use serde::Serialize;
use tonic::async_trait;

/// Seam over the pose service so the dispatcher can be exercised without a
/// live gRPC backend.
#[async_trait]
pub trait PoseDetector: Send + Sync + 'static {
    async fn detect(&self, image_data: Vec<u8>) -> Result<Option<Vec<Landmark>>, PoseClientError>;
}

#[async_trait]
impl PoseDetector for PoseClient {
    async fn detect(&self, image_data: Vec<u8>) -> Result<Option<Vec<Landmark>>, PoseClientError> {
        PoseClient::detect(self, image_data).await
    }
}

#[derive(Debug, Serialize)]
pub struct LandmarkDto {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

impl From<&Landmark> for LandmarkDto {
    fn from(lm: &Landmark) -> Self {
        Self {
            x: lm.x,
            y: lm.y,
            z: lm.z,
            visibility: lm.visibility,
        }
    }
}

/// One frame's outcome. The two variants are mutually exclusive: a frame
/// either yields a verdict or the no-detection marker, never both.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FrameAnalysis {
    Posture {
        angle: f32,
        status: String,
        is_good: bool,
        landmarks: Vec<LandmarkDto>,
    },
    NoDetection {
        error: String,
    },
}

impl FrameAnalysis {
    fn no_detection() -> Self {
        FrameAnalysis::NoDetection {
            error: "No pose detected".to_string(),
        }
    }
}

/// Runs one image through detection and classification. A failed detection
/// is reported as-is; the caller supplies the next frame.
pub async fn analyze_frame<D: PoseDetector>(
    detector: &D,
    policy: &PosturePolicy,
    image_data: Vec<u8>,
) -> Result<FrameAnalysis, PoseClientError> {
    let landmarks = match detector.detect(image_data).await? {
        Some(landmarks) => landmarks,
        None => return Ok(FrameAnalysis::no_detection()),
    };

    let shoulder = &landmarks[RIGHT_SHOULDER];
    let ear = &landmarks[RIGHT_EAR];
    let angle = neck_angle(
        Point2::new(shoulder.x, shoulder.y),
        Point2::new(ear.x, ear.y),
    );
    let verdict = policy.classify(angle);

    Ok(FrameAnalysis::Posture {
        angle,
        status: verdict.label.to_string(),
        is_good: verdict.is_good,
        landmarks: landmarks.iter().map(LandmarkDto::from).collect(),
    })
}
