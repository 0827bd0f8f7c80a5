use crate::config::PoseServiceConfig;
use pose_proto::{pose_service_client::PoseServiceClient, Empty, ImageFrame, Landmark};
use posture_core::landmark::{LANDMARK_COUNT, RIGHT_EAR, RIGHT_SHOULDER};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::{
    sync::Mutex,
    time::{sleep, timeout, Duration},
};
use tonic::{
    transport::{Channel, Error},
    Request, Status,
};
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PoseClientError {
    #[error("Failed to connect to gRPC server: {0}")]
    ConnectionFailed(#[from] Error),
    #[error("Maximum connection retries exceeded.")]
    MaxRetriesExceeded,
    #[error("gRPC request failed: {0}")]
    GrpcRequestFailed(#[from] Status),
    #[error("Pose service landmark registry mismatch: {0}")]
    LandmarkRegistryMismatch(String),
    #[error("Snapshot holds {0} landmarks, expected {expected}", expected = LANDMARK_COUNT)]
    InvalidSnapshot(usize),
}

pub struct PoseClient {
    client: Mutex<PoseServiceClient<Channel>>,
    landmark_names: Vec<String>,
}

impl PoseClient {
    pub async fn new(pose_config: &PoseServiceConfig) -> Result<Self, PoseClientError> {
        let mut client = Self::get_client(pose_config.get_address()).await?;

        // The registry is fixed per model, so one fetch at startup both
        // caches it and proves the service speaks the expected joint set.
        let request = Request::new(Empty {});
        let response = client.get_landmark_names(request).await?;
        let names = response.into_inner().names;
        validate_registry(&names)?;

        Ok(Self {
            client: Mutex::new(client),
            landmark_names: names,
        })
    }

    async fn get_client(address: String) -> Result<PoseServiceClient<Channel>, PoseClientError> {
        let mut retry_delay = Duration::from_millis(50);
        let max_retry_delay = Duration::from_secs(1);
        let max_retries = 10;
        let mut retry_count = 0;

        while retry_count < max_retries {
            match timeout(
                Duration::from_secs(1),
                PoseServiceClient::connect(address.clone()),
            )
            .await
            {
                Ok(Ok(client)) => return Ok(client),
                Ok(Err(e)) => {
                    tracing::error!("Failed to connect to gRPC server: {:?}", e);
                }
                Err(_) => {
                    tracing::error!("Connection timeout");
                }
            }

            retry_count += 1;
            let jitter = rand::random::<f32>() * 0.2 + 0.9;
            sleep(retry_delay.mul_f32(jitter)).await;
            retry_delay = (retry_delay * 2).min(max_retry_delay);
        }

        Err(PoseClientError::MaxRetriesExceeded)
    }

    pub fn landmark_names(&self) -> &[String] {
        &self.landmark_names
    }

    /// Runs pose estimation on one encoded image. `None` means no person was
    /// found; a present snapshot always carries the full landmark set.
    #[instrument(skip(self, image_data))]
    pub async fn detect(&self, image_data: Vec<u8>) -> Result<Option<Vec<Landmark>>, PoseClientError> {
        let mut client = self.client.lock().await;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;

        let request = Request::new(ImageFrame {
            image_data,
            timestamp,
        });

        let response = client.detect(request).await?;
        let pose = response.into_inner().pose;

        match pose {
            Some(snapshot) => {
                if snapshot.landmarks.len() != LANDMARK_COUNT {
                    return Err(PoseClientError::InvalidSnapshot(snapshot.landmarks.len()));
                }
                Ok(Some(snapshot.landmarks))
            }
            None => Ok(None),
        }
    }
}

fn validate_registry(names: &[String]) -> Result<(), PoseClientError> {
    if names.len() != LANDMARK_COUNT {
        return Err(PoseClientError::LandmarkRegistryMismatch(format!(
            "{} names, expected {}",
            names.len(),
            LANDMARK_COUNT
        )));
    }
    for (index, expected) in [(RIGHT_EAR, "right_ear"), (RIGHT_SHOULDER, "right_shoulder")] {
        if names[index] != expected {
            return Err(PoseClientError::LandmarkRegistryMismatch(format!(
                "index {} is {:?}, expected {:?}",
                index, names[index], expected
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Vec<String> {
        let mut names: Vec<String> = (0..LANDMARK_COUNT).map(|i| format!("joint_{i}")).collect();
        names[RIGHT_EAR] = "right_ear".into();
        names[RIGHT_SHOULDER] = "right_shoulder".into();
        names
    }

    #[test]
    fn accepts_the_expected_registry() {
        assert!(validate_registry(&registry()).is_ok());
    }

    #[test]
    fn rejects_wrong_arity() {
        let mut names = registry();
        names.pop();
        assert!(validate_registry(&names).is_err());
    }

    #[test]
    fn rejects_misplaced_joints() {
        let mut names = registry();
        names.swap(RIGHT_EAR, RIGHT_SHOULDER);
        assert!(validate_registry(&names).is_err());
    }
}
