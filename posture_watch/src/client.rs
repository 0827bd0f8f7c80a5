use crate::config::PoseServiceConfig;
use pose_proto::{pose_service_client::PoseServiceClient, Empty, ImageFrame, Landmark};
use posture_core::landmark::LANDMARK_COUNT;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::time::{sleep, timeout, Duration};
use tonic::{
    transport::{Channel, Error},
    Request, Status,
};

#[derive(Error, Debug)]
pub enum PoseClientError {
    #[error("Failed to connect to gRPC server: {0}")]
    ConnectionFailed(#[from] Error),
    #[error("Maximum connection retries exceeded.")]
    MaxRetriesExceeded,
    #[error("gRPC request failed: {0}")]
    GrpcRequestFailed(#[from] Status),
    #[error("Pose service exposes {0} landmarks, expected {expected}", expected = LANDMARK_COUNT)]
    LandmarkRegistryMismatch(usize),
    #[error("Snapshot holds {0} landmarks, expected {expected}", expected = LANDMARK_COUNT)]
    InvalidSnapshot(usize),
}

/// Lean pose-service client for the single-threaded watch loop.
pub struct PoseClient {
    client: PoseServiceClient<Channel>,
    landmark_names: Vec<String>,
}

impl PoseClient {
    pub async fn connect(pose_config: &PoseServiceConfig) -> Result<Self, PoseClientError> {
        let mut client = Self::get_client(pose_config.get_address()).await?;

        let response = client.get_landmark_names(Request::new(Empty {})).await?;
        let names = response.into_inner().names;
        if names.len() != LANDMARK_COUNT {
            return Err(PoseClientError::LandmarkRegistryMismatch(names.len()));
        }

        Ok(Self {
            client,
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

    pub async fn detect(
        &mut self,
        image_data: Vec<u8>,
    ) -> Result<Option<Vec<Landmark>>, PoseClientError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;

        let request = Request::new(ImageFrame {
            image_data,
            timestamp,
        });

        let response = self.client.detect(request).await?;

        match response.into_inner().pose {
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
