use crate::{
    analysis::analyze_frame,
    client::PoseClientError,
    server::SharedState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::time::Instant;
use thiserror::Error;
use tonic::Code;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum ProcessImageError {
    #[error("Pose service failed: {0}")]
    PoseService(#[from] PoseClientError),
}

impl IntoResponse for ProcessImageError {
    fn into_response(self) -> Response {
        let status = match &self {
            // The pose service rejects undecodable images; that is the
            // caller's fault, not ours.
            ProcessImageError::PoseService(PoseClientError::GrpcRequestFailed(grpc))
                if grpc.code() == Code::InvalidArgument =>
            {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, format!("Something went wrong: {}", self)).into_response()
    }
}

#[instrument(skip(state, image_data))]
pub async fn process_image(
    State(state): State<SharedState>,
    image_data: Bytes,
) -> Result<Response, ProcessImageError> {
    state.metrics.record_request("process_image");

    let started = Instant::now();
    let analysis = analyze_frame(
        state.pose_client.as_ref(),
        &state.policy,
        image_data.to_vec(),
    )
    .await?;
    state
        .metrics
        .record_detection_duration(started.elapsed().as_millis() as u64, "process_image");

    Ok(Json(analysis).into_response())
}
