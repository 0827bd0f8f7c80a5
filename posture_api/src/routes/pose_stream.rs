use crate::{analysis::analyze_frame, server::SharedState};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum StreamFrameError {
    #[error("frame is not a data URL")]
    MissingPrefix,
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Upgrades to a WebSocket that accepts data-URL encoded frames and answers
/// one JSON verdict per frame, in arrival order.
#[instrument(skip(ws, state))]
pub async fn pose_stream(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: SharedState) {
    tracing::info!("Posture stream opened");
    let mut last_frame: Option<Instant> = None;

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Stream transport error: {:?}", e);
                break;
            }
        };

        let frame = match message {
            Message::Text(frame) => frame,
            Message::Close(_) => break,
            // Pings are answered by the library; nothing else is expected.
            _ => continue,
        };

        let image_data = match decode_data_url(frame.as_str()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Closing stream on undecodable frame: {}", e);
                break;
            }
        };

        state.metrics.record_request("pose_stream");
        let started = Instant::now();
        let analysis =
            match analyze_frame(state.pose_client.as_ref(), &state.policy, image_data).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    tracing::error!("Closing stream on detection failure: {}", e);
                    break;
                }
            };
        state
            .metrics
            .record_detection_duration(started.elapsed().as_millis() as u64, "pose_stream");

        if let Some(previous) = last_frame.replace(started) {
            let dt = started.duration_since(previous).as_secs_f64();
            if dt > 0.0 {
                state.metrics.record_stream_fps(1.0 / dt);
            }
        }

        let payload = match serde_json::to_string(&analysis) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to serialize analysis: {}", e);
                break;
            }
        };

        if socket.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
    }

    tracing::info!("Posture stream closed");
}

fn decode_data_url(frame: &str) -> Result<Vec<u8>, StreamFrameError> {
    let (_prefix, payload) = frame
        .split_once(',')
        .ok_or(StreamFrameError::MissingPrefix)?;
    Ok(STANDARD.decode(payload.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_data_url_frame() {
        let payload = STANDARD.encode(b"jpegbytes");
        let frame = format!("data:image/jpeg;base64,{payload}");
        assert_eq!(decode_data_url(&frame).unwrap(), b"jpegbytes");
    }

    #[test]
    fn rejects_a_frame_without_a_prefix() {
        let payload = STANDARD.encode(b"jpegbytes");
        assert!(matches!(
            decode_data_url(&payload),
            Err(StreamFrameError::MissingPrefix)
        ));
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(
            decode_data_url("data:image/jpeg;base64,???"),
            Err(StreamFrameError::InvalidBase64(_))
        ));
    }
}
