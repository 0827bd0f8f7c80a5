use crate::{config::ModelConfig, model_service::ModelService, state::LANDMARK_COUNT};
use image::{imageops::FilterType, GenericImageView};
use ndarray::{Array, Ix4};
use ort::{
    execution_providers::TensorRTExecutionProvider,
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use pose_proto::{DetectionResult, ImageFrame, Landmark, PoseSnapshot};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tonic::{async_trait, Status};

/// Side length of the square model input.
const INPUT_SIZE: usize = 256;
/// Per-landmark fields in the output tensor: x, y, z in input pixels,
/// then visibility and presence logits.
const LANDMARK_FIELDS: usize = 5;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn transform_image_frame(image_frame: &ImageFrame) -> Result<Array<f32, Ix4>, String> {
    let image_data = &image_frame.image_data;

    let image_reader = image::ImageReader::new(std::io::Cursor::new(image_data))
        .with_guessed_format()
        .map_err(|e| format!("Error decoding image: {}", e))?;

    let original_img = image_reader
        .decode()
        .map_err(|e| format!("Error decoding image: {}", e))?;

    let img = original_img.resize_exact(INPUT_SIZE as u32, INPUT_SIZE as u32, FilterType::CatmullRom);

    let mut input = Array::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for pixel in img.pixels() {
        let x = pixel.0 as _;
        let y = pixel.1 as _;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    Ok(input)
}

/// Decodes the flat landmark tensor. Coordinates come out normalized to
/// [0, 1] of the input frame; visibility logits are squashed to scores.
fn parse_landmarks(data: &[f32]) -> Result<Vec<Landmark>, String> {
    if data.len() < LANDMARK_COUNT * LANDMARK_FIELDS {
        return Err(format!(
            "landmark tensor holds {} values, expected at least {}",
            data.len(),
            LANDMARK_COUNT * LANDMARK_FIELDS
        ));
    }

    let landmarks = data
        .chunks_exact(LANDMARK_FIELDS)
        .take(LANDMARK_COUNT)
        .map(|row| Landmark {
            x: row[0] / INPUT_SIZE as f32,
            y: row[1] / INPUT_SIZE as f32,
            z: row[2] / INPUT_SIZE as f32,
            visibility: sigmoid(row[3]),
        })
        .collect();

    Ok(landmarks)
}

#[derive(Clone)]
pub struct OrtModelService {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    min_presence: f32,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, Box<dyn std::error::Error>> {
        ort::init()
            .with_execution_providers([TensorRTExecutionProvider::default()
                .with_engine_cache(true)
                .build()])
            .commit()?;
        let num_instances = model_config.num_instances;
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(model_config.get_path())?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!("Created {} ONNX sessions", num_instances);

        Ok(Self {
            counter: Arc::new(AtomicUsize::new(0)),
            sessions: Arc::new(sessions),
            min_presence: model_config.min_presence,
        })
    }

    /// Runs one inference pass and returns the flat landmark tensor plus the
    /// pose presence score.
    pub fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<(Vec<f32>, f32), Box<Status>> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let session_arc = &self.sessions[index];
        let mut session = session_arc
            .lock()
            .map_err(|e| Status::internal(format!("session mutex poisoned: {}", e)))?;

        tracing::debug!("Handling request with session {}", index);
        let owned_buffer;
        let input_view = if input.view().is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.to_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)
            .map_err(|e| Status::internal(format!("failed to build tensor: {}", e)))?;

        let input_tensor = ort::inputs![tensor_ref];

        let outputs = session
            .run(input_tensor)
            .map_err(|e| Status::internal(format!("inference failed: {}", e)))?;

        let (_, landmark_data) = outputs["landmarks"]
            .try_extract_tensor::<f32>()
            .map_err(|e| Status::internal(format!("failed to extract landmark tensor: {}", e)))?;

        let (_, presence_data) = outputs["presence"]
            .try_extract_tensor::<f32>()
            .map_err(|e| Status::internal(format!("failed to extract presence tensor: {}", e)))?;

        let presence = presence_data
            .first()
            .copied()
            .ok_or_else(|| Status::internal("presence tensor is empty"))?;

        Ok((landmark_data.to_vec(), presence))
    }
}

#[async_trait]
impl ModelService for OrtModelService {
    async fn detect(&self, frame: ImageFrame) -> Result<DetectionResult, Status> {
        let input = match transform_image_frame(&frame) {
            Ok(input) => input,
            Err(err) => {
                return Err(Status::invalid_argument(format!(
                    "Image transformation error: {}",
                    err
                )))
            }
        };

        let (landmark_data, presence) = match self.run_inference(&input) {
            Ok(outputs) => outputs,
            Err(err) => return Err(*err),
        };

        if presence < self.min_presence {
            tracing::debug!("No pose in frame (presence {:.3})", presence);
            return Ok(DetectionResult { pose: None });
        }

        let landmarks = parse_landmarks(&landmark_data).map_err(Status::internal)?;

        Ok(DetectionResult {
            pose: Some(PoseSnapshot { landmarks }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    #[test]
    fn test_transform_image_frame() {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(100, 100, Rgb([255, 0, 0]));
        let mut image_data: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut image_data);
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();

        let image_frame = ImageFrame {
            image_data: cursor.get_ref().to_vec(),
            timestamp: 0,
        };

        let input = transform_image_frame(&image_frame).unwrap();

        assert_eq!(input.shape(), &[1, 3, 256, 256]);
        // Solid red input: full red channel, empty green and blue.
        assert_eq!(input[[0, 0, 128, 128]], 1.0);
        assert_eq!(input[[0, 1, 128, 128]], 0.0);
        assert_eq!(input[[0, 2, 128, 128]], 0.0);
    }

    #[test]
    fn test_transform_rejects_garbage() {
        let image_frame = ImageFrame {
            image_data: vec![0, 1, 2, 3],
            timestamp: 0,
        };
        assert!(transform_image_frame(&image_frame).is_err());
    }

    #[test]
    fn test_parse_landmarks() {
        let mut data = vec![0.0f32; LANDMARK_COUNT * LANDMARK_FIELDS];
        // Landmark 8: x=128, y=64, z=0, visibility logit 0 -> 0.5.
        let row = 8 * LANDMARK_FIELDS;
        data[row] = 128.0;
        data[row + 1] = 64.0;
        data[row + 3] = 0.0;

        let landmarks = parse_landmarks(&data).unwrap();
        assert_eq!(landmarks.len(), LANDMARK_COUNT);
        assert_eq!(landmarks[8].x, 0.5);
        assert_eq!(landmarks[8].y, 0.25);
        assert_eq!(landmarks[8].visibility, 0.5);
    }

    #[test]
    fn test_parse_landmarks_truncated_tensor() {
        let data = vec![0.0f32; 12];
        assert!(parse_landmarks(&data).is_err());
    }

    #[test]
    fn test_parse_landmarks_ignores_auxiliary_rows() {
        // Exported models append auxiliary rows past the 33 real joints.
        let data = vec![0.0f32; (LANDMARK_COUNT + 6) * LANDMARK_FIELDS];
        let landmarks = parse_landmarks(&data).unwrap();
        assert_eq!(landmarks.len(), LANDMARK_COUNT);
    }

    #[test]
    fn test_sigmoid_bounds() {
        assert!(sigmoid(-20.0) < 1e-6);
        assert!(sigmoid(20.0) > 1.0 - 1e-6);
        assert_eq!(sigmoid(0.0), 0.5);
    }
}
