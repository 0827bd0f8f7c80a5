use opencv::{
    core::{Mat, Vector},
    imgcodecs,
    prelude::*,
    videoio,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera {0}")]
    OpenCameraFailed(i32),
    #[error("Failed to read frame: {0}")]
    ReadFrameFailed(opencv::Error),
    #[error("Failed to encode frame: {0}")]
    EncodeFrameFailed(opencv::Error),
    #[error("OpenCV error: {0}")]
    OpenCvError(#[from] opencv::Error),
}

pub struct Camera {
    capture: videoio::VideoCapture,
}

impl Camera {
    pub fn open(device_index: i32) -> Result<Self, CameraError> {
        let capture = videoio::VideoCapture::new(device_index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(CameraError::OpenCameraFailed(device_index));
        }
        Ok(Self { capture })
    }

    pub fn read_frame(&mut self) -> Result<Mat, CameraError> {
        let mut frame = Mat::default();
        self.capture
            .read(&mut frame)
            .map_err(CameraError::ReadFrameFailed)?;
        Ok(frame)
    }
}

pub fn encode_frame_to_jpg(frame: &Mat) -> Result<Vec<u8>, CameraError> {
    let mut buf = Vector::<u8>::new();
    imgcodecs::imencode(".jpg", frame, &mut buf, &Vector::new())
        .map_err(CameraError::EncodeFrameFailed)?;
    Ok(buf.into())
}
