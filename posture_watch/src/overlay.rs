use opencv::{
    core::{Mat, Point, Scalar},
    imgproc,
    prelude::*,
};
use pose_proto::Landmark;
use posture_core::landmark::{RIGHT_EAR, RIGHT_SHOULDER};
use posture_core::Verdict;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("OpenCV error: {0}")]
    OpenCvError(#[from] opencv::Error),
}

/// Joint connection topology of the 33-landmark pose model.
const SKELETON: [(usize, usize); 35] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

fn good_color() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn bad_color() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

fn text_color() -> Scalar {
    Scalar::new(255.0, 255.0, 255.0, 0.0)
}

fn to_point(landmark: &Landmark, width: f32, height: f32) -> Point {
    Point::new(
        (landmark.x * width).round() as i32,
        (landmark.y * height).round() as i32,
    )
}

/// Draws the detected skeleton and labels the two joints the posture signal
/// is derived from, using the names the service reports.
pub fn draw_pose(
    frame: &mut Mat,
    landmarks: &[Landmark],
    joint_labels: (&str, &str),
) -> Result<(), OverlayError> {
    let width = frame.cols() as f32;
    let height = frame.rows() as f32;

    for &(a, b) in SKELETON.iter() {
        imgproc::line(
            frame,
            to_point(&landmarks[a], width, height),
            to_point(&landmarks[b], width, height),
            text_color(),
            1,
            imgproc::LINE_AA,
            0,
        )?;
    }

    for landmark in landmarks {
        imgproc::circle(
            frame,
            to_point(landmark, width, height),
            3,
            good_color(),
            imgproc::FILLED,
            imgproc::LINE_AA,
            0,
        )?;
    }

    let (ear_label, shoulder_label) = joint_labels;
    for (index, label) in [(RIGHT_EAR, ear_label), (RIGHT_SHOULDER, shoulder_label)] {
        let at = to_point(&landmarks[index], width, height);
        imgproc::put_text(
            frame,
            label,
            Point::new(at.x + 5, at.y - 5),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.4,
            text_color(),
            1,
            imgproc::LINE_AA,
            false,
        )?;
    }

    Ok(())
}

pub fn draw_status(
    frame: &mut Mat,
    verdict: &Verdict,
    angle: f32,
    bad_duration: Option<Duration>,
) -> Result<(), OverlayError> {
    let status_color = if verdict.is_good {
        good_color()
    } else {
        bad_color()
    };

    imgproc::put_text(
        frame,
        &format!("Status: {}", verdict.label),
        Point::new(10, 30),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        status_color,
        2,
        imgproc::LINE_AA,
        false,
    )?;

    imgproc::put_text(
        frame,
        &format!("Neck Angle: {:.2}", angle),
        Point::new(10, 60),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        text_color(),
        2,
        imgproc::LINE_AA,
        false,
    )?;

    if let Some(duration) = bad_duration {
        imgproc::put_text(
            frame,
            &format!("Bad Posture Time: {}s", duration.as_secs()),
            Point::new(10, 90),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            bad_color(),
            2,
            imgproc::LINE_AA,
            false,
        )?;
    }

    Ok(())
}

pub fn draw_no_detection(frame: &mut Mat) -> Result<(), OverlayError> {
    imgproc::put_text(
        frame,
        "Status: No pose detected",
        Point::new(10, 30),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        text_color(),
        2,
        imgproc::LINE_AA,
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use posture_core::landmark::LANDMARK_COUNT;

    #[test]
    fn skeleton_edges_stay_inside_the_landmark_set() {
        for &(a, b) in SKELETON.iter() {
            assert!(a < LANDMARK_COUNT);
            assert!(b < LANDMARK_COUNT);
            assert_ne!(a, b);
        }
    }

    #[test]
    fn landmarks_map_to_pixel_coordinates() {
        let landmark = Landmark {
            x: 0.5,
            y: 0.25,
            z: 0.0,
            visibility: 1.0,
        };
        let point = to_point(&landmark, 640.0, 480.0);
        assert_eq!(point, Point::new(320, 120));
    }
}
