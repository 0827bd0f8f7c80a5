use crate::{
    alert::AlertPlayer,
    camera::{encode_frame_to_jpg, Camera},
    client::PoseClient,
    config::Config,
    overlay,
};
use opencv::{highgui, prelude::*};
use posture_core::landmark::{RIGHT_EAR, RIGHT_SHOULDER};
use posture_core::{neck_angle, AlertTimer, Point2};
use std::time::Instant;

const WINDOW_NAME: &str = "Posture Watch";
const QUIT_KEY: i32 = b'q' as i32;

pub async fn run_watch(config: Config) -> anyhow::Result<()> {
    let mut client = PoseClient::connect(&config.pose_service).await?;
    tracing::info!(
        "Pose service reports {} landmarks",
        client.landmark_names().len()
    );
    let ear_label = client.landmark_names()[RIGHT_EAR].clone();
    let shoulder_label = client.landmark_names()[RIGHT_SHOULDER].clone();

    let policy = config.posture.policy()?;
    let mut timer = AlertTimer::new(config.alert.threshold(), config.alert.cooldown());
    let player = AlertPlayer::new(config.alert.sound_file.clone());

    let mut camera = Camera::open(config.camera.device_index)?;
    highgui::named_window(WINDOW_NAME, highgui::WINDOW_AUTOSIZE)?;

    loop {
        let mut frame = match camera.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Failed to capture video: {}", e);
                break;
            }
        };
        if frame.empty() {
            tracing::error!("Camera returned an empty frame, stopping");
            break;
        }

        let image_data = encode_frame_to_jpg(&frame)?;
        match client.detect(image_data).await {
            Ok(Some(landmarks)) => {
                let shoulder = &landmarks[RIGHT_SHOULDER];
                let ear = &landmarks[RIGHT_EAR];
                let angle = neck_angle(
                    Point2::new(shoulder.x, shoulder.y),
                    Point2::new(ear.x, ear.y),
                );
                let verdict = policy.classify(angle);

                let now = Instant::now();
                if timer.observe(&verdict, now) {
                    match player.dispatch() {
                        Ok(()) => timer.mark_alerted(now),
                        Err(e) => tracing::warn!("Error playing sound: {}", e),
                    }
                }

                overlay::draw_pose(&mut frame, &landmarks, (&ear_label, &shoulder_label))?;
                overlay::draw_status(&mut frame, &verdict, angle, timer.bad_duration(now))?;
            }
            Ok(None) => {
                overlay::draw_no_detection(&mut frame)?;
            }
            Err(e) => {
                // A single failed detection only costs this frame; the
                // streak timer keeps its state.
                tracing::warn!("Pose detection failed: {}", e);
            }
        }

        highgui::imshow(WINDOW_NAME, &frame)?;
        if highgui::wait_key(1)? == QUIT_KEY {
            break;
        }
    }

    highgui::destroy_all_windows()?;
    Ok(())
}
