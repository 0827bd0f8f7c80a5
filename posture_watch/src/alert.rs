use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("A previous alert is still playing")]
    PlaybackInFlight,
    #[error("Failed to open sound file {path:?}: {source}")]
    SoundFileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Audio output unavailable: {0}")]
    AudioDevice(#[from] rodio::StreamError),
    #[error("Audio sink failed: {0}")]
    Sink(#[from] rodio::PlayError),
    #[error("Failed to decode sound asset: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
}

/// Plays the alert sound off the frame loop, at most one playback at a
/// time.
pub struct AlertPlayer {
    sound_file: PathBuf,
    in_flight: Arc<AtomicBool>,
}

impl AlertPlayer {
    pub fn new(sound_file: PathBuf) -> Self {
        Self {
            sound_file,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Dispatches one playback on a blocking task. The asset is opened
    /// before the dispatch counts as successful, so a missing file fails
    /// here and the caller can retry on the next frame.
    pub fn dispatch(&self) -> Result<(), AlertError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(AlertError::PlaybackInFlight);
        }

        let file = match File::open(&self.sound_file) {
            Ok(file) => file,
            Err(source) => {
                self.in_flight.store(false, Ordering::SeqCst);
                return Err(AlertError::SoundFileUnavailable {
                    path: self.sound_file.clone(),
                    source,
                });
            }
        };

        let in_flight = self.in_flight.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = play_to_end(file) {
                tracing::warn!("Alert playback failed: {}", e);
            }
            in_flight.store(false, Ordering::SeqCst);
        });

        Ok(())
    }
}

fn play_to_end(file: File) -> Result<(), AlertError> {
    let (_stream, handle) = rodio::OutputStream::try_default()?;
    let sink = rodio::Sink::try_new(&handle)?;
    sink.append(rodio::Decoder::new(BufReader::new(file))?);
    sink.sleep_until_end();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_asset_fails_dispatch_and_clears_the_guard() {
        let player = AlertPlayer::new(PathBuf::from("/nonexistent/soft-alert.mp3"));

        assert!(matches!(
            player.dispatch(),
            Err(AlertError::SoundFileUnavailable { .. })
        ));
        assert!(!player.in_flight.load(Ordering::SeqCst));
        // The guard did not stick: a retry reaches the file open again.
        assert!(matches!(
            player.dispatch(),
            Err(AlertError::SoundFileUnavailable { .. })
        ));
    }

    #[test]
    fn a_playback_in_flight_rejects_new_dispatches() {
        let player = AlertPlayer::new(PathBuf::from("/nonexistent/soft-alert.mp3"));
        player.in_flight.store(true, Ordering::SeqCst);

        assert!(matches!(
            player.dispatch(),
            Err(AlertError::PlaybackInFlight)
        ));
        // Only the running playback may clear the guard.
        assert!(player.in_flight.load(Ordering::SeqCst));
    }
}
