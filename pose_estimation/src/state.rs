use crate::config::LandmarksConfig;
use std::{
    fs::File,
    io::{self, BufRead},
    path::PathBuf,
};

/// Number of joints in one snapshot. The landmark model always emits the
/// full set when it detects a person.
pub const LANDMARK_COUNT: usize = 33;

pub trait State: Send + Sync + 'static {
    fn new(landmarks_cfg: &LandmarksConfig) -> Result<Self, String>
    where
        Self: Sized;
    fn landmark_names(&self) -> &Vec<String>;
}

#[derive(Debug)]
pub struct ServiceState {
    landmark_names: Vec<String>,
}

impl State for ServiceState {
    fn new(landmarks_cfg: &LandmarksConfig) -> Result<ServiceState, String> {
        let names = load_landmark_names(&landmarks_cfg.get_path())
            .map_err(|e| format!("Failed to load landmark names: {}", e))?;

        if names.len() != LANDMARK_COUNT {
            return Err(format!(
                "Landmark registry holds {} names, expected {}",
                names.len(),
                LANDMARK_COUNT
            ));
        }

        Ok(ServiceState {
            landmark_names: names,
        })
    }

    fn landmark_names(&self) -> &Vec<String> {
        &self.landmark_names
    }
}

pub fn load_landmark_names(filepath: &PathBuf) -> io::Result<Vec<String>> {
    let file = File::open(filepath)?;
    let reader = io::BufReader::new(file);
    let mut names = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let name = line.trim();
        if name.is_empty() {
            continue;
        }
        if name.contains(char::is_whitespace) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid landmark name: {}", name),
            ));
        }
        names.push(name.to_string());
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_one_name_per_line() {
        let dir = std::env::temp_dir();
        let path = dir.join("pose_landmark_names_test.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "nose\nleft_ear\n\nright_ear").unwrap();

        let names = load_landmark_names(&path).unwrap();
        assert_eq!(names, vec!["nose", "left_ear", "right_ear"]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_names_with_whitespace() {
        let dir = std::env::temp_dir();
        let path = dir.join("pose_landmark_names_bad_test.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "left ear").unwrap();

        assert!(load_landmark_names(&path).is_err());

        std::fs::remove_file(&path).ok();
    }
}
