//! Simulator recording parser.
//!
//! The simulator's training mode writes `robot_log.csv`: one row per camera
//! frame, semicolon separated, with a header naming the columns. Only the
//! columns used for replay are required; their order is taken from the
//! header.

use std::path::{Path, PathBuf};

use prospector_types::{Pose, ProspectorError, Telemetry};

const REQUIRED_COLUMNS: [&str; 7] = [
    "Path",
    "Speed",
    "X_Position",
    "Y_Position",
    "Pitch",
    "Yaw",
    "Roll",
];

/// One recorded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Image path as written by the simulator.
    pub path: String,
    pub speed: f32,
    pub pose: Pose,
    /// Steering the human driver applied, when recorded.
    pub recorded_steer: Option<f32>,
}

impl LogRecord {
    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            pose: self.pose,
            vel: self.speed,
            near_sample: false,
            picking_up: false,
        }
    }

    /// Where to load the frame from.
    ///
    /// With `frames_dir`, only the file name of the recorded path is kept.
    /// Otherwise relative paths are resolved against the log's directory.
    pub fn frame_path(&self, log_dir: &Path, frames_dir: Option<&Path>) -> PathBuf {
        let recorded = Path::new(&self.path);
        match frames_dir {
            Some(dir) => dir.join(recorded.file_name().unwrap_or(recorded.as_os_str())),
            None if recorded.is_relative() => log_dir.join(recorded),
            None => recorded.to_path_buf(),
        }
    }
}

/// Parse a whole recording. Blank lines are skipped.
///
/// # Errors
///
/// [`ProspectorError::InvalidConfig`] naming the log when the header lacks a
/// required column or a row has a malformed number.
pub fn parse_log(text: &str, source: &str) -> Result<Vec<LogRecord>, ProspectorError> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let Some((_, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<&str> = header.split(';').map(str::trim).collect();
    let index_of = |name: &str| columns.iter().position(|c| *c == name);

    let mut idx = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = index_of(name).ok_or_else(|| {
            ProspectorError::invalid_config(source, format!("missing column `{name}`"))
        })?;
    }
    let [path_i, speed_i, x_i, y_i, pitch_i, yaw_i, roll_i] = idx;
    let steer_i = index_of("SteerAngle");

    lines
        .map(|(lineno, line)| {
            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            let num = |i: usize, name: &str| -> Result<f32, ProspectorError> {
                let raw = fields.get(i).copied().unwrap_or("");
                raw.parse().map_err(|_| {
                    ProspectorError::invalid_config(
                        format!("{source}:{}", lineno + 1),
                        format!("`{name}` is not a number: {raw:?}"),
                    )
                })
            };
            Ok(LogRecord {
                path: fields.get(path_i).copied().unwrap_or("").to_string(),
                speed: num(speed_i, "Speed")?,
                pose: Pose {
                    x: num(x_i, "X_Position")?,
                    y: num(y_i, "Y_Position")?,
                    yaw: num(yaw_i, "Yaw")?,
                    pitch: num(pitch_i, "Pitch")?,
                    roll: num(roll_i, "Roll")?,
                },
                recorded_steer: steer_i.and_then(|i| fields.get(i)?.parse().ok()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
Path;SteerAngle;Throttle;Brake;Speed;X_Position;Y_Position;Pitch;Yaw;Roll
/home/sim/IMG/robocam_2017_05_02_11_16_20_870.jpg;0;0;1;0;99.66999;85.58897;0.0;56.82556;359.9996
/home/sim/IMG/robocam_2017_05_02_11_16_20_956.jpg;-1.5;0.2;0;0.3;99.67;85.59;0.2;56.8;0.1

";

    #[test]
    fn parses_simulator_log() {
        let records = parse_log(LOG, "robot_log.csv").unwrap();
        assert_eq!(records.len(), 2);
        let r = &records[0];
        assert!(r.path.ends_with("robocam_2017_05_02_11_16_20_870.jpg"));
        assert!((r.pose.x - 99.66999).abs() < 1e-4);
        assert!((r.pose.yaw - 56.82556).abs() < 1e-4);
        assert!((r.pose.roll - 359.9996).abs() < 1e-3);
        assert_eq!(r.speed, 0.0);
        assert_eq!(records[1].recorded_steer, Some(-1.5));
        assert_eq!(records[1].telemetry().vel, 0.3);
    }

    #[test]
    fn column_order_comes_from_header() {
        let log = "Yaw;Roll;Pitch;Speed;Y_Position;X_Position;Path\n10;0;0;1.5;20;30;img.jpg\n";
        let r = &parse_log(log, "log").unwrap()[0];
        assert_eq!(r.pose, Pose { x: 30.0, y: 20.0, yaw: 10.0, pitch: 0.0, roll: 0.0 });
        assert_eq!(r.recorded_steer, None);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = parse_log("Path;Speed\nimg.jpg;1\n", "log").unwrap_err();
        assert!(err.to_string().contains("X_Position"));
    }

    #[test]
    fn bad_number_reports_line() {
        let log = "Path;Speed;X_Position;Y_Position;Pitch;Yaw;Roll\na.jpg;fast;0;0;0;0;0\n";
        let err = parse_log(log, "log").unwrap_err();
        assert!(err.to_string().contains("log:2"));
    }

    #[test]
    fn empty_log_has_no_records() {
        assert!(parse_log("", "log").unwrap().is_empty());
    }

    #[test]
    fn frame_path_resolution() {
        let r = LogRecord {
            path: "/home/sim/IMG/a.jpg".to_string(),
            speed: 0.0,
            pose: Pose::default(),
            recorded_steer: None,
        };
        let log_dir = Path::new("/data/run1");
        assert_eq!(r.frame_path(log_dir, None), PathBuf::from("/home/sim/IMG/a.jpg"));
        assert_eq!(
            r.frame_path(log_dir, Some(Path::new("/data/run1/IMG"))),
            PathBuf::from("/data/run1/IMG/a.jpg")
        );

        let rel = LogRecord {
            path: "IMG/b.jpg".to_string(),
            ..r
        };
        assert_eq!(rel.frame_path(log_dir, None), PathBuf::from("/data/run1/IMG/b.jpg"));
    }
}
