//! Sensor data snapshot handed to the gait analyser every tick

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FesResult;
use crate::stimlog::PersistError;

/// Body side a gait phase is estimated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, in the order they are queried
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

/// One frame of raw gait sensor values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Seconds since the session origin
    pub time: f64,
    pub left: Vec<f64>,
    pub right: Vec<f64>,
}

impl SensorFrame {
    pub fn side(&self, side: Side) -> &[f64] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Ordered sensor frames collected so far in a session.
///
/// The decision layer never looks inside; only the gait analyser does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSnapshot {
    frames: Vec<SensorFrame>,
}

impl DataSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frames(frames: Vec<SensorFrame>) -> Self {
        Self { frames }
    }

    pub fn append(&mut self, frame: SensorFrame) {
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[SensorFrame] {
        &self.frames
    }

    pub fn latest(&self) -> Option<&SensorFrame> {
        self.frames.last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drop all but the newest `count` frames
    pub fn retain_last(&mut self, count: usize) {
        let excess = self.frames.len().saturating_sub(count);
        self.frames.drain(..excess);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Archive the raw frames as JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> FesResult<()> {
        let json = serde_json::to_vec(self).map_err(|e| PersistError::Malformed(e.to_string()))?;
        fs::write(path, json).map_err(PersistError::from)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> FesResult<Self> {
        let bytes = fs::read(path).map_err(PersistError::from)?;
        let snapshot = serde_json::from_slice(&bytes).map_err(|e| PersistError::Malformed(e.to_string()))?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(time: f64) -> SensorFrame {
        SensorFrame {
            time,
            left: vec![time, 1.0],
            right: vec![-time],
        }
    }

    #[test]
    fn test_snapshot_append_and_latest() {
        let mut snapshot = DataSnapshot::new();
        assert!(snapshot.is_empty());
        assert!(snapshot.latest().is_none());

        snapshot.append(frame(0.001));
        snapshot.append(frame(0.002));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.latest().unwrap().time, 0.002);
        assert_eq!(snapshot.latest().unwrap().side(Side::Right), &[-0.002]);
    }

    #[test]
    fn test_retain_last() {
        let mut snapshot = DataSnapshot::from_frames((0..5).map(|i| frame(i as f64)).collect());
        snapshot.retain_last(2);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.frames()[0].time, 3.0);

        snapshot.retain_last(10);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_snapshot_json_archive() {
        let snapshot = DataSnapshot::from_frames(vec![frame(0.5), frame(0.75)]);
        let file = tempfile::NamedTempFile::new().unwrap();

        snapshot.save_json(file.path()).unwrap();
        let loaded = DataSnapshot::load_json(file.path()).unwrap();

        assert_eq!(loaded, snapshot);
    }
}
