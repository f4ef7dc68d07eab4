//! Per-channel stimulation commands

use serde::{Deserialize, Serialize};

/// What a channel should do this tick.
///
/// A decision slot is `Option<Command>`; `None` keeps the channel in
/// whatever state it is already in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Start and stop automatically after the given number of seconds (> 0)
    Start(f64),
    /// Start until an explicit [`Command::Stop`]
    StartIndefinite,
    Stop,
}

impl Command {
    /// Encode a decision slot in the numeric form drivers expect:
    /// `None` no change, `0` indefinite start, positive timed start,
    /// negative stop.
    pub fn to_legacy(slot: Option<Command>) -> Option<f64> {
        slot.map(|command| match command {
            Command::Start(duration) => duration,
            Command::StartIndefinite => 0.0,
            Command::Stop => -1.0,
        })
    }

    /// Decode the numeric form. NaN is not a valid command and decodes to `None`.
    pub fn from_legacy(value: Option<f64>) -> Option<Command> {
        match value {
            Some(v) if v == 0.0 => Some(Command::StartIndefinite),
            Some(v) if v > 0.0 => Some(Command::Start(v)),
            Some(v) if v < 0.0 => Some(Command::Stop),
            _ => None,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, Command::Start(_) | Command::StartIndefinite)
    }

    /// Duration carried by a timed start
    pub fn duration(&self) -> Option<f64> {
        match self {
            Command::Start(duration) => Some(*duration),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_encoding() {
        assert_eq!(Command::to_legacy(None), None);
        assert_eq!(Command::to_legacy(Some(Command::StartIndefinite)), Some(0.0));
        assert_eq!(Command::to_legacy(Some(Command::Start(0.4))), Some(0.4));
        assert!(Command::to_legacy(Some(Command::Stop)).unwrap() < 0.0);
    }

    #[test]
    fn test_legacy_decoding() {
        assert_eq!(Command::from_legacy(None), None);
        assert_eq!(Command::from_legacy(Some(0.0)), Some(Command::StartIndefinite));
        assert_eq!(Command::from_legacy(Some(1.5)), Some(Command::Start(1.5)));
        assert_eq!(Command::from_legacy(Some(-3.0)), Some(Command::Stop));
        assert_eq!(Command::from_legacy(Some(f64::NAN)), None);
    }

    #[test]
    fn test_start_classification() {
        assert!(Command::Start(1.0).is_start());
        assert!(Command::StartIndefinite.is_start());
        assert!(!Command::Stop.is_start());
        assert_eq!(Command::StartIndefinite.duration(), None);
    }
}
