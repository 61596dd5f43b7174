//! Active frame source selection, shared between the audio and render threads.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Deserialize;

use crate::error::SessionError;

/// Where audio frames come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum Mode {
    #[serde(alias = "sine")]
    SyntheticSine = 0,

    #[serde(alias = "mic")]
    Microphone = 1,

    /// Decoded audio file; spectrum comes from the playback deck
    #[default]
    #[serde(alias = "file")]
    Playback = 2,

    #[serde(alias = "noise")]
    SyntheticNoise = 3,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::SyntheticSine,
        Mode::Microphone,
        Mode::Playback,
        Mode::SyntheticNoise,
    ];

    /// Mode selected by the "next mode" command
    pub fn next(self) -> Self {
        match self {
            Self::SyntheticSine => Self::Microphone,
            Self::Microphone => Self::Playback,
            Self::Playback => Self::SyntheticNoise,
            Self::SyntheticNoise => Self::SyntheticSine,
        }
    }

    pub fn is_playback(self) -> bool {
        self == Self::Playback
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SyntheticSine => "sine",
            Self::Microphone => "microphone",
            Self::Playback => "playback",
            Self::SyntheticNoise => "noise",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::SyntheticSine,
            1 => Self::Microphone,
            3 => Self::SyntheticNoise,
            _ => Self::Playback,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sine" | "synthetic-sine" => Ok(Self::SyntheticSine),
            "mic" | "microphone" => Ok(Self::Microphone),
            "file" | "playback" => Ok(Self::Playback),
            "noise" | "synthetic-noise" => Ok(Self::SyntheticNoise),
            other => Err(SessionError::UnknownMode(other.to_string())),
        }
    }
}

/// Single-byte mode cell read by the audio callback and written by the render loop.
///
/// A stale read costs at most one frame processed under the previous mode.
#[derive(Debug)]
pub struct SharedMode(AtomicU8);

impl SharedMode {
    pub fn new(mode: Mode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    pub fn get(&self) -> Mode {
        Mode::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, mode: Mode) {
        self.0.store(mode as u8, Ordering::Relaxed);
    }

    /// Switch to the next mode and return it
    pub fn advance(&self) -> Mode {
        let next = self.get().next();
        self.set(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_mode_cycle_order() {
        assert_eq!(Mode::SyntheticSine.next(), Mode::Microphone);
        assert_eq!(Mode::Microphone.next(), Mode::Playback);
        assert_eq!(Mode::Playback.next(), Mode::SyntheticNoise);
        assert_eq!(Mode::SyntheticNoise.next(), Mode::SyntheticSine);
    }

    #[test]
    fn test_cycle_visits_every_mode_once() {
        for start in Mode::ALL {
            let mut seen = vec![start];
            let mut mode = start.next();
            while mode != start {
                assert!(!seen.contains(&mode));
                seen.push(mode);
                mode = mode.next();
            }
            assert_eq!(seen.len(), Mode::ALL.len());
        }
    }

    #[test]
    fn test_shared_mode_advance_from_microphone() {
        let shared = SharedMode::new(Mode::Microphone);

        // Three "next mode" commands: Playback, Noise, Sine
        assert_eq!(shared.advance(), Mode::Playback);
        assert_eq!(shared.advance(), Mode::SyntheticNoise);
        assert_eq!(shared.advance(), Mode::SyntheticSine);
        assert_eq!(shared.advance(), Mode::Microphone);
        assert_eq!(shared.get(), Mode::Microphone);
    }

    #[test]
    fn test_shared_mode_round_trips_every_mode() {
        let shared = SharedMode::new(Mode::default());
        for mode in Mode::ALL {
            shared.set(mode);
            assert_eq!(shared.get(), mode);
        }
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Sine".parse::<Mode>().unwrap(), Mode::SyntheticSine);
        assert_eq!("mic".parse::<Mode>().unwrap(), Mode::Microphone);
        assert_eq!("playback".parse::<Mode>().unwrap(), Mode::Playback);
        assert_eq!("noise".parse::<Mode>().unwrap(), Mode::SyntheticNoise);
        assert!(matches!(
            "square".parse::<Mode>(),
            Err(SessionError::UnknownMode(_))
        ));
    }
}
