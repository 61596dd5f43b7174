//! Keyboard and pointer control surface.

use winit::keyboard::KeyCode;

/// Discrete commands accepted by the running app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Recompile the effect shader from disk
    ReloadShader,
    /// Switch between the effect and the plain picture
    ToggleEffect,
    NextPicture,
    /// Sine → Microphone → Playback → Noise → Sine
    NextMode,
    /// Load the next playback asset
    NextTrack,
    Quit,
}

impl Command {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::KeyL => Some(Self::ReloadShader),
            KeyCode::KeyT => Some(Self::ToggleEffect),
            KeyCode::KeyP => Some(Self::NextPicture),
            KeyCode::KeyM => Some(Self::NextMode),
            KeyCode::KeyA => Some(Self::NextTrack),
            KeyCode::Escape => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Sine control value for a pointer at physical `x`.
///
/// The sine width is the logical window width, so the pointer is brought
/// into logical pixels first.
pub fn sine_control(x: f64, scale_factor: f64) -> f32 {
    if scale_factor > 0.0 {
        (x / scale_factor) as f32
    } else {
        x as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(Command::from_key(KeyCode::KeyL), Some(Command::ReloadShader));
        assert_eq!(Command::from_key(KeyCode::KeyT), Some(Command::ToggleEffect));
        assert_eq!(Command::from_key(KeyCode::KeyP), Some(Command::NextPicture));
        assert_eq!(Command::from_key(KeyCode::KeyM), Some(Command::NextMode));
        assert_eq!(Command::from_key(KeyCode::KeyA), Some(Command::NextTrack));
        assert_eq!(Command::from_key(KeyCode::Escape), Some(Command::Quit));
    }

    #[test]
    fn test_unbound_keys_are_ignored() {
        assert_eq!(Command::from_key(KeyCode::KeyQ), None);
        assert_eq!(Command::from_key(KeyCode::Space), None);
    }

    #[test]
    fn test_sine_control_is_logical() {
        // Right edge of a 1024pt window on a 2x display
        assert_eq!(sine_control(2048.0, 2.0), 1024.0);
        assert_eq!(sine_control(300.0, 1.0), 300.0);
        assert_eq!(sine_control(300.0, 0.0), 300.0);
    }
}
