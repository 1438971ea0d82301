//! Engine configuration.

use heks_math::Size;
use serde::Deserialize;

/// Settings for an engine instance and its frame loop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Logical size of the drawing surface, and the default room size.
    pub size: Size,
    /// Display scale factor applied by the drawing surface.
    pub scale: f32,
    /// Frames per second requested from the scheduler.
    pub target_fps: f64,
    /// Maximum number of frames to run (0 = unlimited).
    pub max_frames: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            size: Size::new(320.0, 240.0),
            scale: 1.0,
            target_fps: 60.0,
            max_frames: 0,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed JSON or mistyped fields.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn with_target_fps(mut self, fps: f64) -> Self {
        self.target_fps = fps;
        self
    }

    #[must_use]
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = frames;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.size, Size::new(320.0, 240.0));
        assert_eq!(config.max_frames, 0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{"size": {"width": 160, "height": 144}, "maxFrames": 30}"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.size, Size::new(160.0, 144.0));
        assert_eq!(config.max_frames, 30);
        assert!((config.target_fps - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_mistyped_fields() {
        assert!(EngineConfig::from_json_str(r#"{"scale": "big"}"#).is_err());
    }
}
