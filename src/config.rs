use serde::Deserialize;

/// Positional slack, in points, applied on every side of a target box.
pub const DEFAULT_BBOX_TOLERANCE: f64 = 5.0;

/// Maximum number of characters of element text quoted in a change entry.
pub const DEFAULT_SUMMARY_CHARS: usize = 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    pub bbox_tolerance: f64,
    pub summary_chars: usize,
    /// Re-apply Flate compression to content streams we rewrite when the
    /// original stream carried a filter.
    pub recompress_streams: bool,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        TaggerConfig {
            bbox_tolerance: DEFAULT_BBOX_TOLERANCE,
            summary_chars: DEFAULT_SUMMARY_CHARS,
            recompress_streams: true,
        }
    }
}

impl TaggerConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        if tolerance.is_finite() && tolerance >= 0.0 {
            self.bbox_tolerance = tolerance;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: TaggerConfig = serde_json::from_str(r#"{"bbox_tolerance": 2.5}"#).unwrap();
        assert_eq!(config.bbox_tolerance, 2.5);
        assert_eq!(config.summary_chars, DEFAULT_SUMMARY_CHARS);
        assert!(config.recompress_streams);
    }

    #[test]
    fn invalid_tolerance_is_ignored() {
        let config = TaggerConfig::default().with_tolerance(f64::NAN).with_tolerance(-1.0);
        assert_eq!(config.bbox_tolerance, DEFAULT_BBOX_TOLERANCE);
        assert_eq!(TaggerConfig::default().with_tolerance(0.0).bbox_tolerance, 0.0);
    }
}
