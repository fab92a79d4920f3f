use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SegmentationMode;

/// Per-run configuration shared by the sequential and parallel engines.
///
/// The delay exists purely to slow the run down for visualization; it is
/// never required for correctness and benchmark callers are expected to
/// leave it at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub mode: SegmentationMode,
    /// Meaning depends on the mode: luminance cutoff for grayscale,
    /// per-channel dominance cutoff for the colour modes, unused for custom.
    pub threshold: u8,
    /// Pause inserted at each progress cadence tick. Zero disables pacing.
    #[serde(default)]
    pub delay: Duration,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            mode: SegmentationMode::Grayscale,
            threshold: 128,
            delay: Duration::ZERO,
        }
    }
}

impl SegmentConfig {
    pub fn new(mode: SegmentationMode, threshold: u8) -> Self {
        Self {
            mode,
            threshold,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}
