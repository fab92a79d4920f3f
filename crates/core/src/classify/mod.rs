use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Raster;

/// Named per-pixel classification rules.
///
/// Mode selection is fail-safe: a name the engine does not recognise parses
/// to [`SegmentationMode::Unknown`], which classifies every pixel to black
/// instead of erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SegmentationMode {
    /// Binarise on mean luminance against the threshold.
    Grayscale,
    /// Pure red where red strictly dominates and exceeds the threshold.
    Red,
    /// Pure green where green strictly dominates and exceeds the threshold.
    Green,
    /// Keep pixels inside a fixed RGB window, black out the rest.
    Custom,
    /// Catch-all for unrecognised mode names.
    Unknown,
}

impl SegmentationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Red => "red",
            Self::Green => "green",
            Self::Custom => "custom",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SegmentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentationMode {
    type Err = Infallible;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match value {
            "grayscale" => Self::Grayscale,
            "red" => Self::Red,
            "green" => Self::Green,
            "custom" => Self::Custom,
            _ => Self::Unknown,
        })
    }
}

impl From<String> for SegmentationMode {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(Self::Unknown)
    }
}

/// Classifies one RGBA pixel. Pure and deterministic; both engines rely on
/// this single function for output correctness.
///
/// Every rule passes the alpha channel through unchanged.
pub fn classify(rgba: [u8; 4], mode: SegmentationMode, threshold: u8) -> [u8; 4] {
    let [r, g, b, alpha] = rgba;

    match mode {
        SegmentationMode::Grayscale => {
            let luminance = (u16::from(r) + u16::from(g) + u16::from(b)) / 3;
            let bin = if luminance < u16::from(threshold) { 0 } else { 255 };
            [bin, bin, bin, alpha]
        }
        SegmentationMode::Red => {
            if r > g && r > b && r > threshold {
                [255, 0, 0, alpha]
            } else {
                [0, 0, 0, alpha]
            }
        }
        SegmentationMode::Green => {
            if g > r && g > b && g > threshold {
                [0, 255, 0, alpha]
            } else {
                [0, 0, 0, alpha]
            }
        }
        SegmentationMode::Custom => {
            if r > 100 && g < 150 && b > 50 {
                [r, g, b, alpha]
            } else {
                [0, 0, 0, alpha]
            }
        }
        SegmentationMode::Unknown => [0, 0, 0, alpha],
    }
}

/// Classifies one source row into a destination row slice, strictly
/// column-ascending. The shared per-row body of both engines.
///
/// `dst_row` must cover exactly one row of a raster with the source's
/// dimensions; for 3-channel rasters the classified alpha is dropped on
/// write.
pub(crate) fn classify_row(
    source: &Raster,
    y: usize,
    dst_row: &mut [u8],
    mode: SegmentationMode,
    threshold: u8,
) {
    let channels = source.channels();
    for x in 0..source.width() {
        let out = classify(source.pixel(x, y), mode, threshold);
        dst_row[x * channels..(x + 1) * channels].copy_from_slice(&out[..channels]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_binarises_on_mean_luminance() {
        let mode = SegmentationMode::Grayscale;
        assert_eq!(classify([200, 200, 200, 255], mode, 128), [255, 255, 255, 255]);
        assert_eq!(classify([10, 10, 10, 255], mode, 128), [0, 0, 0, 255]);
        // (127 + 128 + 129) / 3 == 128, which is not below the threshold.
        assert_eq!(classify([127, 128, 129, 255], mode, 128), [255, 255, 255, 255]);
    }

    #[test]
    fn red_requires_strict_dominance_and_threshold() {
        let mode = SegmentationMode::Red;
        assert_eq!(classify([200, 50, 50, 255], mode, 100), [255, 0, 0, 255]);
        // Dominant but not above the threshold.
        assert_eq!(classify([90, 50, 50, 255], mode, 100), [0, 0, 0, 255]);
        // Above the threshold but tied with green.
        assert_eq!(classify([200, 200, 50, 255], mode, 100), [0, 0, 0, 255]);
    }

    #[test]
    fn green_mirrors_red_on_the_green_channel() {
        let mode = SegmentationMode::Green;
        assert_eq!(classify([50, 200, 50, 255], mode, 100), [0, 255, 0, 255]);
        assert_eq!(classify([50, 90, 50, 255], mode, 100), [0, 0, 0, 255]);
    }

    #[test]
    fn custom_keeps_pixels_inside_the_window() {
        let mode = SegmentationMode::Custom;
        assert_eq!(classify([150, 100, 80, 255], mode, 0), [150, 100, 80, 255]);
        // Fails the g < 150 condition.
        assert_eq!(classify([150, 200, 80, 255], mode, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn unknown_mode_degrades_to_black() {
        assert_eq!(
            classify([120, 130, 140, 200], SegmentationMode::Unknown, 128),
            [0, 0, 0, 200]
        );
    }

    #[test]
    fn alpha_passes_through_every_rule() {
        for mode in [
            SegmentationMode::Grayscale,
            SegmentationMode::Red,
            SegmentationMode::Green,
            SegmentationMode::Custom,
            SegmentationMode::Unknown,
        ] {
            assert_eq!(classify([200, 50, 60, 42], mode, 100)[3], 42);
        }
    }

    #[test]
    fn unrecognised_mode_names_parse_to_unknown() {
        assert_eq!("grayscale".parse(), Ok(SegmentationMode::Grayscale));
        assert_eq!("custom".parse(), Ok(SegmentationMode::Custom));
        assert_eq!("sepia".parse(), Ok(SegmentationMode::Unknown));
        assert_eq!("".parse(), Ok(SegmentationMode::Unknown));
    }

    #[test]
    fn classifies_rows_for_rgb_rasters_without_alpha_bytes() {
        let source = Raster::from_raw(2, 1, 3, vec![200, 200, 200, 10, 10, 10]).unwrap();
        let mut row = vec![0_u8; source.row_bytes()];

        classify_row(&source, 0, &mut row, SegmentationMode::Grayscale, 128);

        assert_eq!(row, vec![255, 255, 255, 0, 0, 0]);
    }
}
