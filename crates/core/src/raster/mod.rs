use crate::{Result, SegmenterError};

/// Owned, row-major 2D pixel buffer with 3 (RGB) or 4 (RGBA) byte channels.
///
/// A raster is the unit both engines operate on: the source is read through
/// a shared reference while the destination is mutated exclusively, so the
/// borrow checker rules out two concurrent runs targeting one destination.
/// `Clone` yields the deep copies the benchmark driver hands to each engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl Raster {
    /// Creates a zero-filled raster of the given dimensions.
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self> {
        if channels != 3 && channels != 4 {
            return Err(SegmenterError::InvalidInput(
                "rasters must have 3 (RGB) or 4 (RGBA) channels",
            ));
        }

        Ok(Self {
            width,
            height,
            channels,
            data: vec![0; width * height * channels],
        })
    }

    /// Wraps an existing row-major byte buffer.
    pub fn from_raw(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        if channels != 3 && channels != 4 {
            return Err(SegmenterError::InvalidInput(
                "rasters must have 3 (RGB) or 4 (RGBA) channels",
            ));
        }

        if data.len() != width * height * channels {
            return Err(SegmenterError::InvalidInput(
                "raster buffer length does not match width * height * channels",
            ));
        }

        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of channels per pixel, 3 or 4.
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    /// Bytes occupied by one row.
    pub fn row_bytes(&self) -> usize {
        self.width * self.channels
    }

    /// Reads the pixel at (x, y) as RGBA. Alpha defaults to 255 for RGB
    /// rasters.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let start = (y * self.width + x) * self.channels;
        let px = &self.data[start..start + self.channels];
        let alpha = if self.channels == 4 { px[3] } else { 255 };
        [px[0], px[1], px[2], alpha]
    }

    /// Writes the pixel at (x, y). The alpha component is dropped for RGB
    /// rasters.
    pub fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let start = (y * self.width + x) * self.channels;
        self.data[start..start + self.channels].copy_from_slice(&rgba[..self.channels]);
    }

    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.row_bytes();
        &self.data[start..start + self.row_bytes()]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let row_bytes = self.row_bytes();
        let start = y * row_bytes;
        &mut self.data[start..start + row_bytes]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Full mutable view over the buffer; the parallel engine carves this
    /// into disjoint per-range slices.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the raster and returns the underlying buffer.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_channel_counts() {
        assert!(Raster::new(4, 4, 2).is_err());
        assert!(Raster::new(4, 4, 5).is_err());
        assert!(Raster::new(4, 4, 3).is_ok());
        assert!(Raster::new(4, 4, 4).is_ok());
    }

    #[test]
    fn rejects_mismatched_buffer_length() {
        let err = Raster::from_raw(2, 2, 3, vec![0; 11]).unwrap_err();
        assert!(format!("{err}").contains("buffer length"));
    }

    #[test]
    fn rgb_pixels_read_with_opaque_alpha() {
        let mut raster = Raster::new(2, 1, 3).unwrap();
        raster.set_pixel(1, 0, [10, 20, 30, 99]);

        // The alpha written above is dropped, the alpha read back is opaque.
        assert_eq!(raster.pixel(1, 0), [10, 20, 30, 255]);
        assert_eq!(raster.row(0), &[0, 0, 0, 10, 20, 30]);
    }

    #[test]
    fn rgba_pixels_round_trip() {
        let mut raster = Raster::new(1, 1, 4).unwrap();
        raster.set_pixel(0, 0, [1, 2, 3, 4]);
        assert_eq!(raster.pixel(0, 0), [1, 2, 3, 4]);
    }

    #[test]
    fn clones_are_independent_deep_copies() {
        let mut original = Raster::new(2, 2, 4).unwrap();
        let copy = original.clone();
        original.set_pixel(0, 0, [255, 255, 255, 255]);

        assert_ne!(original, copy);
        assert_eq!(copy.pixel(0, 0), [0, 0, 0, 0]);
    }
}
