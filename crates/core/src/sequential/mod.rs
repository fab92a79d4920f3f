use crate::{classify::classify_row, CancelToken, ProgressSink, Raster, SegmentConfig};

/// Single-threaded baseline engine.
///
/// Walks rows top to bottom, columns left to right, and writes classified
/// pixels into the destination. After each completed row a configured delay
/// is slept off (visualization pacing only) and the progress sink, if any,
/// is asked to redraw.
///
/// Cancellation mid-delay aborts the remaining rows immediately and returns
/// without error, leaving the destination partially written. Callers that
/// care must detect incompleteness themselves.
pub fn segment(
    source: &Raster,
    destination: &mut Raster,
    config: &SegmentConfig,
    progress: Option<&dyn ProgressSink>,
    cancel: &CancelToken,
) {
    debug_assert_eq!(
        (source.width(), source.height(), source.channels()),
        (destination.width(), destination.height(), destination.channels()),
        "source and destination rasters must share dimensions",
    );

    for y in 0..source.height() {
        classify_row(
            source,
            y,
            destination.row_mut(y),
            config.mode,
            config.threshold,
        );

        if !config.delay.is_zero() && !cancel.sleep(config.delay) {
            tracing::debug!(row = y, "sequential run cancelled during its pacing delay");
            return;
        }

        if let Some(sink) = progress {
            sink.redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::SegmentationMode;

    fn white_rgba(width: usize, height: usize) -> Raster {
        Raster::from_raw(width, height, 4, vec![255; width * height * 4]).unwrap()
    }

    #[test]
    fn segments_an_all_white_image_to_white() {
        let source = white_rgba(4, 4);
        let mut destination = Raster::new(4, 4, 4).unwrap();
        let config = SegmentConfig::new(SegmentationMode::Grayscale, 128);

        segment(&source, &mut destination, &config, None, &CancelToken::new());

        assert_eq!(destination, source);
    }

    #[test]
    fn requests_a_redraw_after_every_row() {
        let source = white_rgba(3, 5);
        let mut destination = Raster::new(3, 5, 4).unwrap();
        let config = SegmentConfig::default();

        let redraws = AtomicUsize::new(0);
        let sink = || {
            redraws.fetch_add(1, Ordering::Relaxed);
        };

        segment(
            &source,
            &mut destination,
            &config,
            Some(&sink),
            &CancelToken::new(),
        );

        assert_eq!(redraws.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn unknown_mode_blacks_out_the_image_but_keeps_alpha() {
        let source = white_rgba(2, 2);
        let mut destination = Raster::new(2, 2, 4).unwrap();
        let config = SegmentConfig::new(SegmentationMode::Unknown, 128);

        segment(&source, &mut destination, &config, None, &CancelToken::new());

        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(destination.pixel(x, y), [0, 0, 0, 255]);
            }
        }
    }

    #[test]
    fn cancellation_during_the_delay_stops_after_the_current_row() {
        let source = white_rgba(2, 4);
        let mut destination = Raster::new(2, 4, 4).unwrap();
        let config = SegmentConfig::new(SegmentationMode::Grayscale, 128)
            .with_delay(Duration::from_millis(50));

        let cancel = CancelToken::new();
        cancel.cancel();

        segment(&source, &mut destination, &config, None, &cancel);

        // The first row was classified before the delay fired the token.
        assert_eq!(destination.pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(destination.pixel(1, 0), [255, 255, 255, 255]);
        // Remaining rows were never touched.
        for y in 1..4 {
            assert_eq!(destination.pixel(0, y), [0, 0, 0, 0]);
        }
    }
}
