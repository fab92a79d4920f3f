//! Core library for the Image Segmenter benchmark application.
//!
//! The crate owns everything with real algorithmic or concurrency design:
//! the per-pixel classification rules, the sequential baseline engine, the
//! fork-join parallel engine with its shared progress protocol, and the
//! raster and configuration types both engines operate on. File handling,
//! wall-clock timing, metric formatting and result display are collaborator
//! concerns and live in the application crate.

pub mod classify;
pub mod config;
pub mod error;
pub mod parallel;
pub mod progress;
pub mod raster;
pub mod sequential;

pub use classify::{classify, SegmentationMode};
pub use config::SegmentConfig;
pub use error::{Result, SegmenterError};
pub use progress::{CancelToken, ProgressCounter, ProgressSink, REDRAW_CADENCE_ROWS};
pub use raster::Raster;
