use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use clap::{Args, Parser, Subcommand};
use image_segmenter_core::{
    parallel, sequential, CancelToken, ProgressCounter, ProgressSink, Raster, SegmentConfig,
    SegmentationMode, SegmenterError,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn main() -> image_segmenter_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_benchmark(args),
        Commands::Scalability(args) => run_scalability(args),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Image segmentation performance dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Segment an image with both engines and report speed-up metrics.
    Run(RunArgs),
    /// Sweep the parallel engine across thread counts against one baseline.
    Scalability(ScalabilityArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the image to segment.
    input: PathBuf,
    /// Classification threshold in [0, 255].
    #[arg(short, long, default_value_t = 128)]
    threshold: u8,
    /// Classification rule; unrecognised names classify everything to black.
    #[arg(short, long, default_value = "grayscale")]
    mode: SegmentationMode,
    /// Worker count for the parallel engine.
    #[arg(long, default_value_t = default_threads())]
    threads: usize,
    /// Pacing delay per progress tick in milliseconds. Distorts timings;
    /// only useful together with a live display.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
    /// Directory that receives the two segmented output images.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Emit the metrics as JSON instead of the human-readable report.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ScalabilityArgs {
    /// Path to the image to segment.
    input: PathBuf,
    /// Classification threshold in [0, 255].
    #[arg(short, long, default_value_t = 128)]
    threshold: u8,
    /// Classification rule; unrecognised names classify everything to black.
    #[arg(short, long, default_value = "grayscale")]
    mode: SegmentationMode,
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Stand-in for the GUI's live panel: counts redraw requests and surfaces
/// them as debug events instead of repainting anything.
#[derive(Debug, Default)]
struct RedrawLog {
    requests: AtomicUsize,
}

impl RedrawLog {
    fn count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

impl ProgressSink for RedrawLog {
    fn redraw(&self) {
        let seen = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(requests = seen, "redraw requested");
    }
}

#[derive(Debug, Serialize)]
struct BenchmarkReport {
    width: usize,
    height: usize,
    channels: usize,
    mode: SegmentationMode,
    threshold: u8,
    threads: usize,
    sequential_ms: f64,
    parallel_ms: f64,
    speedup: f64,
    efficiency_pct: f64,
    /// Resident raster bytes per phase. Approximate by design: it counts
    /// the source and destination buffers, not allocator or pool overhead.
    sequential_buffer_bytes: usize,
    parallel_buffer_bytes: usize,
    memory_overhead_ratio: f64,
    rows_processed: usize,
    sequential_redraws: usize,
    parallel_redraws: usize,
}

fn run_benchmark(args: RunArgs) -> image_segmenter_core::Result<()> {
    let source = load_raster(&args.input)?;
    tracing::info!(
        path = %args.input.display(),
        width = source.width(),
        height = source.height(),
        "image loaded"
    );

    let threads = args.threads.max(1);
    let config = SegmentConfig::new(args.mode, args.threshold)
        .with_delay(Duration::from_millis(args.delay_ms));
    let cancel = CancelToken::new();

    // Each engine gets its own deep copy of the source as its destination,
    // so both start from the original pixels.
    let mut seq_output = source.clone();
    let mut par_output = source.clone();

    let seq_panel = RedrawLog::default();
    tracing::info!("running sequential segmentation");
    let started = Instant::now();
    sequential::segment(&source, &mut seq_output, &config, Some(&seq_panel), &cancel);
    let sequential_time = started.elapsed();

    let par_panel = RedrawLog::default();
    let counter = ProgressCounter::new();
    tracing::info!(threads, "running parallel segmentation");
    let started = Instant::now();
    parallel::segment(
        &source,
        &mut par_output,
        &config,
        threads,
        Some(&par_panel),
        &counter,
        &cancel,
    );
    let parallel_time = started.elapsed();

    if counter.value() != source.height() {
        tracing::warn!(
            rows = counter.value(),
            height = source.height(),
            "parallel run finished incomplete"
        );
    }

    let buffer_bytes = source.as_bytes().len() * 2;
    let speedup = sequential_time.as_secs_f64() / parallel_time.as_secs_f64().max(f64::EPSILON);
    let report = BenchmarkReport {
        width: source.width(),
        height: source.height(),
        channels: source.channels(),
        mode: args.mode,
        threshold: args.threshold,
        threads,
        sequential_ms: to_ms(sequential_time),
        parallel_ms: to_ms(parallel_time),
        speedup,
        efficiency_pct: speedup / threads as f64 * 100.0,
        sequential_buffer_bytes: buffer_bytes,
        parallel_buffer_bytes: buffer_bytes,
        memory_overhead_ratio: 1.0,
        rows_processed: counter.value(),
        sequential_redraws: seq_panel.count(),
        parallel_redraws: par_panel.count(),
    };

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)?;
        save_raster(&seq_output, &dir.join("sequential.png"))?;
        save_raster(&par_output, &dir.join("parallel.png"))?;
        tracing::info!(dir = %dir.display(), "segmented outputs written");
    }

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|err| SegmenterError::msg(err.to_string()))?;
        println!("{json}");
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &BenchmarkReport) {
    println!("--- Segmentation Results ---");
    println!(
        "Image:           {}x{} ({} channels), mode {}, threshold {}",
        report.width, report.height, report.channels, report.mode, report.threshold
    );
    println!("Sequential time: {:.2} ms", report.sequential_ms);
    println!(
        "Parallel time:   {:.2} ms ({} threads)",
        report.parallel_ms, report.threads
    );
    println!("Speed-up:        {:.2}x", report.speedup);
    println!(
        "Efficiency:      {:.1}% of the ideal {:.2}x",
        report.efficiency_pct, report.threads as f64
    );
    println!(
        "Raster buffers:  {:.2} MiB per phase (approximate, ratio {:.2}x)",
        report.sequential_buffer_bytes as f64 / (1024.0 * 1024.0),
        report.memory_overhead_ratio
    );
    println!(
        "Rows processed:  {}/{}",
        report.rows_processed, report.height
    );
    println!(
        "Redraw requests: sequential {}, parallel {}",
        report.sequential_redraws, report.parallel_redraws
    );
}

fn run_scalability(args: ScalabilityArgs) -> image_segmenter_core::Result<()> {
    let source = load_raster(&args.input)?;
    tracing::info!(
        path = %args.input.display(),
        width = source.width(),
        height = source.height(),
        "image loaded"
    );

    // No pacing delay and no sink: the sweep wants undistorted timings.
    let config = SegmentConfig::new(args.mode, args.threshold);
    let cancel = CancelToken::new();

    tracing::info!("running sequential baseline");
    let mut baseline_output = source.clone();
    let started = Instant::now();
    sequential::segment(&source, &mut baseline_output, &config, None, &cancel);
    let baseline = started.elapsed();

    println!("--- Scalability Test ---");
    println!("Sequential baseline: {:.2} ms", to_ms(baseline));

    for threads in thread_counts() {
        let mut output = source.clone();
        let counter = ProgressCounter::new();

        let started = Instant::now();
        parallel::segment(
            &source,
            &mut output,
            &config,
            threads,
            None,
            &counter,
            &cancel,
        );
        let elapsed = started.elapsed();

        if output != baseline_output {
            tracing::warn!(threads, "parallel output diverged from the baseline");
        }

        let speedup = baseline.as_secs_f64() / elapsed.as_secs_f64().max(f64::EPSILON);
        println!(
            "  {threads:>2} threads: {:>9.2} ms, speed-up {:.2}x (ideal {:.2}x)",
            to_ms(elapsed),
            speedup,
            threads as f64
        );
    }

    println!(
        "Speed-up should grow with cores until it plateaus on task and \
         scheduling overhead."
    );

    Ok(())
}

/// Thread counts for the sweep: powers of two up to the machine, plus the
/// machine's own core count.
fn thread_counts() -> Vec<usize> {
    let max = default_threads();
    let mut counts: Vec<usize> = [1, 2, 4, 8].into_iter().filter(|&n| n <= max).collect();
    if !counts.contains(&max) {
        counts.push(max);
    }
    counts
}

fn to_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e3
}

fn load_raster(path: &Path) -> image_segmenter_core::Result<Raster> {
    let decoded = image::open(path)
        .map_err(|err| SegmenterError::msg(format!("could not decode {}: {err}", path.display())))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Raster::from_raw(width as usize, height as usize, 4, rgba.into_raw())
}

fn save_raster(raster: &Raster, path: &Path) -> image_segmenter_core::Result<()> {
    let image = image::RgbaImage::from_raw(
        raster.width() as u32,
        raster.height() as u32,
        raster.as_bytes().to_vec(),
    )
    .ok_or(SegmenterError::InvalidInput(
        "raster dimensions do not fit an image buffer",
    ))?;

    image
        .save(path)
        .map_err(|err| SegmenterError::msg(format!("could not write {}: {err}", path.display())))
}
