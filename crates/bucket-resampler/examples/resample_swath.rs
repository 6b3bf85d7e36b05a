//! Resample a synthetic satellite swath onto a polar stereographic grid.
//!
//! Generates a scanning swath over the North Atlantic, buckets it onto a
//! configurable grid, and prints occupancy statistics for the sum, count,
//! and average products.

use std::f64::consts::PI;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bucket_resampler::BucketSession;
use chunked_array::LazyArray;
use projection::PolarStereographic;
use swath_common::{Extent, GridDefinition};

#[derive(Parser, Debug)]
#[command(name = "resample_swath")]
#[command(about = "Bucket-resample a synthetic swath onto a polar grid")]
struct Args {
    /// Grid rows
    #[arg(long, default_value_t = 256)]
    rows: usize,

    /// Grid columns
    #[arg(long, default_value_t = 256)]
    cols: usize,

    /// Number of swath samples
    #[arg(short, long, default_value_t = 100_000)]
    samples: usize,

    /// Chunk length for the lazy input arrays
    #[arg(long, default_value_t = 16_384)]
    chunk_len: usize,

    /// Fill value for empty cells in the average product
    #[arg(long, default_value_t = f64::NAN)]
    fill_value: f64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// A scanning swath: the track sweeps west to east while the scan line
/// oscillates north-south, with a smooth synthetic field attached.
fn synthetic_swath(samples: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut lons = Vec::with_capacity(samples);
    let mut lats = Vec::with_capacity(samples);
    let mut data = Vec::with_capacity(samples);
    for i in 0..samples {
        let t = i as f64 / samples.max(2) as f64;
        let lon = -20.0 + 40.0 * t;
        let lat = 65.0 + 9.5 * (16.0 * PI * t).sin();
        lons.push(lon);
        lats.push(lat);
        data.push(240.0 + 0.8 * (lat - 65.0) - 0.1 * lon);
    }
    (lons, lats, data)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Stereographic grid over the swath area, true scale at 60N.
    let grid = GridDefinition::new(
        args.rows,
        args.cols,
        Extent::new(-1_300_000.0, -3_800_000.0, 1_300_000.0, -1_400_000.0),
        Arc::new(PolarStereographic::north(0.0, 60.0)),
    );
    let (x_res, y_res) = grid.resolution();
    info!(
        rows = args.rows,
        cols = args.cols,
        x_res_m = x_res.round() as i64,
        y_res_m = y_res.round() as i64,
        "grid defined"
    );

    let (lons, lats, data) = synthetic_swath(args.samples);
    let lons = LazyArray::from_vec_chunked(lons, args.chunk_len);
    let lats = LazyArray::from_vec_chunked(lats, args.chunk_len);
    let data = LazyArray::from_vec_chunked(data, args.chunk_len);
    info!(
        samples = args.samples,
        chunks = lons.chunk_lens().len(),
        "swath generated"
    );

    let session = BucketSession::new();
    // All three products assemble lazily; the projection and index work is
    // shared through the session cache and runs once, at materialization.
    let sums = session.sum(&grid, data.clone(), &lons, &lats)?;
    let counts = session.count(&grid, &lons, &lats)?;
    let average = session.average(&grid, data, &lons, &lats, args.fill_value)?;

    let counts = counts.compute();
    let sums = sums.compute();
    let average = average.compute();

    let n_cells = args.rows * args.cols;
    let occupied = counts.iter().filter(|c| *c > 0).count();
    let landed: u64 = counts.iter().sum();
    let max_per_cell = counts.iter().max().unwrap_or(0);
    println!("Grid: {} x {} ({} cells)", args.rows, args.cols, n_cells);
    println!(
        "Samples landed: {} of {} ({} discarded out-of-grid)",
        landed,
        args.samples,
        args.samples as u64 - landed
    );
    println!(
        "Occupied cells: {} ({:.1}% coverage), max {} samples per cell",
        occupied,
        100.0 * occupied as f64 / n_cells as f64,
        max_per_cell
    );

    let total_sum: f64 = sums.iter().sum();
    println!("Total accumulated value: {:.1}", total_sum);

    let finite: Vec<f64> = average.iter().filter(|v| v.is_finite()).collect();
    if let (Some(min), Some(max)) = (
        finite.iter().copied().reduce(f64::min),
        finite.iter().copied().reduce(f64::max),
    ) {
        println!("Average product range: {:.2} .. {:.2}", min, max);
    }

    let stats = session.cache_stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        "index cache statistics"
    );

    Ok(())
}
